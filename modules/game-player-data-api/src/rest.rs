use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue},
    response::Json,
    routing::{get, post},
    Router,
};
use game_player_data_common::{
    BlockSumoPlayerData, GameDataResponse, MinesweeperPlayerData, TowerDefencePlayerData,
};
use serde::{Deserialize, Serialize};
use tower_http::set_header::SetResponseHeaderLayer;
use uuid::Uuid;

use crate::error::{QueryError, QueryResult};
use crate::AppState;

// --- Request / response bodies ---

#[derive(Deserialize)]
pub struct GameModeQuery {
    game_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    player_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub players: HashMap<Uuid, BlockSumoPlayerData>,
}

// --- Router ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        .route("/game-player-data/{player_id}", get(api_player_data))
        .route("/game-player-data/{player_id}/block-sumo", get(api_block_sumo))
        .route("/game-player-data/{player_id}/minesweeper", get(api_minesweeper))
        .route("/game-player-data/{player_id}/tower-defence", get(api_tower_defence))
        .route("/game-player-data/block-sumo/batch", post(api_block_sumo_batch))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Player state changes underneath every response
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

// --- Handlers ---

pub async fn api_player_data(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
    params: Result<Query<GameModeQuery>, QueryRejection>,
) -> QueryResult<Json<GameDataResponse>> {
    let Query(params) = params?;
    let game_mode = params
        .game_mode
        .ok_or_else(|| QueryError::invalid_argument("game_mode is required"))?;

    let data = state.query.get_player_data(&player_id, &game_mode).await?;
    Ok(Json(data))
}

pub async fn api_block_sumo(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> QueryResult<Json<BlockSumoPlayerData>> {
    Ok(Json(state.query.get_block_sumo_data(&player_id).await?))
}

pub async fn api_minesweeper(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> QueryResult<Json<MinesweeperPlayerData>> {
    Ok(Json(state.query.get_minesweeper_data(&player_id).await?))
}

pub async fn api_tower_defence(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> QueryResult<Json<TowerDefencePlayerData>> {
    Ok(Json(state.query.get_tower_defence_data(&player_id).await?))
}

pub async fn api_block_sumo_batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> QueryResult<Json<BatchResponse>> {
    let Json(body) = body?;
    let players = state
        .query
        .get_block_sumo_data_for_players(&body.player_ids)
        .await?;
    Ok(Json(BatchResponse { players }))
}
