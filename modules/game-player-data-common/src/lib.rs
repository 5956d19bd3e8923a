pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod mask;
pub mod types;

pub use config::Config;
pub use defaults::DefaultPolicy;
pub use error::PlayerDataError;
pub use events::ChangeEvent;
pub use mask::{merge, Field, FieldMask};
pub use types::*;
