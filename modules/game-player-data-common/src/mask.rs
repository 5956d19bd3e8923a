//! Field-mask driven partial updates.
//!
//! A change event carries a partial record plus the list of field names that
//! are authoritative in it. Only those fields are copied onto the base record;
//! everything else in the partial (typically zero values) is ignored.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::PlayerDataError;
use crate::types::{GameData, PlayerRecord};

/// Ordered field names naming the authoritative fields of a partial value.
/// May be empty, repeat names, or name fields the variant does not have.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMask {
    #[serde(default)]
    pub paths: Vec<String>,
}

impl FieldMask {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldMask {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// One entry of a variant's static field table.
pub struct Field<T> {
    pub name: &'static str,
    pub apply: fn(&mut T, &T),
}

impl<T: GameData> Field<T> {
    fn lookup(name: &str) -> Option<&'static Field<T>> {
        T::FIELDS.iter().find(|f| f.name == name)
    }
}

/// Copy the masked fields of `partial` onto a copy of `base`.
///
/// Unknown names are skipped. The player id is never part of a field table,
/// so it always comes from `base`.
pub fn merge<T: GameData>(base: &T, partial: &T, mask: &FieldMask) -> T {
    let mut merged = base.clone();
    for path in mask.paths() {
        match Field::<T>::lookup(path) {
            Some(field) => (field.apply)(&mut merged, partial),
            None => trace!(path = path.as_str(), game_mode = %T::MODE, "Ignoring unknown mask path"),
        }
    }
    merged
}

impl PlayerRecord {
    /// Variant-dispatching [`merge`]. Both records must be of the same mode.
    pub fn merge(&self, partial: &PlayerRecord, mask: &FieldMask) -> Result<PlayerRecord, PlayerDataError> {
        match (self, partial) {
            (PlayerRecord::BlockSumo(base), PlayerRecord::BlockSumo(p)) => Ok(merge(base, p, mask).into()),
            (PlayerRecord::Minesweeper(base), PlayerRecord::Minesweeper(p)) => {
                Ok(merge(base, p, mask).into())
            }
            (PlayerRecord::TowerDefence(base), PlayerRecord::TowerDefence(p)) => {
                Ok(merge(base, p, mask).into())
            }
            (base, p) => Err(PlayerDataError::VariantMismatch {
                expected: base.game_mode(),
                actual: p.game_mode(),
            }),
        }
    }
}
