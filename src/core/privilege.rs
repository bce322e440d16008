//! Privilege levels a context can run at

use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege level of a context
///
/// `Normal` contexts execute against the schema that enforces access
/// control; `Elevated` ("sudo") contexts execute against the schema that
/// bypasses it. Nothing else about a context depends on the level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    #[default]
    Normal,
    Elevated,
}

impl Privilege {
    /// Both levels, in binding order
    pub const ALL: [Privilege; 2] = [Privilege::Normal, Privilege::Elevated];

    pub fn is_elevated(self) -> bool {
        matches!(self, Privilege::Elevated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Privilege::Normal => "normal",
            Privilege::Elevated => "elevated",
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
