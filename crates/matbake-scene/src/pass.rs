//! Bake pass types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the three independent render outputs produced per material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassType {
    /// Fully lit colour.
    Light,
    /// Fully shadowed colour.
    Dark,
    /// Tangent-space normal map.
    Normal,
}

impl PassType {
    /// All pass types in bake order.
    pub const ALL: [PassType; 3] = [PassType::Light, PassType::Dark, PassType::Normal];

    /// Returns the string identifier, which is also the image node name and
    /// the file name suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            PassType::Light => "light",
            PassType::Dark => "dark",
            PassType::Normal => "normal",
        }
    }
}

impl fmt::Display for PassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(PassType::Light),
            "dark" => Ok(PassType::Dark),
            "normal" => Ok(PassType::Normal),
            other => Err(format!("unknown pass type '{}'", other)),
        }
    }
}
