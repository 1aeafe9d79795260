//! Selection policy identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SelectionError;

/// How [`ServerSelector`](crate::ServerSelector) picks among candidates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Always the first candidate.
    First,
    /// A uniformly random candidate.
    Random,
    /// The first candidate to complete a benchmark probe.
    #[default]
    Fastest,
}

impl SelectionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Random => "random",
            Self::Fastest => "fastest",
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionPolicy {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "random" => Ok(Self::Random),
            "fastest" => Ok(Self::Fastest),
            _ => Err(SelectionError::UnknownPolicy(s.to_string())),
        }
    }
}
