//! Resolver configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How unmatched images are ordered before positional pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Reading order: rows top to bottom, left to right within a row
    #[default]
    Spatial,
    /// Order of appearance in the paint stream
    Draw,
}

impl FallbackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackMode::Spatial => "spatial",
            FallbackMode::Draw => "draw",
        }
    }
}

impl fmt::Display for FallbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spatial" => Ok(FallbackMode::Spatial),
            "draw" => Ok(FallbackMode::Draw),
            other => Err(format!(
                "Unknown fallback mode '{}' (expected 'spatial' or 'draw')",
                other
            )),
        }
    }
}

/// Options for resolving alt text on a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Ordering used by the positional fallback
    pub fallback_mode: FallbackMode,
}

impl ResolveOptions {
    /// Create new resolve options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set fallback mode.
    pub fn with_fallback_mode(mut self, mode: FallbackMode) -> Self {
        self.fallback_mode = mode;
        self
    }

    /// Fall back to paint-stream order.
    pub fn draw_order(mut self) -> Self {
        self.fallback_mode = FallbackMode::Draw;
        self
    }

    /// Fall back to reading order.
    pub fn spatial(mut self) -> Self {
        self.fallback_mode = FallbackMode::Spatial;
        self
    }
}
