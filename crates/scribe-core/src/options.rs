//! Model configuration options.
//!
//! [`ModelOptions`] collects every knob that can be set at load time into one
//! explicit struct, so a model can be opened fully configured in a single call
//! instead of a sequence of post-load mutators.

use serde::{Deserialize, Serialize};

/// Options applied when opening a model.
///
/// All fields are optional; `None` means "use the engine default".
///
/// # Example
///
/// ```ignore
/// use scribe_core::ModelOptions;
///
/// let opts = ModelOptions::new()
///     .with_beam_width(256)
///     .with_scorer_path("scorer.bin")
///     .with_scorer_weights(0.75, 1.85);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Decode beam width. `None` keeps the engine default.
    pub beam_width: Option<u32>,
    /// Path to an external scorer artifact to enable at load time.
    pub scorer_path: Option<String>,
    /// Scorer weights `(alpha, beta)`. Ignored unless a scorer is enabled.
    pub scorer_weights: Option<(f32, f32)>,
}

impl ModelOptions {
    /// Options with every field at the engine default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the decode beam width.
    pub fn with_beam_width(mut self, beam_width: u32) -> Self {
        self.beam_width = Some(beam_width);
        self
    }

    /// Enable an external scorer from the given path at load time.
    pub fn with_scorer_path(mut self, path: impl Into<String>) -> Self {
        self.scorer_path = Some(path.into());
        self
    }

    /// Set the scorer weights (language model weight alpha, word insertion
    /// weight beta).
    pub fn with_scorer_weights(mut self, alpha: f32, beta: f32) -> Self {
        self.scorer_weights = Some((alpha, beta));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_engine_defaults() {
        let opts = ModelOptions::new();
        assert_eq!(opts.beam_width, None);
        assert_eq!(opts.scorer_path, None);
        assert_eq!(opts.scorer_weights, None);
    }

    #[test]
    fn test_builder_chaining() {
        let opts = ModelOptions::new()
            .with_beam_width(128)
            .with_scorer_path("scorer.bin")
            .with_scorer_weights(0.75, 1.85);
        assert_eq!(opts.beam_width, Some(128));
        assert_eq!(opts.scorer_path.as_deref(), Some("scorer.bin"));
        assert_eq!(opts.scorer_weights, Some((0.75, 1.85)));
    }

    #[test]
    fn test_serde_round_trip() {
        let opts = ModelOptions::new().with_beam_width(64);
        let json = serde_json::to_string(&opts).unwrap();
        let back: ModelOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
    }
}
