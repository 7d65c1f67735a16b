//! Model sessions.
//!
//! A [`ModelSession`] owns one loaded engine model from open to close. It is
//! the single entry point for decode configuration, one-shot transcription,
//! and starting incremental streams.

use log::{debug, info};

use crate::engine::{Engine, EngineModel};
use crate::error::{ScribeError, ScribeResult};
use crate::options::ModelOptions;
use crate::stream::StreamSession;
use crate::transcript::TranscriptSet;

/// An open handle to a loaded speech-to-text model.
///
/// The session is created fully configured via [`ModelOptions`] or adjusted
/// afterwards through the mutators. Configuration changes apply to decodes
/// and streams started after the change; streams already created keep the
/// configuration they saw at creation.
///
/// Closing is explicit and happens at most once; every operation after
/// [`close`](ModelSession::close) fails with [`ScribeError::UseAfterFinish`].
/// Dropping an unclosed session releases the model automatically.
///
/// # Example
///
/// ```ignore
/// use scribe_core::{ModelOptions, ModelSession};
///
/// let mut model = ModelSession::open_with(
///     &engine,
///     "model.bin",
///     &ModelOptions::new().with_beam_width(256),
/// )?;
/// let text = model.transcribe(&samples)?;
/// model.close()?;
/// ```
pub struct ModelSession {
    /// `None` once closed.
    inner: Option<Box<dyn EngineModel>>,
    model_path: String,
}

impl ModelSession {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open a model with engine-default configuration.
    pub fn open(engine: &dyn Engine, model_path: &str) -> ScribeResult<Self> {
        Self::open_with(engine, model_path, &ModelOptions::default())
    }

    /// Open a model and apply the given options before returning.
    ///
    /// If any option fails to apply, the partially configured model is
    /// released and the error returned; no handle survives a failed open.
    pub fn open_with(
        engine: &dyn Engine,
        model_path: &str,
        options: &ModelOptions,
    ) -> ScribeResult<Self> {
        let mut inner = engine.load_model(model_path)?;

        if let Some(beam_width) = options.beam_width {
            inner.set_beam_width(beam_width)?;
        }
        if let Some(scorer_path) = &options.scorer_path {
            inner.enable_scorer(scorer_path)?;
            if let Some((alpha, beta)) = options.scorer_weights {
                inner.set_scorer_weights(alpha, beta)?;
            }
        } else if options.scorer_weights.is_some() {
            return Err(ScribeError::scorer(
                "scorer weights given without a scorer path",
            ));
        }

        info!(
            target: "scribe_core",
            "loaded model from {} (beam width {})",
            model_path,
            inner.beam_width()
        );

        Ok(ModelSession {
            inner: Some(inner),
            model_path: model_path.to_string(),
        })
    }

    /// Whether the session is still open.
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Release the model.
    ///
    /// Fails with [`ScribeError::UseAfterFinish`] if already closed. After a
    /// successful close every other operation fails the same way.
    pub fn close(&mut self) -> ScribeResult<()> {
        if self.inner.take().is_none() {
            return Err(ScribeError::UseAfterFinish);
        }
        info!(target: "scribe_core", "closed model {}", self.model_path);
        Ok(())
    }

    fn inner(&self) -> ScribeResult<&dyn EngineModel> {
        self.inner.as_deref().ok_or(ScribeError::UseAfterFinish)
    }

    fn inner_mut(&mut self) -> ScribeResult<&mut (dyn EngineModel + 'static)> {
        self.inner.as_deref_mut().ok_or(ScribeError::UseAfterFinish)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Current decode beam width.
    pub fn beam_width(&self) -> ScribeResult<u32> {
        Ok(self.inner()?.beam_width())
    }

    /// Set the decode beam width. Zero is rejected.
    ///
    /// Applies to decodes and streams started after this call.
    pub fn set_beam_width(&mut self, beam_width: u32) -> ScribeResult<()> {
        self.inner_mut()?.set_beam_width(beam_width)
    }

    /// The sample rate (Hz) the model expects its input audio in.
    pub fn sample_rate(&self) -> ScribeResult<u32> {
        Ok(self.inner()?.sample_rate())
    }

    /// Enable an external scorer from the given artifact path.
    pub fn enable_scorer(&mut self, scorer_path: &str) -> ScribeResult<()> {
        self.inner_mut()?.enable_scorer(scorer_path)?;
        debug!(target: "scribe_core", "enabled scorer {}", scorer_path);
        Ok(())
    }

    /// Disable the external scorer.
    pub fn disable_scorer(&mut self) -> ScribeResult<()> {
        self.inner_mut()?.disable_scorer()
    }

    /// Set scorer weights (language model weight alpha, word insertion
    /// weight beta). Fails unless a scorer is enabled.
    pub fn set_scorer_weights(&mut self, alpha: f32, beta: f32) -> ScribeResult<()> {
        self.inner_mut()?.set_scorer_weights(alpha, beta)
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// One-shot transcription of a complete buffer, returning the best text.
    ///
    /// The session stays open and reusable afterwards.
    pub fn transcribe(&self, audio: &[i16]) -> ScribeResult<String> {
        Ok(self.inner()?.decode(audio, 0)?.best_text())
    }

    /// One-shot transcription returning up to `num_candidates` alternates
    /// with token metadata, ordered best-first. `0` means the engine default.
    pub fn transcribe_with_candidates(
        &self,
        audio: &[i16],
        num_candidates: u32,
    ) -> ScribeResult<TranscriptSet> {
        self.inner()?.decode(audio, num_candidates)
    }

    /// Start an incremental decode with the current configuration.
    ///
    /// The returned stream is independent of later configuration changes and
    /// of other streams created from this session.
    pub fn new_stream(&self) -> ScribeResult<StreamSession> {
        let stream = self.inner()?.create_stream()?;
        debug!(target: "scribe_core", "created stream on model {}", self.model_path);
        Ok(StreamSession::new(stream))
    }
}

impl std::fmt::Debug for ModelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSession")
            .field("model_path", &self.model_path)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{burst_audio, FakeEngine, DEFAULT_BEAM_WIDTH, SAMPLE_RATE};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn artifact() -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"weights").unwrap();
        f
    }

    fn open_model(file: &NamedTempFile) -> ModelSession {
        ModelSession::open(&FakeEngine::new(), file.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_open_failure_returns_load_error() {
        let err = ModelSession::open(&FakeEngine::new(), "/no/such/model.bin").unwrap_err();
        assert!(matches!(err, ScribeError::Load { .. }));
    }

    #[test]
    fn test_open_with_applies_options() {
        let file = artifact();
        let scorer = artifact();
        let opts = ModelOptions::new()
            .with_beam_width(128)
            .with_scorer_path(scorer.path().to_str().unwrap())
            .with_scorer_weights(0.75, 1.85);
        let model =
            ModelSession::open_with(&FakeEngine::new(), file.path().to_str().unwrap(), &opts)
                .unwrap();
        assert_eq!(model.beam_width().unwrap(), 128);
    }

    #[test]
    fn test_open_with_rejects_weights_without_scorer() {
        let file = artifact();
        let opts = ModelOptions::new().with_scorer_weights(0.75, 1.85);
        let err = ModelSession::open_with(&FakeEngine::new(), file.path().to_str().unwrap(), &opts)
            .unwrap_err();
        assert!(matches!(err, ScribeError::Scorer { .. }));
    }

    #[test]
    fn test_defaults_and_queries() {
        let file = artifact();
        let model = open_model(&file);
        assert!(model.is_open());
        assert_eq!(model.beam_width().unwrap(), DEFAULT_BEAM_WIDTH);
        assert_eq!(model.sample_rate().unwrap(), SAMPLE_RATE);
    }

    #[test]
    fn test_set_beam_width_zero_rejected() {
        let file = artifact();
        let mut model = open_model(&file);
        let err = model.set_beam_width(0).unwrap_err();
        assert!(matches!(err, ScribeError::InvalidParameter { .. }));
        // The old value survives a rejected update.
        assert_eq!(model.beam_width().unwrap(), DEFAULT_BEAM_WIDTH);
    }

    #[test]
    fn test_transcribe_keeps_session_open() {
        let file = artifact();
        let model = open_model(&file);
        let text = model.transcribe(&burst_audio(2)).unwrap();
        assert_eq!(text, "the quick");
        // Still usable for another decode.
        assert_eq!(model.transcribe(&burst_audio(1)).unwrap(), "the");
    }

    #[test]
    fn test_close_is_exactly_once() {
        let file = artifact();
        let mut model = open_model(&file);
        model.close().unwrap();
        assert!(!model.is_open());
        assert!(matches!(model.close(), Err(ScribeError::UseAfterFinish)));
    }

    #[test]
    fn test_every_operation_fails_after_close() {
        let file = artifact();
        let mut model = open_model(&file);
        model.close().unwrap();

        assert!(matches!(model.beam_width(), Err(ScribeError::UseAfterFinish)));
        assert!(matches!(
            model.set_beam_width(64),
            Err(ScribeError::UseAfterFinish)
        ));
        assert!(matches!(model.sample_rate(), Err(ScribeError::UseAfterFinish)));
        assert!(matches!(
            model.enable_scorer("scorer.bin"),
            Err(ScribeError::UseAfterFinish)
        ));
        assert!(matches!(
            model.disable_scorer(),
            Err(ScribeError::UseAfterFinish)
        ));
        assert!(matches!(
            model.set_scorer_weights(0.5, 0.5),
            Err(ScribeError::UseAfterFinish)
        ));
        assert!(matches!(
            model.transcribe(&[]),
            Err(ScribeError::UseAfterFinish)
        ));
        assert!(matches!(
            model.transcribe_with_candidates(&[], 0),
            Err(ScribeError::UseAfterFinish)
        ));
        assert!(matches!(model.new_stream(), Err(ScribeError::UseAfterFinish)));
    }

    #[test]
    fn test_config_change_applies_to_new_streams_only() {
        let file = artifact();
        let scorer = artifact();
        let mut model = open_model(&file);
        let audio = burst_audio(2);

        let mut before = model.new_stream().unwrap();
        model
            .enable_scorer(scorer.path().to_str().unwrap())
            .unwrap();
        let mut after = model.new_stream().unwrap();

        before.feed(&audio).unwrap();
        after.feed(&audio).unwrap();
        let plain = before.finish_with_candidates(0).unwrap();
        let scored = after.finish_with_candidates(0).unwrap();
        assert!(scored.candidates[0].confidence > plain.candidates[0].confidence);
    }
}
