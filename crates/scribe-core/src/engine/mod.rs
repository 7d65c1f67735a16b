//! The engine seam.
//!
//! scribe-core manages lifecycle and state; the actual acoustic model and
//! decoder live behind these traits. A production build installs a backend
//! wrapping the native engine; tests use the deterministic [`fake`] backend.
//!
//! All three traits are object-safe so sessions can hold `Box<dyn ...>`
//! without caring which backend is underneath.

#[cfg(any(test, feature = "fake-engine"))]
pub mod fake;

use crate::error::ScribeResult;
use crate::transcript::TranscriptSet;

/// An engine backend: a factory for models plus global queries.
pub trait Engine: Send + Sync {
    /// Load a model artifact from disk.
    ///
    /// On failure no partial state survives; the error carries the reason.
    fn load_model(&self, model_path: &str) -> ScribeResult<Box<dyn EngineModel>>;

    /// The engine's version string.
    fn version(&self) -> String;
}

/// A loaded model: configuration plus decode entry points.
///
/// Implementations are `Send` but not required to be `Sync`; concurrent use
/// of one model requires external synchronization.
pub trait EngineModel: Send {
    /// Current decode beam width.
    fn beam_width(&self) -> u32;

    /// Set the decode beam width. Zero is rejected as an invalid parameter.
    ///
    /// Affects subsequently started decodes only; streams already created
    /// keep the configuration they were created with.
    fn set_beam_width(&mut self, beam_width: u32) -> ScribeResult<()>;

    /// The sample rate (Hz) the model expects.
    fn sample_rate(&self) -> u32;

    /// Enable an external scorer from the given artifact path.
    fn enable_scorer(&mut self, scorer_path: &str) -> ScribeResult<()>;

    /// Disable the external scorer, if one is enabled.
    fn disable_scorer(&mut self) -> ScribeResult<()>;

    /// Set scorer weights. Fails if no scorer is enabled.
    fn set_scorer_weights(&mut self, alpha: f32, beta: f32) -> ScribeResult<()>;

    /// One-shot decode of a complete buffer.
    ///
    /// `num_candidates` bounds how many alternates are produced; `0` means
    /// the engine default. The result is ordered best-first.
    fn decode(&self, audio: &[i16], num_candidates: u32) -> ScribeResult<TranscriptSet>;

    /// Start an incremental decode with the model's current configuration.
    fn create_stream(&self) -> ScribeResult<Box<dyn EngineStream>>;
}

/// An in-progress incremental decode.
///
/// The session layer guarantees `finish` and `discard` are each reached at
/// most once and that no call follows them.
pub trait EngineStream: Send {
    /// Append audio samples to the stream.
    fn feed(&mut self, audio: &[i16]) -> ScribeResult<()>;

    /// Decode everything fed so far without consuming the stream.
    fn intermediate(&mut self, num_candidates: u32) -> ScribeResult<TranscriptSet>;

    /// Complete the decode, consuming the stream.
    fn finish(self: Box<Self>, num_candidates: u32) -> ScribeResult<TranscriptSet>;

    /// Abandon the stream, releasing its resources without decoding.
    fn discard(self: Box<Self>);
}
