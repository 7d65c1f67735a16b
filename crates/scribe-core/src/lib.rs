//! # scribe-core
//!
//! Session and lifecycle layer for a streaming speech-to-text engine.
//!
//! The crate wraps an opaque engine backend behind the [`Engine`] trait and
//! exposes two session types on top of it:
//!
//! - [`ModelSession`]: owns one loaded model from open to close. Carries the
//!   decode configuration (beam width, external scorer) and offers one-shot
//!   transcription plus a factory for streams.
//! - [`StreamSession`]: one incremental decode. Feed audio in arbitrary
//!   chunks, poll intermediate results, then finish or discard exactly once.
//!
//! ## Quick Start
//!
//! ```ignore
//! use scribe_core::{ModelSession, ModelOptions};
//!
//! let mut model = ModelSession::open_with(
//!     &engine,
//!     "model.bin",
//!     &ModelOptions::new().with_beam_width(256),
//! )?;
//!
//! // One-shot:
//! let text = model.transcribe(&samples)?;
//!
//! // Streaming:
//! let mut stream = model.new_stream()?;
//! for chunk in samples.chunks(1024) {
//!     stream.feed(chunk)?;
//! }
//! let text = stream.finish()?;
//!
//! model.close()?;
//! ```
//!
//! ## Lifecycle Contract
//!
//! - Every operation returns `Result`; nothing panics across the API.
//! - A model closes at most once; any use after close fails with
//!   [`ScribeError::UseAfterFinish`].
//! - A stream reaches exactly one terminal operation (finish or discard);
//!   any use afterwards fails with [`ScribeError::UseAfterFinish`].
//! - Configuration changes apply to decodes and streams started after the
//!   change, never retroactively.
//! - Dropping an unclosed model or a live stream releases its engine state.

pub mod engine;
pub mod error;
pub mod model;
pub mod options;
pub mod stream;
pub mod transcript;

pub use engine::{Engine, EngineModel, EngineStream};
pub use error::{ErrorCode, ScribeError, ScribeResult};
pub use model::ModelSession;
pub use options::ModelOptions;
pub use stream::StreamSession;
pub use transcript::{CandidateTranscript, TranscriptSet, TranscriptToken};
