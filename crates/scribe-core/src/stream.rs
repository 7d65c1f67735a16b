//! Streaming sessions.
//!
//! A [`StreamSession`] is an in-progress incremental decode. Its lifecycle is
//! a two-state machine: `Live` until exactly one terminal operation
//! ([`finish`](StreamSession::finish), [`finish_with_candidates`] or
//! [`discard`](StreamSession::discard)), then `Terminal` forever. Any call on
//! a terminal stream fails with [`ScribeError::UseAfterFinish`].
//!
//! [`finish_with_candidates`]: StreamSession::finish_with_candidates

use std::mem;

use log::debug;

use crate::engine::EngineStream;
use crate::error::{ScribeError, ScribeResult};
use crate::transcript::TranscriptSet;

enum State {
    Live(Box<dyn EngineStream>),
    Terminal,
}

/// An incremental decode bound to the model configuration it was created
/// with.
///
/// Feed audio in chunks of any size, poll intermediate results as often as
/// needed, then finish (to get the final transcript) or discard (to abandon
/// it). Both terminal operations release the underlying engine state; a
/// still-live session releases it on drop.
///
/// # Example
///
/// ```ignore
/// let mut stream = model.new_stream()?;
/// for chunk in chunks {
///     stream.feed(chunk)?;
///     println!("so far: {}", stream.intermediate()?);
/// }
/// let text = stream.finish()?;
/// ```
pub struct StreamSession {
    state: State,
}

impl StreamSession {
    pub(crate) fn new(inner: Box<dyn EngineStream>) -> Self {
        StreamSession {
            state: State::Live(inner),
        }
    }

    /// Whether the stream still accepts operations.
    pub fn is_live(&self) -> bool {
        matches!(self.state, State::Live(_))
    }

    fn live_mut(&mut self) -> ScribeResult<&mut dyn EngineStream> {
        match &mut self.state {
            State::Live(inner) => Ok(inner.as_mut()),
            State::Terminal => Err(ScribeError::UseAfterFinish),
        }
    }

    /// Take the live engine stream, leaving the session terminal.
    fn take_live(&mut self) -> ScribeResult<Box<dyn EngineStream>> {
        match mem::replace(&mut self.state, State::Terminal) {
            State::Live(inner) => Ok(inner),
            State::Terminal => Err(ScribeError::UseAfterFinish),
        }
    }

    /// Append audio samples to the stream. Any chunk size is accepted,
    /// including empty.
    pub fn feed(&mut self, audio: &[i16]) -> ScribeResult<()> {
        self.live_mut()?.feed(audio)
    }

    /// Decode everything fed so far and return the best text.
    ///
    /// Non-destructive: the stream stays live and later results may extend
    /// or revise this one.
    pub fn intermediate(&mut self) -> ScribeResult<String> {
        Ok(self.live_mut()?.intermediate(0)?.best_text())
    }

    /// Like [`intermediate`](StreamSession::intermediate) but returns up to
    /// `num_candidates` alternates with token metadata. `0` means the engine
    /// default.
    pub fn intermediate_with_candidates(
        &mut self,
        num_candidates: u32,
    ) -> ScribeResult<TranscriptSet> {
        self.live_mut()?.intermediate(num_candidates)
    }

    /// Complete the decode and return the final best text.
    ///
    /// Terminal: the stream accepts no further operations afterwards, even
    /// if the underlying decode failed.
    pub fn finish(&mut self) -> ScribeResult<String> {
        Ok(self.finish_with_candidates(0)?.best_text())
    }

    /// Complete the decode and return up to `num_candidates` alternates with
    /// token metadata. Terminal.
    pub fn finish_with_candidates(&mut self, num_candidates: u32) -> ScribeResult<TranscriptSet> {
        let inner = self.take_live()?;
        debug!(target: "scribe_core", "finishing stream");
        inner.finish(num_candidates)
    }

    /// Abandon the stream without producing a transcript. Terminal.
    pub fn discard(&mut self) -> ScribeResult<()> {
        let inner = self.take_live()?;
        debug!(target: "scribe_core", "discarding stream");
        inner.discard();
        Ok(())
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        // A session dropped while live still releases its engine state.
        if let State::Live(inner) = mem::replace(&mut self.state, State::Terminal) {
            inner.discard();
        }
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("live", &self.is_live())
            .finish()
    }
}
