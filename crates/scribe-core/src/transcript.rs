//! Transcript result types.
//!
//! A decode produces a [`TranscriptSet`] of one or more [`CandidateTranscript`]s
//! ordered best-first. Each candidate carries per-token timing metadata and an
//! overall confidence score.

use serde::{Deserialize, Serialize};

/// A single recognized token with timing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptToken {
    /// The token text (typically a single character or word piece).
    pub text: String,
    /// Engine timestep at which the token was emitted.
    pub timestep: u32,
    /// Position of the token in seconds from the start of the audio.
    pub start_time: f32,
}

/// One candidate transcript with per-token metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTranscript {
    /// Tokens in emission order.
    pub tokens: Vec<TranscriptToken>,
    /// Relative confidence. Only meaningful for ordering candidates within
    /// the same [`TranscriptSet`], not across decodes.
    pub confidence: f64,
}

impl CandidateTranscript {
    /// The candidate's full text, concatenated from its tokens.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

/// The full result of a decode: candidates ordered best-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSet {
    /// Candidate transcripts, best first. Never empty for a successful decode.
    pub candidates: Vec<CandidateTranscript>,
}

impl TranscriptSet {
    /// Text of the best candidate, or an empty string if there are none.
    pub fn best_text(&self) -> String {
        self.candidates
            .first()
            .map(CandidateTranscript::text)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, timestep: u32) -> TranscriptToken {
        TranscriptToken {
            text: text.to_string(),
            timestep,
            start_time: timestep as f32 * 0.02,
        }
    }

    #[test]
    fn test_candidate_text_concatenation() {
        let candidate = CandidateTranscript {
            tokens: vec![token("h", 0), token("i", 1), token(" ", 2), token("yo", 3)],
            confidence: -1.5,
        };
        assert_eq!(candidate.text(), "hi yo");
    }

    #[test]
    fn test_best_text_empty_set() {
        let set = TranscriptSet { candidates: vec![] };
        assert_eq!(set.best_text(), "");
    }

    #[test]
    fn test_best_text_picks_first_candidate() {
        let set = TranscriptSet {
            candidates: vec![
                CandidateTranscript {
                    tokens: vec![token("a", 0)],
                    confidence: -0.1,
                },
                CandidateTranscript {
                    tokens: vec![token("b", 0)],
                    confidence: -0.9,
                },
            ],
        };
        assert_eq!(set.best_text(), "a");
    }

    #[test]
    fn test_serde_round_trip() {
        let set = TranscriptSet {
            candidates: vec![CandidateTranscript {
                tokens: vec![token("x", 4)],
                confidence: -2.0,
            }],
        };
        let json = serde_json::to_string(&set).unwrap();
        let back: TranscriptSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
