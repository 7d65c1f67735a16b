//! Deterministic in-process engine backend for tests and demos.
//!
//! The fake engine treats any non-empty file as a valid model artifact and
//! synthesizes transcripts from the audio's energy envelope: each run of
//! voiced frames becomes the next word from a fixed lexicon. The mapping is
//! pure, so identical input always produces identical output, and the scorer
//! toggle visibly shifts candidate confidences, which makes configuration
//! snapshot behavior observable from tests.

use std::fs;

use crate::engine::{Engine, EngineModel, EngineStream};
use crate::error::{ScribeError, ScribeResult};
use crate::transcript::{CandidateTranscript, TranscriptSet, TranscriptToken};

/// Samples per analysis frame (20 ms at 16 kHz).
pub const FRAME_SAMPLES: usize = 320;

/// Sample rate the fake engine expects.
pub const SAMPLE_RATE: u32 = 16_000;

/// Default decode beam width.
pub const DEFAULT_BEAM_WIDTH: u32 = 500;

/// Mean absolute amplitude above which a frame counts as voiced.
const VOICED_THRESHOLD: i32 = 100;

/// Words emitted for successive voiced runs, cycling.
const LEXICON: [&str; 8] = [
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog",
];

/// Decode configuration snapshotted by streams at creation time.
#[derive(Debug, Clone, Copy)]
struct DecodeConfig {
    beam_width: u32,
    scorer_enabled: bool,
    scorer_alpha: f32,
    scorer_beta: f32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        DecodeConfig {
            beam_width: DEFAULT_BEAM_WIDTH,
            scorer_enabled: false,
            scorer_alpha: 0.0,
            scorer_beta: 0.0,
        }
    }
}

/// The fake backend. Install via `scribe_ffi::install_engine` or pass models
/// from [`FakeEngine::load_model`] straight to `ModelSession::open_with`.
#[derive(Debug, Default)]
pub struct FakeEngine;

impl FakeEngine {
    pub fn new() -> Self {
        FakeEngine
    }
}

impl Engine for FakeEngine {
    fn load_model(&self, model_path: &str) -> ScribeResult<Box<dyn EngineModel>> {
        let data = fs::read(model_path)
            .map_err(|e| ScribeError::load(format!("cannot read {model_path}: {e}")))?;
        if data.is_empty() {
            return Err(ScribeError::load(format!("empty model artifact: {model_path}")));
        }
        Ok(Box::new(FakeModel {
            config: DecodeConfig::default(),
        }))
    }

    fn version(&self) -> String {
        "fake-engine 1.0.0".to_string()
    }
}

/// A loaded fake model. Holds only decode configuration; the "weights" are
/// the fixed lexicon.
#[derive(Debug)]
struct FakeModel {
    config: DecodeConfig,
}

impl EngineModel for FakeModel {
    fn beam_width(&self) -> u32 {
        self.config.beam_width
    }

    fn set_beam_width(&mut self, beam_width: u32) -> ScribeResult<()> {
        if beam_width == 0 {
            return Err(ScribeError::invalid_parameter("beam width must be non-zero"));
        }
        self.config.beam_width = beam_width;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn enable_scorer(&mut self, scorer_path: &str) -> ScribeResult<()> {
        let data = fs::read(scorer_path)
            .map_err(|e| ScribeError::scorer(format!("cannot read {scorer_path}: {e}")))?;
        if data.is_empty() {
            return Err(ScribeError::scorer(format!(
                "empty scorer artifact: {scorer_path}"
            )));
        }
        self.config.scorer_enabled = true;
        Ok(())
    }

    fn disable_scorer(&mut self) -> ScribeResult<()> {
        self.config.scorer_enabled = false;
        self.config.scorer_alpha = 0.0;
        self.config.scorer_beta = 0.0;
        Ok(())
    }

    fn set_scorer_weights(&mut self, alpha: f32, beta: f32) -> ScribeResult<()> {
        if !self.config.scorer_enabled {
            return Err(ScribeError::scorer("no scorer enabled"));
        }
        self.config.scorer_alpha = alpha;
        self.config.scorer_beta = beta;
        Ok(())
    }

    fn decode(&self, audio: &[i16], num_candidates: u32) -> ScribeResult<TranscriptSet> {
        Ok(decode_samples(audio, self.config, num_candidates))
    }

    fn create_stream(&self) -> ScribeResult<Box<dyn EngineStream>> {
        Ok(Box::new(FakeStream {
            config: self.config,
            buffer: Vec::new(),
        }))
    }
}

/// An in-progress fake decode: buffers samples, decodes on demand with the
/// configuration snapshotted at creation.
#[derive(Debug)]
struct FakeStream {
    config: DecodeConfig,
    buffer: Vec<i16>,
}

impl EngineStream for FakeStream {
    fn feed(&mut self, audio: &[i16]) -> ScribeResult<()> {
        self.buffer.extend_from_slice(audio);
        Ok(())
    }

    fn intermediate(&mut self, num_candidates: u32) -> ScribeResult<TranscriptSet> {
        Ok(decode_samples(&self.buffer, self.config, num_candidates))
    }

    fn finish(self: Box<Self>, num_candidates: u32) -> ScribeResult<TranscriptSet> {
        Ok(decode_samples(&self.buffer, self.config, num_candidates))
    }

    fn discard(self: Box<Self>) {}
}

/// Synthesize audio with `n` voiced bursts separated by silence, each burst
/// and gap four frames long. Test fixture helper.
pub fn burst_audio(n: usize) -> Vec<i16> {
    let mut audio = Vec::new();
    for _ in 0..n {
        audio.extend(std::iter::repeat(4000i16).take(FRAME_SAMPLES * 4));
        audio.extend(std::iter::repeat(0i16).take(FRAME_SAMPLES * 4));
    }
    audio
}

/// A voiced run of frames, half-open over frame indices.
struct VoicedRun {
    start: usize,
    end: usize,
}

fn voiced_runs(audio: &[i16]) -> Vec<VoicedRun> {
    let mut runs = Vec::new();
    let mut current: Option<usize> = None;
    let frames = audio.len() / FRAME_SAMPLES;
    for frame in 0..frames {
        let slice = &audio[frame * FRAME_SAMPLES..(frame + 1) * FRAME_SAMPLES];
        let energy: i64 = slice.iter().map(|s| (*s as i32).abs() as i64).sum();
        let voiced = energy / FRAME_SAMPLES as i64 > VOICED_THRESHOLD as i64;
        match (voiced, current) {
            (true, None) => current = Some(frame),
            (false, Some(start)) => {
                runs.push(VoicedRun { start, end: frame });
                current = None;
            }
            _ => {}
        }
    }
    if let Some(start) = current {
        runs.push(VoicedRun { start, end: frames });
    }
    runs
}

fn decode_samples(audio: &[i16], config: DecodeConfig, num_candidates: u32) -> TranscriptSet {
    let runs = voiced_runs(audio);
    let words: Vec<(&str, usize)> = runs
        .iter()
        .enumerate()
        .map(|(i, run)| (LEXICON[i % LEXICON.len()], run.start))
        .collect();

    // Scorer-assisted decodes are "cheaper" per word, so enabling the scorer
    // is observable through candidate confidences. Weights add a flat bonus.
    let word_cost = if config.scorer_enabled { 0.5 } else { 1.0 };
    let weight_bonus = if config.scorer_enabled {
        (config.scorer_alpha + config.scorer_beta) as f64 * 0.01
    } else {
        0.0
    };

    let limit = if num_candidates == 0 {
        1
    } else {
        num_candidates as usize
    };
    let max_drop = words.len().min(limit.saturating_sub(1)) + 1;

    let mut candidates = Vec::with_capacity(max_drop);
    for drop in 0..max_drop.min(limit) {
        let kept = &words[..words.len() - drop];
        let mut tokens = Vec::new();
        for (i, (word, start_frame)) in kept.iter().enumerate() {
            if i > 0 {
                let timestep = *start_frame as u32;
                tokens.push(TranscriptToken {
                    text: " ".to_string(),
                    timestep,
                    start_time: timestep as f32 * 0.02,
                });
            }
            for (ci, ch) in word.chars().enumerate() {
                let timestep = (*start_frame + ci) as u32;
                tokens.push(TranscriptToken {
                    text: ch.to_string(),
                    timestep,
                    start_time: timestep as f32 * 0.02,
                });
            }
        }
        let confidence = -(kept.len() as f64) * word_cost - drop as f64 * 2.0 + weight_bonus;
        candidates.push(CandidateTranscript { tokens, confidence });
    }

    TranscriptSet { candidates }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn model_file() -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"fake model weights").unwrap();
        f
    }

    #[test]
    fn test_load_rejects_missing_and_empty() {
        let engine = FakeEngine::new();
        assert!(matches!(
            engine.load_model("/nonexistent/model.bin"),
            Err(ScribeError::Load { .. })
        ));

        let empty = NamedTempFile::new().unwrap();
        assert!(matches!(
            engine.load_model(empty.path().to_str().unwrap()),
            Err(ScribeError::Load { .. })
        ));
    }

    #[test]
    fn test_silence_decodes_to_empty_transcript() {
        let engine = FakeEngine::new();
        let file = model_file();
        let model = engine.load_model(file.path().to_str().unwrap()).unwrap();
        let silence = vec![0i16; FRAME_SAMPLES * 10];
        let result = model.decode(&silence, 0).unwrap();
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.best_text(), "");
    }

    #[test]
    fn test_voiced_bursts_map_to_lexicon_words() {
        let engine = FakeEngine::new();
        let file = model_file();
        let model = engine.load_model(file.path().to_str().unwrap()).unwrap();
        let result = model.decode(&burst_audio(3), 0).unwrap();
        assert_eq!(result.best_text(), "the quick brown");
    }

    #[test]
    fn test_decode_is_deterministic() {
        let engine = FakeEngine::new();
        let file = model_file();
        let model = engine.load_model(file.path().to_str().unwrap()).unwrap();
        let audio = burst_audio(2);
        let a = model.decode(&audio, 2).unwrap();
        let b = model.decode(&audio, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_candidates_bounded_and_ordered() {
        let engine = FakeEngine::new();
        let file = model_file();
        let model = engine.load_model(file.path().to_str().unwrap()).unwrap();
        let result = model.decode(&burst_audio(4), 3).unwrap();
        assert!(result.candidates.len() <= 3);
        assert!(result.candidates.len() > 1);
        for pair in result.candidates.windows(2) {
            assert!(pair[0].confidence > pair[1].confidence);
        }
    }

    #[test]
    fn test_token_timing_increases() {
        let engine = FakeEngine::new();
        let file = model_file();
        let model = engine.load_model(file.path().to_str().unwrap()).unwrap();
        let result = model.decode(&burst_audio(2), 0).unwrap();
        let tokens = &result.candidates[0].tokens;
        assert!(!tokens.is_empty());
        for t in tokens {
            assert!((t.start_time - t.timestep as f32 * 0.02).abs() < f32::EPSILON);
        }
        assert!(tokens.first().unwrap().timestep <= tokens.last().unwrap().timestep);
    }

    #[test]
    fn test_scorer_shifts_confidence() {
        let engine = FakeEngine::new();
        let file = model_file();
        let scorer = model_file();
        let audio = burst_audio(2);

        let mut model = engine.load_model(file.path().to_str().unwrap()).unwrap();
        let plain = model.decode(&audio, 0).unwrap();
        model
            .enable_scorer(scorer.path().to_str().unwrap())
            .unwrap();
        let scored = model.decode(&audio, 0).unwrap();
        assert!(scored.candidates[0].confidence > plain.candidates[0].confidence);
        assert_eq!(scored.best_text(), plain.best_text());
    }

    #[test]
    fn test_scorer_weights_require_scorer() {
        let engine = FakeEngine::new();
        let file = model_file();
        let mut model = engine.load_model(file.path().to_str().unwrap()).unwrap();
        assert!(matches!(
            model.set_scorer_weights(0.75, 1.85),
            Err(ScribeError::Scorer { .. })
        ));
    }

    #[test]
    fn test_stream_snapshots_config_at_creation() {
        let engine = FakeEngine::new();
        let file = model_file();
        let scorer = model_file();
        let mut model = engine.load_model(file.path().to_str().unwrap()).unwrap();
        let audio = burst_audio(2);

        let mut before = model.create_stream().unwrap();
        model
            .enable_scorer(scorer.path().to_str().unwrap())
            .unwrap();
        let mut after = model.create_stream().unwrap();

        before.feed(&audio).unwrap();
        after.feed(&audio).unwrap();
        let plain = before.intermediate(0).unwrap();
        let scored = after.intermediate(0).unwrap();
        assert!(scored.candidates[0].confidence > plain.candidates[0].confidence);
    }
}
