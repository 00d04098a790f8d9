use std::path::Path;
use std::process::Command;

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};
use crate::media::process::{is_program_available, run_tool};
use crate::subtitle::align::WordStamp;

/// Whether a transcription engine can be used in this runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Speech-to-text collaborator returning word-level timestamps.
///
/// Callers check [`Transcriber::availability`] before calling [`Transcriber::transcribe`].
pub trait Transcriber {
    fn availability(&self) -> Availability;
    fn transcribe(&self, audio: &Path, language: &str) -> ReelResult<Vec<WordStamp>>;
}

/// Always unavailable.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTranscriber;

impl Transcriber for NoTranscriber {
    fn availability(&self) -> Availability {
        Availability::Unavailable {
            reason: "no transcription engine configured".to_string(),
        }
    }

    fn transcribe(&self, _audio: &Path, _language: &str) -> ReelResult<Vec<WordStamp>> {
        Err(ReelError::subtitle_unavailable(
            "no transcription engine configured",
        ))
    }
}

/// The `whisper` command line tool with word timestamps enabled.
#[derive(Clone, Debug)]
pub struct WhisperCli {
    program: String,
    model: String,
}

impl WhisperCli {
    pub fn new(program: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model: model.into(),
        }
    }
}

#[derive(serde::Deserialize)]
struct WhisperOut {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(serde::Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    words: Vec<WordStamp>,
}

fn parse_whisper_json(bytes: &[u8]) -> ReelResult<Vec<WordStamp>> {
    let parsed: WhisperOut = serde_json::from_slice(bytes)
        .map_err(|e| ReelError::serde(format!("whisper json parse failed: {e}")))?;
    Ok(parsed
        .segments
        .into_iter()
        .flat_map(|s| s.words)
        .filter(|w| w.start.is_finite() && w.end.is_finite() && w.end >= w.start)
        .collect())
}

impl Transcriber for WhisperCli {
    fn availability(&self) -> Availability {
        if is_program_available(&self.program, "--help") {
            Availability::Available
        } else {
            Availability::Unavailable {
                reason: format!("'{}' is not on PATH", self.program),
            }
        }
    }

    #[tracing::instrument(skip(self), fields(audio = %audio.display()))]
    fn transcribe(&self, audio: &Path, language: &str) -> ReelResult<Vec<WordStamp>> {
        let out_dir = tempfile::tempdir().context("create whisper output directory")?;
        let mut cmd = Command::new(&self.program);
        cmd.arg(audio)
            .args(["--model", &self.model, "--language", language])
            .args(["--word_timestamps", "True", "--output_format", "json"])
            .arg("--output_dir")
            .arg(out_dir.path());
        run_tool(&mut cmd, "whisper")?;

        let stem = audio
            .file_stem()
            .ok_or_else(|| ReelError::invalid_input("audio path has no file name"))?;
        let json_path = out_dir
            .path()
            .join(format!("{}.json", stem.to_string_lossy()));
        let bytes = std::fs::read(&json_path)
            .with_context(|| format!("read whisper output '{}'", json_path.display()))?;
        let words = parse_whisper_json(&bytes)?;
        tracing::debug!(words = words.len(), "transcription finished");
        Ok(words)
    }
}
