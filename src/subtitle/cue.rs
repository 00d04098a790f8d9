use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};

/// One timed caption in a finalized, 1-based, non-overlapping sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SubtitleCue {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Cue before indexing and invariant enforcement.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RawCue {
    pub(crate) start: f64,
    pub(crate) end: f64,
    pub(crate) text: String,
}

impl RawCue {
    pub(crate) fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub(crate) fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Render seconds as `HH:MM:SS,mmm`. Negative and non-finite input clamps to zero.
pub fn format_time(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Sort, clip overlaps, drop empty or zero-length cues and number the rest from 1.
pub(crate) fn finalize(mut raw: Vec<RawCue>) -> Vec<SubtitleCue> {
    raw.retain(|c| c.start.is_finite() && c.end.is_finite() && !c.text.trim().is_empty());
    raw.sort_by(|a, b| a.start.total_cmp(&b.start));

    let next_starts: Vec<Option<f64>> = (0..raw.len())
        .map(|i| raw.get(i + 1).map(|n| n.start))
        .collect();

    let mut out = Vec::with_capacity(raw.len());
    for (cue, next_start) in raw.into_iter().zip(next_starts) {
        let start = cue.start.max(0.0);
        let end = match next_start {
            Some(n) => cue.end.min(n),
            None => cue.end,
        };
        if end <= start {
            tracing::debug!(text = %cue.text, start, end, "dropping zero-length cue");
            continue;
        }
        out.push(SubtitleCue {
            index: out.len() + 1,
            start,
            end,
            text: cue.text.trim().to_string(),
        });
    }
    out
}

/// Check the sequence invariants: contiguous 1-based indices, positive spans, no overlap and
/// bounded text length.
pub fn check_invariants(cues: &[SubtitleCue], max_chars: usize) -> ReelResult<()> {
    for (i, cue) in cues.iter().enumerate() {
        if cue.index != i + 1 {
            return Err(ReelError::invalid_input(format!(
                "cue {} has index {}",
                i + 1,
                cue.index
            )));
        }
        if !(cue.start >= 0.0 && cue.start < cue.end) {
            return Err(ReelError::invalid_input(format!(
                "cue {} has invalid span {}..{}",
                cue.index, cue.start, cue.end
            )));
        }
        if cue.text.is_empty() || cue.text.chars().count() > max_chars {
            return Err(ReelError::invalid_input(format!(
                "cue {} text length {} is outside 1..={max_chars}",
                cue.index,
                cue.text.chars().count()
            )));
        }
        if let Some(next) = cues.get(i + 1)
            && cue.end > next.start
        {
            return Err(ReelError::invalid_input(format!(
                "cue {} overlaps cue {}",
                cue.index, next.index
            )));
        }
    }
    Ok(())
}

pub fn to_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            cue.index,
            format_time(cue.start),
            format_time(cue.end),
            cue.text
        );
    }
    out
}

pub fn write_srt(path: &Path, cues: &[SubtitleCue]) -> ReelResult<()> {
    std::fs::write(path, to_srt(cues))
        .with_context(|| format!("write subtitles '{}'", path.display()))?;
    Ok(())
}
