use std::path::{Path, PathBuf};
use std::process::Command;

use crate::foundation::error::ReelResult;
use crate::media::process::run_tool;

/// Text-to-speech collaborator.
pub trait Synthesizer {
    /// Write narration audio for `text` to `out`.
    fn synthesize(&self, text: &str, voice: &str, out: &Path) -> ReelResult<()>;

    /// Write narration audio to `out` and, in the same synthesis, a timed-caption file (VTT or
    /// SRT) to `captions`.
    ///
    /// `Ok(None)` means the engine produced no caption file; the audio is still written.
    fn synthesize_with_captions(
        &self,
        text: &str,
        voice: &str,
        out: &Path,
        _captions: &Path,
    ) -> ReelResult<Option<PathBuf>> {
        self.synthesize(text, voice, out)?;
        Ok(None)
    }
}

/// The `edge-tts` command line tool.
#[derive(Clone, Debug)]
pub struct EdgeTts {
    program: String,
}

impl EdgeTts {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, text: &str, voice: &str, media: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--text")
            .arg(text)
            .arg("--voice")
            .arg(voice)
            .arg("--write-media")
            .arg(media);
        cmd
    }
}

impl Default for EdgeTts {
    fn default() -> Self {
        Self::new("edge-tts")
    }
}

impl Synthesizer for EdgeTts {
    #[tracing::instrument(skip(self, text), fields(chars = text.chars().count()))]
    fn synthesize(&self, text: &str, voice: &str, out: &Path) -> ReelResult<()> {
        run_tool(&mut self.command(text, voice, out), "edge-tts")?;
        Ok(())
    }

    #[tracing::instrument(skip(self, text), fields(chars = text.chars().count()))]
    fn synthesize_with_captions(
        &self,
        text: &str,
        voice: &str,
        out: &Path,
        captions: &Path,
    ) -> ReelResult<Option<PathBuf>> {
        let mut cmd = self.command(text, voice, out);
        cmd.arg("--write-subtitles").arg(captions);
        run_tool(&mut cmd, "edge-tts")?;
        Ok(non_empty_file(captions).then(|| captions.to_path_buf()))
    }
}

fn non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
