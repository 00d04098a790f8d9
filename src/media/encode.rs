use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};
use crate::media::probe::MediaProbe;
use crate::media::process::run_tool;
use crate::subtitle::cue::{SubtitleCue, write_srt};

/// Burned-in caption look: large white text, black outline, middle of the frame, no margins.
const SUBTITLE_FORCE_STYLE: &str = "Fontsize=18,PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,BorderStyle=1,Outline=2,Shadow=0,Alignment=5,MarginL=0,MarginR=0,MarginV=0";

/// One still-image + audio encode.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeJob {
    pub image: PathBuf,
    pub audio: PathBuf,
    pub subtitles: Option<PathBuf>,
    pub duration_sec: f64,
    pub out: PathBuf,
}

/// Media-encode collaborator.
pub trait MediaEncoder {
    /// Produce `job.out`. Non-zero exit is a `MediaToolFailure`.
    fn encode(&self, job: &EncodeJob) -> ReelResult<()>;
}

/// System `ffmpeg` binary: libx264 still-image video, AAC audio.
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    program: String,
    audio_bitrate: String,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<String>, audio_bitrate: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            audio_bitrate: audio_bitrate.into(),
        }
    }

    pub fn build_args(&self, job: &EncodeJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-loop", "1", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(job.image.clone().into_os_string());
        args.push("-i".into());
        args.push(job.audio.clone().into_os_string());
        for a in [
            "-c:v",
            "libx264",
            "-tune",
            "stillimage",
            "-c:a",
            "aac",
            "-b:a",
            self.audio_bitrate.as_str(),
            "-pix_fmt",
            "yuv420p",
            "-shortest",
            "-t",
        ] {
            args.push(a.into());
        }
        args.push(format!("{:.3}", job.duration_sec).into());
        args.push("-movflags".into());
        args.push("+faststart".into());
        if let Some(subs) = &job.subtitles {
            args.push("-vf".into());
            args.push(
                format!(
                    "subtitles=filename='{}':charenc=UTF-8:force_style='{SUBTITLE_FORCE_STYLE}'",
                    escape_filter_path(subs)
                )
                .into(),
            );
        }
        args.push(job.out.clone().into_os_string());
        args
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg", "192k")
    }
}

impl MediaEncoder for FfmpegEncoder {
    #[tracing::instrument(skip(self, job), fields(out = %job.out.display()))]
    fn encode(&self, job: &EncodeJob) -> ReelResult<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(job));
        run_tool(&mut cmd, "ffmpeg")?;
        Ok(())
    }
}

/// Escape a path for use inside a quoted filtergraph option value.
pub fn escape_filter_path(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let mut escaped = String::with_capacity(normalized.len() + 8);
    for ch in normalized.chars() {
        match ch {
            ':' => escaped.push_str("\\:"),
            '\'' => escaped.push_str("'\\''"),
            ',' => escaped.push_str("\\,"),
            ';' => escaped.push_str("\\;"),
            '[' => escaped.push_str("\\["),
            ']' => escaped.push_str("\\]"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComposedVideo {
    pub path: PathBuf,
    pub duration_sec: f64,
}

/// Combines a still image, an audio track and optional cues into one video.
pub struct VideoComposer {
    probe: Box<dyn MediaProbe>,
    encoder: Box<dyn MediaEncoder>,
}

impl VideoComposer {
    pub fn new(probe: Box<dyn MediaProbe>, encoder: Box<dyn MediaEncoder>) -> Self {
        Self { probe, encoder }
    }

    pub fn probe_duration(&self, audio: &Path) -> ReelResult<f64> {
        self.probe.probe_duration(audio)
    }

    /// Compose with the duration probed from `audio`.
    pub fn compose(
        &self,
        image: &Path,
        audio: &Path,
        cues: Option<&[SubtitleCue]>,
        out: &Path,
    ) -> ReelResult<ComposedVideo> {
        let duration_sec = self.probe.probe_duration(audio)?;
        self.compose_with_duration(image, audio, cues, duration_sec, out)
    }

    /// Compose with an already probed duration.
    ///
    /// Cues are written to a private temporary directory whose path has no filter-breaking
    /// characters; it is removed when this call returns.
    #[tracing::instrument(skip(self, cues), fields(out = %out.display(), cues = cues.map_or(0, <[_]>::len)))]
    pub fn compose_with_duration(
        &self,
        image: &Path,
        audio: &Path,
        cues: Option<&[SubtitleCue]>,
        duration_sec: f64,
        out: &Path,
    ) -> ReelResult<ComposedVideo> {
        if !duration_sec.is_finite() || duration_sec <= 0.0 {
            return Err(ReelError::media_tool(
                "ffprobe",
                None,
                format!("unusable audio duration {duration_sec}"),
            ));
        }
        ensure_parent_dir(out)?;

        let scratch = match cues {
            Some(c) if !c.is_empty() => {
                let dir = tempfile::Builder::new()
                    .prefix("storyreel_subs")
                    .tempdir()
                    .context("create subtitle scratch directory")?;
                let srt = dir.path().join("subtitles.srt");
                write_srt(&srt, c)?;
                Some((dir, srt))
            }
            _ => None,
        };

        let job = EncodeJob {
            image: image.to_path_buf(),
            audio: audio.to_path_buf(),
            subtitles: scratch.as_ref().map(|(_, srt)| srt.clone()),
            duration_sec,
            out: out.to_path_buf(),
        };
        self.encoder.encode(&job)?;
        drop(scratch);

        if !out.exists() {
            return Err(ReelError::media_tool(
                "ffmpeg",
                Some(0),
                format!("encoder reported success but '{}' is missing", out.display()),
            ));
        }
        tracing::info!(duration_sec, "video composed");
        Ok(ComposedVideo {
            path: out.to_path_buf(),
            duration_sec,
        })
    }
}
