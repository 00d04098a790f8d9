//! End-to-end run: cover, narration audio, subtitles (with fallback), video.
//!
//! The run is a linear state machine over [`PipelineStage`]. Only the subtitle step degrades
//! instead of failing; every other failure halts the run and is reported as
//! [`ReelError::Stage`] naming the last state reached.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::NaiveDateTime;

use crate::collab::transcribe::{Availability, Transcriber, WhisperCli};
use crate::collab::tts::{EdgeTts, Synthesizer};
use crate::config::{CoverMode, PipelineConfig};
use crate::cover::{self, render::CoverRenderer};
use crate::foundation::error::{PipelineStage, ReelError, ReelResult};
use crate::media::encode::{FfmpegEncoder, MediaEncoder, VideoComposer};
use crate::media::probe::{FfprobeProbe, MediaProbe};
use crate::script::{TextBlock, sanitize_dir_name};
use crate::subtitle::align::{CueSource, SubtitleAligner};
use crate::subtitle::cue::{SubtitleCue, write_srt};

const MAX_DIR_SUFFIX: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Cover,
    Audio,
    Subtitles,
    Video,
    Manifest,
}

impl ArtifactKind {
    /// Fixed file name inside a post directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Cover => "cover.png",
            Self::Audio => "audio.mp3",
            Self::Subtitles => "subtitles.srt",
            Self::Video => "video.mp4",
            Self::Manifest => "post.json",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MediaArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Directory owning every artifact of one run. Never reused.
#[derive(Clone, Debug)]
pub struct PostDirectory {
    path: PathBuf,
}

impl PostDirectory {
    /// Create `<data_dir>/<YYYYmmdd_HHMMSS>_<sanitized title>`, adding `_2`, `_3`, ... when a
    /// directory of that name already exists.
    pub fn create(
        data_dir: &Path,
        title: &str,
        max_len: usize,
        now: NaiveDateTime,
    ) -> ReelResult<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory '{}'", data_dir.display()))?;

        let stamp = now.format("%Y%m%d_%H%M%S").to_string();
        let safe = sanitize_dir_name(title, max_len);
        let base = if safe.is_empty() {
            stamp
        } else {
            format!("{stamp}_{safe}")
        };

        for n in 1..=MAX_DIR_SUFFIX {
            let name = if n == 1 {
                base.clone()
            } else {
                format!("{base}_{n}")
            };
            let path = data_dir.join(name);
            match std::fs::create_dir(&path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "post directory created");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("failed to create post directory '{}'", path.display()))
                        .into());
                }
            }
        }
        Err(ReelError::validation(format!(
            "no free post directory name for '{base}' in '{}'",
            data_dir.display()
        )))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn artifact_path(&self, kind: ArtifactKind) -> PathBuf {
        self.path.join(kind.file_name())
    }
}

/// Which strategy produced the burned-in subtitles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleOutcome {
    Words,
    ForeignFormat,
    Duration,
    Skipped,
}

/// Summary of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub post_dir: PathBuf,
    pub artifacts: Vec<MediaArtifact>,
    pub subtitles: SubtitleOutcome,
    pub audio_duration_sec: f64,
    /// Non-fatal degradations, in the order they happened.
    pub warnings: Vec<ReelError>,
}

impl RunReport {
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Path> {
        self.artifacts
            .iter()
            .find(|a| a.kind == kind)
            .map(|a| a.path.as_path())
    }
}

/// Sequences cover → audio → subtitles → video for one script.
pub struct PipelineCoordinator {
    cfg: PipelineConfig,
    tts: Box<dyn Synthesizer>,
    transcriber: Box<dyn Transcriber>,
    composer: VideoComposer,
    aligner: SubtitleAligner,
}

impl PipelineCoordinator {
    pub fn new(
        cfg: PipelineConfig,
        tts: Box<dyn Synthesizer>,
        transcriber: Box<dyn Transcriber>,
        probe: Box<dyn MediaProbe>,
        encoder: Box<dyn MediaEncoder>,
    ) -> ReelResult<Self> {
        cfg.validate()?;
        let aligner = SubtitleAligner::new(cfg.subtitles.clone())?;
        Ok(Self {
            cfg,
            tts,
            transcriber,
            composer: VideoComposer::new(probe, encoder),
            aligner,
        })
    }

    /// Coordinator backed by the configured command line tools.
    pub fn with_system_tools(cfg: PipelineConfig) -> ReelResult<Self> {
        let tools = cfg.tools.clone();
        Self::new(
            cfg,
            Box::new(EdgeTts::new(tools.tts_program)),
            Box::new(WhisperCli::new(tools.whisper_program, tools.whisper_model)),
            Box::new(FfprobeProbe::new(tools.ffprobe_program)),
            Box::new(FfmpegEncoder::new(tools.ffmpeg_program, tools.audio_bitrate)),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub fn run(&self, script: &str) -> ReelResult<RunReport> {
        self.run_at(script, chrono::Local::now().naive_local())
    }

    /// Run with an explicit clock reading for the post directory name.
    #[tracing::instrument(skip(self, script))]
    pub fn run_at(&self, script: &str, now: NaiveDateTime) -> ReelResult<RunReport> {
        let mut stage = PipelineStage::Start;
        let mut warnings = Vec::new();
        let mut artifacts = Vec::new();

        let block = TextBlock::parse(script).map_err(|e| e.at_stage(stage))?;
        let dir = PostDirectory::create(
            &self.cfg.data_dir,
            block.title(),
            self.cfg.dir_name_max_len,
            now,
        )
        .map_err(|e| e.at_stage(stage))?;

        // Cover
        let cover_path = dir.artifact_path(ArtifactKind::Cover);
        let manifest_path = dir.artifact_path(ArtifactKind::Manifest);
        let cover_out = self
            .generate_cover(&block, &cover_path, &manifest_path)
            .map_err(|e| e.at_stage(stage))?;
        if let Some(overflow) = cover_out.overflow {
            tracing::warn!(error = %overflow, "cover text overflows the canvas");
            warnings.push(overflow);
        }
        artifacts.push(MediaArtifact {
            kind: ArtifactKind::Cover,
            path: cover_path.clone(),
        });
        artifacts.push(MediaArtifact {
            kind: ArtifactKind::Manifest,
            path: manifest_path,
        });
        stage = advance(stage, PipelineStage::CoverGenerated);

        // Audio
        let narration = block.narration();
        let audio_path = dir.artifact_path(ArtifactKind::Audio);
        let scratch = tempfile::tempdir()
            .context("create caption scratch directory")
            .map_err(|e| ReelError::from(e).at_stage(stage))?;
        let captions = self
            .tts
            .synthesize_with_captions(
                &narration,
                &self.cfg.voice,
                &audio_path,
                &scratch.path().join("captions.vtt"),
            )
            .map_err(|e| e.at_stage(stage))?;
        if !audio_path.exists() {
            return Err(ReelError::media_tool(
                "tts",
                Some(0),
                format!("synthesizer did not write '{}'", audio_path.display()),
            )
            .at_stage(stage));
        }
        artifacts.push(MediaArtifact {
            kind: ArtifactKind::Audio,
            path: audio_path.clone(),
        });
        let duration = self
            .composer
            .probe_duration(&audio_path)
            .map_err(|e| e.at_stage(stage))?;
        stage = advance(stage, PipelineStage::AudioAcquired);

        // Subtitles
        let built = self.build_subtitles(&narration, &audio_path, captions.as_deref(), duration);
        drop(scratch);
        let (cues, outcome) = match built {
            Ok((cues, outcome)) => (Some(cues), outcome),
            Err(e) if !e.is_fatal() => {
                tracing::warn!(error = %e, "continuing without subtitles");
                warnings.push(e);
                (None, SubtitleOutcome::Skipped)
            }
            Err(e) => return Err(e.at_stage(stage)),
        };
        if let Some(cues) = &cues {
            let srt_path = dir.artifact_path(ArtifactKind::Subtitles);
            write_srt(&srt_path, cues).map_err(|e| e.at_stage(stage))?;
            artifacts.push(MediaArtifact {
                kind: ArtifactKind::Subtitles,
                path: srt_path,
            });
        }
        stage = advance(stage, PipelineStage::SubtitlesAttempted);

        // Video
        let video_path = dir.artifact_path(ArtifactKind::Video);
        let composed = self
            .composer
            .compose_with_duration(
                &cover_path,
                &audio_path,
                cues.as_deref(),
                duration,
                &video_path,
            )
            .map_err(|e| e.at_stage(stage))?;
        artifacts.push(MediaArtifact {
            kind: ArtifactKind::Video,
            path: composed.path,
        });
        stage = advance(stage, PipelineStage::VideoComposed);
        advance(stage, PipelineStage::Done);

        Ok(RunReport {
            post_dir: dir.path().to_path_buf(),
            artifacts,
            subtitles: outcome,
            audio_duration_sec: duration,
            warnings,
        })
    }

    fn generate_cover(
        &self,
        block: &TextBlock,
        cover_path: &Path,
        manifest_path: &Path,
    ) -> ReelResult<cover::render::CoverOutput> {
        let cover_cfg = self.cfg.cover.clone();
        let mode = cover_cfg.mode;
        let mut renderer = match mode {
            CoverMode::Text => CoverRenderer::new(cover_cfg)?,
            CoverMode::Background => CoverRenderer::background_only(cover_cfg)?,
        };
        cover::generate_with_manifest(&mut renderer, mode, block, cover_path, manifest_path)
    }

    /// Word timestamps, then the synthesizer's captions, then (if enabled) duration spreading.
    /// Every cue is kept inside `duration_sec`.
    ///
    /// Returns `SubtitleUnavailable` when every enabled strategy came up empty.
    fn build_subtitles(
        &self,
        narration: &str,
        audio: &Path,
        captions: Option<&Path>,
        duration_sec: f64,
    ) -> ReelResult<(Vec<SubtitleCue>, SubtitleOutcome)> {
        let mut reasons = Vec::new();

        match self.transcriber.availability() {
            Availability::Available => {
                match self
                    .transcriber
                    .transcribe(audio, &self.cfg.language)
                    .and_then(|words| {
                        self.aligner
                            .align_within(CueSource::FromWords(&words), duration_sec)
                    })
                {
                    Ok(cues) if !cues.is_empty() => return Ok((cues, SubtitleOutcome::Words)),
                    Ok(_) => reasons.push("transcription produced no words".to_string()),
                    Err(e) => {
                        tracing::warn!(error = %e, "word-level subtitles failed");
                        reasons.push(format!("transcription failed: {e}"));
                    }
                }
            }
            Availability::Unavailable { reason } => {
                tracing::info!(reason = %reason, "transcription unavailable");
                reasons.push(format!("transcription unavailable: {reason}"));
            }
        }

        match captions {
            Some(path) => match self.cues_from_captions(path, duration_sec) {
                Ok(cues) if !cues.is_empty() => {
                    return Ok((cues, SubtitleOutcome::ForeignFormat));
                }
                Ok(_) => reasons.push("tts captions held no cues".to_string()),
                Err(e) => {
                    tracing::warn!(error = %e, "caption-format subtitles failed");
                    reasons.push(format!("caption conversion failed: {e}"));
                }
            },
            None => reasons.push("tts produced no caption file".to_string()),
        }

        if self.cfg.subtitles.duration_fallback {
            match self.aligner.align(CueSource::FromDuration {
                text: narration,
                duration_sec,
            }) {
                Ok(cues) if !cues.is_empty() => return Ok((cues, SubtitleOutcome::Duration)),
                Ok(_) => reasons.push("duration spreading produced no cues".to_string()),
                Err(e) => reasons.push(format!("duration spreading failed: {e}")),
            }
        }

        Err(ReelError::subtitle_unavailable(reasons.join("; ")))
    }

    fn cues_from_captions(&self, path: &Path, duration_sec: f64) -> ReelResult<Vec<SubtitleCue>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read captions '{}'", path.display()))?;
        self.aligner
            .align_within(CueSource::FromForeignFormat(&content), duration_sec)
    }
}

fn advance(from: PipelineStage, to: PipelineStage) -> PipelineStage {
    tracing::info!(from = %from, to = %to, "pipeline state transition");
    to
}
