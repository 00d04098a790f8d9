//! Run configuration.
//!
//! Every component receives the slice of configuration it needs at construction time. A
//! [`PipelineConfig`] can be loaded from JSON; omitted fields take their defaults.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Rgb8};
use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root under which one post directory per run is created.
    pub data_dir: PathBuf,
    /// TTS voice identifier.
    pub voice: String,
    /// Language hint passed to the transcription engine.
    pub language: String,
    /// Maximum characters of the sanitized title used in a post directory name.
    pub dir_name_max_len: usize,
    pub cover: CoverConfig,
    pub subtitles: SubtitleConfig,
    pub tools: ToolsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
            language: "zh".to_string(),
            dir_name_max_len: 40,
            cover: CoverConfig::default(),
            subtitles: SubtitleConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| ReelError::serde(format!("config json parse failed: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_path(path: &Path) -> ReelResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.voice.trim().is_empty() {
            return Err(ReelError::validation("voice must be non-empty"));
        }
        if self.dir_name_max_len == 0 {
            return Err(ReelError::validation("dir_name_max_len must be > 0"));
        }
        self.cover.validate()?;
        self.subtitles.validate()?;
        self.tools.validate()
    }
}

/// What the cover shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverMode {
    /// Title and body laid out on the canvas.
    #[default]
    Text,
    /// Blank canvas; burned-in subtitles are the only on-screen text.
    Background,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    pub canvas: Canvas,
    pub margin: u32,
    pub title_size: u32,
    pub body_size: u32,
    pub spacing: u32,
    pub title_body_gap: u32,
    /// Smallest title size the shrink loop will try.
    pub min_title_size: u32,
    pub shrink_step: u32,
    /// Body size, spacing and gap as fractions of the title size after a shrink.
    pub body_ratio: f32,
    pub spacing_ratio: f32,
    pub gap_ratio: f32,
    pub background: Rgb8,
    pub text_color: Rgb8,
    /// Candidate font files, first existing one wins.
    pub font_paths: Vec<PathBuf>,
    pub mode: CoverMode,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::VERTICAL_HD,
            margin: 80,
            title_size: 90,
            body_size: 60,
            spacing: 40,
            title_body_gap: 60,
            min_title_size: 40,
            shrink_step: 10,
            body_ratio: 0.67,
            spacing_ratio: 0.4,
            gap_ratio: 0.67,
            background: Rgb8::BLACK,
            text_color: Rgb8::WHITE,
            font_paths: [
                "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
                "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
                "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
                "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
            mode: CoverMode::Text,
        }
    }
}

impl CoverConfig {
    pub fn validate(&self) -> ReelResult<()> {
        self.canvas.validate()?;
        if self.margin.saturating_mul(2) >= self.canvas.width.min(self.canvas.height) {
            return Err(ReelError::validation(
                "cover margin leaves no room for text",
            ));
        }
        if self.min_title_size == 0 || self.shrink_step == 0 {
            return Err(ReelError::validation(
                "cover min_title_size and shrink_step must be > 0",
            ));
        }
        if self.title_size < self.min_title_size {
            return Err(ReelError::validation(
                "cover title_size must be >= min_title_size",
            ));
        }
        if self.body_size == 0 {
            return Err(ReelError::validation("cover body_size must be > 0"));
        }
        for (name, r) in [
            ("body_ratio", self.body_ratio),
            ("spacing_ratio", self.spacing_ratio),
            ("gap_ratio", self.gap_ratio),
        ] {
            if !r.is_finite() || r <= 0.0 {
                return Err(ReelError::validation(format!(
                    "cover {name} must be finite and > 0"
                )));
            }
        }
        Ok(())
    }

    /// Zero when the margins swallow the canvas.
    pub fn max_text_width(&self) -> f32 {
        self.canvas
            .width
            .saturating_sub(self.margin.saturating_mul(2)) as f32
    }

    pub fn max_text_height(&self) -> f32 {
        self.canvas
            .height
            .saturating_sub(self.margin.saturating_mul(2)) as f32
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Upper bound on characters per cue.
    pub max_chars: usize,
    /// Gap cut from the end of each duration-proportional cue, in seconds.
    pub fallback_gap_sec: f64,
    /// Gap cut from the end of each re-split segment, in seconds.
    pub resplit_gap_sec: f64,
    /// Time text evenly against the probed audio duration when no timed source is available.
    pub duration_fallback: bool,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            max_chars: 15,
            fallback_gap_sec: 0.1,
            resplit_gap_sec: 0.05,
            duration_fallback: true,
        }
    }
}

impl SubtitleConfig {
    pub fn validate(&self) -> ReelResult<()> {
        if self.max_chars < 2 {
            return Err(ReelError::validation("subtitles max_chars must be >= 2"));
        }
        for (name, g) in [
            ("fallback_gap_sec", self.fallback_gap_sec),
            ("resplit_gap_sec", self.resplit_gap_sec),
        ] {
            if !g.is_finite() || g < 0.0 {
                return Err(ReelError::validation(format!(
                    "subtitles {name} must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub tts_program: String,
    pub whisper_program: String,
    pub whisper_model: String,
    pub ffprobe_program: String,
    pub ffmpeg_program: String,
    pub audio_bitrate: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tts_program: "edge-tts".to_string(),
            whisper_program: "whisper".to_string(),
            whisper_model: "base".to_string(),
            ffprobe_program: "ffprobe".to_string(),
            ffmpeg_program: "ffmpeg".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

impl ToolsConfig {
    pub fn validate(&self) -> ReelResult<()> {
        for (name, v) in [
            ("tts_program", &self.tts_program),
            ("whisper_program", &self.whisper_program),
            ("ffprobe_program", &self.ffprobe_program),
            ("ffmpeg_program", &self.ffmpeg_program),
            ("audio_bitrate", &self.audio_bitrate),
        ] {
            if v.trim().is_empty() {
                return Err(ReelError::validation(format!(
                    "tools {name} must be non-empty"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = PipelineConfig::from_json_str(
            r#"{ "voice": "zh-CN-YunxiNeural", "subtitles": { "max_chars": 12 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.voice, "zh-CN-YunxiNeural");
        assert_eq!(cfg.subtitles.max_chars, 12);
        assert_eq!(cfg.subtitles.fallback_gap_sec, 0.1);
        assert_eq!(cfg.cover.canvas, Canvas::VERTICAL_HD);
        assert_eq!(cfg.cover.mode, CoverMode::Text);
    }

    #[test]
    fn cover_mode_parses_snake_case() {
        let cfg = PipelineConfig::from_json_str(r#"{ "cover": { "mode": "background" } }"#).unwrap();
        assert_eq!(cfg.cover.mode, CoverMode::Background);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = PipelineConfig::from_json_str(r#"{ "cover": { "shrink_step": 0 } }"#).unwrap_err();
        assert!(matches!(err, ReelError::Validation(_)));

        let err = PipelineConfig::from_json_str(r#"{ "subtitles": { "max_chars": 1 } }"#).unwrap_err();
        assert!(matches!(err, ReelError::Validation(_)));

        let err = PipelineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ReelError::Serde(_)));
    }

    #[test]
    fn usable_area_excludes_margins() {
        let cover = CoverConfig::default();
        assert_eq!(cover.max_text_width(), 920.0);
        assert_eq!(cover.max_text_height(), 1760.0);
    }

    #[test]
    fn oversized_margin_leaves_zero_area() {
        let cover = CoverConfig {
            margin: 2000,
            ..CoverConfig::default()
        };
        assert_eq!(cover.max_text_width(), 0.0);
        assert_eq!(cover.max_text_height(), 0.0);
        assert!(matches!(cover.validate(), Err(ReelError::Validation(_))));

        let huge = CoverConfig {
            margin: u32::MAX,
            ..CoverConfig::default()
        };
        assert_eq!(huge.max_text_width(), 0.0);
    }
}
