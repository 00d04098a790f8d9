use std::fmt;

pub type ReelResult<T> = Result<T, ReelError>;

/// Pipeline state a fatal error halted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    CoverGenerated,
    AudioAcquired,
    SubtitlesAttempted,
    VideoComposed,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::CoverGenerated => "cover_generated",
            Self::AudioAcquired => "audio_acquired",
            Self::SubtitlesAttempted => "subtitles_attempted",
            Self::VideoComposed => "video_composed",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("media tool '{tool}' failed ({}): {stderr}", exit_label(*.code))]
    MediaToolFailure {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("subtitles unavailable: {0}")]
    SubtitleUnavailable(String),

    #[error(
        "layout overflow: text needs {total_height:.0}px of {max_height:.0}px at title size {title_size_px}px"
    )]
    LayoutOverflow {
        title_size_px: u32,
        total_height: f32,
        max_height: f32,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error("pipeline failed at {stage}: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<ReelError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code".to_string(),
    }
}

impl ReelError {
    pub fn media_tool(tool: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::MediaToolFailure {
            tool: tool.into(),
            code,
            stderr: stderr.into(),
        }
    }

    pub fn subtitle_unavailable(msg: impl Into<String>) -> Self {
        Self::SubtitleUnavailable(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn at_stage(self, stage: PipelineStage) -> Self {
        match self {
            already @ Self::Stage { .. } => already,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Non-fatal errors degrade the artifact set; the run keeps going.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::SubtitleUnavailable(_) | Self::LayoutOverflow { .. }
        )
    }
}
