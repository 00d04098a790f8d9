use std::path::Path;
use std::process::Command;

use crate::foundation::error::{ReelError, ReelResult};
use crate::media::process::run_tool;

/// Media-inspection collaborator.
pub trait MediaProbe {
    /// Duration of `path` in seconds; always finite and positive on success.
    fn probe_duration(&self, path: &Path) -> ReelResult<f64>;
}

/// `ffprobe` reading `format=duration`.
#[derive(Clone, Debug)]
pub struct FfprobeProbe {
    program: String,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProbe for FfprobeProbe {
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    fn probe_duration(&self, path: &Path) -> ReelResult<f64> {
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path);
        let out = run_tool(&mut cmd, "ffprobe")?;
        parse_duration(&String::from_utf8_lossy(&out.stdout))
    }
}

fn parse_duration(stdout: &str) -> ReelResult<f64> {
    let text = stdout.trim();
    match text.parse::<f64>() {
        Ok(d) if d.is_finite() && d > 0.0 => Ok(d),
        _ => Err(ReelError::media_tool(
            "ffprobe",
            Some(0),
            format!("could not read a duration from output {text:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_duration_output() {
        assert_eq!(parse_duration("12.400000\n").unwrap(), 12.4);
    }

    #[test]
    fn non_numeric_or_zero_duration_is_a_tool_failure() {
        for bad in ["N/A", "", "0.000000", "-1"] {
            assert!(matches!(
                parse_duration(bad),
                Err(ReelError::MediaToolFailure { .. })
            ));
        }
    }
}
