use std::process::{Command, Output, Stdio};

use crate::foundation::error::{ReelError, ReelResult};

/// Run an external tool to completion, capturing stdout and stderr.
///
/// A spawn failure or a non-zero exit becomes [`ReelError::MediaToolFailure`] carrying the
/// tool's diagnostic output.
pub(crate) fn run_tool(cmd: &mut Command, tool: &str) -> ReelResult<Output> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    tracing::debug!(tool, program = %program, "invoking external tool");

    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            ReelError::media_tool(
                tool,
                None,
                format!("failed to spawn '{program}' (is it installed and on PATH?): {e}"),
            )
        })?;

    tracing::debug!(tool, status = %output.status, "external tool finished");
    if !output.status.success() {
        return Err(ReelError::media_tool(
            tool,
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(output)
}

/// True when `program arg` runs and exits successfully.
pub fn is_program_available(program: &str, arg: &str) -> bool {
    Command::new(program)
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
