//! Running external probe commands.

use std::io;
use std::process::Command;

use wt_core::ProbeError;

/// Runs `program` and returns its stdout without the trailing newline.
///
/// A missing executable is reported as [`ProbeError::Unavailable`]; a non-zero
/// exit as [`ProbeError::Command`] carrying stderr.
pub fn run(program: &'static str, args: &[&str]) -> Result<String, ProbeError> {
    tracing::trace!(program, ?args, "running probe command");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ProbeError::Unavailable {
                probe: program,
                reason: format!("{program} is not installed"),
            },
            _ => ProbeError::Command {
                command: program,
                message: err.to_string(),
            },
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ProbeError::Command {
            command: program,
            message: if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            },
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_without_trailing_newline() {
        let output = run("sh", &["-c", "printf 'hello\\n'"]).unwrap();
        assert_eq!(output, "hello");
    }

    #[test]
    fn missing_program_is_unavailable() {
        let err = run("wt-definitely-not-installed", &[]).unwrap_err();
        assert!(matches!(err, ProbeError::Unavailable { .. }), "{err:?}");
    }

    #[test]
    fn failing_program_reports_stderr() {
        let err = run("sh", &["-c", "echo 'no display' >&2; exit 1"]).unwrap_err();
        match err {
            ProbeError::Command { command, message } => {
                assert_eq!(command, "sh");
                assert_eq!(message, "no display");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
