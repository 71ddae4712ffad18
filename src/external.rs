use log::{debug, info};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

#[derive(thiserror::Error, Debug)]
pub enum SubprocessError {
    #[error("failed to start {program:?}: {source}")]
    Spawn { program: String, source: std::io::Error },
    #[error("failed ({status}): {command} > {stdout_fn:?} 2> {stderr_fn:?}")]
    NonZeroExit { command: String, status: ExitStatus, stdout_fn: PathBuf, stderr_fn: PathBuf },
    #[error("failed to create redirect file {path:?}: {source}")]
    Redirect { path: PathBuf, source: std::io::Error }
}

/// Renders a command as a single shell-like line for logging
pub fn command_line(command: &Command) -> String {
    let mut parts: Vec<String> = vec![command.get_program().to_string_lossy().to_string()];
    parts.extend(command.get_args().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}

/// Runs a command to completion with stdout and stderr redirected to files.
/// # Arguments
/// * `command` - the fully configured command, including any working directory
/// * `stdout_fn` - file that receives stdout, truncated first
/// * `stderr_fn` - file that receives stderr, truncated first
/// # Errors
/// * if either redirect file cannot be created
/// * if the program cannot be started
/// * if the program exits with a non-zero status
pub fn run_logged(command: &mut Command, stdout_fn: &Path, stderr_fn: &Path) -> Result<(), SubprocessError> {
    let stdout_file: File = File::create(stdout_fn).map_err(|source| SubprocessError::Redirect {
        path: stdout_fn.to_path_buf(),
        source
    })?;
    let stderr_file: File = File::create(stderr_fn).map_err(|source| SubprocessError::Redirect {
        path: stderr_fn.to_path_buf(),
        source
    })?;

    let program: String = command.get_program().to_string_lossy().to_string();
    let cmd_string: String = command_line(command);
    info!("Running: {} > {:?} 2> {:?}", cmd_string, stdout_fn, stderr_fn);
    if let Some(dir) = command.get_current_dir() {
        debug!("\tWorking directory: {:?}", dir);
    }

    let status: ExitStatus = command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file))
        .status()
        .map_err(|source| SubprocessError::Spawn { program, source })?;

    if !status.success() {
        return Err(SubprocessError::NonZeroExit {
            command: cmd_string,
            status,
            stdout_fn: stdout_fn.to_path_buf(),
            stderr_fn: stderr_fn.to_path_buf()
        });
    }

    info!("Finished running: {}", cmd_string);
    Ok(())
}
