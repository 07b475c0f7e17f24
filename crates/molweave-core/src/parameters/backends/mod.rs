//! Protocols that drive AmberTools, GROMACS and the Open Force Field toolkit.

mod amber;
mod gaff;
mod gromacs;
mod openff;

pub use amber::{AmberProtein, DisulphideBond, disulphide_bonds};
pub use gaff::Gaff;
pub use gromacs::GromacsProtein;
pub use openff::OpenForceField;

use super::error::ParameterError;
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

pub(crate) const INPUT_PDB: &str = "input.pdb";
pub(crate) const OUTPUT_PRM7: &str = "output.prm7";
pub(crate) const OUTPUT_RST7: &str = "output.rst7";

/// Runs `program` in `work_dir` with stdout and stderr written to
/// `<work_dir>/<log_name>`. A non-zero exit is reported with the log path.
pub(crate) fn run_logged<I, S>(
    program: &Path,
    args: I,
    work_dir: &Path,
    log_name: &str,
    envs: &[(&str, &Path)],
) -> Result<PathBuf, ParameterError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let log = work_dir.join(log_name);
    let stdout = File::create(&log)?;
    let stderr = stdout.try_clone()?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    for (key, value) in envs {
        command.env(key, value);
    }
    debug!(program = %program.display(), log = %log.display(), "Running external program");

    let status = command.status().map_err(|e| {
        debug!("Failed to start {}: {}", program.display(), e);
        process_failed(program, &log)
    })?;
    if !status.success() {
        return Err(process_failed(program, &log));
    }
    Ok(log)
}

pub(crate) fn process_failed(program: &Path, log: &Path) -> ParameterError {
    ParameterError::ProcessFailed {
        program: program
            .file_name()
            .unwrap_or(program.as_os_str())
            .to_string_lossy()
            .into_owned(),
        log: log.to_path_buf(),
    }
}

/// Fails with the producing program's log when an expected output is absent.
pub(crate) fn require_outputs(
    work_dir: &Path,
    outputs: &[&str],
    program: &Path,
    log: &Path,
) -> Result<(), ParameterError> {
    for output in outputs {
        if !work_dir.join(output).is_file() {
            debug!(output, "Expected output was not produced");
            return Err(process_failed(program, log));
        }
    }
    Ok(())
}
