use super::error::ParameterError;
use super::protocol::Protocol;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{error, info, info_span};

/// A parameterisation running on a background thread.
///
/// The handle is returned as soon as the thread starts. Call
/// [`get_molecule`](Self::get_molecule) to wait for the result; the work
/// directory, with every input, output and log, is left on disk.
#[derive(Debug)]
pub struct ParameterisationProcess {
    forcefield: String,
    work_dir: PathBuf,
    handle: JoinHandle<Result<Molecule, ParameterError>>,
}

impl ParameterisationProcess {
    /// Starts `protocol` on a copy of `molecule` in `work_dir`, which must
    /// already exist.
    pub fn spawn(
        protocol: Box<dyn Protocol>,
        molecule: &Molecule,
        work_dir: PathBuf,
        map: PropertyMap,
    ) -> Result<Self, ParameterError> {
        let forcefield = protocol.forcefield().to_string();
        let span = info_span!("parameterise", forcefield = %forcefield);
        let molecule = molecule.clone();
        let thread_dir = work_dir.clone();

        let handle = thread::Builder::new()
            .name(format!("parameterise-{forcefield}"))
            .spawn(move || {
                span.in_scope(|| {
                    let result = protocol.run(&molecule, &thread_dir, &map);
                    match &result {
                        Ok(parameterised) => info!(
                            atoms = parameterised.atom_count(),
                            "Parameterisation finished"
                        ),
                        Err(e) => error!("Parameterisation failed: {}", e),
                    }
                    result
                })
            })?;

        Ok(Self {
            forcefield,
            work_dir,
            handle,
        })
    }

    pub fn forcefield(&self) -> &str {
        &self.forcefield
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Whether the background thread is still working.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Blocks until the process finishes and returns the parameterised
    /// molecule, or the error that stopped it.
    pub fn get_molecule(self) -> Result<Molecule, ParameterError> {
        self.handle
            .join()
            .map_err(|_| ParameterError::TaskPanicked)?
    }
}
