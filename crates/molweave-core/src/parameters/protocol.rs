use super::error::ParameterError;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use std::fmt;
use std::path::Path;

/// A parameterisation recipe run against an external tool-chain.
///
/// Implementations write their inputs to `work_dir`, run their programs
/// there, and read the parameterised molecule back from the outputs.
pub trait Protocol: fmt::Debug + Send + Sync {
    /// The force field this protocol applies, for logging.
    fn forcefield(&self) -> &str;

    fn run(
        &self,
        molecule: &Molecule,
        work_dir: &Path,
        map: &PropertyMap,
    ) -> Result<Molecule, ParameterError>;
}
