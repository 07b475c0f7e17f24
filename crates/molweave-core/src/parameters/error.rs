use crate::core::io::amber::AmberError;
use crate::core::io::gro::GroError;
use crate::core::io::grotop::TopError;
use crate::core::io::pdb::PdbError;
use crate::core::io::sdf::SdfError;
use crate::core::models::molecule::MoleculeError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("Invalid type for '{argument}': {message}")]
    InvalidType {
        argument: &'static str,
        message: String,
    },

    #[error("Invalid value for '{argument}': {message}")]
    InvalidValue {
        argument: &'static str,
        message: String,
    },

    #[error("Unsupported force field '{name}'. Supported force fields are: {}", supported.join(", "))]
    UnsupportedForceField { name: String, supported: Vec<String> },

    #[error("'{forcefield}' is not supported. Please install {package}.")]
    MissingSoftware {
        forcefield: String,
        package: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("'{program}' failed. See the log at {}", log.display())]
    ProcessFailed { program: String, log: PathBuf },

    #[error("Failed to write input structure: {0}")]
    Pdb(#[from] PdbError),

    #[error("Failed to write input structure: {0}")]
    Sdf(#[from] SdfError),

    #[error("Invalid input molecule: {0}")]
    Molecule(#[from] MoleculeError),

    #[error("Failed to read AMBER output: {0}")]
    Amber(#[from] AmberError),

    #[error("Failed to read GROMACS topology: {0}")]
    Topology(#[from] TopError),

    #[error("Failed to read GROMACS coordinates: {0}")]
    Gro(#[from] GroError),

    #[error("Parameterisation thread panicked")]
    TaskPanicked,
}
