use crate::core::models::mapping::{AtomMapping, MappingError};
use crate::core::models::merged::MergeError;
use crate::core::models::molecule::MoleculeError;
use crate::core::units::UnitError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum AlignError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unsupported scoring function '{name}'. Options are: {options:?}")]
    UnsupportedScoringFunction {
        name: String,
        options: &'static [&'static str],
    },

    #[error("Invalid mapping: {0}")]
    Mapping(#[from] MappingError),

    /// The least-squares fit could not be computed. The underlying numerical
    /// cause is deliberately not part of the message.
    #[error("Failed to align molecules based on mapping: {mapping}")]
    AlignmentFailed { mapping: AtomMapping },

    #[error("Invalid quantity: {0}")]
    Unit(#[from] UnitError),

    #[error("Molecule error: {0}")]
    Molecule(#[from] MoleculeError),

    #[error("Merge failed: {0}")]
    Merge(#[from] MergeError),
}
