//! Provides input/output functionality for molecular file formats.
//!
//! Structure formats (PDB, GRO, SDF) share the [`traits::MolecularFile`]
//! interface. The AMBER and GROMACS topology readers rebuild parameterised
//! molecules from tool-chain output, and [`cache::FileCache`] avoids writing
//! the same molecule twice.

pub mod amber;
pub mod cache;
pub mod gro;
pub mod grotop;
pub mod pdb;
pub mod sdf;
pub mod traits;
