//! # Core Module
//!
//! The foundation the alignment and parameterisation layers build on.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, bonds, molecules, atom mappings and merged molecules
//! - **Physical Quantities** ([`units`]) - Time, charge and length values with explicit units
//! - **File I/O** ([`io`]) - PDB, GRO, SDF, AMBER and GROMACS readers and writers, plus a file cache
//! - **Geometry** ([`utils`]) - RMSD and least-squares superposition
//!
//! Everything here is stateless apart from the explicit [`io::cache::FileCache`].

pub mod io;
pub mod models;
pub mod units;
pub mod utils;
