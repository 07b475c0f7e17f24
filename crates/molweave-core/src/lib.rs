//! # molweave Core Library
//!
//! Atom mapping, alignment and merging of small molecules, plus dispatch of
//! force-field parameterisation to external tool-chains.
//!
//! ## Architectural Philosophy
//!
//! The library is organised in three layers:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`, `AtomMapping`,
//!   `MergedMolecule`), physical units, geometry and file I/O.
//!
//! - **[`align`]: Mapping and Alignment.** Maximum common substructure search, RMSD
//!   scoring of candidate mappings, rigid-body alignment and dual-topology merging.
//!
//! - **[`parameters`]: Parameterisation.** A registry of supported force fields and a
//!   dispatcher that runs AMBER, GROMACS or Open Force Field tool-chains in the
//!   background and hands back the parameterised molecule.

pub mod align;
pub mod core;
pub mod parameters;
