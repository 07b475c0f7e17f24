//! Atom mapping, alignment and merging of small molecules.
//!
//! The entry points are [`match_atoms`](matcher::match_atoms), which finds
//! and ranks correspondences between the atoms of two molecules,
//! [`rmsd_align`](rmsd::rmsd_align), which rigidly fits one molecule onto
//! another, and [`merge`](merge::merge), which builds a dual-topology
//! molecule for alchemical free-energy work.

pub mod config;
pub mod error;
pub mod matcher;
pub mod mcs;
pub mod merge;
pub mod prematch;
pub mod rmsd;
pub mod scoring;
