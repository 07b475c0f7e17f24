//! Seed mappings for the substructure search.
//!
//! A prematch is a best-effort guess at part of the final mapping. The
//! matcher treats any [`PrematchError`] as "no seed" and carries on.

use super::mcs::{McsMatcher, McsQuery, SubstructureMatcher};
use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::traits::MolecularFile;
use crate::core::models::mapping::AtomMapping;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use nalgebra::Point3;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Volumes below this (in cubic Angstroms) are treated as planar centres.
const CHIRAL_VOLUME_THRESHOLD: f64 = 0.5;

#[derive(Debug, Error)]
pub enum PrematchError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("PDB round trip failed: {0}")]
    Pdb(#[from] PdbError),
    #[error("No common heavy-atom substructure")]
    NoCommonSubstructure,
    #[error("Every common substructure inverts a stereocentre")]
    ChiralityMismatch,
}

/// Produces a seed mapping from `molecule0` to `molecule1`.
pub trait Prematcher: Send + Sync {
    fn prematch(
        &self,
        molecule0: &Molecule,
        molecule1: &Molecule,
        map0: &PropertyMap,
        map1: &PropertyMap,
        timeout: Duration,
    ) -> Result<AtomMapping, PrematchError>;
}

/// Seeds the search from a permissive heavy-atom match.
///
/// Both molecules are written to PDB files in a scoped temporary directory
/// and read back, which drops anything the PDB format cannot carry and
/// re-perceives connectivity from CONECT records. Hydrogens are then
/// removed, a common substructure that ignores elements and bond orders is
/// found, and candidates that invert a stereocentre are discarded.
#[derive(Debug, Clone, Default)]
pub struct PdbPrematcher {
    matcher: McsMatcher,
}

impl PdbPrematcher {
    fn round_trip(
        molecule: &Molecule,
        map: &PropertyMap,
        path: &std::path::Path,
    ) -> Result<Molecule, PrematchError> {
        PdbFile::write_molecule_to_path(molecule, map, path)?;
        let (read, _) = PdbFile::read_from_path(path)?;
        Ok(read)
    }
}

impl Prematcher for PdbPrematcher {
    fn prematch(
        &self,
        molecule0: &Molecule,
        molecule1: &Molecule,
        map0: &PropertyMap,
        map1: &PropertyMap,
        timeout: Duration,
    ) -> Result<AtomMapping, PrematchError> {
        let work_dir = tempfile::Builder::new().prefix("molweave_prematch").tempdir()?;
        let pdb0 = Self::round_trip(molecule0, map0, &work_dir.path().join("tmp0.pdb"))?;
        let pdb1 = Self::round_trip(molecule1, map1, &work_dir.path().join("tmp1.pdb"))?;

        let plain = PropertyMap::new();
        let (heavy0, kept0) = pdb0.extract(|_, atom| !atom.element(&plain).is_hydrogen());
        let (heavy1, kept1) = pdb1.extract(|_, atom| !atom.element(&plain).is_hydrogen());
        if heavy0.is_empty() || heavy1.is_empty() {
            return Err(PrematchError::NoCommonSubstructure);
        }

        let empty = AtomMapping::new();
        let query = McsQuery {
            prematch: &empty,
            timeout,
            match_light: true,
            min_heavy_protons: 0,
            map0: &plain,
            map1: &plain,
            verbose: false,
        };
        let candidates = self.matcher.find_matches(&heavy0, &heavy1, &query);
        if candidates.is_empty() {
            return Err(PrematchError::NoCommonSubstructure);
        }

        let best = candidates
            .iter()
            .find(|mapping| preserves_chirality(&heavy0, &heavy1, mapping, &plain))
            .ok_or(PrematchError::ChiralityMismatch)?;

        // PDB round trips keep atom order, so kept indices are original ones.
        Ok(best.iter().map(|(a, b)| (kept0[a], kept1[b])).collect())
    }
}

fn signed_volume(centre: Point3<f64>, a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> f64 {
    (a - centre).dot(&(b - centre).cross(&(c - centre)))
}

/// Checks every mapped atom with at least three mapped, non-coplanar
/// neighbours keeps its handedness.
fn preserves_chirality(
    mol0: &Molecule,
    mol1: &Molecule,
    mapping: &AtomMapping,
    map: &PropertyMap,
) -> bool {
    for (a, b) in mapping.iter() {
        let neighbours: Vec<(usize, usize)> = mol0
            .neighbors(a)
            .iter()
            .filter_map(|&x| mapping.get(x).map(|y| (x, y)))
            .take(3)
            .collect();
        if neighbours.len() < 3 {
            continue;
        }
        let positions = |mol: &Molecule, centre: usize, others: [usize; 3]| -> Option<f64> {
            let c = mol.position(centre, map).ok()?;
            let p: Vec<Point3<f64>> = others
                .iter()
                .map(|&i| mol.position(i, map).ok())
                .collect::<Option<_>>()?;
            Some(signed_volume(c, p[0], p[1], p[2]))
        };
        let (Some(v0), Some(v1)) = (
            positions(mol0, a, [neighbours[0].0, neighbours[1].0, neighbours[2].0]),
            positions(mol1, b, [neighbours[0].1, neighbours[1].1, neighbours[2].1]),
        ) else {
            continue;
        };
        if v0.abs() > CHIRAL_VOLUME_THRESHOLD
            && v1.abs() > CHIRAL_VOLUME_THRESHOLD
            && v0.signum() != v1.signum()
        {
            return false;
        }
    }
    true
}
