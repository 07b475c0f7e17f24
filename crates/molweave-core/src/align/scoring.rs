use super::error::AlignError;
use crate::core::models::mapping::AtomMapping;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use crate::core::units::Length;
use crate::core::utils::geometry::{calculate_rmsd, kabsch};
use nalgebra::Point3;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument};

/// A candidate mapping together with its RMSD score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMapping {
    pub mapping: AtomMapping,
    pub rmsd: Length,
}

/// Collects the coordinates of the mapped atoms, in mapping order.
pub(crate) fn mapped_positions(
    molecule0: &Molecule,
    molecule1: &Molecule,
    mapping: &AtomMapping,
    map0: &PropertyMap,
    map1: &PropertyMap,
) -> Result<(Vec<Point3<f64>>, Vec<Point3<f64>>), AlignError> {
    let mut coords0 = Vec::with_capacity(mapping.len());
    let mut coords1 = Vec::with_capacity(mapping.len());
    for (a, b) in mapping.iter() {
        coords0.push(molecule0.position(a, map0)?);
        coords1.push(molecule1.position(b, map1)?);
    }
    Ok((coords0, coords1))
}

fn score_one(
    molecule0: &Molecule,
    molecule1: &Molecule,
    mapping: &AtomMapping,
    align: bool,
    map0: &PropertyMap,
    map1: &PropertyMap,
) -> Result<ScoredMapping, AlignError> {
    let (mut coords0, coords1) = mapped_positions(molecule0, molecule1, mapping, map0, map1)?;
    if align {
        let transform = kabsch(&coords0, &coords1).map_err(|_| AlignError::AlignmentFailed {
            mapping: mapping.clone(),
        })?;
        for p in coords0.iter_mut() {
            *p = transform.apply(p);
        }
    }
    let rmsd = calculate_rmsd(&coords0, &coords1).unwrap_or(0.0);
    Ok(ScoredMapping {
        mapping: mapping.clone(),
        rmsd: Length::angstrom(rmsd),
    })
}

/// Scores every mapping by the RMSD of its mapped atoms, optionally after a
/// least-squares fit of `molecule0` onto `molecule1`, and returns them from
/// best to worst. Ties keep their input order.
///
/// Each candidate is fitted independently; a rigid fit is insensitive to
/// where the molecule started, so the order of evaluation does not matter.
#[instrument(skip_all, fields(candidates = mappings.len(), align = align))]
pub fn score_rmsd(
    molecule0: &Molecule,
    molecule1: &Molecule,
    mappings: &[AtomMapping],
    align: bool,
    map0: &PropertyMap,
    map1: &PropertyMap,
) -> Result<Vec<ScoredMapping>, AlignError> {
    let mut scored: Vec<ScoredMapping> = mappings
        .par_iter()
        .map(|mapping| score_one(molecule0, molecule1, mapping, align, map0, map1))
        .collect::<Result<_, _>>()?;
    scored.sort_by(|a, b| a.rmsd.total_cmp(&b.rmsd));

    if let Some(best) = scored.first() {
        info!(best = %best.rmsd, "Scored {} candidate mapping(s)", scored.len());
    }
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::tests::benzene_ring;
    use crate::core::utils::geometry::RigidTransform;
    use nalgebra::{Rotation3, Unit, Vector3};

    fn rotated_ring() -> Molecule {
        let transform = RigidTransform {
            rotation: Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::new(0.2, 1.0, 0.3)), 0.8),
            translation: Vector3::new(4.0, -1.0, 2.5),
        };
        benzene_ring().transformed(&transform, &PropertyMap::new()).unwrap()
    }

    fn rotation_mapping(shift: usize) -> AtomMapping {
        (0..6).map(|i| (i, (i + shift) % 6)).collect()
    }

    #[test]
    fn scores_are_sorted_ascending() {
        let ring = benzene_ring();
        let mappings: Vec<_> = [3, 0, 1, 2].iter().map(|&s| rotation_mapping(s)).collect();
        let map = PropertyMap::new();
        let scored = score_rmsd(&ring, &ring, &mappings, false, &map, &map).unwrap();

        assert_eq!(scored.len(), 4);
        assert!(scored.windows(2).all(|w| w[0].rmsd <= w[1].rmsd));
        assert_eq!(scored[0].mapping, rotation_mapping(0));
        assert_eq!(scored[0].rmsd.value(), 0.0);
    }

    #[test]
    fn aligned_score_never_exceeds_unaligned_score() {
        let ring = benzene_ring();
        let moved = rotated_ring();
        let map = PropertyMap::new();
        let mappings: Vec<_> = (0..6).map(rotation_mapping).collect();

        let plain = score_rmsd(&ring, &moved, &mappings, false, &map, &map).unwrap();
        let aligned = score_rmsd(&ring, &moved, &mappings, true, &map, &map).unwrap();
        for candidate in &aligned {
            let unaligned = plain.iter().find(|s| s.mapping == candidate.mapping).unwrap();
            assert!(candidate.rmsd.value() <= unaligned.rmsd.value() + 1e-9);
        }
        // Every rotation of a regular hexagon superposes exactly.
        assert!(aligned.iter().all(|s| s.rmsd.value() < 1e-6));
    }

    #[test]
    fn empty_mapping_scores_zero_unless_aligning() {
        let ring = benzene_ring();
        let map = PropertyMap::new();
        let empty = vec![AtomMapping::new()];

        let scored = score_rmsd(&ring, &ring, &empty, false, &map, &map).unwrap();
        assert_eq!(scored[0].rmsd.value(), 0.0);

        assert_eq!(
            score_rmsd(&ring, &ring, &empty, true, &map, &map),
            Err(AlignError::AlignmentFailed {
                mapping: AtomMapping::new()
            })
        );
    }

    #[test]
    fn no_candidates_yields_empty_list() {
        let ring = benzene_ring();
        let map = PropertyMap::new();
        assert!(score_rmsd(&ring, &ring, &[], true, &map, &map).unwrap().is_empty());
    }
}
