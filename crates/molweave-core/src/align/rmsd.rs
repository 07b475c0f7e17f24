use super::config::MatchOptions;
use super::error::AlignError;
use super::matcher::match_atoms;
use super::scoring::mapped_positions;
use crate::core::models::mapping::AtomMapping;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use crate::core::utils::geometry::kabsch;
use tracing::{info, instrument};

/// Finds the best mapping under default options, using the caller's property
/// maps. No match is an alignment failure with an empty mapping.
pub(crate) fn default_mapping(
    molecule0: &Molecule,
    molecule1: &Molecule,
    map0: &PropertyMap,
    map1: &PropertyMap,
) -> Result<AtomMapping, AlignError> {
    let options = MatchOptions {
        property_map0: map0.clone(),
        property_map1: map1.clone(),
        ..MatchOptions::default()
    };
    match_atoms(molecule0, molecule1, &options)?
        .and_then(|outcome| outcome.into_mappings().into_iter().next())
        .ok_or(AlignError::AlignmentFailed {
            mapping: AtomMapping::new(),
        })
}

/// Returns a copy of `molecule0` rigidly moved to minimise the RMSD of the
/// mapped atoms against `molecule1`.
///
/// When `mapping` is `None` the best mapping is found with
/// [`match_atoms`] under default options. `molecule1` is never modified.
#[instrument(skip_all, name = "rmsd_align", fields(mol0 = %molecule0.name, mol1 = %molecule1.name))]
pub fn rmsd_align(
    molecule0: &Molecule,
    molecule1: &Molecule,
    mapping: Option<&AtomMapping>,
    map0: &PropertyMap,
    map1: &PropertyMap,
) -> Result<Molecule, AlignError> {
    let derived;
    let mapping = match mapping {
        Some(mapping) => mapping,
        None => {
            derived = default_mapping(molecule0, molecule1, map0, map1)?;
            &derived
        }
    };
    mapping.validate(molecule0.atom_count(), molecule1.atom_count())?;

    let (coords0, coords1) = mapped_positions(molecule0, molecule1, mapping, map0, map1)?;
    let transform = kabsch(&coords0, &coords1).map_err(|_| AlignError::AlignmentFailed {
        mapping: mapping.clone(),
    })?;
    info!("Aligned on {} mapped atom(s)", mapping.len());

    Ok(molecule0.transformed(&transform, map0)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::mcs::tests::methanol;
    use crate::core::models::molecule::tests::{benzene_ring, methane};
    use crate::core::utils::geometry::{RigidTransform, calculate_rmsd};
    use nalgebra::{Point3, Rotation3, Unit, Vector3};

    fn moved(molecule: &Molecule) -> Molecule {
        let transform = RigidTransform {
            rotation: Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::new(1.0, -0.4, 0.7)), 1.1),
            translation: Vector3::new(-3.0, 2.0, 7.5),
        };
        molecule.transformed(&transform, &PropertyMap::new()).unwrap()
    }

    #[test]
    fn explicit_mapping_superposes_rigid_copy() {
        let ring = benzene_ring();
        let target = moved(&ring);
        let identity: AtomMapping = (0..6).map(|i| (i, i)).collect();
        let map = PropertyMap::new();

        let aligned = rmsd_align(&ring, &target, Some(&identity), &map, &map).unwrap();
        let rmsd = calculate_rmsd(&aligned.positions(&map).unwrap(), &target.positions(&map).unwrap()).unwrap();
        assert!(rmsd < 1e-6);
        assert_eq!(aligned.atom_count(), ring.atom_count());
        assert_eq!(aligned.bonds(), ring.bonds());
    }

    #[test]
    fn derived_mapping_aligns_related_molecules() {
        let map = PropertyMap::new();
        let target = moved(&methanol());
        let aligned = rmsd_align(&methane(), &target, None, &map, &map).unwrap();

        let carbon = aligned.position(0, &map).unwrap();
        let target_carbon = target.position(0, &map).unwrap();
        assert!((carbon - target_carbon).norm() < 1.0);
    }

    #[test]
    fn empty_mapping_cannot_be_aligned() {
        let map = PropertyMap::new();
        let ring = benzene_ring();
        assert_eq!(
            rmsd_align(&ring, &ring, Some(&AtomMapping::new()), &map, &map),
            Err(AlignError::AlignmentFailed {
                mapping: AtomMapping::new()
            })
        );
    }

    #[test]
    fn out_of_range_mapping_is_rejected() {
        let map = PropertyMap::new();
        let ring = benzene_ring();
        let mapping: AtomMapping = [(0, 10)].into_iter().collect();
        assert!(matches!(
            rmsd_align(&ring, &ring, Some(&mapping), &map, &map),
            Err(AlignError::Mapping(_))
        ));
    }

    #[test]
    fn non_finite_coordinates_fail_alignment() {
        let map = PropertyMap::new();
        let ring = benzene_ring();
        let mut broken = ring.clone();
        broken
            .atom_mut(2)
            .unwrap()
            .set_position(&map, Point3::new(f64::NAN, 0.0, 0.0));
        let identity: AtomMapping = (0..6).map(|i| (i, i)).collect();
        assert!(matches!(
            rmsd_align(&broken, &ring, Some(&identity), &map, &map),
            Err(AlignError::AlignmentFailed { .. })
        ));
    }
}
