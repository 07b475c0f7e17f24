use super::error::AlignError;
use super::rmsd::{default_mapping, rmsd_align};
use crate::core::models::mapping::AtomMapping;
use crate::core::models::merged::MergedMolecule;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use tracing::{info, instrument};

/// Creates a dual-topology molecule from `molecule0` (lambda 0) and
/// `molecule1` (lambda 1).
///
/// With an explicit `mapping` the molecules are merged as they stand, so the
/// caller is expected to have aligned them. Without one, the best mapping is
/// found under default options and `molecule0` is aligned onto `molecule1`
/// before merging.
#[instrument(skip_all, name = "merge", fields(mol0 = %molecule0.name, mol1 = %molecule1.name))]
pub fn merge(
    molecule0: &Molecule,
    molecule1: &Molecule,
    mapping: Option<&AtomMapping>,
    allow_ring_breaking: bool,
    map0: &PropertyMap,
    map1: &PropertyMap,
) -> Result<MergedMolecule, AlignError> {
    let merged = match mapping {
        Some(mapping) => molecule0.merge(molecule1, mapping, allow_ring_breaking, map0, map1)?,
        None => {
            let mapping = default_mapping(molecule0, molecule1, map0, map1)?;
            let aligned = rmsd_align(molecule0, molecule1, Some(&mapping), map0, map1)?;
            aligned.merge(molecule1, &mapping, allow_ring_breaking, map0, map1)?
        }
    };
    info!(
        atoms = merged.atom_count(),
        "Merged '{}' and '{}'", molecule0.name, molecule1.name
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::mcs::tests::methanol;
    use crate::core::models::element::Element;
    use crate::core::models::merged::{EndState, MergeError};
    use crate::core::models::molecule::tests::{benzene_ring, methane};

    #[test]
    fn merge_without_mapping_matches_and_aligns_first() {
        let map = PropertyMap::new();
        let merged = merge(&methane(), &methanol(), None, false, &map, &map).unwrap();

        // Five methane atoms map onto methanol, leaving one methanol atom.
        assert_eq!(merged.atom_count(), 6);
        assert_eq!(merged.dummy_count(EndState::Lambda0), 1);
        assert_eq!(merged.dummy_count(EndState::Lambda1), 0);
        assert_eq!(merged.name, "methane~methanol");

        let lambda0 = merged.end_state(EndState::Lambda0, false);
        assert_eq!(lambda0.atom_count(), 5);
        let lambda1 = merged.end_state(EndState::Lambda1, true);
        assert_eq!(lambda1.atom_count(), 6);
    }

    #[test]
    fn merge_with_mapping_keeps_coordinates() {
        let map = PropertyMap::new();
        let mol0 = methane();
        let mapping: AtomMapping = [(0, 0), (1, 2)].into_iter().collect();
        let merged = merge(&mol0, &methanol(), Some(&mapping), false, &map, &map).unwrap();

        let lambda0 = merged.end_state(EndState::Lambda0, false);
        assert_eq!(lambda0.positions(&map).unwrap(), mol0.positions(&map).unwrap());
        assert_eq!(
            merged.atoms()[2].properties(EndState::Lambda1).element("element"),
            Some(Element::DUMMY)
        );
    }

    #[test]
    fn ring_breaking_is_reported() {
        let map = PropertyMap::new();
        // Methane C1-H1 onto the aromatic C1-C2 ring bond.
        let mapping: AtomMapping = [(0, 0), (1, 1)].into_iter().collect();
        assert_eq!(
            merge(&methane(), &benzene_ring(), Some(&mapping), false, &map, &map),
            Err(AlignError::Merge(MergeError::RingBreaking { atom0: 0, atom1: 0 }))
        );
        assert!(merge(&methane(), &benzene_ring(), Some(&mapping), true, &map, &map).is_ok());

        let single: AtomMapping = [(0, 0)].into_iter().collect();
        assert!(merge(&benzene_ring(), &methane(), Some(&single), false, &map, &map).is_ok());
    }
}
