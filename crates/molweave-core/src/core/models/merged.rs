use super::atom::Atom;
use super::element::Element;
use super::mapping::{AtomMapping, MappingError};
use super::molecule::Molecule;
use super::properties::{Properties, PropertyMap, PropertyValue, names};
use super::topology::Bond;
use nalgebra::Point3;
use thiserror::Error;
use tracing::debug;

/// Canonical properties rewritten from a caller's alias when atoms are copied
/// into a merged molecule.
const CANONICAL_PROPERTIES: [&str; 6] = [
    names::COORDINATES,
    names::ELEMENT,
    names::CHARGE,
    names::MASS,
    names::AMBER_TYPE,
    names::FORMAL_CHARGE,
];

const DUMMY_AMBER_TYPE: &str = "du";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MergeError {
    #[error("Invalid mapping: {0}")]
    Mapping(#[from] MappingError),
    #[error(
        "Mapping atom {atom0} onto atom {atom1} would open or close a ring. Pass 'allow_ring_breaking' to permit this."
    )]
    RingBreaking { atom0: usize, atom1: usize },
}

/// One of the two physical end states of a merged molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndState {
    Lambda0,
    Lambda1,
}

impl EndState {
    /// Maps a lambda value of exactly `0.0` or `1.0` onto an end state.
    pub fn from_lambda(lambda: f64) -> Option<Self> {
        if lambda == 0.0 {
            Some(Self::Lambda0)
        } else if lambda == 1.0 {
            Some(Self::Lambda1)
        } else {
            None
        }
    }
}

/// An atom of a dual-topology molecule.
///
/// Properties are stored under canonical names for both end states. An atom
/// that only exists in one state is a dummy (element `Xx`, zero charge) in
/// the other.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedAtom {
    pub name: String,
    pub residue_name: String,
    pub residue_number: isize,
    pub chain_id: char,
    pub state0: Properties,
    pub state1: Properties,
    /// Index of the source atom in the first molecule, if any.
    pub index0: Option<usize>,
    /// Index of the source atom in the second molecule, if any.
    pub index1: Option<usize>,
}

impl MergedAtom {
    pub fn properties(&self, state: EndState) -> &Properties {
        match state {
            EndState::Lambda0 => &self.state0,
            EndState::Lambda1 => &self.state1,
        }
    }

    pub fn is_dummy(&self, state: EndState) -> bool {
        match state {
            EndState::Lambda0 => self.index0.is_none(),
            EndState::Lambda1 => self.index1.is_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedMolecule {
    pub name: String,
    atoms: Vec<MergedAtom>,
    bonds0: Vec<Bond>,
    bonds1: Vec<Bond>,
}

impl MergedMolecule {
    pub fn atoms(&self) -> &[MergedAtom] {
        &self.atoms
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bonds(&self, state: EndState) -> &[Bond] {
        match state {
            EndState::Lambda0 => &self.bonds0,
            EndState::Lambda1 => &self.bonds1,
        }
    }

    /// Number of atoms that are dummies in the given state.
    pub fn dummy_count(&self, state: EndState) -> usize {
        self.atoms.iter().filter(|a| a.is_dummy(state)).count()
    }

    /// Extracts a plain molecule for one end state. Dummy atoms are kept
    /// unless `include_dummies` is false.
    pub fn end_state(&self, state: EndState, include_dummies: bool) -> Molecule {
        let mut molecule = Molecule::new(&self.name);
        let mut index = vec![None; self.atoms.len()];
        for (i, merged) in self.atoms.iter().enumerate() {
            if !include_dummies && merged.is_dummy(state) {
                continue;
            }
            let mut atom = Atom::new(&merged.name, Element::DUMMY, Point3::origin());
            atom.residue_name = merged.residue_name.clone();
            atom.residue_number = merged.residue_number;
            atom.chain_id = merged.chain_id;
            atom.properties = merged.properties(state).clone();
            index[i] = Some(molecule.add_atom(atom));
        }
        for bond in self.bonds(state) {
            if let (Some(a), Some(b)) = (index[bond.atom1], index[bond.atom2]) {
                let added = molecule.add_bond(a, b, bond.order);
                debug_assert!(added.is_ok(), "merged bond {a}-{b} is invalid");
            }
        }
        molecule
    }
}

/// Copies an atom's properties, renaming aliased canonical entries back to
/// their canonical names.
fn canonical_properties(atom: &Atom, map: &PropertyMap) -> Properties {
    let mut properties = atom.properties.clone();
    for canonical in CANONICAL_PROPERTIES {
        let alias = map.get(canonical);
        if alias != canonical {
            if let Some(value) = properties.remove(alias) {
                properties.set(canonical, value);
            }
        }
    }
    if !properties.contains(names::ELEMENT) {
        properties.set(names::ELEMENT, PropertyValue::Element(atom.element(map)));
    }
    properties
}

/// Turns the properties of a real atom into those of its dummy counterpart.
fn dummy_properties(real: &Properties) -> Properties {
    let mut dummy = real.clone();
    dummy.set(names::ELEMENT, PropertyValue::Element(Element::DUMMY));
    if dummy.contains(names::CHARGE) {
        dummy.set(names::CHARGE, PropertyValue::Real(0.0));
    }
    if dummy.contains(names::MASS) {
        dummy.set(names::MASS, PropertyValue::Real(0.0));
    }
    if dummy.contains(names::AMBER_TYPE) {
        dummy.set(
            names::AMBER_TYPE,
            PropertyValue::Text(DUMMY_AMBER_TYPE.to_string()),
        );
    }
    dummy.remove(names::FORMAL_CHARGE);
    dummy
}

/// Every bond between two mapped atoms must be a ring bond in both molecules
/// or in neither. Mapped atoms whose ring neighbours are all dummies keep the
/// ring intact in the other state, so only mapped pairs are compared.
fn check_ring_bonds(
    molecule0: &Molecule,
    molecule1: &Molecule,
    mapping: &AtomMapping,
    inverse: &AtomMapping,
) -> Result<(), MergeError> {
    let key = |a: usize, b: usize| (a.min(b), a.max(b));
    let rings0 = molecule0.ring_bonds();
    let rings1 = molecule1.ring_bonds();

    for bond in molecule0.bonds() {
        if let (Some(a1), Some(b1)) = (mapping.get(bond.atom1), mapping.get(bond.atom2)) {
            let ring0 = rings0.contains(&key(bond.atom1, bond.atom2));
            if ring0 != rings1.contains(&key(a1, b1)) {
                return Err(MergeError::RingBreaking {
                    atom0: bond.atom1,
                    atom1: a1,
                });
            }
        }
    }
    for bond in molecule1.bonds() {
        if let (Some(a0), Some(b0)) = (inverse.get(bond.atom1), inverse.get(bond.atom2)) {
            let ring1 = rings1.contains(&key(bond.atom1, bond.atom2));
            if ring1 != rings0.contains(&key(a0, b0)) {
                return Err(MergeError::RingBreaking {
                    atom0: a0,
                    atom1: bond.atom1,
                });
            }
        }
    }
    Ok(())
}

impl Molecule {
    /// Builds a dual-topology molecule from `self` (lambda 0) and `other`
    /// (lambda 1) using `mapping` from atoms of `self` to atoms of `other`.
    ///
    /// Merged atoms are all atoms of `self` in order, followed by the atoms
    /// of `other` that are not mapped. Each state's bonds are that molecule's
    /// own bonds plus the bonds of the other molecule that touch an atom
    /// unique to it, so dummies stay attached.
    pub fn merge(
        &self,
        other: &Molecule,
        mapping: &AtomMapping,
        allow_ring_breaking: bool,
        map0: &PropertyMap,
        map1: &PropertyMap,
    ) -> Result<MergedMolecule, MergeError> {
        mapping.validate(self.atom_count(), other.atom_count())?;
        let inverse = mapping.inverse().unwrap_or_default();

        if !allow_ring_breaking {
            check_ring_bonds(self, other, mapping, &inverse)?;
        }

        let mut atoms = Vec::with_capacity(self.atom_count() + other.atom_count() - mapping.len());
        for (i, atom) in self.atoms().iter().enumerate() {
            let state0 = canonical_properties(atom, map0);
            let (index1, state1) = match mapping.get(i) {
                Some(j) => (Some(j), canonical_properties(&other.atoms()[j], map1)),
                None => (None, dummy_properties(&state0)),
            };
            atoms.push(MergedAtom {
                name: atom.name.clone(),
                residue_name: atom.residue_name.clone(),
                residue_number: atom.residue_number,
                chain_id: atom.chain_id,
                state0,
                state1,
                index0: Some(i),
                index1,
            });
        }

        // Where each atom of `other` lands in the merged molecule.
        let mut merged_index1 = vec![0usize; other.atom_count()];
        for (j, atom) in other.atoms().iter().enumerate() {
            if let Some(i) = inverse.get(j) {
                merged_index1[j] = i;
                continue;
            }
            let state1 = canonical_properties(atom, map1);
            merged_index1[j] = atoms.len();
            atoms.push(MergedAtom {
                name: atom.name.clone(),
                residue_name: atom.residue_name.clone(),
                residue_number: atom.residue_number,
                chain_id: atom.chain_id,
                state0: dummy_properties(&state1),
                state1,
                index0: None,
                index1: Some(j),
            });
        }

        let translated1: Vec<Bond> = other
            .bonds()
            .iter()
            .map(|b| Bond::new(merged_index1[b.atom1], merged_index1[b.atom2], b.order))
            .collect();

        let unique0 = |b: &Bond| !mapping.contains_key(b.atom1) || !mapping.contains_key(b.atom2);
        let unique1 = |b: &Bond| atoms[b.atom1].index0.is_none() || atoms[b.atom2].index0.is_none();

        let mut bonds0: Vec<Bond> = self.bonds().to_vec();
        bonds0.extend(translated1.iter().copied().filter(|b| unique1(b)));
        let mut bonds1 = translated1.clone();
        bonds1.extend(self.bonds().iter().copied().filter(|b| unique0(b)));

        debug!(
            mapped = mapping.len(),
            dummies0 = atoms.iter().filter(|a| a.index0.is_none()).count(),
            dummies1 = atoms.iter().filter(|a| a.index1.is_none()).count(),
            "Merged molecules"
        );

        Ok(MergedMolecule {
            name: format!("{}~{}", self.name, other.name),
            atoms,
            bonds0,
            bonds1,
        })
    }
}
