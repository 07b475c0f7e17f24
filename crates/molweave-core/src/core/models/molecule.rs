use super::atom::Atom;
use super::properties::{PropertyMap, names};
use super::topology::{Bond, BondOrder};
use crate::core::utils::geometry::RigidTransform;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use std::collections::HashSet;
use thiserror::Error;

/// Extra distance allowed beyond the sum of covalent radii when perceiving
/// bonds from coordinates.
const BOND_TOLERANCE: f64 = 0.45;
/// Upper bound on any covalent bond length considered during perception.
const MAX_BOND_LENGTH: f64 = 3.0;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MoleculeError {
    #[error("Atom index {index} is out of range for a molecule with {count} atoms")]
    AtomIndexOutOfRange { index: usize, count: usize },
    #[error("Atom {0} cannot be bonded to itself")]
    SelfBond(usize),
    #[error("Atom {atom} has no '{property}' property")]
    MissingProperty { atom: usize, property: String },
}

/// A single molecule: an ordered list of atoms plus their bonds.
///
/// Atom indices are positions in the atom list and run from `0` to
/// `atom_count() - 1`. The adjacency list is kept in sync with the bond list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Molecule {
    pub name: String,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<usize>>,
}

impl Molecule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    pub fn atoms_iter_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.atoms.iter_mut()
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Adds a bond between two existing atoms. Adding an existing bond again
    /// only updates its order.
    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) -> Result<(), MoleculeError> {
        let count = self.atoms.len();
        for index in [a, b] {
            if index >= count {
                return Err(MoleculeError::AtomIndexOutOfRange { index, count });
            }
        }
        if a == b {
            return Err(MoleculeError::SelfBond(a));
        }

        let bond = Bond::new(a, b, order);
        if let Some(existing) = self
            .bonds
            .iter_mut()
            .find(|x| x.atom1 == bond.atom1 && x.atom2 == bond.atom2)
        {
            existing.order = order;
            return Ok(());
        }
        self.bonds.push(bond);
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
        Ok(())
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn are_bonded(&self, a: usize, b: usize) -> bool {
        self.neighbors(a).contains(&b)
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<&Bond> {
        let key = Bond::new(a, b, BondOrder::Single);
        self.bonds
            .iter()
            .find(|x| x.atom1 == key.atom1 && x.atom2 == key.atom2)
    }

    /// Coordinates of one atom, read through the property map.
    pub fn position(&self, index: usize, map: &PropertyMap) -> Result<Point3<f64>, MoleculeError> {
        let atom = self.atoms.get(index).ok_or(MoleculeError::AtomIndexOutOfRange {
            index,
            count: self.atoms.len(),
        })?;
        atom.position(map).ok_or_else(|| MoleculeError::MissingProperty {
            atom: index,
            property: map.get(names::COORDINATES).to_string(),
        })
    }

    pub fn positions(&self, map: &PropertyMap) -> Result<Vec<Point3<f64>>, MoleculeError> {
        (0..self.atoms.len())
            .map(|i| self.position(i, map))
            .collect()
    }

    /// Returns a copy with every atom position moved by `transform`.
    pub fn transformed(
        &self,
        transform: &RigidTransform,
        map: &PropertyMap,
    ) -> Result<Molecule, MoleculeError> {
        let mut moved = self.clone();
        for (index, atom) in moved.atoms.iter_mut().enumerate() {
            let position = atom.position(map).ok_or_else(|| MoleculeError::MissingProperty {
                atom: index,
                property: map.get(names::COORDINATES).to_string(),
            })?;
            atom.set_position(map, transform.apply(&position));
        }
        Ok(moved)
    }

    /// Creates single bonds between atoms closer than the sum of their
    /// covalent radii plus a tolerance. Returns the number of bonds added.
    pub fn perceive_bonds(&mut self, map: &PropertyMap) -> Result<usize, MoleculeError> {
        let positions = self.positions(map)?;
        if positions.len() < 2 {
            return Ok(0);
        }
        let radii: Vec<f64> = self
            .atoms
            .iter()
            .map(|a| a.element(map).covalent_radius())
            .collect();

        let points: Vec<[f64; 3]> = positions.iter().map(|p| [p.x, p.y, p.z]).collect();
        let tree: KdTree<f64, 3> = (&points).into();

        let mut pairs = Vec::new();
        for (i, point) in points.iter().enumerate() {
            if radii[i] == 0.0 {
                continue;
            }
            for neighbour in tree.within_unsorted::<SquaredEuclidean>(point, MAX_BOND_LENGTH.powi(2))
            {
                let j = neighbour.item as usize;
                if j <= i || radii[j] == 0.0 {
                    continue;
                }
                let cutoff = radii[i] + radii[j] + BOND_TOLERANCE;
                if neighbour.distance > 0.0 && neighbour.distance <= cutoff * cutoff {
                    pairs.push((i, j));
                }
            }
        }

        let before = self.bonds.len();
        for (i, j) in pairs {
            self.add_bond(i, j, BondOrder::Single)?;
        }
        Ok(self.bonds.len() - before)
    }

    /// Flags every atom that lies on a ring, i.e. is incident to at least one
    /// ring bond.
    pub fn ring_atoms(&self) -> Vec<bool> {
        let mut in_ring = vec![false; self.atoms.len()];
        for (a, b) in self.ring_bonds() {
            in_ring[a] = true;
            in_ring[b] = true;
        }
        in_ring
    }

    /// The bonds that are not bridges of the bond graph, as `(low, high)`
    /// atom index pairs.
    pub fn ring_bonds(&self) -> HashSet<(usize, usize)> {
        let n = self.atoms.len();
        let mut discovery = vec![usize::MAX; n];
        let mut low = vec![0usize; n];
        let mut bridges: HashSet<(usize, usize)> = HashSet::new();
        let mut timer = 0usize;

        for root in 0..n {
            if discovery[root] != usize::MAX {
                continue;
            }
            // Iterative DFS: (node, parent, next neighbour position).
            let mut stack: Vec<(usize, usize, usize)> = vec![(root, usize::MAX, 0)];
            discovery[root] = timer;
            low[root] = timer;
            timer += 1;

            while let Some(frame) = stack.last_mut() {
                let (node, parent) = (frame.0, frame.1);
                if let Some(&next) = self.adjacency[node].get(frame.2) {
                    frame.2 += 1;
                    if next == parent {
                        continue;
                    }
                    if discovery[next] == usize::MAX {
                        discovery[next] = timer;
                        low[next] = timer;
                        timer += 1;
                        stack.push((next, node, 0));
                    } else {
                        low[node] = low[node].min(discovery[next]);
                    }
                } else {
                    stack.pop();
                    if parent != usize::MAX {
                        low[parent] = low[parent].min(low[node]);
                        if low[node] > discovery[parent] {
                            bridges.insert((parent.min(node), parent.max(node)));
                        }
                    }
                }
            }
        }

        self.bonds
            .iter()
            .map(|bond| (bond.atom1.min(bond.atom2), bond.atom1.max(bond.atom2)))
            .filter(|pair| !bridges.contains(pair))
            .collect()
    }

    /// Builds the sub-molecule made of the atoms selected by `keep`, together
    /// with the original index of every kept atom.
    pub fn extract(&self, keep: impl Fn(usize, &Atom) -> bool) -> (Molecule, Vec<usize>) {
        let mut sub = Molecule::new(&self.name);
        let mut old_to_new = vec![None; self.atoms.len()];
        let mut kept = Vec::new();
        for (index, atom) in self.atoms.iter().enumerate() {
            if keep(index, atom) {
                old_to_new[index] = Some(sub.add_atom(atom.clone()));
                kept.push(index);
            }
        }
        for bond in &self.bonds {
            if let (Some(a), Some(b)) = (old_to_new[bond.atom1], old_to_new[bond.atom2]) {
                // Both indices were just created, so this cannot fail.
                let _ = sub.add_bond(a, b, bond.order);
            }
        }
        (sub, kept)
    }
}
