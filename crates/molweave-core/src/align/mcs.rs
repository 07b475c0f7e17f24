//! Maximum common substructure search.
//!
//! [`McsMatcher`] enumerates connected, induced common subgraphs of two bond
//! graphs by backtracking. Atoms are compared only by the light/heavy
//! classification, so a carbon may map onto a nitrogen, and bonds are
//! compared only by presence. Every mapping returned has the maximum size
//! found within the time budget.

use crate::core::models::mapping::AtomMapping;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How often (in search nodes) the deadline is checked.
const DEADLINE_CHECK_INTERVAL: u64 = 256;

/// Parameters of one substructure search.
#[derive(Debug, Clone)]
pub struct McsQuery<'a> {
    /// Pairs every result must contain.
    pub prematch: &'a AtomMapping,
    pub timeout: Duration,
    /// Whether hydrogens take part in the match.
    pub match_light: bool,
    /// Atoms with fewer protons than this are light and may only map onto
    /// other light atoms. Zero lifts the restriction.
    pub min_heavy_protons: u8,
    pub map0: &'a PropertyMap,
    pub map1: &'a PropertyMap,
    pub verbose: bool,
}

/// Finds maximum common substructure mappings between two molecules.
pub trait SubstructureMatcher: Send + Sync {
    /// Returns every maximum mapping found (all of equal size), or an empty
    /// list when nothing matches. Running out of time is not an error: the
    /// best mappings found so far are returned.
    fn find_matches(
        &self,
        molecule0: &Molecule,
        molecule1: &Molecule,
        query: &McsQuery<'_>,
    ) -> Vec<AtomMapping>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McsMatcher {
    /// Upper limit on the number of equally sized mappings kept.
    pub max_results: usize,
}

impl Default for McsMatcher {
    fn default() -> Self {
        Self { max_results: 512 }
    }
}

impl SubstructureMatcher for McsMatcher {
    fn find_matches(
        &self,
        molecule0: &Molecule,
        molecule1: &Molecule,
        query: &McsQuery<'_>,
    ) -> Vec<AtomMapping> {
        let mut search = Search::new(molecule0, molecule1, query, self.max_results);
        search.run(query.prematch);

        let message = format!(
            "MCS search (min heavy protons {}) found {} mapping(s) of size {} after {} nodes{}",
            query.min_heavy_protons,
            search.results.len(),
            search.best,
            search.nodes,
            if search.timed_out { ", timed out" } else { "" }
        );
        if query.verbose {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
        search.results
    }
}

struct Search<'a> {
    mol0: &'a Molecule,
    mol1: &'a Molecule,
    light0: Vec<bool>,
    light1: Vec<bool>,
    eligible0: Vec<bool>,
    eligible1: Vec<bool>,
    restrict_light: bool,

    forward: Vec<Option<usize>>,
    backward: Vec<Option<usize>>,
    excluded: Vec<bool>,
    mapped: usize,
    available0: usize,
    available1: usize,

    best: usize,
    results: Vec<AtomMapping>,
    seen: HashSet<AtomMapping>,
    max_results: usize,

    deadline: Instant,
    nodes: u64,
    timed_out: bool,
}

impl<'a> Search<'a> {
    fn new(mol0: &'a Molecule, mol1: &'a Molecule, query: &McsQuery<'_>, max_results: usize) -> Self {
        let classify = |mol: &Molecule, map: &PropertyMap| -> (Vec<bool>, Vec<bool>) {
            mol.atoms()
                .iter()
                .map(|atom| {
                    let element = atom.element(map);
                    let light = element.atomic_number() < query.min_heavy_protons;
                    let eligible = query.match_light || !element.is_hydrogen();
                    (light, eligible)
                })
                .unzip()
        };
        let (light0, eligible0) = classify(mol0, query.map0);
        let (light1, eligible1) = classify(mol1, query.map1);
        let available0 = eligible0.iter().filter(|&&e| e).count();
        let available1 = eligible1.iter().filter(|&&e| e).count();

        Self {
            mol0,
            mol1,
            light0,
            light1,
            eligible0,
            eligible1,
            restrict_light: query.min_heavy_protons > 0,
            forward: vec![None; mol0.atom_count()],
            backward: vec![None; mol1.atom_count()],
            excluded: vec![false; mol0.atom_count()],
            mapped: 0,
            available0,
            available1,
            best: 0,
            results: Vec::new(),
            seen: HashSet::new(),
            max_results: max_results.max(1),
            deadline: Instant::now() + query.timeout,
            nodes: 0,
            timed_out: false,
        }
    }

    fn run(&mut self, prematch: &AtomMapping) {
        if !prematch.is_empty() {
            for (a, b) in prematch.iter() {
                if a >= self.forward.len() || b >= self.backward.len() {
                    continue;
                }
                if self.forward[a].is_none()
                    && self.backward[b].is_none()
                    && self.compatible(a, b)
                    && self.consistent(a, b)
                {
                    self.assign(a, b);
                } else {
                    debug!(atom0 = a, atom1 = b, "Ignoring prematch pair incompatible with the search");
                }
            }
            if self.mapped > 0 {
                self.search();
                return;
            }
        }

        // Each connected mapping is enumerated once, from its lowest mol0 atom.
        for a in 0..self.forward.len() {
            if self.bound() < self.best {
                return;
            }
            if !self.eligible0[a] {
                continue;
            }
            for b in 0..self.backward.len() {
                if !self.compatible(a, b) {
                    continue;
                }
                self.assign(a, b);
                self.search();
                self.unassign(a, b);
                if self.timed_out {
                    return;
                }
            }
            self.exclude(a);
        }
    }

    fn compatible(&self, a: usize, b: usize) -> bool {
        self.eligible0[a]
            && self.eligible1[b]
            && (!self.restrict_light || self.light0[a] == self.light1[b])
    }

    /// Checks that adding `a -> b` keeps the mapping an induced subgraph
    /// isomorphism: bonds to mapped atoms must exist on both sides or on
    /// neither.
    fn consistent(&self, a: usize, b: usize) -> bool {
        for &x in self.mol0.neighbors(a) {
            if let Some(y) = self.forward[x] {
                if !self.mol1.are_bonded(b, y) {
                    return false;
                }
            }
        }
        for &y in self.mol1.neighbors(b) {
            if let Some(x) = self.backward[y] {
                if !self.mol0.are_bonded(a, x) {
                    return false;
                }
            }
        }
        true
    }

    fn assign(&mut self, a: usize, b: usize) {
        self.forward[a] = Some(b);
        self.backward[b] = Some(a);
        self.mapped += 1;
        self.available0 -= 1;
        self.available1 -= 1;
    }

    fn unassign(&mut self, a: usize, b: usize) {
        self.forward[a] = None;
        self.backward[b] = None;
        self.mapped -= 1;
        self.available0 += 1;
        self.available1 += 1;
    }

    fn exclude(&mut self, a: usize) {
        self.excluded[a] = true;
        self.available0 -= 1;
    }

    fn include(&mut self, a: usize) {
        self.excluded[a] = false;
        self.available0 += 1;
    }

    fn bound(&self) -> usize {
        self.mapped + self.available0.min(self.available1)
    }

    /// The lowest-index unmapped, unexcluded atom of mol0 bonded to a mapped
    /// atom.
    fn next_frontier(&self) -> Option<usize> {
        (0..self.forward.len()).find(|&a| {
            self.eligible0[a]
                && self.forward[a].is_none()
                && !self.excluded[a]
                && self
                    .mol0
                    .neighbors(a)
                    .iter()
                    .any(|&x| self.forward[x].is_some())
        })
    }

    fn candidates(&self, a: usize) -> Vec<usize> {
        let Some(anchor) = self
            .mol0
            .neighbors(a)
            .iter()
            .find_map(|&x| self.forward[x])
        else {
            return Vec::new();
        };
        self.mol1
            .neighbors(anchor)
            .iter()
            .copied()
            .filter(|&b| self.backward[b].is_none() && self.compatible(a, b) && self.consistent(a, b))
            .collect()
    }

    fn record(&mut self) {
        if self.mapped > self.best {
            self.best = self.mapped;
            self.results.clear();
            self.seen.clear();
        }
        if self.mapped == self.best && self.mapped > 0 && self.results.len() < self.max_results {
            let mapping: AtomMapping = self
                .forward
                .iter()
                .enumerate()
                .filter_map(|(a, b)| b.map(|b| (a, b)))
                .collect();
            if self.seen.insert(mapping.clone()) {
                self.results.push(mapping);
            }
        }
    }

    /// Counts a search node and decides whether to expand it. Returns the
    /// frame for the next frontier atom, or `None` at a leaf, a pruned node
    /// or once the deadline has passed.
    fn visit(&mut self) -> Option<Frame> {
        self.nodes += 1;
        if !self.timed_out
            && self.nodes % DEADLINE_CHECK_INTERVAL == 0
            && Instant::now() >= self.deadline
        {
            self.timed_out = true;
            // Out of time before any leaf: the partial mapping is the best so far.
            if self.results.is_empty() {
                self.record();
            }
        }
        if self.timed_out {
            return None;
        }

        let bound = self.bound();
        if bound < self.best || (bound == self.best && self.results.len() >= self.max_results) {
            return None;
        }

        let Some(atom) = self.next_frontier() else {
            self.record();
            return None;
        };
        Some(Frame {
            atom,
            candidates: self.candidates(atom),
            cursor: 0,
            assigned: None,
            excluded: false,
        })
    }

    /// Depth-first search from the current state. Each frontier atom is
    /// tried against every candidate and then excluded; the frames live on
    /// the heap so depth is bounded by memory, not by the thread stack.
    fn search(&mut self) {
        let mut stack: Vec<Frame> = Vec::new();
        stack.extend(self.visit());

        while let Some(frame) = stack.last_mut() {
            if let Some(b) = frame.assigned.take() {
                self.unassign(frame.atom, b);
            }
            if self.timed_out {
                if frame.excluded {
                    self.include(frame.atom);
                }
                stack.pop();
                continue;
            }

            if frame.cursor < frame.candidates.len() {
                let b = frame.candidates[frame.cursor];
                frame.cursor += 1;
                frame.assigned = Some(b);
                self.assign(frame.atom, b);
            } else if !frame.excluded {
                frame.excluded = true;
                self.exclude(frame.atom);
            } else {
                self.include(frame.atom);
                stack.pop();
                continue;
            }
            if let Some(child) = self.visit() {
                stack.push(child);
            }
        }
    }
}

/// One level of the search: a frontier atom and the choices left for it.
struct Frame {
    atom: usize,
    candidates: Vec<usize>,
    cursor: usize,
    /// The candidate currently assigned to `atom`, undone on return.
    assigned: Option<usize>,
    /// Whether the branch leaving `atom` unmapped has been taken.
    excluded: bool,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::molecule::tests::{benzene_ring, methane};
    use crate::core::models::topology::BondOrder;
    use nalgebra::Point3;

    /// Methanol with explicit hydrogens: C, O, HO and three methyl hydrogens.
    pub(crate) fn methanol() -> Molecule {
        let mut mol = Molecule::new("methanol");
        let c = mol.add_atom(Atom::new("C1", Element::CARBON, Point3::origin()));
        let o = mol.add_atom(Atom::new("O1", Element::OXYGEN, Point3::new(1.43, 0.0, 0.0)));
        let ho = mol.add_atom(Atom::new("HO", Element::HYDROGEN, Point3::new(1.75, 0.9, 0.0)));
        mol.add_bond(c, o, BondOrder::Single).unwrap();
        mol.add_bond(o, ho, BondOrder::Single).unwrap();
        for (name, p) in [
            ("H1", Point3::new(-0.36, 1.03, 0.0)),
            ("H2", Point3::new(-0.36, -0.51, 0.89)),
            ("H3", Point3::new(-0.36, -0.51, -0.89)),
        ] {
            let h = mol.add_atom(Atom::new(name, Element::HYDROGEN, p));
            mol.add_bond(c, h, BondOrder::Single).unwrap();
        }
        mol
    }

    fn query<'a>(
        prematch: &'a AtomMapping,
        map: &'a PropertyMap,
        min_heavy_protons: u8,
        match_light: bool,
    ) -> McsQuery<'a> {
        McsQuery {
            prematch,
            timeout: Duration::from_secs(5),
            match_light,
            min_heavy_protons,
            map0: map,
            map1: map,
            verbose: false,
        }
    }

    /// An unbranched carbon chain with 1.54 Angstrom spacing.
    pub(crate) fn carbon_chain(length: usize) -> Molecule {
        let mut mol = Molecule::new("chain");
        for i in 0..length {
            let position = Point3::new(1.54 * i as f64, 0.0, 0.0);
            mol.add_atom(Atom::new(&format!("C{}", i % 1000), Element::CARBON, position));
            if i > 0 {
                mol.add_bond(i - 1, i, BondOrder::Single).unwrap();
            }
        }
        mol
    }

    fn assert_valid(mapping: &AtomMapping, mol0: &Molecule, mol1: &Molecule) {
        assert!(mapping.validate(mol0.atom_count(), mol1.atom_count()).is_ok());
        for (a, b) in mapping.iter() {
            for (x, y) in mapping.iter() {
                assert_eq!(mol0.are_bonded(a, x), mol1.are_bonded(b, y));
            }
        }
    }

    #[test]
    fn identical_rings_map_completely_in_every_rotation() {
        let ring = benzene_ring();
        let empty = AtomMapping::new();
        let map = PropertyMap::new();
        let results = McsMatcher::default().find_matches(&ring, &ring, &query(&empty, &map, 6, true));

        // Six rotations times two directions.
        assert_eq!(results.len(), 12);
        for mapping in &results {
            assert_eq!(mapping.len(), 6);
            assert_valid(mapping, &ring, &ring);
        }
    }

    #[test]
    fn strict_search_keeps_heavy_and_light_atoms_apart() {
        let (mol0, mol1) = (methane(), methanol());
        let empty = AtomMapping::new();
        let map = PropertyMap::new();
        let strict = McsMatcher::default().find_matches(&mol0, &mol1, &query(&empty, &map, 6, true));
        let widened = McsMatcher::default().find_matches(&mol0, &mol1, &query(&empty, &map, 0, true));

        assert!(!strict.is_empty());
        assert_eq!(strict[0].len(), 4);
        for mapping in &strict {
            assert_valid(mapping, &mol0, &mol1);
            assert!(mapping.values().all(|b| b != 1), "oxygen mapped onto hydrogen");
        }
        assert_eq!(widened[0].len(), 5);
        assert!(widened.iter().any(|m| m.values().any(|b| b == 1)));
    }

    #[test]
    fn match_light_false_skips_hydrogens() {
        let (mol0, mol1) = (methane(), methanol());
        let empty = AtomMapping::new();
        let map = PropertyMap::new();
        let results = McsMatcher::default().find_matches(&mol0, &mol1, &query(&empty, &map, 0, false));
        // Only the carbon takes part; it may land on either heavy atom.
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|m| m.len() == 1 && m.get(0).is_some()));
    }

    #[test]
    fn prematch_pairs_are_always_kept() {
        let ring = benzene_ring();
        let prematch: AtomMapping = [(0, 3)].into_iter().collect();
        let map = PropertyMap::new();
        let results = McsMatcher::default().find_matches(&ring, &ring, &query(&prematch, &map, 6, true));
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|m| m.get(0) == Some(3) && m.len() == 6));
    }

    #[test]
    fn max_results_caps_equal_sized_mappings() {
        let ring = benzene_ring();
        let empty = AtomMapping::new();
        let map = PropertyMap::new();
        let matcher = McsMatcher { max_results: 3 };
        let results = matcher.find_matches(&ring, &ring, &query(&empty, &map, 6, true));
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn disjoint_light_and_heavy_atoms_do_not_match() {
        let mut h2 = Molecule::new("hydrogen");
        h2.add_atom(Atom::new("H1", Element::HYDROGEN, Point3::origin()));
        h2.add_atom(Atom::new("H2", Element::HYDROGEN, Point3::new(0.74, 0.0, 0.0)));
        h2.add_bond(0, 1, BondOrder::Single).unwrap();
        let ring = benzene_ring();
        let empty = AtomMapping::new();
        let map = PropertyMap::new();
        assert!(
            McsMatcher::default()
                .find_matches(&h2, &ring, &query(&empty, &map, 6, true))
                .is_empty()
        );
    }

    #[test]
    fn long_chains_do_not_exhaust_the_stack() {
        let chain = carbon_chain(10_000);
        let empty = AtomMapping::new();
        let map = PropertyMap::new();
        let mut q = query(&empty, &map, 6, true);
        q.timeout = Duration::from_secs(2);

        let results = McsMatcher::default().find_matches(&chain, &chain, &q);
        assert!(!results.is_empty());
        assert!(results[0].len() > 1);
        assert!(results[0].validate(chain.atom_count(), chain.atom_count()).is_ok());
    }

    #[test]
    fn exhausted_budget_returns_the_partial_mapping() {
        let chain = carbon_chain(400);
        let empty = AtomMapping::new();
        let map = PropertyMap::new();
        let mut q = query(&empty, &map, 6, true);
        q.timeout = Duration::ZERO;

        let results = McsMatcher::default().find_matches(&chain, &chain, &q);
        assert_eq!(results.len(), 1);
        let partial = &results[0];
        assert!(!partial.is_empty() && partial.len() < 400);
        assert_valid(partial, &chain, &chain);
    }
}
