use super::{INPUT_PDB, OUTPUT_PRM7, OUTPUT_RST7, require_outputs, run_logged};
use crate::core::io::amber::read_amber;
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::element::Element;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::properties::PropertyMap;
use crate::parameters::error::ParameterError;
use crate::parameters::protocol::Protocol;
use crate::parameters::registry::AmberForceField;
use kiddo::{KdTree, SquaredEuclidean};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub(crate) const LEAP_SCRIPT: &str = "leap.txt";
pub(crate) const LEAP_LOG: &str = "tleap.log";

/// Longest SG-SG distance, in Angstroms, treated as a disulphide bridge.
const DISULPHIDE_CUTOFF: f64 = 2.5;
const CYSTEINE_NAMES: [&str; 3] = ["CYS", "CYX", "CYM"];
const BRIDGED_CYSTEINE: &str = "CYX";

/// A disulphide bridge between the SG atoms of two cysteines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisulphideBond {
    /// Atom indices of the two SG atoms.
    pub atom0: usize,
    pub atom1: usize,
    /// One-based residue numbers as `tleap` assigns them on `loadPdb`.
    pub residue0: usize,
    pub residue1: usize,
}

/// Numbers residues in order of appearance, starting at one, the way
/// `tleap` does. A new residue starts whenever chain, number or name
/// changes, so repeated numbering across chains stays distinct.
fn leap_residue_numbers(molecule: &Molecule) -> Vec<usize> {
    let mut numbers = Vec::with_capacity(molecule.atom_count());
    let mut previous = None;
    let mut current = 0;
    for atom in molecule.atoms() {
        let key = (atom.chain_id, atom.residue_number, atom.residue_name.as_str());
        if previous != Some(key) {
            current += 1;
            previous = Some(key);
        }
        numbers.push(current);
    }
    numbers
}

/// Finds cysteine SG pairs close enough to be bridged. Each SG takes part
/// in at most one bridge, closest pairs first.
pub fn disulphide_bonds(
    molecule: &Molecule,
    map: &PropertyMap,
) -> Result<Vec<DisulphideBond>, MoleculeError> {
    let sulphurs: Vec<usize> = molecule
        .atoms()
        .iter()
        .enumerate()
        .filter(|(_, atom)| {
            atom.name == "SG"
                && atom.element(map) == Element::SULFUR
                && CYSTEINE_NAMES.contains(&atom.residue_name.as_str())
        })
        .map(|(i, _)| i)
        .collect();
    if sulphurs.len() < 2 {
        return Ok(Vec::new());
    }

    let points = sulphurs
        .iter()
        .map(|&i| molecule.position(i, map).map(|p| [p.x, p.y, p.z]))
        .collect::<Result<Vec<_>, _>>()?;
    let tree: KdTree<f64, 3> = (&points).into();

    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    let cutoff = DISULPHIDE_CUTOFF.powi(2);
    for (i, point) in points.iter().enumerate() {
        for neighbour in tree.within_unsorted::<SquaredEuclidean>(point, cutoff) {
            let j = neighbour.item as usize;
            if j > i {
                pairs.push((neighbour.distance, sulphurs[i], sulphurs[j]));
            }
        }
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let residues = leap_residue_numbers(molecule);
    let mut used = HashSet::new();
    let mut bonds = Vec::new();
    for (_, a, b) in pairs {
        if residues[a] == residues[b] || used.contains(&a) || used.contains(&b) {
            continue;
        }
        used.insert(a);
        used.insert(b);
        let (atom0, atom1) = (a.min(b), a.max(b));
        bonds.push(DisulphideBond {
            atom0,
            atom1,
            residue0: residues[atom0],
            residue1: residues[atom1],
        });
    }
    bonds.sort_by_key(|bond| (bond.atom0, bond.atom1));
    Ok(bonds)
}

/// Parameterises a protein with one of the AmberTools protein force fields.
#[derive(Debug, Clone)]
pub struct AmberProtein {
    name: String,
    forcefield: AmberForceField,
    tleap: PathBuf,
}

impl AmberProtein {
    pub fn new(name: &str, forcefield: AmberForceField, tleap: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            forcefield,
            tleap,
        }
    }

    fn leap_script(&self, bridges: &[DisulphideBond]) -> String {
        let mut script = format!(
            "source {}\nmol = loadPdb {}\n",
            self.forcefield.leaprc(),
            INPUT_PDB
        );
        for bridge in bridges {
            script.push_str(&format!(
                "bond mol.{}.SG mol.{}.SG\n",
                bridge.residue0, bridge.residue1
            ));
        }
        script.push_str(&format!(
            "saveAmberParm mol {} {}\nquit\n",
            OUTPUT_PRM7, OUTPUT_RST7
        ));
        script
    }

    /// A copy of `molecule` with bridged cysteines renamed to CYX, so that
    /// `tleap` uses the template without the thiol hydrogen.
    fn rename_bridged(molecule: &Molecule, bridges: &[DisulphideBond]) -> Molecule {
        let residues = leap_residue_numbers(molecule);
        let bridged: HashSet<usize> = bridges
            .iter()
            .flat_map(|b| [b.residue0, b.residue1])
            .collect();
        let mut renamed = molecule.clone();
        for (atom, residue) in renamed.atoms_iter_mut().zip(residues) {
            if bridged.contains(&residue) {
                atom.residue_name = BRIDGED_CYSTEINE.to_string();
            }
        }
        renamed
    }
}

/// Runs `tleap` on a script already written to the work directory and reads
/// the AMBER files it saved.
pub(crate) fn run_tleap(
    tleap: &Path,
    script: &str,
    work_dir: &Path,
    name: &str,
) -> Result<Molecule, ParameterError> {
    fs::write(work_dir.join(LEAP_SCRIPT), script)?;
    let log = run_logged(tleap, ["-f", LEAP_SCRIPT], work_dir, LEAP_LOG, &[])?;
    require_outputs(work_dir, &[OUTPUT_PRM7, OUTPUT_RST7], tleap, &log)?;

    let mut molecule = read_amber(work_dir.join(OUTPUT_PRM7), work_dir.join(OUTPUT_RST7))?;
    molecule.name = name.to_string();
    Ok(molecule)
}

impl Protocol for AmberProtein {
    fn forcefield(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        molecule: &Molecule,
        work_dir: &Path,
        map: &PropertyMap,
    ) -> Result<Molecule, ParameterError> {
        info!(forcefield = %self.name, "Parameterising with tleap");
        let bridges = disulphide_bonds(molecule, map)?;
        if !bridges.is_empty() {
            debug!(count = bridges.len(), "Found disulphide bridges");
        }
        let input = Self::rename_bridged(molecule, &bridges);
        PdbFile::write_molecule_to_path(&input, map, work_dir.join(INPUT_PDB))?;
        run_tleap(&self.tleap, &self.leap_script(&bridges), work_dir, &molecule.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;

    /// Appends a minimal cysteine (CA, CB, SG) with SG at `sg`.
    fn add_cysteine(mol: &mut Molecule, chain: char, number: isize, sg: Point3<f64>) -> usize {
        let offset = Point3::new(sg.x, sg.y + 1.8, sg.z);
        for (name, element, position) in [
            ("CA", Element::CARBON, Point3::new(offset.x, offset.y + 1.5, offset.z)),
            ("CB", Element::CARBON, offset),
        ] {
            let mut atom = Atom::new(name, element, position).with_residue("CYS", number);
            atom.chain_id = chain;
            mol.add_atom(atom);
        }
        let mut atom = Atom::new("SG", Element::SULFUR, sg).with_residue("CYS", number);
        atom.chain_id = chain;
        mol.add_atom(atom)
    }

    /// Two bridged cysteines in chain A and a free one, then the same pair
    /// numbering repeated in chain B.
    fn bridged_protein() -> Molecule {
        let mut mol = Molecule::new("protein");
        add_cysteine(&mut mol, 'A', 3, Point3::new(0.0, 0.0, 0.0));
        add_cysteine(&mut mol, 'A', 7, Point3::new(2.05, 0.0, 0.0));
        add_cysteine(&mut mol, 'A', 9, Point3::new(20.0, 0.0, 0.0));
        add_cysteine(&mut mol, 'B', 3, Point3::new(0.0, 30.0, 0.0));
        add_cysteine(&mut mol, 'B', 7, Point3::new(2.05, 30.0, 0.0));
        mol
    }

    #[test]
    fn leap_script_loads_the_selected_force_field() {
        let protocol = AmberProtein::new("ff14SB", AmberForceField::Ff14Sb, PathBuf::from("tleap"));
        let script = protocol.leap_script(&[]);
        assert!(script.starts_with("source leaprc.protein.ff14SB\n"));
        assert!(script.contains("loadPdb input.pdb"));
        assert!(!script.contains("bond "));
        assert!(script.contains("saveAmberParm mol output.prm7 output.rst7"));
        assert!(script.ends_with("quit\n"));
    }

    #[test]
    fn disulphide_bridges_are_found_per_chain() {
        let protein = bridged_protein();
        let bonds = disulphide_bonds(&protein, &PropertyMap::new()).unwrap();
        assert_eq!(
            bonds,
            vec![
                DisulphideBond { atom0: 2, atom1: 5, residue0: 1, residue1: 2 },
                DisulphideBond { atom0: 11, atom1: 14, residue0: 4, residue1: 5 },
            ]
        );
    }

    #[test]
    fn bridged_cysteines_are_bonded_and_renamed_for_tleap() {
        let protein = bridged_protein();
        let bonds = disulphide_bonds(&protein, &PropertyMap::new()).unwrap();
        let protocol = AmberProtein::new("ff99SB", AmberForceField::Ff99Sb, PathBuf::from("tleap"));

        let script = protocol.leap_script(&bonds);
        assert!(script.contains(
            "mol = loadPdb input.pdb\n\
             bond mol.1.SG mol.2.SG\n\
             bond mol.4.SG mol.5.SG\n\
             saveAmberParm"
        ));

        let renamed = AmberProtein::rename_bridged(&protein, &bonds);
        let names: Vec<&str> = renamed.atoms().iter().map(|a| a.residue_name.as_str()).collect();
        assert_eq!(&names[0..6], ["CYX"; 6]);
        assert_eq!(&names[6..9], ["CYS"; 3]);
        assert_eq!(&names[9..15], ["CYX"; 6]);
    }

    #[test]
    fn distant_or_lone_sulphurs_form_no_bridge() {
        let mut mol = Molecule::new("single");
        add_cysteine(&mut mol, 'A', 1, Point3::origin());
        assert!(disulphide_bonds(&mol, &PropertyMap::new()).unwrap().is_empty());

        add_cysteine(&mut mol, 'A', 2, Point3::new(3.5, 0.0, 0.0));
        assert!(disulphide_bonds(&mol, &PropertyMap::new()).unwrap().is_empty());
    }
}
