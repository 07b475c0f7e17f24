//! Reader for GROMACS topology (`.top`/`.itp`) files.
//!
//! Molecule types are read from `[ moleculetype ]`, `[ atoms ]` and
//! `[ bonds ]`; the system composition comes from `[ molecules ]`. Local
//! `#include` files are followed; includes that cannot be found next to the
//! topology (usually force-field files under the GROMACS data directory) are
//! skipped.

use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::properties::{PropertyMap, PropertyValue, names};
use crate::core::models::topology::BondOrder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TopError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error in {file} on line {line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },
    #[error("Unknown molecule type '{0}' in [ molecules ]")]
    UnknownMoleculeType(String),
    #[error("Topology describes {expected} atoms but the coordinates hold {found}")]
    CountMismatch { expected: usize, found: usize },
    #[error("Molecule error: {0}")]
    Molecule(#[from] MoleculeError),
}

#[derive(Debug, Clone, PartialEq)]
struct TopAtom {
    atom_type: String,
    residue_number: isize,
    residue_name: String,
    name: String,
    charge: f64,
    mass: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct MoleculeType {
    name: String,
    atoms: Vec<TopAtom>,
    bonds: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroTopology {
    molecule_types: Vec<MoleculeType>,
    molecules: Vec<(String, usize)>,
}

impl GroTopology {
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TopError> {
        let path = path.as_ref();
        let mut topology = Self::default();
        topology.parse_file(path)?;
        Ok(topology)
    }

    /// Parses topology text; includes are resolved against `base_dir`.
    pub fn read_from(reader: &mut impl BufRead, base_dir: Option<&Path>) -> Result<Self, TopError> {
        let mut topology = Self::default();
        topology.parse(reader, "<input>", base_dir)?;
        Ok(topology)
    }

    fn parse_file(&mut self, path: &Path) -> Result<(), TopError> {
        let mut reader = BufReader::new(File::open(path)?);
        self.parse(&mut reader, &path.display().to_string(), path.parent())
    }

    fn parse(
        &mut self,
        reader: &mut impl BufRead,
        file: &str,
        base_dir: Option<&Path>,
    ) -> Result<(), TopError> {
        let mut section = String::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line_num = line_num + 1;
            let content = line.split(';').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            if let Some(include) = content.strip_prefix("#include") {
                let name = include.trim().trim_matches('"');
                let candidate: Option<PathBuf> = base_dir.map(|d| d.join(name));
                match candidate.filter(|p| p.is_file()) {
                    Some(path) => self.parse_file(&path)?,
                    None => debug!(include = name, "Skipping include not found next to topology"),
                }
                continue;
            }
            if content.starts_with('#') {
                continue;
            }
            if content.starts_with('[') {
                section = content
                    .trim_matches(|c| c == '[' || c == ']')
                    .trim()
                    .to_lowercase();
                if section == "moleculetype" {
                    self.molecule_types.push(MoleculeType::default());
                }
                continue;
            }

            let fields: Vec<&str> = content.split_whitespace().collect();
            let parse_error = |message: String| TopError::Parse {
                file: file.to_string(),
                line: line_num,
                message,
            };

            match section.as_str() {
                "moleculetype" => {
                    if let Some(current) = self.molecule_types.last_mut() {
                        if current.name.is_empty() {
                            current.name = fields[0].to_string();
                        }
                    }
                }
                "atoms" => {
                    if fields.len() < 7 {
                        return Err(parse_error(format!("expected at least 7 fields, got {}", fields.len())));
                    }
                    let residue_number = fields[2]
                        .parse()
                        .map_err(|_| parse_error(format!("invalid residue number '{}'", fields[2])))?;
                    let charge = fields[6]
                        .parse()
                        .map_err(|_| parse_error(format!("invalid charge '{}'", fields[6])))?;
                    let mass = fields.get(7).and_then(|m| m.parse().ok());
                    let atom = TopAtom {
                        atom_type: fields[1].to_string(),
                        residue_number,
                        residue_name: fields[3].to_string(),
                        name: fields[4].to_string(),
                        charge,
                        mass,
                    };
                    self.molecule_types
                        .last_mut()
                        .ok_or_else(|| parse_error("[ atoms ] outside a [ moleculetype ]".into()))?
                        .atoms
                        .push(atom);
                }
                "bonds" => {
                    if fields.len() < 2 {
                        return Err(parse_error("bond needs two atom numbers".into()));
                    }
                    let index = |f: &str| -> Result<usize, TopError> {
                        f.parse::<usize>()
                            .ok()
                            .filter(|&n| n > 0)
                            .map(|n| n - 1)
                            .ok_or_else(|| parse_error(format!("invalid atom number '{}'", f)))
                    };
                    let bond = (index(fields[0])?, index(fields[1])?);
                    self.molecule_types
                        .last_mut()
                        .ok_or_else(|| parse_error("[ bonds ] outside a [ moleculetype ]".into()))?
                        .bonds
                        .push(bond);
                }
                "molecules" => {
                    if fields.len() < 2 {
                        return Err(parse_error("expected a name and a count".into()));
                    }
                    let count = fields[1]
                        .parse()
                        .map_err(|_| parse_error(format!("invalid molecule count '{}'", fields[1])))?;
                    self.molecules.push((fields[0].to_string(), count));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Total number of atoms in the system described by `[ molecules ]`.
    pub fn atom_count(&self) -> Result<usize, TopError> {
        let mut total = 0;
        for (name, count) in &self.molecules {
            total += self.molecule_type(name)?.atoms.len() * count;
        }
        Ok(total)
    }

    fn molecule_type(&self, name: &str) -> Result<&MoleculeType, TopError> {
        self.molecule_types
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| TopError::UnknownMoleculeType(name.to_string()))
    }

    /// Applies the topology to a coordinate molecule (for instance one read
    /// from a `.gro` file), adding charges, masses, types and bonds.
    pub fn apply_to(&self, coordinates: &Molecule) -> Result<Molecule, TopError> {
        let expected = self.atom_count()?;
        if expected != coordinates.atom_count() {
            return Err(TopError::CountMismatch {
                expected,
                found: coordinates.atom_count(),
            });
        }

        let map = PropertyMap::new();
        let mut molecule = Molecule::new(&coordinates.name);
        for (name, count) in &self.molecules {
            let molecule_type = self.molecule_type(name)?;
            for _ in 0..*count {
                let offset = molecule.atom_count();
                for top_atom in &molecule_type.atoms {
                    let source = &coordinates.atoms()[molecule.atom_count()];
                    let position = coordinates.position(molecule.atom_count(), &map)?;
                    let element = top_atom
                        .mass
                        .and_then(Element::from_mass)
                        .or_else(|| Element::guess_from_atom_name(&top_atom.name))
                        .unwrap_or(Element::DUMMY);
                    let mut atom = Atom::new(&top_atom.name, element, position)
                        .with_residue(&top_atom.residue_name, top_atom.residue_number);
                    atom.chain_id = source.chain_id;
                    atom.properties
                        .set(names::CHARGE, PropertyValue::Real(top_atom.charge));
                    atom.properties.set(
                        names::MASS,
                        PropertyValue::Real(top_atom.mass.unwrap_or_else(|| element.mass())),
                    );
                    atom.properties
                        .set(names::AMBER_TYPE, PropertyValue::Text(top_atom.atom_type.clone()));
                    molecule.add_atom(atom);
                }
                for &(a, b) in &molecule_type.bonds {
                    molecule.add_bond(offset + a, offset + b, BondOrder::Single)?;
                }
            }
        }
        Ok(molecule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::gro::GroFile;
    use crate::core::io::traits::MolecularFile;
    use std::io::Cursor;

    const WATER_TOP: &str = "\
; water topology
#include \"amber99sb.ff/forcefield.itp\"

[ moleculetype ]
; name  nrexcl
SOL     2

[ atoms ]
;   nr   type  resnr residue  atom   cgnr     charge       mass
     1     OW      1    SOL     OW      1     -0.834   15.99940
     2     HW      1    SOL    HW1      1      0.417    1.00800
     3     HW      1    SOL    HW2      1      0.417    1.00800

[ bonds ]
1 2
1 3

[ system ]
Water box

[ molecules ]
SOL     2
";

    const TWO_WATERS_GRO: &str = "\
Two waters
    6
    1SOL     OW    1   0.126   1.624   1.679
    1SOL    HW1    2   0.190   1.661   1.747
    1SOL    HW2    3   0.177   1.568   1.613
    2SOL     OW    4   1.126   1.624   1.679
    2SOL    HW1    5   1.190   1.661   1.747
    2SOL    HW2    6   1.177   1.568   1.613
   1.86206   1.86206   1.86206
";

    #[test]
    fn parses_molecule_types_and_composition() {
        let topology = GroTopology::read_from(&mut Cursor::new(WATER_TOP), None).unwrap();
        assert_eq!(topology.molecule_types.len(), 1);
        assert_eq!(topology.molecule_types[0].name, "SOL");
        assert_eq!(topology.molecule_types[0].bonds, vec![(0, 1), (0, 2)]);
        assert_eq!(topology.atom_count().unwrap(), 6);
    }

    #[test]
    fn applies_topology_to_coordinates() {
        let topology = GroTopology::read_from(&mut Cursor::new(WATER_TOP), None).unwrap();
        let (coords, _) = GroFile::read_from(&mut Cursor::new(TWO_WATERS_GRO)).unwrap();
        let mol = topology.apply_to(&coords).unwrap();

        assert_eq!(mol.atom_count(), 6);
        assert_eq!(mol.bonds().len(), 4);
        assert!(mol.are_bonded(3, 4));
        let map = PropertyMap::new();
        assert_eq!(mol.atoms()[0].element(&map), Element::OXYGEN);
        assert_eq!(mol.atoms()[4].charge(&map), Some(0.417));
        assert_eq!(mol.atoms()[0].properties.text("ambertype"), Some("OW"));
    }

    #[test]
    fn rejects_mismatched_coordinates_and_unknown_types() {
        let topology = GroTopology::read_from(&mut Cursor::new(WATER_TOP), None).unwrap();
        let mut single = Molecule::new("one");
        single.add_atom(Atom::new("OW", Element::OXYGEN, nalgebra::Point3::origin()));
        assert!(matches!(
            topology.apply_to(&single),
            Err(TopError::CountMismatch { expected: 6, found: 1 })
        ));

        let broken = WATER_TOP.replace("[ molecules ]\nSOL", "[ molecules ]\nHOH");
        let topology = GroTopology::read_from(&mut Cursor::new(broken), None).unwrap();
        assert!(matches!(
            topology.atom_count(),
            Err(TopError::UnknownMoleculeType(_))
        ));
    }

    #[test]
    fn follows_local_includes() {
        let dir = tempfile::tempdir().unwrap();
        let itp = WATER_TOP
            .split("[ system ]")
            .next()
            .unwrap()
            .replace("#include \"amber99sb.ff/forcefield.itp\"\n", "");
        std::fs::write(dir.path().join("water.itp"), itp).unwrap();
        std::fs::write(
            dir.path().join("topol.top"),
            "#include \"water.itp\"\n[ molecules ]\nSOL 1\n",
        )
        .unwrap();

        let topology = GroTopology::read_from_path(dir.path().join("topol.top")).unwrap();
        assert_eq!(topology.atom_count().unwrap(), 3);
    }

    #[test]
    fn reports_malformed_atom_lines() {
        let input = "[ moleculetype ]\nX 3\n[ atoms ]\n1 C 1 MOL\n";
        assert!(matches!(
            GroTopology::read_from(&mut Cursor::new(input), None),
            Err(TopError::Parse { line: 4, .. })
        ));
    }
}
