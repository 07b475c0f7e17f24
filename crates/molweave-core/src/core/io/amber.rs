//! Readers for AMBER parameter/topology (`prm7`) and restart (`rst7`) files.
//!
//! Only the sections needed to rebuild a molecule are interpreted: atom
//! names, charges, masses, types, residues and bonds.

use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::properties::{PropertyMap, PropertyValue, names};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// AMBER stores charges multiplied by this factor (sqrt of 332.0522173).
const AMBER_CHARGE_SCALE: f64 = 18.2223;

#[derive(Debug, Error)]
pub enum AmberError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing required section '%FLAG {0}'")]
    MissingSection(String),
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },
    #[error("{context} holds {found} entries, expected {expected}")]
    CountMismatch {
        context: String,
        expected: usize,
        found: usize,
    },
    #[error("Molecule error: {0}")]
    Molecule(#[from] MoleculeError),
}

#[derive(Debug, Default)]
struct Section {
    width: usize,
    lines: Vec<String>,
}

impl Section {
    fn fields(&self) -> Vec<&str> {
        let width = self.width.max(1);
        self.lines
            .iter()
            .flat_map(|line| {
                (0..line.len())
                    .step_by(width)
                    .map(move |start| line.get(start..(start + width).min(line.len())).unwrap_or(""))
            })
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect()
    }
}

/// Extracts the field width from a Fortran format such as `(10I8)` or
/// `(5E16.8)`.
fn format_width(format: &str) -> Option<usize> {
    let descriptor = format.trim().trim_start_matches('(').trim_end_matches(')');
    let letter = descriptor.find(|c: char| c.is_ascii_alphabetic())?;
    let rest = &descriptor[letter + 1..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// The parsed sections of a `prm7` file.
#[derive(Debug, Default)]
pub struct Prm7Topology {
    sections: HashMap<String, Section>,
}

impl Prm7Topology {
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, AmberError> {
        let mut topology = Self::default();
        let mut current: Option<String> = None;
        for line in reader.lines() {
            let line = line?;
            if let Some(flag) = line.strip_prefix("%FLAG") {
                let name = flag.trim().to_string();
                topology.sections.insert(name.clone(), Section::default());
                current = Some(name);
            } else if let Some(format) = line.strip_prefix("%FORMAT") {
                if let Some(section) = current.as_ref().and_then(|c| topology.sections.get_mut(c)) {
                    section.width = format_width(format).ok_or_else(|| AmberError::Parse {
                        context: "%FORMAT".into(),
                        message: format!("unsupported format '{}'", format.trim()),
                    })?;
                }
            } else if line.starts_with('%') {
                continue;
            } else if let Some(section) = current.as_ref().and_then(|c| topology.sections.get_mut(c)) {
                section.lines.push(line);
            }
        }
        Ok(topology)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, AmberError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }

    fn section(&self, flag: &str) -> Result<&Section, AmberError> {
        self.sections
            .get(flag)
            .ok_or_else(|| AmberError::MissingSection(flag.to_string()))
    }

    fn strings(&self, flag: &str) -> Result<Vec<String>, AmberError> {
        Ok(self
            .section(flag)?
            .fields()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    fn numbers<T: std::str::FromStr>(&self, flag: &str) -> Result<Vec<T>, AmberError> {
        self.section(flag)?
            .fields()
            .into_iter()
            .map(|f| {
                f.parse().map_err(|_| AmberError::Parse {
                    context: format!("%FLAG {}", flag),
                    message: format!("invalid number '{}'", f),
                })
            })
            .collect()
    }

    fn expect_len<T>(flag: &str, values: Vec<T>, expected: usize) -> Result<Vec<T>, AmberError> {
        if values.len() < expected {
            return Err(AmberError::CountMismatch {
                context: format!("%FLAG {}", flag),
                expected,
                found: values.len(),
            });
        }
        Ok(values)
    }

    pub fn atom_count(&self) -> Result<usize, AmberError> {
        self.numbers::<usize>("POINTERS")?
            .first()
            .copied()
            .ok_or_else(|| AmberError::MissingSection("POINTERS".into()))
    }

    /// Builds a molecule from the topology and the given coordinates.
    pub fn to_molecule(&self, coordinates: &[Point3<f64>]) -> Result<Molecule, AmberError> {
        let n = self.atom_count()?;
        if coordinates.len() != n {
            return Err(AmberError::CountMismatch {
                context: "coordinates".into(),
                expected: n,
                found: coordinates.len(),
            });
        }

        let atom_names = Self::expect_len("ATOM_NAME", self.strings("ATOM_NAME")?, n)?;
        let charges = Self::expect_len("CHARGE", self.numbers::<f64>("CHARGE")?, n)?;
        let masses = Self::expect_len("MASS", self.numbers::<f64>("MASS")?, n)?;
        let types = Self::expect_len("AMBER_ATOM_TYPE", self.strings("AMBER_ATOM_TYPE")?, n)?;
        let atomic_numbers: Option<Vec<i64>> = self.numbers("ATOMIC_NUMBER").ok();
        let residue_labels = self.strings("RESIDUE_LABEL")?;
        let residue_pointers: Vec<usize> = self.numbers("RESIDUE_POINTER")?;

        let title = self
            .section("TITLE")
            .map(|s| s.lines.join(" ").trim().to_string())
            .unwrap_or_default();
        let mut molecule = Molecule::new(&title);

        let mut residue = 0usize;
        for i in 0..n {
            while residue + 1 < residue_pointers.len() && i + 1 >= residue_pointers[residue + 1] {
                residue += 1;
            }
            let element = atomic_numbers
                .as_ref()
                .and_then(|z| z.get(i))
                .and_then(|&z| u8::try_from(z).ok())
                .and_then(Element::from_atomic_number)
                .or_else(|| Element::from_mass(masses[i]))
                .unwrap_or(Element::DUMMY);
            let residue_name = residue_labels.get(residue).map_or("MOL", String::as_str);

            let mut atom = Atom::new(&atom_names[i], element, coordinates[i])
                .with_residue(residue_name, residue as isize + 1);
            atom.properties.set(
                names::CHARGE,
                PropertyValue::Real(charges[i] / AMBER_CHARGE_SCALE),
            );
            atom.properties.set(names::MASS, PropertyValue::Real(masses[i]));
            atom.properties
                .set(names::AMBER_TYPE, PropertyValue::Text(types[i].clone()));
            molecule.add_atom(atom);
        }

        for flag in ["BONDS_INC_HYDROGEN", "BONDS_WITHOUT_HYDROGEN"] {
            let Ok(values) = self.numbers::<i64>(flag) else {
                continue;
            };
            for triple in values.chunks_exact(3) {
                // Bond entries are coordinate-array offsets, i.e. 3 * index.
                let (a, b) = ((triple[0] / 3) as usize, (triple[1] / 3) as usize);
                molecule.add_bond(a, b, BondOrder::Single)?;
            }
        }

        if molecule.name.is_empty() && !molecule.is_empty() {
            molecule.name = molecule.atoms()[0].residue_name.clone();
        }
        Ok(molecule)
    }
}

/// Reads the coordinates from an ASCII `rst7`/`inpcrd` file.
pub fn read_rst7(reader: &mut impl BufRead) -> Result<Vec<Point3<f64>>, AmberError> {
    let mut lines = reader.lines();
    let _title = lines.next().transpose()?;
    let count_line = lines.next().transpose()?.unwrap_or_default();
    let n: usize = count_line
        .split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| AmberError::Parse {
            context: "rst7".into(),
            message: format!("invalid atom count line '{}'", count_line.trim()),
        })?;

    let mut values = Vec::with_capacity(3 * n);
    for line in lines {
        let line = line?;
        for start in (0..line.len()).step_by(12) {
            let field = line.get(start..(start + 12).min(line.len())).unwrap_or("").trim();
            if field.is_empty() {
                continue;
            }
            values.push(field.parse::<f64>().map_err(|_| AmberError::Parse {
                context: "rst7".into(),
                message: format!("invalid coordinate '{}'", field),
            })?);
        }
        if values.len() >= 3 * n {
            break;
        }
    }
    if values.len() < 3 * n {
        return Err(AmberError::CountMismatch {
            context: "rst7 coordinates".into(),
            expected: 3 * n,
            found: values.len(),
        });
    }
    Ok(values
        .chunks_exact(3)
        .take(n)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

/// Reads a molecule from a pair of AMBER files.
pub fn read_amber<P: AsRef<Path>, Q: AsRef<Path>>(prm7: P, rst7: Q) -> Result<Molecule, AmberError> {
    let topology = Prm7Topology::read_from_path(prm7)?;
    let coordinates = read_rst7(&mut BufReader::new(File::open(rst7)?))?;
    topology.to_molecule(&coordinates)
}

/// Sum of the partial charges of all atoms that carry one.
pub fn total_charge(molecule: &Molecule, map: &PropertyMap) -> f64 {
    molecule
        .atoms()
        .iter()
        .filter_map(|a| a.charge(map))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const WATER_PRM7: &str = "\
%VERSION  VERSION_STAMP = V0001.000
%FLAG TITLE
%FORMAT(20a4)
WAT
%FLAG POINTERS
%FORMAT(10I8)
       3       2       2       0       0       0       0       0       0       0
%FLAG ATOM_NAME
%FORMAT(20a4)
O   H1  H2
%FLAG CHARGE
%FORMAT(5E16.8)
 -1.51973982E+01  7.59869910E+00  7.59869910E+00
%FLAG ATOMIC_NUMBER
%FORMAT(10I8)
       8       1       1
%FLAG MASS
%FORMAT(5E16.8)
  1.60000000E+01  1.00800000E+00  1.00800000E+00
%FLAG RESIDUE_LABEL
%FORMAT(20a4)
WAT
%FLAG RESIDUE_POINTER
%FORMAT(10I8)
       1
%FLAG AMBER_ATOM_TYPE
%FORMAT(20a4)
OW  HW  HW
%FLAG BONDS_INC_HYDROGEN
%FORMAT(10I8)
       0       3       1       0       6       1
%FLAG BONDS_WITHOUT_HYDROGEN
%FORMAT(10I8)

";

    const WATER_RST7: &str = "\
WAT
     3
   0.0000000   0.0000000   0.0000000   0.9572000   0.0000000   0.0000000
  -0.2399872   0.9266272   0.0000000
";

    #[test]
    fn format_width_reads_fortran_formats() {
        assert_eq!(format_width("(20a4)"), Some(4));
        assert_eq!(format_width("(5E16.8)"), Some(16));
        assert_eq!(format_width("(10I8)"), Some(8));
        assert_eq!(format_width("()"), None);
    }

    #[test]
    fn reads_water_topology_and_coordinates() {
        let topology = Prm7Topology::read_from(&mut Cursor::new(WATER_PRM7)).unwrap();
        let coordinates = read_rst7(&mut Cursor::new(WATER_RST7)).unwrap();
        let mol = topology.to_molecule(&coordinates).unwrap();

        assert_eq!(mol.name, "WAT");
        assert_eq!(mol.atom_count(), 3);
        assert_eq!(mol.bonds().len(), 2);
        assert!(mol.are_bonded(0, 1) && mol.are_bonded(0, 2));

        let map = PropertyMap::new();
        let oxygen = &mol.atoms()[0];
        assert_eq!(oxygen.element(&map), Element::OXYGEN);
        assert!((oxygen.charge(&map).unwrap() + 0.834).abs() < 1e-3);
        assert_eq!(oxygen.properties.text("ambertype"), Some("OW"));
        assert_eq!(mol.atoms()[2].residue_name, "WAT");
        assert!(total_charge(&mol, &map).abs() < 1e-6);
        assert!((mol.position(1, &map).unwrap().x - 0.9572).abs() < 1e-9);
    }

    #[test]
    fn rejects_coordinate_count_mismatch() {
        let topology = Prm7Topology::read_from(&mut Cursor::new(WATER_PRM7)).unwrap();
        assert!(matches!(
            topology.to_molecule(&[Point3::origin()]),
            Err(AmberError::CountMismatch { expected: 3, found: 1, .. })
        ));
    }

    #[test]
    fn rejects_truncated_restart_file() {
        let truncated = "WAT\n     3\n   0.0000000   0.0000000\n";
        assert!(matches!(
            read_rst7(&mut Cursor::new(truncated)),
            Err(AmberError::CountMismatch { found: 2, .. })
        ));
    }

    #[test]
    fn missing_sections_are_reported() {
        let topology = Prm7Topology::read_from(&mut Cursor::new("%FLAG TITLE\n")).unwrap();
        assert!(matches!(
            topology.to_molecule(&[]),
            Err(AmberError::MissingSection(flag)) if flag == "POINTERS"
        ));
    }
}
