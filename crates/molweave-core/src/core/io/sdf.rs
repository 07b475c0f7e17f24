use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::properties::PropertyMap;
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SdfMetadata {
    pub program_line: String,
    pub comment: String,
}

#[derive(Debug, Error)]
pub enum SdfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Molecule error: {0}")]
    Molecule(#[from] MoleculeError),
}

fn bond_order_code(order: BondOrder) -> u8 {
    match order {
        BondOrder::Single => 1,
        BondOrder::Double => 2,
        BondOrder::Triple => 3,
        BondOrder::Aromatic => 4,
    }
}

fn bond_order_from_code(code: u8) -> BondOrder {
    match code {
        2 => BondOrder::Double,
        3 => BondOrder::Triple,
        4 => BondOrder::Aromatic,
        _ => BondOrder::Single,
    }
}

/// A single-record MDL SD file (V2000 connection table).
pub struct SdfFile;

impl SdfFile {
    fn next_line(
        lines: &mut impl Iterator<Item = io::Result<String>>,
        line_num: &mut usize,
    ) -> Result<String, SdfError> {
        *line_num += 1;
        lines.next().transpose()?.ok_or_else(|| SdfError::Parse {
            line: *line_num,
            message: "unexpected end of file".into(),
        })
    }
}

impl MolecularFile for SdfFile {
    type Metadata = SdfMetadata;
    type Error = SdfError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Molecule, Self::Metadata), Self::Error> {
        let mut lines = reader.lines();
        let mut line_num = 0;
        let name = Self::next_line(&mut lines, &mut line_num)?;
        let metadata = SdfMetadata {
            program_line: Self::next_line(&mut lines, &mut line_num)?,
            comment: Self::next_line(&mut lines, &mut line_num)?,
        };

        let counts = Self::next_line(&mut lines, &mut line_num)?;
        let parse_count = |start: usize| -> Result<usize, SdfError> {
            counts
                .get(start..start + 3)
                .unwrap_or("")
                .trim()
                .parse()
                .map_err(|_| SdfError::Parse {
                    line: 4,
                    message: format!("invalid counts line '{}'", counts),
                })
        };
        let (atom_count, bond_count) = (parse_count(0)?, parse_count(3)?);

        let mut molecule = Molecule::new(name.trim());
        for _ in 0..atom_count {
            let line = Self::next_line(&mut lines, &mut line_num)?;
            let parts: Vec<&str> = line.split_whitespace().collect();
            let coords: Vec<f64> = parts.iter().take(3).filter_map(|v| v.parse().ok()).collect();
            if coords.len() != 3 || parts.len() < 4 {
                return Err(SdfError::Parse {
                    line: line_num,
                    message: "malformed atom line".into(),
                });
            }
            let element = parts[3].parse::<Element>().unwrap_or(Element::DUMMY);
            let atom_name = format!("{}{}", element.symbol(), molecule.atom_count() + 1);
            molecule.add_atom(Atom::new(
                &atom_name,
                element,
                Point3::new(coords[0], coords[1], coords[2]),
            ));
        }

        for _ in 0..bond_count {
            let line = Self::next_line(&mut lines, &mut line_num)?;
            let field = |start: usize| line.get(start..start + 3).unwrap_or("").trim().parse::<usize>();
            let (Ok(a), Ok(b), Ok(order)) = (field(0), field(3), field(6)) else {
                return Err(SdfError::Parse {
                    line: line_num,
                    message: "malformed bond line".into(),
                });
            };
            if a == 0 || b == 0 {
                return Err(SdfError::Parse {
                    line: line_num,
                    message: "bond atom numbers start at 1".into(),
                });
            }
            molecule.add_bond(a - 1, b - 1, bond_order_from_code(order as u8))?;
        }

        Ok((molecule, metadata))
    }

    fn write_to(
        molecule: &Molecule,
        metadata: &Self::Metadata,
        map: &PropertyMap,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", molecule.name)?;
        let program = if metadata.program_line.is_empty() {
            "  molweave"
        } else {
            metadata.program_line.as_str()
        };
        writeln!(writer, "{}", program)?;
        writeln!(writer, "{}", metadata.comment)?;
        writeln!(
            writer,
            "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
            molecule.atom_count(),
            molecule.bonds().len()
        )?;
        for (index, atom) in molecule.atoms().iter().enumerate() {
            let p = molecule.position(index, map)?;
            writeln!(
                writer,
                "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0",
                p.x,
                p.y,
                p.z,
                atom.element(map).symbol()
            )?;
        }
        for bond in molecule.bonds() {
            writeln!(
                writer,
                "{:>3}{:>3}{:>3}  0",
                bond.atom1 + 1,
                bond.atom2 + 1,
                bond_order_code(bond.order)
            )?;
        }
        writeln!(writer, "M  END")?;
        writeln!(writer, "$$$$")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::tests::benzene_ring;
    use std::io::Cursor;

    #[test]
    fn write_produces_v2000_connection_table() {
        let mol = benzene_ring();
        let mut buffer = Vec::new();
        SdfFile::write_molecule_to(&mol, &PropertyMap::new(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "benzene");
        assert_eq!(lines[3], "  6  6  0  0  0  0  0  0  0  0999 V2000");
        assert!(lines[4].starts_with("    1.3900    0.0000    0.0000 C  "));
        assert_eq!(lines[10], "  1  2  4  0");
        assert_eq!(lines.last(), Some(&"$$$$"));
    }

    #[test]
    fn written_file_reads_back() {
        let mol = benzene_ring();
        let mut buffer = Vec::new();
        SdfFile::write_molecule_to(&mol, &PropertyMap::new(), &mut buffer).unwrap();

        let (again, _) = SdfFile::read_from(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(again.name, "benzene");
        assert_eq!(again.atom_count(), 6);
        assert_eq!(again.bonds(), mol.bonds());
        assert_eq!(again.atoms()[0].element(&PropertyMap::new()), Element::CARBON);
    }

    #[test]
    fn read_rejects_truncated_atom_block() {
        let input = "name\n\n\n  2  0  0  0  0  0  0  0  0  0999 V2000\n    0.0 0.0 0.0 C\n";
        assert!(matches!(
            SdfFile::read_from(&mut Cursor::new(input)),
            Err(SdfError::Parse { line: 6, .. })
        ));
    }
}
