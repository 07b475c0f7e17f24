use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::properties::PropertyMap;
use nalgebra::{Point3, Vector3};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// GROMACS uses nanometres; the molecule model uses Angstroms.
const NM_TO_ANGSTROM: f64 = 10.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroMetadata {
    pub title: String,
    /// Box vectors in Angstroms (only the rectangular part is kept).
    pub box_vectors: Option<Vector3<f64>>,
}

#[derive(Debug, Error)]
pub enum GroError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("File ended after {found} of {expected} atoms")]
    Truncated { expected: usize, found: usize },
    #[error("Molecule error: {0}")]
    Molecule(#[from] MoleculeError),
}

fn field(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_field<T: std::str::FromStr>(
    line: &str,
    line_num: usize,
    start: usize,
    end: usize,
) -> Result<T, GroError> {
    let value = field(line, start, end);
    value.parse().map_err(|_| GroError::Parse {
        line: line_num,
        message: format!("invalid value '{}' in columns {}-{}", value, start + 1, end),
    })
}

/// The fixed-column `gro87` coordinate format.
pub struct GroFile;

impl MolecularFile for GroFile {
    type Metadata = GroMetadata;
    type Error = GroError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Molecule, Self::Metadata), Self::Error> {
        let mut lines = reader.lines();
        let mut metadata = GroMetadata {
            title: lines.next().transpose()?.unwrap_or_default().trim().to_string(),
            box_vectors: None,
        };

        let count_line = lines.next().transpose()?.unwrap_or_default();
        let expected: usize = count_line.trim().parse().map_err(|_| GroError::Parse {
            line: 2,
            message: format!("invalid atom count '{}'", count_line.trim()),
        })?;

        let mut molecule = Molecule::new(&metadata.title);
        for n in 0..expected {
            let line_num = n + 3;
            let Some(line) = lines.next().transpose()? else {
                return Err(GroError::Truncated {
                    expected,
                    found: n,
                });
            };
            let residue_number: isize = parse_field(&line, line_num, 0, 5)?;
            let residue_name = field(&line, 5, 10);
            let name = field(&line, 10, 15);
            let x: f64 = parse_field(&line, line_num, 20, 28)?;
            let y: f64 = parse_field(&line, line_num, 28, 36)?;
            let z: f64 = parse_field(&line, line_num, 36, 44)?;

            let element = Element::guess_from_atom_name(name).unwrap_or(Element::DUMMY);
            let position = Point3::new(x, y, z) * NM_TO_ANGSTROM;
            molecule.add_atom(
                Atom::new(name, element, position).with_residue(residue_name, residue_number),
            );
        }

        if let Some(line) = lines.next().transpose()? {
            let values: Vec<f64> = line
                .split_whitespace()
                .take(3)
                .filter_map(|v| v.parse().ok())
                .collect();
            if values.len() == 3 {
                metadata.box_vectors =
                    Some(Vector3::new(values[0], values[1], values[2]) * NM_TO_ANGSTROM);
            }
        }

        if molecule.name.is_empty() && !molecule.is_empty() {
            molecule.name = molecule.atoms()[0].residue_name.clone();
        }
        Ok((molecule, metadata))
    }

    fn write_to(
        molecule: &Molecule,
        metadata: &Self::Metadata,
        map: &PropertyMap,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let title = if metadata.title.is_empty() {
            molecule.name.as_str()
        } else {
            metadata.title.as_str()
        };
        writeln!(writer, "{}", title)?;
        writeln!(writer, "{:>5}", molecule.atom_count())?;

        for (index, atom) in molecule.atoms().iter().enumerate() {
            let p = molecule.position(index, map)? / NM_TO_ANGSTROM;
            writeln!(
                writer,
                "{:>5}{:<5}{:>5}{:>5}{:>8.3}{:>8.3}{:>8.3}",
                atom.residue_number.rem_euclid(100_000),
                atom.residue_name,
                atom.name,
                (index + 1) % 100_000,
                p.x,
                p.y,
                p.z
            )?;
        }

        let box_vectors = metadata.box_vectors.unwrap_or_else(Vector3::zeros) / NM_TO_ANGSTROM;
        writeln!(
            writer,
            "{:>10.5}{:>10.5}{:>10.5}",
            box_vectors.x, box_vectors.y, box_vectors.z
        )?;
        Ok(())
    }
}
