use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::properties::{PropertyMap, PropertyValue, names};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const STANDARD_RESIDUES: [&str; 28] = [
    "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE", "LEU", "LYS", "MET",
    "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL", "HID", "HIE", "HIP", "CYX", "ASH", "GLH",
    "ACE", "NME",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    /// HEADER, TITLE, COMPND and REMARK records, written back verbatim.
    pub header_lines: Vec<String>,
    /// Whether connectivity came from CONECT records rather than perception.
    pub has_conect: bool,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Molecule error: {0}")]
    Molecule(#[from] MoleculeError),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
    #[error("CONECT record references unknown atom serial {0}")]
    UnknownSerial(usize),
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_int<T: std::str::FromStr>(
    line: &str,
    line_num: usize,
    start: usize,
    end: usize,
) -> Result<T, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

/// Parses a PDB formal charge field such as `"1-"` or `"2+"`.
fn parse_formal_charge(field: &str) -> Option<i64> {
    let mut chars = field.chars();
    let magnitude = chars.next()?.to_digit(10)? as i64;
    match chars.next()? {
        '+' => Some(magnitude),
        '-' => Some(-magnitude),
        _ => None,
    }
}

/// Pads an atom name into the four-character PDB name field. Names of
/// one-letter elements that are shorter than four characters start in
/// column 14.
fn format_atom_name(name: &str, element: Element) -> String {
    if name.len() < 4 && element.symbol().len() == 1 {
        format!(" {:<3}", name)
    } else {
        format!("{:<4}", name)
    }
}

pub struct PdbFile;

impl MolecularFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Molecule, Self::Metadata), Self::Error> {
        let mut molecule = Molecule::new("");
        let mut metadata = PdbMetadata::default();
        let mut serial_to_index: HashMap<usize, usize> = HashMap::new();
        let mut conect: Vec<(usize, usize, usize)> = Vec::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record_type = slice_and_trim(&line, 0, 6);

            match record_type {
                "ATOM" | "HETATM" => {
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }
                    let serial: usize = parse_int(&line, line_num, 6, 11)?;
                    let name = slice_and_trim(&line, 12, 16);
                    let residue_name = slice_and_trim(&line, 17, 20);
                    let chain_id = line.get(21..22).and_then(|c| c.chars().next()).unwrap_or(' ');
                    let residue_number: isize = parse_int(&line, line_num, 22, 26)?;
                    let x = parse_float(&line, line_num, 30, 38)?;
                    let y = parse_float(&line, line_num, 38, 46)?;
                    let z = parse_float(&line, line_num, 46, 54)?;

                    let element = slice_and_trim(&line, 76, 78)
                        .parse::<Element>()
                        .ok()
                        .or_else(|| Element::guess_from_atom_name(name))
                        .unwrap_or(Element::DUMMY);

                    let mut atom = Atom::new(name, element, Point3::new(x, y, z))
                        .with_residue(residue_name, residue_number);
                    atom.chain_id = if chain_id == ' ' { 'A' } else { chain_id };
                    if let Some(charge) = parse_formal_charge(slice_and_trim(&line, 78, 80)) {
                        atom.properties
                            .set(names::FORMAL_CHARGE, PropertyValue::Integer(charge));
                    }
                    let index = molecule.add_atom(atom);
                    serial_to_index.insert(serial, index);
                }
                "CONECT" => {
                    let origin: usize = parse_int(&line, line_num, 6, 11)?;
                    for start in [11, 16, 21, 26] {
                        let field = slice_and_trim(&line, start, start + 5);
                        if field.is_empty() {
                            continue;
                        }
                        let partner: usize = parse_int(&line, line_num, start, start + 5)?;
                        conect.push((line_num, origin, partner));
                    }
                }
                "HEADER" | "TITLE" | "COMPND" | "REMARK" => {
                    if molecule.name.is_empty() && record_type == "COMPND" {
                        molecule.name = slice_and_trim(&line, 10, 80).to_string();
                    }
                    metadata.header_lines.push(line.clone());
                }
                "END" | "ENDMDL" => break,
                _ => {}
            }
        }

        if molecule.is_empty() {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }

        for (line_num, a, b) in conect {
            let lookup = |serial: usize| {
                serial_to_index.get(&serial).copied().ok_or(PdbError::Parse {
                    line: line_num,
                    kind: PdbParseErrorKind::UnknownSerial(serial),
                })
            };
            let (i, j) = (lookup(a)?, lookup(b)?);
            if i != j {
                molecule.add_bond(i, j, BondOrder::Single)?;
            }
        }
        metadata.has_conect = !molecule.bonds().is_empty();
        if !metadata.has_conect {
            molecule.perceive_bonds(&PropertyMap::new())?;
        }

        if molecule.name.is_empty() {
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
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }

        for (index, atom) in molecule.atoms().iter().enumerate() {
            let position = molecule.position(index, map)?;
            let element = atom.element(map);
            let record_type = if STANDARD_RESIDUES.contains(&atom.residue_name.as_str()) {
                "ATOM"
            } else {
                "HETATM"
            };
            let charge = match atom.properties.get(map.get(names::FORMAL_CHARGE)) {
                Some(PropertyValue::Integer(q)) if *q > 0 => format!("{}+", q),
                Some(PropertyValue::Integer(q)) if *q < 0 => format!("{}-", -q),
                _ => String::new(),
            };
            writeln!(
                writer,
                "{:<6}{:>5} {} {:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}{:<2}",
                record_type,
                index + 1,
                format_atom_name(&atom.name, element),
                atom.residue_name,
                atom.chain_id,
                atom.residue_number,
                position.x,
                position.y,
                position.z,
                1.0,
                0.0,
                element.symbol().to_ascii_uppercase(),
                charge,
            )?;
        }

        for index in 0..molecule.atom_count() {
            let mut partners: Vec<usize> = molecule.neighbors(index).to_vec();
            if partners.is_empty() {
                continue;
            }
            partners.sort_unstable();
            for chunk in partners.chunks(4) {
                write!(writer, "CONECT{:>5}", index + 1)?;
                for partner in chunk {
                    write!(writer, "{:>5}", partner + 1)?;
                }
                writeln!(writer)?;
            }
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}
