use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing molecular file formats.
///
/// Readers store everything they parse under the canonical property names.
/// Writers read coordinates, elements and charges through the supplied
/// [`PropertyMap`], so a molecule using aliased names can be written as is.
pub trait MolecularFile {
    /// Format-specific data that does not fit the molecule model, such as
    /// header records or a periodic box.
    type Metadata: Default;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a molecule from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<(Molecule, Self::Metadata), Self::Error>;

    /// Writes a molecule and metadata to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if a required property is missing or writing fails.
    fn write_to(
        molecule: &Molecule,
        metadata: &Self::Metadata,
        map: &PropertyMap,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Writes a molecule with default metadata.
    fn write_molecule_to(
        molecule: &Molecule,
        map: &PropertyMap,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        Self::write_to(molecule, &Self::Metadata::default(), map, writer)
    }

    /// Reads a molecule from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<(Molecule, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a molecule and metadata to a file path.
    fn write_to_path<P: AsRef<Path>>(
        molecule: &Molecule,
        metadata: &Self::Metadata,
        map: &PropertyMap,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(molecule, metadata, map, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes a molecule to a file path with default metadata.
    fn write_molecule_to_path<P: AsRef<Path>>(
        molecule: &Molecule,
        map: &PropertyMap,
        path: P,
    ) -> Result<(), Self::Error> {
        Self::write_to_path(molecule, &Self::Metadata::default(), map, path)
    }
}
