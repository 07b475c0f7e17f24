use crate::core::io::gro::{GroError, GroFile};
use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::sdf::{SdfError, SdfFile};
use crate::core::io::traits::MolecularFile;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Unsupported file format '{0}'. Supported formats are: pdb, gro87, sdf")]
    UnsupportedFormat(String),
    #[error("'{0}' is a topology format and is not written through the file cache")]
    TopologyFormat(String),
    #[error("PDB error: {0}")]
    Pdb(#[from] PdbError),
    #[error("GRO error: {0}")]
    Gro(#[from] GroError),
    #[error("SDF error: {0}")]
    Sdf(#[from] SdfError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Pdb,
    Gro87,
    Sdf,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdb => "pdb",
            Self::Gro87 => "gro",
            Self::Sdf => "sdf",
        }
    }

    fn write(&self, molecule: &Molecule, map: &PropertyMap, path: &Path) -> Result<(), CacheError> {
        match self {
            Self::Pdb => PdbFile::write_molecule_to_path(molecule, map, path)?,
            Self::Gro87 => GroFile::write_molecule_to_path(molecule, map, path)?,
            Self::Sdf => SdfFile::write_molecule_to_path(molecule, map, path)?,
        }
        Ok(())
    }
}

impl FromStr for FileFormat {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdb" => Ok(Self::Pdb),
            "gro" | "gro87" => Ok(Self::Gro87),
            "sdf" | "mol" => Ok(Self::Sdf),
            "prm7" | "parm7" | "rst7" | "top" | "grotop" => {
                Err(CacheError::TopologyFormat(s.to_string()))
            }
            _ => Err(CacheError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdb => "pdb",
            Self::Gro87 => "gro87",
            Self::Sdf => "sdf",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    path: PathBuf,
    checksum: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn file_checksum(path: &Path) -> io::Result<String> {
    Ok(sha256_hex(&fs::read(path)?))
}

/// A content fingerprint of a molecule: its PDB rendering under the given
/// property map.
fn molecule_checksum(molecule: &Molecule, map: &PropertyMap) -> Result<String, CacheError> {
    let mut buffer = Vec::new();
    PdbFile::write_molecule_to(molecule, map, &mut buffer)?;
    buffer.extend_from_slice(molecule.name.as_bytes());
    Ok(sha256_hex(&buffer))
}

/// Remembers which files were last written for a given molecule and format.
///
/// A cached file is reused by copying it to the new location when it still
/// exists and its checksum is unchanged; otherwise the molecule is written
/// again and the entry replaced. The cache lives in memory only and never
/// evicts entries.
///
/// Only coordinate formats go through the cache. AMBER and GROMACS topologies
/// are read, never written, so there is nothing to cache for them.
#[derive(Debug, Default)]
pub struct FileCache {
    entries: HashMap<(String, FileFormat), CacheEntry>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Writes `molecule` as `<stem>.<ext>` for every requested format and
    /// returns the written paths in the same order.
    pub fn save_molecule(
        &mut self,
        molecule: &Molecule,
        stem: &Path,
        formats: &[FileFormat],
        map: &PropertyMap,
    ) -> Result<Vec<PathBuf>, CacheError> {
        let key = molecule_checksum(molecule, map)?;
        let mut written = Vec::with_capacity(formats.len());

        for &format in formats {
            let target = stem.with_extension(format.extension());
            let cache_key = (key.clone(), format);

            if let Some(entry) = self.entries.get(&cache_key) {
                let unchanged = entry.path.is_file()
                    && file_checksum(&entry.path).is_ok_and(|c| c == entry.checksum);
                if unchanged {
                    if entry.path != target {
                        fs::copy(&entry.path, &target)?;
                    }
                    debug!(path = %target.display(), source = %entry.path.display(), "Reused cached file");
                    written.push(target);
                    continue;
                }
            }

            format.write(molecule, map, &target)?;
            let checksum = file_checksum(&target)?;
            self.entries.insert(
                cache_key,
                CacheEntry {
                    path: target.clone(),
                    checksum,
                },
            );
            written.push(target);
        }
        Ok(written)
    }
}
