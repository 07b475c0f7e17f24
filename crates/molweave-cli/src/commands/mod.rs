pub mod align;
pub mod forcefields;
pub mod match_atoms;
pub mod merge;
pub mod parameterise;

use crate::error::Result;
use crate::utils::parser;
use molweave::core::io::cache::{FileCache, FileFormat};
use molweave::core::models::mapping::AtomMapping;
use molweave::core::models::molecule::Molecule;
use molweave::core::models::properties::PropertyMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub(crate) fn parse_optional_mapping(text: Option<&str>) -> Result<Option<AtomMapping>> {
    text.map(parser::parse_mapping)
        .transpose()
        .map_err(|e| crate::error::CliError::Argument(e.to_string()))
}

/// Writes `molecule` once per format and reports every written path.
pub(crate) fn write_outputs(
    cache: &mut FileCache,
    molecule: &Molecule,
    stem: &Path,
    formats: &[FileFormat],
) -> Result<Vec<PathBuf>> {
    let written = cache.save_molecule(molecule, stem, formats, &PropertyMap::new())?;
    for path in &written {
        info!("Wrote '{}' to {:?}", molecule.name, path);
        println!("  {}", path.display());
    }
    Ok(written)
}
