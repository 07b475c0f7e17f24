use crate::error::{CliError, Result};
use molweave::core::io::amber::read_amber;
use molweave::core::io::gro::GroFile;
use molweave::core::io::grotop::GroTopology;
use molweave::core::io::pdb::PdbFile;
use molweave::core::io::sdf::SdfFile;
use molweave::core::io::traits::MolecularFile;
use molweave::core::models::molecule::Molecule;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn parsing_error(path: &Path, e: impl std::error::Error + Send + Sync + 'static) -> CliError {
    CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    }
}

/// The file sharing `path`'s stem with another extension, required to exist.
fn sibling(path: &Path, extension: &str) -> Result<PathBuf> {
    let companion = path.with_extension(extension);
    if companion.is_file() {
        Ok(companion)
    } else {
        Err(CliError::Argument(format!(
            "'{}' needs a matching '{}' file next to it",
            path.display(),
            companion.display()
        )))
    }
}

/// Reads a molecule, choosing the reader from the file extension.
///
/// Topology formats carry no coordinates, so `.prm7`/`.parm7` files are read
/// with the `.rst7` file of the same stem and `.top` files with the `.gro`
/// file of the same stem.
pub fn read_molecule(path: &Path) -> Result<Molecule> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    debug!(path = %path.display(), extension = %extension, "Reading molecule");

    let mut molecule = match extension.as_str() {
        "pdb" => PdbFile::read_from_path(path).map_err(|e| parsing_error(path, e))?.0,
        "gro" => GroFile::read_from_path(path).map_err(|e| parsing_error(path, e))?.0,
        "sdf" | "mol" => SdfFile::read_from_path(path).map_err(|e| parsing_error(path, e))?.0,
        "prm7" | "parm7" | "prmtop" => {
            let rst7 = sibling(path, "rst7")?;
            read_amber(path, &rst7).map_err(|e| parsing_error(path, e))?
        }
        "top" => {
            let gro = sibling(path, "gro")?;
            let (coordinates, _) =
                GroFile::read_from_path(&gro).map_err(|e| parsing_error(&gro, e))?;
            GroTopology::read_from_path(path)
                .and_then(|top| top.apply_to(&coordinates))
                .map_err(|e| parsing_error(path, e))?
        }
        other => {
            return Err(CliError::Argument(format!(
                "Unsupported input format '{}' for '{}'. Expected pdb, gro, sdf, mol, prm7 or top.",
                other,
                path.display()
            )));
        }
    };

    if molecule.name.is_empty() {
        molecule.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("molecule")
            .to_string();
    }
    info!(
        "Read molecule '{}' with {} atom(s) from {:?}",
        molecule.name,
        molecule.atom_count(),
        path
    );
    Ok(molecule)
}
