use super::{OUTPUT_PRM7, OUTPUT_RST7, require_outputs, run_logged};
use crate::core::io::amber::read_amber;
use crate::core::io::sdf::SdfFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use crate::parameters::error::ParameterError;
use crate::parameters::protocol::Protocol;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const INPUT_SDF: &str = "input.sdf";
const SCRIPT: &str = "openff.py";
const SCRIPT_SOURCE: &str = "\
import sys

from openff.interchange import Interchange
from openff.toolkit import ForceField, Molecule

offxml, sdf, prm7, rst7 = sys.argv[1:5]
molecule = Molecule.from_file(sdf, allow_undefined_stereo=True)
forcefield = ForceField(offxml)
interchange = Interchange.from_smirnoff(forcefield, [molecule])
interchange.to_prmtop(prm7)
interchange.to_inpcrd(rst7)
";

/// Parameterises a small molecule with an Open Force Field Initiative force
/// field through `openff-toolkit` and `openff-interchange`.
#[derive(Debug, Clone)]
pub struct OpenForceField {
    name: String,
    offxml: PathBuf,
    python: PathBuf,
}

impl OpenForceField {
    pub fn new(name: &str, offxml: PathBuf, python: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            offxml,
            python,
        }
    }

    /// Command-line arguments for the interpreter. The script reads its file
    /// names from `sys.argv`, so paths never need quoting as Python literals.
    fn arguments(&self) -> Vec<OsString> {
        vec![
            OsString::from(SCRIPT),
            self.offxml.clone().into_os_string(),
            OsString::from(INPUT_SDF),
            OsString::from(OUTPUT_PRM7),
            OsString::from(OUTPUT_RST7),
        ]
    }
}

impl Protocol for OpenForceField {
    fn forcefield(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        molecule: &Molecule,
        work_dir: &Path,
        map: &PropertyMap,
    ) -> Result<Molecule, ParameterError> {
        info!(forcefield = %self.name, "Parameterising with the Open Force Field toolkit");
        SdfFile::write_molecule_to_path(molecule, map, work_dir.join(INPUT_SDF))?;
        fs::write(work_dir.join(SCRIPT), SCRIPT_SOURCE)?;

        let log = run_logged(&self.python, self.arguments(), work_dir, "openff.log", &[])?;
        require_outputs(work_dir, &[OUTPUT_PRM7, OUTPUT_RST7], &self.python, &log)?;

        let mut parameterised =
            read_amber(work_dir.join(OUTPUT_PRM7), work_dir.join(OUTPUT_RST7))?;
        parameterised.name = molecule.name.clone();
        Ok(parameterised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_reads_every_file_name_from_argv() {
        assert!(SCRIPT_SOURCE.contains("sys.argv[1:5]"));
        assert!(SCRIPT_SOURCE.contains("ForceField(offxml)"));
        assert!(!SCRIPT_SOURCE.contains('"'));
    }

    #[test]
    fn offxml_path_is_passed_verbatim() {
        let offxml = PathBuf::from("/data/odd\u{7}name\n/openff-2.0.0.offxml");
        let protocol = OpenForceField::new("openff-2.0.0", offxml.clone(), PathBuf::from("python3"));
        assert_eq!(
            protocol.arguments(),
            [
                OsString::from("openff.py"),
                offxml.into_os_string(),
                OsString::from("input.sdf"),
                OsString::from("output.prm7"),
                OsString::from("output.rst7"),
            ]
        );
    }
}
