use super::{INPUT_PDB, require_outputs, run_logged};
use crate::core::io::gro::GroFile;
use crate::core::io::grotop::GroTopology;
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use crate::parameters::error::ParameterError;
use crate::parameters::protocol::Protocol;
use std::path::{Path, PathBuf};
use tracing::info;

const OUTPUT_GRO: &str = "output.gro";
const OUTPUT_TOP: &str = "output.top";
const PDB2GMX_LOG: &str = "pdb2gmx.log";

/// Parameterises a protein with `gmx pdb2gmx` and a GROMACS port of an AMBER
/// force field.
#[derive(Debug, Clone)]
pub struct GromacsProtein {
    name: String,
    gromacs_name: &'static str,
    gmx: PathBuf,
    topology_dir: PathBuf,
}

impl GromacsProtein {
    pub fn new(name: &str, gromacs_name: &'static str, gmx: PathBuf, topology_dir: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            gromacs_name,
            gmx,
            topology_dir,
        }
    }

    fn arguments(&self) -> [&str; 11] {
        [
            "pdb2gmx",
            "-f",
            INPUT_PDB,
            "-o",
            OUTPUT_GRO,
            "-p",
            OUTPUT_TOP,
            "-ff",
            self.gromacs_name,
            "-water",
            "none",
        ]
    }
}

impl Protocol for GromacsProtein {
    fn forcefield(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        molecule: &Molecule,
        work_dir: &Path,
        map: &PropertyMap,
    ) -> Result<Molecule, ParameterError> {
        info!(forcefield = %self.name, gromacs = self.gromacs_name, "Parameterising with pdb2gmx");
        PdbFile::write_molecule_to_path(molecule, map, work_dir.join(INPUT_PDB))?;

        let log = run_logged(
            &self.gmx,
            self.arguments(),
            work_dir,
            PDB2GMX_LOG,
            &[("GMXLIB", self.topology_dir.as_path())],
        )?;
        require_outputs(work_dir, &[OUTPUT_GRO, OUTPUT_TOP], &self.gmx, &log)?;

        let (coordinates, _) = GroFile::read_from_path(work_dir.join(OUTPUT_GRO))?;
        let topology = GroTopology::read_from_path(work_dir.join(OUTPUT_TOP))?;
        let mut parameterised = topology.apply_to(&coordinates)?;
        parameterised.name = molecule.name.clone();
        Ok(parameterised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdb2gmx_uses_the_gromacs_force_field_name() {
        let protocol = GromacsProtein::new(
            "ff99SBildn",
            "amber99sb-ildn",
            PathBuf::from("gmx"),
            PathBuf::from("/usr/share/gromacs/top"),
        );
        let args = protocol.arguments();
        assert_eq!(args[0], "pdb2gmx");
        let ff = args.iter().position(|&a| a == "-ff").unwrap();
        assert_eq!(args[ff + 1], "amber99sb-ildn");
        assert_eq!(&args[9..], ["-water", "none"]);
    }
}
