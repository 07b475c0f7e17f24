use super::amber::run_tleap;
use super::{INPUT_PDB, OUTPUT_PRM7, OUTPUT_RST7, require_outputs, run_logged};
use crate::core::io::amber::total_charge;
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::molecule::Molecule;
use crate::core::models::properties::PropertyMap;
use crate::parameters::error::ParameterError;
use crate::parameters::protocol::Protocol;
use crate::parameters::registry::GaffVersion;
use std::path::{Path, PathBuf};
use tracing::info;

const ANTECHAMBER_MOL2: &str = "antechamber.mol2";
const FRCMOD: &str = "input.frcmod";

/// Parameterises a small molecule with GAFF or GAFF2: AM1-BCC charges from
/// `antechamber`, missing parameters from `parmchk2`, then `tleap`.
#[derive(Debug, Clone)]
pub struct Gaff {
    version: GaffVersion,
    net_charge: Option<i64>,
    amber_home: PathBuf,
}

impl Gaff {
    /// `net_charge` of `None` uses the molecule's total charge, rounded.
    pub fn new(version: GaffVersion, net_charge: Option<i64>, amber_home: PathBuf) -> Self {
        Self {
            version,
            net_charge,
            amber_home,
        }
    }

    fn program(&self, name: &str) -> PathBuf {
        self.amber_home.join("bin").join(name)
    }

    fn antechamber_arguments(&self, net_charge: i64) -> Vec<String> {
        [
            "-i", INPUT_PDB, "-fi", "pdb", "-o", ANTECHAMBER_MOL2, "-fo", "mol2", "-c", "bcc",
            "-s", "2", "-at",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain([
            self.version.atom_types().to_string(),
            "-nc".to_string(),
            net_charge.to_string(),
        ])
        .collect()
    }

    fn parmchk2_arguments(&self) -> [&str; 8] {
        [
            "-i",
            ANTECHAMBER_MOL2,
            "-f",
            "mol2",
            "-o",
            FRCMOD,
            "-s",
            self.version.atom_types(),
        ]
    }

    fn leap_script(&self) -> String {
        format!(
            "source {}\nmol = loadMol2 {}\nloadAmberParams {}\nsaveAmberParm mol {} {}\nquit\n",
            self.version.leaprc(),
            ANTECHAMBER_MOL2,
            FRCMOD,
            OUTPUT_PRM7,
            OUTPUT_RST7
        )
    }
}

impl Protocol for Gaff {
    fn forcefield(&self) -> &str {
        self.version.atom_types()
    }

    fn run(
        &self,
        molecule: &Molecule,
        work_dir: &Path,
        map: &PropertyMap,
    ) -> Result<Molecule, ParameterError> {
        let net_charge = match self.net_charge {
            Some(charge) => charge,
            None => {
                let estimate = total_charge(molecule, map).round() as i64;
                info!(net_charge = estimate, "Using the molecule's total charge");
                estimate
            }
        };
        info!(forcefield = self.version.atom_types(), net_charge, "Parameterising with antechamber");
        PdbFile::write_molecule_to_path(molecule, map, work_dir.join(INPUT_PDB))?;
        let amber_env = [("AMBERHOME", self.amber_home.as_path())];

        let antechamber = self.program("antechamber");
        let log = run_logged(
            &antechamber,
            self.antechamber_arguments(net_charge),
            work_dir,
            "antechamber.log",
            &amber_env,
        )?;
        require_outputs(work_dir, &[ANTECHAMBER_MOL2], &antechamber, &log)?;

        let parmchk2 = self.program("parmchk2");
        let log = run_logged(
            &parmchk2,
            self.parmchk2_arguments(),
            work_dir,
            "parmchk2.log",
            &amber_env,
        )?;
        require_outputs(work_dir, &[FRCMOD], &parmchk2, &log)?;

        run_tleap(&self.program("tleap"), &self.leap_script(), work_dir, &molecule.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antechamber_receives_atom_types_and_net_charge() {
        let protocol = Gaff::new(GaffVersion::Gaff2, Some(-1), PathBuf::from("/opt/amber"));
        let args = protocol.antechamber_arguments(-1);
        let tail: Vec<&str> = args[args.len() - 4..].iter().map(String::as_str).collect();
        assert_eq!(tail, ["-at", "gaff2", "-nc", "-1"]);
        assert!(args.windows(2).any(|w| w[0] == "-c" && w[1] == "bcc"));
        assert_eq!(protocol.program("tleap"), PathBuf::from("/opt/amber/bin/tleap"));
    }

    #[test]
    fn leap_script_loads_frcmod_and_mol2() {
        let script = Gaff::new(GaffVersion::Gaff, None, PathBuf::from("/opt/amber")).leap_script();
        assert!(script.starts_with("source leaprc.gaff\n"));
        assert!(script.contains("loadMol2 antechamber.mol2"));
        assert!(script.contains("loadAmberParams input.frcmod"));
    }
}
