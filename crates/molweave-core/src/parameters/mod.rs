//! Force-field parameterisation through external tool-chains.
//!
//! [`parameterise`] resolves a force field by name, checks that the programs
//! it needs are installed, and starts the matching protocol on a background
//! thread. The returned [`ParameterisationProcess`] yields the parameterised
//! molecule once the tool-chain has finished.

pub mod backends;
pub mod config;
pub mod error;
pub mod net_charge;
pub mod process;
pub mod protocol;
pub mod registry;
pub mod toolchain;

pub use config::ParameteriseOptions;
pub use error::ParameterError;
pub use net_charge::NetCharge;
pub use process::ParameterisationProcess;
pub use registry::{ForceField, ForceFieldKind, ForceFieldRegistry};
pub use toolchain::Toolchain;

use crate::core::models::molecule::Molecule;
use backends::{AmberProtein, Gaff, GromacsProtein, OpenForceField};
use protocol::Protocol;
use registry::AmberForceField;
use std::fs;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

const AMBER_PACKAGE: &str = "AmberTools (http://ambermd.org)";
const AMBER_OR_GROMACS_PACKAGE: &str =
    "AmberTools (http://ambermd.org) or GROMACS (http://www.gromacs.org)";
const OPENFF_PACKAGE: &str =
    "Python with openff-toolkit and openff-interchange (https://openforcefield.org)";

/// Dispatches force-field names to protocols for a given set of installed
/// programs.
#[derive(Debug, Clone)]
pub struct Parameteriser<'r> {
    registry: &'r ForceFieldRegistry,
    toolchain: Toolchain,
}

impl Parameteriser<'static> {
    /// Uses the process-wide registry and the programs found on this machine.
    pub fn detect() -> Self {
        Self::new(ForceFieldRegistry::global(), Toolchain::detect())
    }
}

impl<'r> Parameteriser<'r> {
    pub fn new(registry: &'r ForceFieldRegistry, toolchain: Toolchain) -> Self {
        Self {
            registry,
            toolchain,
        }
    }

    pub fn registry(&self) -> &ForceFieldRegistry {
        self.registry
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Builds the protocol for `name`, failing before any work starts when
    /// the name is unknown, the net charge is unusable or a required program
    /// is missing.
    pub fn protocol(
        &self,
        name: &str,
        options: &ParameteriseOptions,
    ) -> Result<Box<dyn Protocol>, ParameterError> {
        let forcefield = self.registry.get(name)?;
        let missing = |package| ParameterError::MissingSoftware {
            forcefield: forcefield.name.clone(),
            package,
        };

        if options.net_charge.is_some() && !matches!(forcefield.kind, ForceFieldKind::Gaff(_)) {
            warn!(forcefield = %forcefield.name, "Ignoring net charge, only GAFF protocols use it");
        }

        let protocol: Box<dyn Protocol> = match &forcefield.kind {
            ForceFieldKind::Amber(amber) => self.amber_protocol(&forcefield.name, *amber).ok_or_else(
                || match amber.gromacs_name() {
                    Some(_) => missing(AMBER_OR_GROMACS_PACKAGE),
                    None => missing(AMBER_PACKAGE),
                },
            )?,
            ForceFieldKind::Gaff(version) => {
                let amber_home = self
                    .toolchain
                    .amber_home
                    .clone()
                    .ok_or_else(|| missing(AMBER_PACKAGE))?;
                let net_charge = options
                    .net_charge
                    .as_ref()
                    .map(NetCharge::resolve)
                    .transpose()?;
                Box::new(Gaff::new(*version, net_charge, amber_home))
            }
            ForceFieldKind::OpenFf(offxml) => {
                let python = self
                    .toolchain
                    .python
                    .clone()
                    .ok_or_else(|| missing(OPENFF_PACKAGE))?;
                Box::new(OpenForceField::new(&forcefield.name, offxml.clone(), python))
            }
        };
        Ok(protocol)
    }

    /// AMBER is preferred; GROMACS is used when only it is installed and it
    /// ships the force field.
    fn amber_protocol(&self, name: &str, forcefield: AmberForceField) -> Option<Box<dyn Protocol>> {
        if let Some(tleap) = self.toolchain.amber_program("tleap") {
            return Some(Box::new(AmberProtein::new(name, forcefield, tleap)));
        }
        let gromacs_name = forcefield.gromacs_name()?;
        let (Some(gmx), Some(top)) = (&self.toolchain.gmx_exe, &self.toolchain.gromacs_path) else {
            return None;
        };
        Some(Box::new(GromacsProtein::new(
            name,
            gromacs_name,
            gmx.clone(),
            top.clone(),
        )))
    }

    /// Starts parameterising `molecule` with the force field `name`.
    #[instrument(skip_all, name = "parameterise", fields(forcefield = name, molecule = %molecule.name))]
    pub fn parameterise(
        &self,
        name: &str,
        molecule: &Molecule,
        options: ParameteriseOptions,
    ) -> Result<ParameterisationProcess, ParameterError> {
        let protocol = self.protocol(name, &options)?;
        let work_dir = prepare_work_dir(options.work_dir)?;
        info!(work_dir = %work_dir.display(), "Starting parameterisation");
        ParameterisationProcess::spawn(protocol, molecule, work_dir, options.property_map)
    }
}

/// Creates the requested directory, or a fresh one under the system
/// temporary directory that outlives this call.
fn prepare_work_dir(requested: Option<PathBuf>) -> Result<PathBuf, ParameterError> {
    match requested {
        Some(dir) => {
            fs::create_dir_all(&dir)?;
            Ok(dir)
        }
        None => Ok(tempfile::Builder::new()
            .prefix("molweave_parameterise")
            .tempdir()?
            .keep()),
    }
}

/// Starts parameterising `molecule` with the force field `name`, using the
/// process-wide registry and the programs installed on this machine.
///
/// Unknown names, unusable options and missing programs are reported here;
/// tool-chain failures are reported by
/// [`ParameterisationProcess::get_molecule`].
pub fn parameterise(
    name: &str,
    molecule: &Molecule,
    options: ParameteriseOptions,
) -> Result<ParameterisationProcess, ParameterError> {
    Parameteriser::detect().parameterise(name, molecule, options)
}

/// Every supported force field name.
pub fn forcefields() -> Vec<&'static str> {
    ForceFieldRegistry::global().names().collect()
}

/// The supported AMBER protein force fields.
pub fn amber_protein_forcefields() -> Vec<&'static str> {
    ForceFieldRegistry::global()
        .amber_protein_forcefields()
        .map(|ff| ff.name.as_str())
        .collect()
}

/// The supported force fields from the Open Force Field Initiative.
pub fn open_forcefields() -> Vec<&'static str> {
    ForceFieldRegistry::global()
        .open_forcefields()
        .map(|ff| ff.name.as_str())
        .collect()
}
