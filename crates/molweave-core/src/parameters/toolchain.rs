use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

const GROMACS_BINARIES: [&str; 2] = ["gmx", "gmx_mpi"];
const PYTHON_BINARIES: [&str; 2] = ["python3", "python"];

/// The external programs available for parameterisation.
///
/// Fields are public so callers can describe a toolchain explicitly instead
/// of probing the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolchain {
    /// Root of the AMBER installation (`$AMBERHOME`).
    pub amber_home: Option<PathBuf>,
    /// The `gmx` executable.
    pub gmx_exe: Option<PathBuf>,
    /// The GROMACS topology library directory.
    pub gromacs_path: Option<PathBuf>,
    /// A Python interpreter, used for the Open Force Field toolkit.
    pub python: Option<PathBuf>,
}

impl Toolchain {
    /// Probes environment variables and `PATH` for the supported packages.
    pub fn detect() -> Self {
        let amber_home = env::var_os("AMBERHOME")
            .map(PathBuf::from)
            .filter(|p| p.is_dir());

        let gmx_exe = env::var_os("GROMACS_EXE")
            .map(PathBuf::from)
            .filter(|p| p.is_file())
            .or_else(|| GROMACS_BINARIES.iter().find_map(find_in_path));

        let gromacs_path = env::var_os("GMXDATA")
            .map(|data| PathBuf::from(data).join("top"))
            .filter(|p| p.is_dir())
            .or_else(|| gmx_exe.as_deref().and_then(topology_dir_for));

        let python = PYTHON_BINARIES.iter().find_map(find_in_path);

        let toolchain = Self {
            amber_home,
            gmx_exe,
            gromacs_path,
            python,
        };
        debug!(?toolchain, "Detected external toolchain");
        toolchain
    }

    pub fn has_amber(&self) -> bool {
        self.amber_home.is_some()
    }

    /// GROMACS is only usable with both the binary and its topology library.
    pub fn has_gromacs(&self) -> bool {
        self.gmx_exe.is_some() && self.gromacs_path.is_some()
    }

    pub fn has_python(&self) -> bool {
        self.python.is_some()
    }

    /// Path of an AMBER program, e.g. `tleap`.
    pub fn amber_program(&self, name: &str) -> Option<PathBuf> {
        self.amber_home.as_ref().map(|home| home.join("bin").join(name))
    }
}

fn find_in_path(name: impl AsRef<OsStr>) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name.as_ref()))
        .find(|candidate| candidate.is_file())
}

/// `<prefix>/bin/gmx` ships its force fields in `<prefix>/share/gromacs/top`.
fn topology_dir_for(gmx: &Path) -> Option<PathBuf> {
    let prefix = gmx.parent()?.parent()?;
    let top = prefix.join("share").join("gromacs").join("top");
    top.is_dir().then_some(top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn gromacs_needs_binary_and_topology_path() {
        let mut toolchain = Toolchain {
            gmx_exe: Some(PathBuf::from("/opt/gromacs/bin/gmx")),
            ..Default::default()
        };
        assert!(!toolchain.has_gromacs());
        toolchain.gromacs_path = Some(PathBuf::from("/opt/gromacs/share/gromacs/top"));
        assert!(toolchain.has_gromacs());
        assert!(!toolchain.has_amber());
    }

    #[test]
    fn amber_programs_live_in_bin() {
        let toolchain = Toolchain {
            amber_home: Some(PathBuf::from("/opt/amber")),
            ..Default::default()
        };
        assert_eq!(
            toolchain.amber_program("tleap"),
            Some(PathBuf::from("/opt/amber/bin/tleap"))
        );
        assert_eq!(Toolchain::default().amber_program("tleap"), None);
    }

    #[test]
    fn topology_dir_is_found_next_to_binary() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("bin");
        let top = dir.path().join("share").join("gromacs").join("top");
        fs::create_dir_all(&bin).unwrap();
        fs::create_dir_all(&top).unwrap();
        fs::write(bin.join("gmx"), "").unwrap();

        assert_eq!(topology_dir_for(&bin.join("gmx")), Some(top));
        assert_eq!(topology_dir_for(Path::new("gmx")), None);
    }
}
