use crate::cli::ForcefieldsArgs;
use crate::error::Result;
use molweave::parameters::{ForceField, ForceFieldKind, ForceFieldRegistry, Toolchain};

fn family(forcefield: &ForceField) -> &'static str {
    match forcefield.kind {
        ForceFieldKind::Amber(_) => "AMBER protein",
        ForceFieldKind::Gaff(_) => "GAFF small molecule",
        ForceFieldKind::OpenFf(_) => "Open Force Field",
    }
}

fn installed(forcefield: &ForceField, toolchain: &Toolchain) -> bool {
    match &forcefield.kind {
        ForceFieldKind::Amber(amber) => {
            toolchain.has_amber() || (amber.gromacs_name().is_some() && toolchain.has_gromacs())
        }
        ForceFieldKind::Gaff(_) => toolchain.has_amber(),
        ForceFieldKind::OpenFf(_) => toolchain.has_python(),
    }
}

pub async fn run(args: ForcefieldsArgs) -> Result<()> {
    let registry = ForceFieldRegistry::global();
    let toolchain = Toolchain::detect();

    let listed: Vec<&ForceField> = if args.open {
        registry.open_forcefields().collect()
    } else if args.protein {
        registry.amber_protein_forcefields().collect()
    } else {
        registry.iter().collect()
    };
    if listed.is_empty() {
        println!(
            "No force fields found. Open Force Field files are read from the directories in ${}.",
            molweave::parameters::registry::OPENFF_DIRS_ENV
        );
        return Ok(());
    }

    for forcefield in listed {
        println!(
            "{:<24} {:<20} {}",
            forcefield.name,
            family(forcefield),
            if installed(forcefield, &toolchain) {
                "available"
            } else {
                "missing software"
            }
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn availability_follows_the_installed_programs() {
        let registry = ForceFieldRegistry::builtin();
        let gromacs = Toolchain {
            gmx_exe: Some(PathBuf::from("/usr/bin/gmx")),
            gromacs_path: Some(PathBuf::from("/usr/share/gromacs/top")),
            ..Default::default()
        };
        let ff99sb = registry.get("ff99SB").unwrap();
        let ff14sb = registry.get("ff14SB").unwrap();
        assert!(installed(ff99sb, &gromacs));
        assert!(!installed(ff14sb, &gromacs));
        assert_eq!(family(registry.get("gaff").unwrap()), "GAFF small molecule");
    }
}
