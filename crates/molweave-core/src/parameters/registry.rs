//! The set of force fields a molecule can be parameterised with.
//!
//! Built-in AMBER and GAFF force fields come from a static table. Open Force
//! Field entries are discovered from `*.offxml` files in dataset directories.

use super::error::ParameterError;
use phf::{OrderedMap, phf_ordered_map};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Environment variable listing Open Force Field dataset directories,
/// separated like `PATH`.
pub const OPENFF_DIRS_ENV: &str = "OPENFF_FORCEFIELD_DIRS";

const OFFXML_EXTENSION: &str = "offxml";

/// A protein force field distributed with AmberTools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmberForceField {
    Ff99,
    Ff99Sb,
    Ff99SbIldn,
    Ff03,
    Ff14Sb,
}

impl AmberForceField {
    /// The `tleap` script that loads the force field.
    pub fn leaprc(&self) -> &'static str {
        match self {
            Self::Ff99 => "oldff/leaprc.ff99",
            Self::Ff99Sb => "oldff/leaprc.ff99SB",
            Self::Ff99SbIldn => "oldff/leaprc.ff99SBildn",
            Self::Ff03 => "oldff/leaprc.ff03",
            Self::Ff14Sb => "leaprc.protein.ff14SB",
        }
    }

    /// The equivalent force field shipped with GROMACS, if there is one.
    pub fn gromacs_name(&self) -> Option<&'static str> {
        match self {
            Self::Ff99 => Some("amber99"),
            Self::Ff99Sb => Some("amber99sb"),
            Self::Ff99SbIldn => Some("amber99sb-ildn"),
            Self::Ff03 => Some("amber03"),
            Self::Ff14Sb => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GaffVersion {
    Gaff,
    Gaff2,
}

impl GaffVersion {
    pub fn leaprc(&self) -> &'static str {
        match self {
            Self::Gaff => "leaprc.gaff",
            Self::Gaff2 => "leaprc.gaff2",
        }
    }

    /// The atom type set passed to `antechamber -at`.
    pub fn atom_types(&self) -> &'static str {
        match self {
            Self::Gaff => "gaff",
            Self::Gaff2 => "gaff2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ForceFieldKind {
    Amber(AmberForceField),
    Gaff(GaffVersion),
    /// An Open Force Field Initiative force field and its `.offxml` file.
    OpenFf(PathBuf),
}

static BUILTIN_FORCEFIELDS: OrderedMap<&'static str, ForceFieldKind> = phf_ordered_map! {
    "ff99" => ForceFieldKind::Amber(AmberForceField::Ff99),
    "ff99SB" => ForceFieldKind::Amber(AmberForceField::Ff99Sb),
    "ff99SBildn" => ForceFieldKind::Amber(AmberForceField::Ff99SbIldn),
    "ff03" => ForceFieldKind::Amber(AmberForceField::Ff03),
    "ff14SB" => ForceFieldKind::Amber(AmberForceField::Ff14Sb),
    "gaff" => ForceFieldKind::Gaff(GaffVersion::Gaff),
    "gaff2" => ForceFieldKind::Gaff(GaffVersion::Gaff2),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceField {
    /// The name as published, e.g. `ff99SB` or `openff-2.0.0`.
    pub name: String,
    /// The name with `-` and `.` replaced by `_`, usable as an identifier.
    pub identifier: String,
    pub kind: ForceFieldKind,
}

impl ForceField {
    fn new(name: &str, kind: ForceFieldKind) -> Self {
        Self {
            name: name.to_string(),
            identifier: sanitize_identifier(name),
            kind,
        }
    }

    pub fn is_open_forcefield(&self) -> bool {
        matches!(self.kind, ForceFieldKind::OpenFf(_))
    }

    pub fn is_amber_protein(&self) -> bool {
        matches!(self.kind, ForceFieldKind::Amber(_))
    }
}

fn sanitize_identifier(name: &str) -> String {
    name.replace(['-', '.'], "_")
}

/// Lookup key: case-insensitive with all whitespace removed.
fn lookup_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[derive(Debug, Clone, Default)]
pub struct ForceFieldRegistry {
    entries: Vec<ForceField>,
    index: HashMap<String, usize>,
}

impl ForceFieldRegistry {
    /// A registry holding only the built-in force fields.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for (name, kind) in BUILTIN_FORCEFIELDS.entries() {
            registry.register(ForceField::new(name, kind.clone()));
        }
        registry
    }

    /// The built-in force fields plus every `*.offxml` file found directly in
    /// `dirs`. Missing or unreadable directories are skipped.
    pub fn discover<P: AsRef<Path>>(dirs: &[P]) -> Self {
        let mut registry = Self::builtin();
        for dir in dirs {
            let dir = dir.as_ref();
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(dir = %dir.display(), "Skipping force field directory: {}", e);
                    continue;
                }
            };
            let mut files: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.is_file()
                        && path.extension().is_some_and(|ext| ext == OFFXML_EXTENSION)
                })
                .collect();
            files.sort();

            for path in files {
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let name = name.to_string();
                if !registry.register(ForceField::new(&name, ForceFieldKind::OpenFf(path))) {
                    debug!(name = %name, "Ignoring duplicate force field");
                }
            }
        }
        info!(
            total = registry.len(),
            open = registry.open_forcefields().count(),
            "Force field registry built"
        );
        registry
    }

    /// The process-wide registry, built once on first use from the
    /// directories in `OPENFF_FORCEFIELD_DIRS`.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ForceFieldRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let dirs: Vec<PathBuf> = env::var_os(OPENFF_DIRS_ENV)
                .map(|value| env::split_paths(&value).collect())
                .unwrap_or_default();
            Self::discover(&dirs)
        })
    }

    /// Adds an entry under its name and sanitised identifier. Returns false,
    /// leaving the registry unchanged, when the name is already taken.
    fn register(&mut self, forcefield: ForceField) -> bool {
        let key = lookup_key(&forcefield.name);
        if self.index.contains_key(&key) {
            return false;
        }
        let position = self.entries.len();
        self.index.insert(key, position);
        self.index
            .entry(lookup_key(&forcefield.identifier))
            .or_insert(position);
        self.entries.push(forcefield);
        true
    }

    /// Looks a force field up by name or identifier, ignoring case and
    /// whitespace.
    pub fn get(&self, name: &str) -> Result<&ForceField, ParameterError> {
        self.index
            .get(&lookup_key(name))
            .map(|&i| &self.entries[i])
            .ok_or_else(|| ParameterError::UnsupportedForceField {
                name: name.to_string(),
                supported: self.names().map(str::to_string).collect(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForceField> {
        self.entries.iter()
    }

    /// Every registered name, built-ins first, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|ff| ff.name.as_str())
    }

    pub fn open_forcefields(&self) -> impl Iterator<Item = &ForceField> {
        self.entries.iter().filter(|ff| ff.is_open_forcefield())
    }

    pub fn amber_protein_forcefields(&self) -> impl Iterator<Item = &ForceField> {
        self.entries.iter().filter(|ff| ff.is_amber_protein())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builtin_registry_lists_amber_and_gaff_in_order() {
        let registry = ForceFieldRegistry::builtin();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            ["ff99", "ff99SB", "ff99SBildn", "ff03", "ff14SB", "gaff", "gaff2"]
        );
        assert_eq!(registry.open_forcefields().count(), 0);
        let proteins: Vec<&str> = registry
            .amber_protein_forcefields()
            .map(|ff| ff.name.as_str())
            .collect();
        assert_eq!(proteins, ["ff99", "ff99SB", "ff99SBildn", "ff03", "ff14SB"]);
    }

    #[test]
    fn lookup_ignores_case_and_spaces() {
        let registry = ForceFieldRegistry::builtin();
        assert_eq!(registry.get("FF99sb").unwrap().name, "ff99SB");
        assert_eq!(registry.get(" ff 14 SB ").unwrap().name, "ff14SB");
        assert_eq!(
            registry.get("GAFF2").unwrap().kind,
            ForceFieldKind::Gaff(GaffVersion::Gaff2)
        );
    }

    #[test]
    fn unknown_name_lists_every_supported_force_field() {
        let registry = ForceFieldRegistry::builtin();
        let err = registry.get("charmm36").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported force field 'charmm36'. Supported force fields are: \
             ff99, ff99SB, ff99SBildn, ff03, ff14SB, gaff, gaff2"
        );
    }

    #[test]
    fn discover_adds_offxml_files_with_sanitised_identifiers() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("openff-2.0.0.offxml"), "<SMIRNOFF/>").unwrap();
        fs::write(dir.path().join("smirnoff99Frosst-1.1.0.offxml"), "<SMIRNOFF/>").unwrap();
        fs::write(dir.path().join("README.md"), "not a force field").unwrap();
        let missing = dir.path().join("does-not-exist");

        let registry = ForceFieldRegistry::discover(&[dir.path().to_path_buf(), missing]);
        assert_eq!(registry.len(), 9);

        let openff = registry.get("openff-2.0.0").unwrap();
        assert_eq!(openff.identifier, "openff_2_0_0");
        assert_eq!(
            openff.kind,
            ForceFieldKind::OpenFf(dir.path().join("openff-2.0.0.offxml"))
        );
        assert_eq!(registry.get("OPENFF_2_0_0").unwrap().name, "openff-2.0.0");

        let open: Vec<&str> = registry.open_forcefields().map(|ff| ff.name.as_str()).collect();
        assert_eq!(open, ["openff-2.0.0", "smirnoff99Frosst-1.1.0"]);
    }

    #[test]
    fn duplicate_offxml_names_keep_the_first_directory() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::write(first.path().join("openff-1.0.0.offxml"), "").unwrap();
        fs::write(second.path().join("openff-1.0.0.offxml"), "").unwrap();

        let registry = ForceFieldRegistry::discover(&[first.path(), second.path()]);
        assert_eq!(registry.len(), 8);
        assert_eq!(
            registry.get("openff-1.0.0").unwrap().kind,
            ForceFieldKind::OpenFf(first.path().join("openff-1.0.0.offxml"))
        );
    }
}
