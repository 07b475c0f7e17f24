mod defaults;

use crate::cli::{MatchArgs, ParameteriseArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use defaults::DefaultsConfig;
use directories::ProjectDirs;
use molweave::align::config::MatchOptions;
use molweave::core::io::cache::FileFormat;
use molweave::parameters::{NetCharge, ParameteriseOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialMatchConfig {
    #[serde(rename = "scoring-function")]
    scoring_function: Option<String>,
    matches: Option<usize>,
    timeout: Option<String>,
    #[serde(rename = "match-light")]
    match_light: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialParameteriseConfig {
    forcefield: Option<String>,
    #[serde(rename = "work-dir")]
    work_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    formats: Option<Vec<String>>,
}

/// Settings read from the TOML configuration file. Every field is optional;
/// command-line arguments take precedence, then the file, then built-in
/// defaults.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    #[serde(rename = "match")]
    matching: Option<PartialMatchConfig>,
    parameterise: Option<PartialParameteriseConfig>,
    output: Option<PartialOutputConfig>,
}

/// A parameterisation request after merging all configuration sources.
#[derive(Debug)]
pub struct ParameteriseConfig {
    pub forcefield: String,
    pub options: ParameteriseOptions,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads the explicitly requested file, or the user's default file when
    /// it exists, or an empty configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                debug!("No configuration file found, using built-in defaults.");
                Ok(Self::default())
            }
        }
    }

    pub fn match_options(&self, args: &MatchArgs) -> Result<MatchOptions> {
        let defaults = DefaultsConfig::default();
        let file = self.matching.as_ref();

        let scoring_function = args
            .scoring_function
            .clone()
            .or_else(|| file.and_then(|m| m.scoring_function.clone()))
            .unwrap_or(defaults.scoring_function);
        let timeout = args
            .timeout
            .clone()
            .or_else(|| file.and_then(|m| m.timeout.clone()))
            .unwrap_or(defaults.timeout);
        let matches = args
            .matches
            .or(file.and_then(|m| m.matches))
            .unwrap_or(defaults.matches);
        let match_light = if args.no_match_light {
            false
        } else {
            file.and_then(|m| m.match_light)
                .unwrap_or(defaults.match_light)
        };

        let mut builder = MatchOptions::builder()
            .scoring_function(&scoring_function)
            .timeout(&timeout)
            .matches(matches)
            .match_light(match_light)
            .return_scores(true);
        if let Some(prematch) = &args.prematch {
            builder = builder.prematch(
                parser::parse_mapping(prematch).map_err(|e| CliError::Argument(e.to_string()))?,
            );
        }
        Ok(builder.build()?)
    }

    pub fn parameterise(&self, args: &ParameteriseArgs) -> Result<ParameteriseConfig> {
        let file = self.parameterise.as_ref();

        let forcefield = args
            .forcefield
            .clone()
            .or_else(|| file.and_then(|p| p.forcefield.clone()))
            .ok_or_else(|| {
                CliError::Config(
                    "No force field given. Use `--forcefield` or set `parameterise.forcefield`."
                        .to_string(),
                )
            })?;
        let work_dir = args
            .work_dir
            .clone()
            .or_else(|| file.and_then(|p| p.work_dir.clone()));

        Ok(ParameteriseConfig {
            forcefield,
            options: ParameteriseOptions {
                work_dir,
                net_charge: args.net_charge.as_deref().map(NetCharge::from),
                ..Default::default()
            },
        })
    }

    /// Output formats from the command line, else the file, else PDB only.
    pub fn formats(&self, cli_formats: &[String]) -> Result<Vec<FileFormat>> {
        let names: Vec<String> = if !cli_formats.is_empty() {
            cli_formats.to_vec()
        } else {
            self.output
                .as_ref()
                .and_then(|o| o.formats.clone())
                .unwrap_or_else(|| DefaultsConfig::default().formats)
        };
        if names.is_empty() {
            return Err(CliError::Config(
                "`output.formats` must name at least one format.".to_string(),
            ));
        }
        names
            .iter()
            .map(|name| {
                name.parse::<FileFormat>()
                    .map_err(|e| CliError::Config(e.to_string()))
            })
            .collect()
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "molweave", "molweave")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use molweave::align::config::ScoringFunction;
    use std::fs;
    use tempfile::tempdir;

    fn match_args(extra: &[&str]) -> MatchArgs {
        let mut argv = vec!["molweave", "match", "a.pdb", "b.pdb"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Match(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn parameterise_args(extra: &[&str]) -> ParameteriseArgs {
        let mut argv = vec!["molweave", "parameterise", "-i", "lig.pdb", "-o", "out"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Parameterise(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("molweave.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn built_in_defaults_apply_without_a_file() {
        let options = PartialConfig::default().match_options(&match_args(&[])).unwrap();
        assert_eq!(options.scoring_function, ScoringFunction::RmsdAlign);
        assert_eq!(options.matches, 1);
        assert!(options.match_light);
        assert_eq!(options.timeout.as_seconds(), 5.0);
    }

    #[test]
    fn file_values_override_defaults_and_cli_overrides_file() {
        let (_dir, path) = write_config(
            r#"
            [match]
            scoring-function = "rmsd"
            matches = 3
            timeout = "2 s"
            match-light = true

            [output]
            formats = ["pdb", "sdf"]
            "#,
        );
        let config = PartialConfig::from_file(&path).unwrap();

        let from_file = config.match_options(&match_args(&[])).unwrap();
        assert_eq!(from_file.scoring_function, ScoringFunction::Rmsd);
        assert_eq!(from_file.matches, 3);
        assert_eq!(from_file.timeout.as_seconds(), 2.0);

        let from_cli = config
            .match_options(&match_args(&["-n", "5", "--no-match-light", "-p", "0:1"]))
            .unwrap();
        assert_eq!(from_cli.matches, 5);
        assert!(!from_cli.match_light);
        assert_eq!(from_cli.prematch.get(0), Some(1));

        assert_eq!(
            config.formats(&[]).unwrap(),
            vec![FileFormat::Pdb, FileFormat::Sdf]
        );
        assert_eq!(config.formats(&["gro".to_string()]).unwrap(), vec![FileFormat::Gro87]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (_dir, path) = write_config("[match]\nmax-matches = 2\n");
        assert!(matches!(
            PartialConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn invalid_values_surface_as_errors() {
        let config = PartialConfig::default();
        assert!(matches!(
            config.match_options(&match_args(&["-t", "5 parsecs"])),
            Err(CliError::Align(_))
        ));
        assert!(matches!(
            config.match_options(&match_args(&["-p", "0-1"])),
            Err(CliError::Argument(_))
        ));
        assert!(matches!(
            config.formats(&["mol2".to_string()]),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn parameterise_settings_merge_file_and_cli() {
        let (_dir, path) = write_config(
            r#"
            [parameterise]
            forcefield = "ff14SB"
            work-dir = "/tmp/molweave-work"
            "#,
        );
        let config = PartialConfig::from_file(&path).unwrap();

        let from_file = config.parameterise(&parameterise_args(&[])).unwrap();
        assert_eq!(from_file.forcefield, "ff14SB");
        assert_eq!(
            from_file.options.work_dir,
            Some(PathBuf::from("/tmp/molweave-work"))
        );
        assert!(from_file.options.net_charge.is_none());

        let from_cli = config
            .parameterise(&parameterise_args(&["--forcefield", "gaff", "--net-charge", "-1"]))
            .unwrap();
        assert_eq!(from_cli.forcefield, "gaff");
        assert_eq!(from_cli.options.net_charge, Some(NetCharge::Text("-1".to_string())));
    }

    #[test]
    fn parameterise_requires_a_force_field() {
        assert!(matches!(
            PartialConfig::default().parameterise(&parameterise_args(&[])),
            Err(CliError::Config(_))
        ));
    }
}
