use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu",
    version,
    about = "molweave CLI - Map, align and merge small molecules, and parameterise them with AMBER, GROMACS or Open Force Field tool-chains.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    /// Defaults to `config.toml` in the platform configuration directory, if present.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find the best atom mappings between two molecules.
    Match(MatchArgs),
    /// Rigidly align the first molecule onto the second.
    Align(AlignArgs),
    /// Merge two molecules into a dual-topology molecule and write both end states.
    Merge(MergeArgs),
    /// Parameterise a molecule with a supported force field.
    Parameterise(ParameteriseArgs),
    /// List the supported force fields.
    Forcefields(ForcefieldsArgs),
}

/// The two molecules shared by the mapping commands.
#[derive(Args, Debug)]
pub struct MoleculePair {
    /// The first molecule (pdb, gro, sdf, or a prm7/top file with a matching rst7/gro).
    #[arg(value_name = "MOLECULE0")]
    pub molecule0: PathBuf,

    /// The second molecule.
    #[arg(value_name = "MOLECULE1")]
    pub molecule1: PathBuf,
}

/// Arguments for the `match` subcommand.
#[derive(Args, Debug)]
pub struct MatchArgs {
    #[command(flatten)]
    pub molecules: MoleculePair,

    /// Number of mappings to report, best first.
    #[arg(short = 'n', long, value_name = "INT")]
    pub matches: Option<usize>,

    /// How to rank mappings: 'RMSD' or 'RMSD align'.
    #[arg(short, long, value_name = "NAME")]
    pub scoring_function: Option<String>,

    /// Time budget for each substructure search, with units (e.g., '5 s').
    #[arg(short, long, value_name = "TIME")]
    pub timeout: Option<String>,

    /// Pairs every mapping must contain, e.g. '0:0,3:4'.
    #[arg(short, long, value_name = "MAPPING")]
    pub prematch: Option<String>,

    /// Exclude hydrogens from the match, overriding the config file.
    #[arg(long)]
    pub no_match_light: bool,

    /// Write the mappings and their scores as CSV.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `align` subcommand.
#[derive(Args, Debug)]
pub struct AlignArgs {
    #[command(flatten)]
    pub molecules: MoleculePair,

    /// Mapping to align on, e.g. '0:0,1:2'. Found automatically if omitted.
    #[arg(short, long, value_name = "MAPPING")]
    pub mapping: Option<String>,

    /// Output path without extension; one file is written per format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Output formats, e.g. 'pdb,sdf'. Overrides `output.formats` in the config file.
    #[arg(short, long, value_name = "FORMATS", value_delimiter = ',')]
    pub format: Vec<String>,
}

/// Arguments for the `merge` subcommand.
#[derive(Args, Debug)]
pub struct MergeArgs {
    #[command(flatten)]
    pub molecules: MoleculePair,

    /// Mapping to merge on, e.g. '0:0,1:2'. If omitted, a mapping is found and
    /// the first molecule is aligned onto the second before merging.
    #[arg(short, long, value_name = "MAPPING")]
    pub mapping: Option<String>,

    /// Permit mappings that open or close a ring.
    #[arg(long)]
    pub allow_ring_breaking: bool,

    /// Output path without extension. End states are written to
    /// '<PATH>_lambda0' and '<PATH>_lambda1'.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Output formats, e.g. 'pdb,sdf'. Overrides `output.formats` in the config file.
    #[arg(short, long, value_name = "FORMATS", value_delimiter = ',')]
    pub format: Vec<String>,
}

/// Arguments for the `parameterise` subcommand.
#[derive(Args, Debug)]
pub struct ParameteriseArgs {
    /// The molecule to parameterise.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// The force field, e.g. 'ff14SB', 'gaff2' or 'openff-2.0.0'.
    #[arg(long = "forcefield", value_name = "NAME")]
    pub forcefield: Option<String>,

    /// Net charge for GAFF, e.g. '-1' or '-1 e'.
    #[arg(long, value_name = "CHARGE", allow_hyphen_values = true)]
    pub net_charge: Option<String>,

    /// Directory to run the tool-chain in. A fresh temporary directory is used if omitted.
    #[arg(short, long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Output path without extension; one file is written per format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Output formats, e.g. 'pdb,gro87'. Overrides `output.formats` in the config file.
    #[arg(short, long, value_name = "FORMATS", value_delimiter = ',')]
    pub format: Vec<String>,
}

/// Arguments for the `forcefields` subcommand.
#[derive(Args, Debug)]
pub struct ForcefieldsArgs {
    /// Only list force fields from the Open Force Field Initiative.
    #[arg(long, conflicts_with = "protein")]
    pub open: bool,

    /// Only list the AMBER protein force fields.
    #[arg(long)]
    pub protein: bool,
}
