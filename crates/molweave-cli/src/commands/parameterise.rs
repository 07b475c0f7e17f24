use super::write_outputs;
use crate::cli::ParameteriseArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::input::read_molecule;
use crate::utils::progress::Spinner;
use molweave::core::io::cache::FileCache;
use molweave::parameters;
use std::time::Duration;
use tracing::info;

const POLL_INTERVAL_MS: u64 = 200;

pub async fn run(args: ParameteriseArgs, config: &PartialConfig) -> Result<()> {
    let formats = config.formats(&args.format)?;
    let settings = config.parameterise(&args)?;
    let molecule = read_molecule(&args.input)?;

    let process = parameters::parameterise(&settings.forcefield, &molecule, settings.options)?;
    let work_dir = process.work_dir().to_path_buf();
    println!(
        "Parameterising '{}' with {} in {}",
        molecule.name,
        process.forcefield(),
        work_dir.display()
    );

    let spinner = Spinner::new(format!("Running the {} tool-chain...", process.forcefield()));
    while process.is_running() {
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
    let parameterised = match tokio::task::block_in_place(|| process.get_molecule()) {
        Ok(molecule) => {
            spinner.finish("✓ Done");
            molecule
        }
        Err(e) => {
            spinner.finish("✗ Failed");
            println!("Inputs and logs are kept in {}", work_dir.display());
            return Err(e.into());
        }
    };

    info!(
        atoms = parameterised.atom_count(),
        "Parameterised '{}'", parameterised.name
    );
    println!("Writing {} file(s):", formats.len());
    write_outputs(&mut FileCache::new(), &parameterised, &args.output, &formats)?;
    Ok(())
}
