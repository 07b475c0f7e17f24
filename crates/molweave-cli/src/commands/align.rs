use super::{parse_optional_mapping, write_outputs};
use crate::cli::AlignArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::input::read_molecule;
use molweave::align::rmsd::rmsd_align;
use molweave::core::io::cache::FileCache;
use molweave::core::models::properties::PropertyMap;
use tracing::info;

pub async fn run(args: AlignArgs, config: &PartialConfig) -> Result<()> {
    let formats = config.formats(&args.format)?;
    let mapping = parse_optional_mapping(args.mapping.as_deref())?;
    let molecule0 = read_molecule(&args.molecules.molecule0)?;
    let molecule1 = read_molecule(&args.molecules.molecule1)?;

    if mapping.is_none() {
        info!("No mapping given; searching for the best one.");
    }
    let map = PropertyMap::new();
    let aligned = tokio::task::block_in_place(|| {
        rmsd_align(&molecule0, &molecule1, mapping.as_ref(), &map, &map)
    })?;

    println!(
        "Aligned '{}' onto '{}'. Writing {} file(s):",
        molecule0.name,
        molecule1.name,
        formats.len()
    );
    write_outputs(&mut FileCache::new(), &aligned, &args.output, &formats)?;
    Ok(())
}
