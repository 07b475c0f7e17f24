use super::{parse_optional_mapping, write_outputs};
use crate::cli::MergeArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::input::read_molecule;
use molweave::align::merge::merge;
use molweave::core::io::cache::FileCache;
use molweave::core::models::merged::EndState;
use molweave::core::models::properties::PropertyMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// `<stem>_lambda0` or `<stem>_lambda1`, keeping the stem's directory.
fn end_state_stem(stem: &Path, state: EndState) -> PathBuf {
    let suffix = match state {
        EndState::Lambda0 => "lambda0",
        EndState::Lambda1 => "lambda1",
    };
    let name = stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.with_file_name(format!("{name}_{suffix}"))
}

pub async fn run(args: MergeArgs, config: &PartialConfig) -> Result<()> {
    let formats = config.formats(&args.format)?;
    let mapping = parse_optional_mapping(args.mapping.as_deref())?;
    let molecule0 = read_molecule(&args.molecules.molecule0)?;
    let molecule1 = read_molecule(&args.molecules.molecule1)?;

    let map = PropertyMap::new();
    let merged = tokio::task::block_in_place(|| {
        merge(
            &molecule0,
            &molecule1,
            mapping.as_ref(),
            args.allow_ring_breaking,
            &map,
            &map,
        )
    })?;

    println!(
        "Merged '{}' with {} atom(s) ({} dummy at lambda 0, {} dummy at lambda 1).",
        merged.name,
        merged.atom_count(),
        merged.dummy_count(EndState::Lambda0),
        merged.dummy_count(EndState::Lambda1)
    );

    let mut cache = FileCache::new();
    for state in [EndState::Lambda0, EndState::Lambda1] {
        let molecule = merged.end_state(state, false);
        let stem = end_state_stem(&args.output, state);
        info!(state = ?state, atoms = molecule.atom_count(), "Writing end state");
        write_outputs(&mut cache, &molecule, &stem, &formats)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_state_stems_keep_the_directory() {
        let stem = Path::new("out/complex");
        assert_eq!(
            end_state_stem(stem, EndState::Lambda0),
            PathBuf::from("out/complex_lambda0")
        );
        assert_eq!(
            end_state_stem(stem, EndState::Lambda1),
            PathBuf::from("out/complex_lambda1")
        );
    }
}
