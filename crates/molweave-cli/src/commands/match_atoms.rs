use crate::cli::MatchArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::input::read_molecule;
use molweave::align::matcher::{self, MatchOutcome};
use molweave::align::scoring::{ScoredMapping, score_rmsd};
use molweave::core::models::mapping::AtomMapping;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// One row of the CSV report.
#[derive(Debug, Serialize, PartialEq)]
struct MappingRow {
    rank: usize,
    atoms: usize,
    rmsd: f64,
    /// In the `index0:index1,...` form accepted by `--mapping`.
    mapping: String,
}

fn mapping_argument(mapping: &AtomMapping) -> String {
    mapping
        .iter()
        .map(|(a, b)| format!("{a}:{b}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn rows(scored: &[ScoredMapping]) -> Vec<MappingRow> {
    scored
        .iter()
        .enumerate()
        .map(|(i, s)| MappingRow {
            rank: i + 1,
            atoms: s.mapping.len(),
            rmsd: s.rmsd.value(),
            mapping: mapping_argument(&s.mapping),
        })
        .collect()
}

fn write_csv(path: &Path, rows: &[MappingRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub async fn run(args: MatchArgs, config: &PartialConfig) -> Result<()> {
    let options = config.match_options(&args)?;
    let molecule0 = read_molecule(&args.molecules.molecule0)?;
    let molecule1 = read_molecule(&args.molecules.molecule1)?;

    info!(
        "Matching '{}' onto '{}' (scoring: {}, matches: {})",
        molecule0.name, molecule1.name, options.scoring_function, options.matches
    );
    let outcome =
        tokio::task::block_in_place(|| matcher::match_atoms(&molecule0, &molecule1, &options))?;

    let scored = match outcome {
        None => {
            warn!("No common substructure found.");
            println!("No mapping found between the two molecules.");
            return Ok(());
        }
        Some(MatchOutcome::Scored(scored)) => scored,
        // A single match carries no score, so score it for the report.
        Some(outcome) => score_rmsd(
            &molecule0,
            &molecule1,
            &outcome.into_mappings(),
            options.scoring_function.aligns(),
            &options.property_map0,
            &options.property_map1,
        )?,
    };

    let rows = rows(&scored);
    println!(
        "Found {} mapping(s), ranked by {}:",
        rows.len(),
        options.scoring_function
    );
    for row in &rows {
        println!(
            "  #{:<3} {:>3} atom(s)  RMSD {:>8.4} A  {}",
            row.rank, row.atoms, row.rmsd, row.mapping
        );
    }

    if let Some(path) = &args.output {
        write_csv(path, &rows)?;
        info!("Wrote {} mapping(s) to {:?}", rows.len(), path);
        println!("Mappings written to: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parser::parse_mapping;
    use molweave::core::units::Length;
    use tempfile::tempdir;

    fn scored() -> Vec<ScoredMapping> {
        vec![
            ScoredMapping {
                mapping: [(0, 0), (1, 2)].into_iter().collect(),
                rmsd: Length::angstrom(0.125),
            },
            ScoredMapping {
                mapping: [(0, 1)].into_iter().collect(),
                rmsd: Length::angstrom(0.5),
            },
        ]
    }

    #[test]
    fn mapping_column_round_trips_through_the_argument_parser() {
        let scored = scored();
        let rows = rows(&scored);
        assert_eq!(rows[0].mapping, "0:0,1:2");
        assert_eq!(parse_mapping(&rows[0].mapping).unwrap(), scored[0].mapping);
        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[1].atoms, 1);
    }

    #[test]
    fn csv_report_has_a_header_and_one_row_per_mapping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mappings.csv");
        write_csv(&path, &rows(&scored())).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "rank,atoms,rmsd,mapping");
        assert_eq!(lines[1], "1,2,0.125,\"0:0,1:2\"");
        assert_eq!(lines[2], "2,1,0.5,0:1");
    }
}
