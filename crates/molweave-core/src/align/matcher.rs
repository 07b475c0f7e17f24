use super::config::MatchOptions;
use super::error::AlignError;
use super::mcs::{McsMatcher, McsQuery, SubstructureMatcher};
use super::prematch::{PdbPrematcher, Prematcher};
use super::scoring::{ScoredMapping, score_rmsd};
use crate::core::models::mapping::AtomMapping;
use crate::core::models::molecule::Molecule;
use tracing::{debug, info, instrument};

/// Light atoms have fewer protons than carbon in the strict search.
const STRICT_MIN_HEAVY_PROTONS: u8 = 6;

/// The result of a successful match, shaped by the requested count.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The best mapping, returned when exactly one match was requested.
    Single(AtomMapping),
    /// The best mappings, best first.
    Ranked(Vec<AtomMapping>),
    /// The best mappings with their scores, best first.
    Scored(Vec<ScoredMapping>),
}

impl MatchOutcome {
    /// The best mapping, if the outcome holds any.
    pub fn best(&self) -> Option<&AtomMapping> {
        match self {
            Self::Single(mapping) => Some(mapping),
            Self::Ranked(mappings) => mappings.first(),
            Self::Scored(scored) => scored.first().map(|s| &s.mapping),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Ranked(mappings) => mappings.len(),
            Self::Scored(scored) => scored.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens the outcome into its mappings, best first.
    pub fn into_mappings(self) -> Vec<AtomMapping> {
        match self {
            Self::Single(mapping) => vec![mapping],
            Self::Ranked(mappings) => mappings,
            Self::Scored(scored) => scored.into_iter().map(|s| s.mapping).collect(),
        }
    }
}

/// Finds and ranks atom mappings between two molecules.
///
/// The substructure search and the seed derivation are pluggable; the
/// default pairing uses [`McsMatcher`] and [`PdbPrematcher`].
#[derive(Debug, Clone, Default)]
pub struct AtomMatcher<M = McsMatcher, P = PdbPrematcher> {
    matcher: M,
    prematcher: P,
}

impl<M: SubstructureMatcher, P: Prematcher> AtomMatcher<M, P> {
    pub fn new(matcher: M, prematcher: P) -> Self {
        Self {
            matcher,
            prematcher,
        }
    }

    /// Returns `Ok(None)` when the molecules share no substructure.
    #[instrument(skip_all, name = "match_atoms", fields(mol0 = %molecule0.name, mol1 = %molecule1.name))]
    pub fn match_atoms(
        &self,
        molecule0: &Molecule,
        molecule1: &Molecule,
        options: &MatchOptions,
    ) -> Result<Option<MatchOutcome>, AlignError> {
        options
            .prematch
            .validate(molecule0.atom_count(), molecule1.atom_count())?;
        let timeout = options.timeout.to_duration()?;
        let map0 = &options.property_map0;
        let map1 = &options.property_map1;

        let prematch = if options.prematch.is_empty() {
            match self
                .prematcher
                .prematch(molecule0, molecule1, map0, map1, timeout)
            {
                Ok(seed) => seed,
                Err(e) => {
                    debug!("Prematch unavailable, searching unseeded: {}", e);
                    AtomMapping::new()
                }
            }
        } else {
            options.prematch.clone()
        };

        let query = |min_heavy_protons| McsQuery {
            prematch: &prematch,
            timeout,
            match_light: options.match_light,
            min_heavy_protons,
            map0,
            map1,
            verbose: options.verbose,
        };
        let strict = self
            .matcher
            .find_matches(molecule0, molecule1, &query(STRICT_MIN_HEAVY_PROTONS));
        let widened = self.matcher.find_matches(molecule0, molecule1, &query(0));

        let strict_size = strict.first().map_or(0, AtomMapping::len);
        let widened_size = widened.first().map_or(0, AtomMapping::len);
        let candidates = if widened_size > strict_size {
            debug!(strict_size, widened_size, "Widened search found a larger match");
            widened
        } else {
            strict
        };
        if candidates.is_empty() {
            info!("No common substructure found");
            return Ok(None);
        }

        let mut scored = score_rmsd(
            molecule0,
            molecule1,
            &candidates,
            options.scoring_function.aligns(),
            map0,
            map1,
        )?;
        info!(
            "Matched {} atom(s); {} candidate mapping(s) ranked by {}",
            scored[0].mapping.len(),
            scored.len(),
            options.scoring_function
        );

        if options.matches == 1 {
            return Ok(Some(MatchOutcome::Single(scored.swap_remove(0).mapping)));
        }
        scored.truncate(options.matches);
        Ok(Some(if options.return_scores {
            MatchOutcome::Scored(scored)
        } else {
            MatchOutcome::Ranked(scored.into_iter().map(|s| s.mapping).collect())
        }))
    }
}

/// Matches `molecule0` against `molecule1` with the default search and seed.
pub fn match_atoms(
    molecule0: &Molecule,
    molecule1: &Molecule,
    options: &MatchOptions,
) -> Result<Option<MatchOutcome>, AlignError> {
    AtomMatcher::<McsMatcher, PdbPrematcher>::default().match_atoms(molecule0, molecule1, options)
}
