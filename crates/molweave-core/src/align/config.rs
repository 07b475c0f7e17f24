use super::error::AlignError;
use crate::core::models::mapping::AtomMapping;
use crate::core::models::properties::PropertyMap;
use crate::core::units::Time;
use std::fmt;
use std::str::FromStr;

/// How candidate mappings are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScoringFunction {
    /// RMSD of the mapped atoms as they are.
    Rmsd,
    /// RMSD of the mapped atoms after a least-squares fit on the mapping.
    #[default]
    RmsdAlign,
}

impl ScoringFunction {
    pub const OPTIONS: &'static [&'static str] = &["RMSD", "RMSDALIGN"];

    pub fn aligns(&self) -> bool {
        matches!(self, Self::RmsdAlign)
    }
}

impl FromStr for ScoringFunction {
    type Err = AlignError;

    /// Parses a scoring function name, ignoring case and spaces, so
    /// `"RMSD align"` and `"rmsdalign"` are the same.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        match normalized.as_str() {
            "RMSD" => Ok(Self::Rmsd),
            "RMSDALIGN" => Ok(Self::RmsdAlign),
            _ => Err(AlignError::UnsupportedScoringFunction {
                name: normalized,
                options: Self::OPTIONS,
            }),
        }
    }
}

impl fmt::Display for ScoringFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rmsd => "RMSD",
            Self::RmsdAlign => "RMSD align",
        })
    }
}

/// Options for [`match_atoms`](super::matcher::match_atoms).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    pub scoring_function: ScoringFunction,
    /// Maximum number of mappings to return, best first.
    pub matches: usize,
    /// Return scores alongside mappings when more than one is requested.
    pub return_scores: bool,
    /// Pairs that every returned mapping must contain. Empty means derive a
    /// seed automatically.
    pub prematch: AtomMapping,
    /// Soft time budget for each substructure search.
    pub timeout: Time,
    /// Whether hydrogens take part in the match.
    pub match_light: bool,
    pub property_map0: PropertyMap,
    pub property_map1: PropertyMap,
    pub verbose: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            scoring_function: ScoringFunction::RmsdAlign,
            matches: 1,
            return_scores: false,
            prematch: AtomMapping::new(),
            timeout: Time::seconds(5.0),
            match_light: true,
            property_map0: PropertyMap::new(),
            property_map1: PropertyMap::new(),
            verbose: false,
        }
    }
}

impl MatchOptions {
    pub fn builder() -> MatchOptionsBuilder {
        MatchOptionsBuilder::new()
    }
}

/// Builds [`MatchOptions`], validating string and quantity inputs.
#[derive(Default)]
pub struct MatchOptionsBuilder {
    scoring_function: Option<String>,
    matches: Option<usize>,
    return_scores: Option<bool>,
    prematch: Option<AtomMapping>,
    timeout: Option<String>,
    match_light: Option<bool>,
    property_map0: Option<PropertyMap>,
    property_map1: Option<PropertyMap>,
    verbose: Option<bool>,
}

impl MatchOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scoring_function(mut self, name: &str) -> Self {
        self.scoring_function = Some(name.to_string());
        self
    }
    pub fn matches(mut self, n: usize) -> Self {
        self.matches = Some(n);
        self
    }
    pub fn return_scores(mut self, enabled: bool) -> Self {
        self.return_scores = Some(enabled);
        self
    }
    pub fn prematch(mut self, prematch: AtomMapping) -> Self {
        self.prematch = Some(prematch);
        self
    }
    /// Sets the timeout from a quantity string such as `"5 s"`.
    pub fn timeout(mut self, timeout: &str) -> Self {
        self.timeout = Some(timeout.to_string());
        self
    }
    pub fn match_light(mut self, enabled: bool) -> Self {
        self.match_light = Some(enabled);
        self
    }
    pub fn property_map0(mut self, map: PropertyMap) -> Self {
        self.property_map0 = Some(map);
        self
    }
    pub fn property_map1(mut self, map: PropertyMap) -> Self {
        self.property_map1 = Some(map);
        self
    }
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = Some(enabled);
        self
    }

    pub fn build(self) -> Result<MatchOptions, AlignError> {
        let defaults = MatchOptions::default();
        let scoring_function = match self.scoring_function {
            Some(name) => name.parse()?,
            None => defaults.scoring_function,
        };
        let timeout = match self.timeout {
            Some(text) => {
                let time: Time = text.parse()?;
                time.to_duration()?;
                time
            }
            None => defaults.timeout,
        };
        Ok(MatchOptions {
            scoring_function,
            matches: self.matches.unwrap_or(defaults.matches),
            return_scores: self.return_scores.unwrap_or(defaults.return_scores),
            prematch: self.prematch.unwrap_or(defaults.prematch),
            timeout,
            match_light: self.match_light.unwrap_or(defaults.match_light),
            property_map0: self.property_map0.unwrap_or(defaults.property_map0),
            property_map1: self.property_map1.unwrap_or(defaults.property_map1),
            verbose: self.verbose.unwrap_or(defaults.verbose),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::UnitError;

    #[test]
    fn scoring_function_ignores_case_and_spaces() {
        assert_eq!("RMSD align".parse::<ScoringFunction>(), Ok(ScoringFunction::RmsdAlign));
        assert_eq!(" rmsd ".parse::<ScoringFunction>(), Ok(ScoringFunction::Rmsd));
        assert_eq!("r m s d a l i g n".parse::<ScoringFunction>(), Ok(ScoringFunction::RmsdAlign));
    }

    #[test]
    fn unsupported_scoring_function_lists_options() {
        let err = "energy".parse::<ScoringFunction>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported scoring function 'ENERGY'. Options are: [\"RMSD\", \"RMSDALIGN\"]"
        );
    }

    #[test]
    fn builder_defaults_match_documented_values() {
        let options = MatchOptions::builder().build().unwrap();
        assert_eq!(options, MatchOptions::default());
        assert_eq!(options.matches, 1);
        assert!(options.match_light);
        assert!(options.scoring_function.aligns());
        assert_eq!(options.timeout.as_seconds(), 5.0);
    }

    #[test]
    fn builder_validates_timeout() {
        let options = MatchOptions::builder().timeout("250 ms").build().unwrap();
        assert!((options.timeout.as_seconds() - 0.25).abs() < 1e-12);

        assert!(matches!(
            MatchOptions::builder().timeout("5").build(),
            Err(AlignError::Unit(UnitError::UnknownUnit { .. }))
        ));
        assert!(matches!(
            MatchOptions::builder().timeout("-1 s").build(),
            Err(AlignError::Unit(UnitError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn builder_rejects_bad_scoring_function() {
        assert!(matches!(
            MatchOptions::builder().scoring_function("RMSF").build(),
            Err(AlignError::UnsupportedScoringFunction { .. })
        ));
    }
}
