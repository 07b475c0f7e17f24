use molweave::core::models::mapping::AtomMapping;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid mapping pair '{0}'. Expected 'index0:index1' (e.g., '0:0,3:4').")]
    InvalidPair(String),

    #[error("Atom {0} is mapped more than once.")]
    DuplicateSource(usize),

    #[error("Mapping '{0}' cannot be empty.")]
    Empty(String),
}

/// Parses a comma-separated list of `index0:index1` pairs.
pub fn parse_mapping(s: &str) -> Result<AtomMapping, ParseError> {
    if s.trim().is_empty() {
        return Err(ParseError::Empty(s.to_string()));
    }
    let mut mapping = AtomMapping::new();
    for pair in s.split(',') {
        let (from, to) = pair
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidPair(pair.to_string()))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidPair(pair.to_string()))
        };
        let from = parse(from)?;
        if mapping.insert(from, parse(to)?).is_some() {
            return Err(ParseError::DuplicateSource(from));
        }
    }
    Ok(mapping)
}
