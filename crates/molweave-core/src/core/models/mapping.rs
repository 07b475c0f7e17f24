use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MappingError {
    #[error(
        "Mapping pair '{from} : {to}' is out of range! The molecules contain {atoms0} and {atoms1} atoms."
    )]
    OutOfRange {
        from: usize,
        to: usize,
        atoms0: usize,
        atoms1: usize,
    },
    #[error("Atoms {first} and {second} are both mapped onto atom {target}.")]
    NotInjective {
        target: usize,
        first: usize,
        second: usize,
    },
}

/// A partial function from atom indices of one molecule to atom indices of
/// another. Keys are unique by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomMapping(BTreeMap<usize, usize>);

impl AtomMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pair, returning the previous target of `from` if any.
    pub fn insert(&mut self, from: usize, to: usize) -> Option<usize> {
        self.0.insert(from, to)
    }

    pub fn remove(&mut self, from: usize) -> Option<usize> {
        self.0.remove(&from)
    }

    pub fn get(&self, from: usize) -> Option<usize> {
        self.0.get(&from).copied()
    }

    pub fn contains_key(&self, from: usize) -> bool {
        self.0.contains_key(&from)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().map(|(&a, &b)| (a, b))
    }

    pub fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.values().copied()
    }

    /// Returns the reverse mapping, or `None` when two keys share a value.
    pub fn inverse(&self) -> Option<AtomMapping> {
        let mut inverse = AtomMapping::new();
        for (a, b) in self.iter() {
            if inverse.insert(b, a).is_some() {
                return None;
            }
        }
        Some(inverse)
    }

    /// Checks every pair against the atom counts of both molecules and
    /// rejects mappings that send two atoms onto the same target.
    pub fn validate(&self, atoms0: usize, atoms1: usize) -> Result<(), MappingError> {
        let mut seen: BTreeMap<usize, usize> = BTreeMap::new();
        for (from, to) in self.iter() {
            if from >= atoms0 || to >= atoms1 {
                return Err(MappingError::OutOfRange {
                    from,
                    to,
                    atoms0,
                    atoms1,
                });
            }
            if let Some(first) = seen.insert(to, from) {
                return Err(MappingError::NotInjective {
                    target: to,
                    first,
                    second: from,
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<(usize, usize)> for AtomMapping {
    fn from_iter<T: IntoIterator<Item = (usize, usize)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AtomMapping {
    type Item = (usize, usize);
    type IntoIter = btree_map::IntoIter<usize, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for AtomMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (a, b)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} : {}", a, b)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_in_range_injective_mapping() {
        let mapping: AtomMapping = [(0, 1), (1, 0), (2, 2)].into_iter().collect();
        assert_eq!(mapping.validate(3, 3), Ok(()));
    }

    #[test]
    fn validate_rejects_out_of_range_pairs() {
        let mapping: AtomMapping = [(0, 5)].into_iter().collect();
        assert_eq!(
            mapping.validate(3, 3),
            Err(MappingError::OutOfRange {
                from: 0,
                to: 5,
                atoms0: 3,
                atoms1: 3
            })
        );

        let mapping: AtomMapping = [(3, 0)].into_iter().collect();
        assert!(matches!(
            mapping.validate(3, 3),
            Err(MappingError::OutOfRange { .. })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_targets() {
        let mapping: AtomMapping = [(0, 1), (2, 1)].into_iter().collect();
        assert_eq!(
            mapping.validate(3, 3),
            Err(MappingError::NotInjective {
                target: 1,
                first: 0,
                second: 2
            })
        );
        assert!(mapping.inverse().is_none());
    }

    #[test]
    fn inverse_swaps_keys_and_values() {
        let mapping: AtomMapping = [(0, 4), (1, 3)].into_iter().collect();
        let inverse = mapping.inverse().unwrap();
        assert_eq!(inverse.get(4), Some(0));
        assert_eq!(inverse.get(3), Some(1));
    }

    #[test]
    fn display_lists_pairs_in_key_order() {
        let mapping: AtomMapping = [(2, 0), (0, 1)].into_iter().collect();
        assert_eq!(mapping.to_string(), "{0 : 1, 2 : 0}");
        assert_eq!(AtomMapping::new().to_string(), "{}");
    }
}
