use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single = 1,
    Double = 2,
    Triple = 3,
    Aromatic = 4,
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            "4" | "ar" | "aromatic" => Ok(Self::Aromatic),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

/// A bond between two atoms, stored by atom index with `atom1 < atom2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1: usize,
    pub atom2: usize,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(a: usize, b: usize, order: BondOrder) -> Self {
        let (atom1, atom2) = if a <= b { (a, b) } else { (b, a) };
        Self {
            atom1,
            atom2,
            order,
        }
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atom1 == atom || self.atom2 == atom
    }

    pub fn partner(&self, atom: usize) -> Option<usize> {
        if self.atom1 == atom {
            Some(self.atom2)
        } else if self.atom2 == atom {
            Some(self.atom1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bond_new_normalizes_atom_order() {
        let bond = Bond::new(5, 2, BondOrder::Double);
        assert_eq!(bond.atom1, 2);
        assert_eq!(bond.atom2, 5);
        assert_eq!(bond, Bond::new(2, 5, BondOrder::Double));
    }

    #[test]
    fn bond_partner_and_contains() {
        let bond = Bond::new(1, 3, BondOrder::Single);
        assert!(bond.contains(1));
        assert!(!bond.contains(2));
        assert_eq!(bond.partner(3), Some(1));
        assert_eq!(bond.partner(7), None);
    }

    #[test]
    fn bond_order_from_str_is_case_insensitive() {
        assert_eq!(BondOrder::from_str("AR").unwrap(), BondOrder::Aromatic);
        assert_eq!(BondOrder::from_str("Double").unwrap(), BondOrder::Double);
        assert_eq!(BondOrder::from_str("2").unwrap(), BondOrder::Double);
        assert!(BondOrder::from_str("quadruple").is_err());
    }

    #[test]
    fn bond_order_display_and_repr() {
        assert_eq!(BondOrder::Triple.to_string(), "Triple");
        assert_eq!(BondOrder::Aromatic as u8, 4);
        assert_eq!(BondOrder::default(), BondOrder::Single);
    }
}
