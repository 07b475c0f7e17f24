use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

struct ElementData {
    symbol: &'static str,
    atomic_number: u8,
    mass: f64,
    covalent_radius: f64,
}

macro_rules! element {
    ($sym:expr, $z:expr, $mass:expr, $radius:expr) => {
        ElementData {
            symbol: $sym,
            atomic_number: $z,
            mass: $mass,
            covalent_radius: $radius,
        }
    };
}

// Covalent radii follow Cordero et al. (2008), in Angstroms.
static ELEMENT_TABLE: &[ElementData] = &[
    element!("Xx", 0, 0.0, 0.0),
    element!("H", 1, 1.008, 0.31),
    element!("He", 2, 4.0026, 0.28),
    element!("Li", 3, 6.94, 1.28),
    element!("Be", 4, 9.0122, 0.96),
    element!("B", 5, 10.81, 0.84),
    element!("C", 6, 12.011, 0.76),
    element!("N", 7, 14.007, 0.71),
    element!("O", 8, 15.999, 0.66),
    element!("F", 9, 18.998, 0.57),
    element!("Ne", 10, 20.180, 0.58),
    element!("Na", 11, 22.990, 1.66),
    element!("Mg", 12, 24.305, 1.41),
    element!("Al", 13, 26.982, 1.21),
    element!("Si", 14, 28.085, 1.11),
    element!("P", 15, 30.974, 1.07),
    element!("S", 16, 32.06, 1.05),
    element!("Cl", 17, 35.45, 1.02),
    element!("Ar", 18, 39.948, 1.06),
    element!("K", 19, 39.098, 2.03),
    element!("Ca", 20, 40.078, 1.76),
    element!("Sc", 21, 44.956, 1.70),
    element!("Ti", 22, 47.867, 1.60),
    element!("V", 23, 50.942, 1.53),
    element!("Cr", 24, 51.996, 1.39),
    element!("Mn", 25, 54.938, 1.39),
    element!("Fe", 26, 55.845, 1.32),
    element!("Co", 27, 58.933, 1.26),
    element!("Ni", 28, 58.693, 1.24),
    element!("Cu", 29, 63.546, 1.32),
    element!("Zn", 30, 65.38, 1.22),
    element!("Ga", 31, 69.723, 1.22),
    element!("Ge", 32, 72.630, 1.20),
    element!("As", 33, 74.922, 1.19),
    element!("Se", 34, 78.971, 1.20),
    element!("Br", 35, 79.904, 1.20),
    element!("Kr", 36, 83.798, 1.16),
    element!("Ag", 47, 107.87, 1.45),
    element!("I", 53, 126.90, 1.39),
    element!("Xe", 54, 131.29, 1.40),
];

static SYMBOL_TO_NUMBER: Map<&'static str, u8> = phf_map! {
    "XX" => 0, "DU" => 0,
    "H" => 1, "D" => 1, "HE" => 2, "LI" => 3, "BE" => 4, "B" => 5, "C" => 6, "N" => 7,
    "O" => 8, "F" => 9, "NE" => 10, "NA" => 11, "MG" => 12, "AL" => 13, "SI" => 14,
    "P" => 15, "S" => 16, "CL" => 17, "AR" => 18, "K" => 19, "CA" => 20, "SC" => 21,
    "TI" => 22, "V" => 23, "CR" => 24, "MN" => 25, "FE" => 26, "CO" => 27, "NI" => 28,
    "CU" => 29, "ZN" => 30, "GA" => 31, "GE" => 32, "AS" => 33, "SE" => 34, "BR" => 35,
    "KR" => 36, "AG" => 47, "I" => 53, "XE" => 54,
};

/// A chemical element identified by its atomic number.
///
/// Atomic number zero is the dummy element `Xx`, used for atoms that do not
/// exist in one end state of a merged molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Element(u8);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element symbol: '{0}'")]
pub struct ParseElementError(pub String);

impl Element {
    pub const DUMMY: Element = Element(0);
    pub const HYDROGEN: Element = Element(1);
    pub const CARBON: Element = Element(6);
    pub const NITROGEN: Element = Element(7);
    pub const OXYGEN: Element = Element(8);
    pub const SULFUR: Element = Element(16);

    pub fn from_atomic_number(number: u8) -> Option<Self> {
        ELEMENT_TABLE
            .iter()
            .any(|e| e.atomic_number == number)
            .then_some(Element(number))
    }

    /// Picks the tabulated element whose standard mass is closest to `mass`,
    /// accepting a deviation of up to 0.6 Da.
    pub fn from_mass(mass: f64) -> Option<Self> {
        ELEMENT_TABLE
            .iter()
            .skip(1)
            .map(|e| (e, (e.mass - mass).abs()))
            .filter(|(_, delta)| *delta <= 0.6)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(e, _)| Element(e.atomic_number))
    }

    /// Guesses the element from a PDB-style atom name (e.g. "CA" -> carbon,
    /// "1HB" -> hydrogen, "CL1" -> chlorine).
    pub fn guess_from_atom_name(name: &str) -> Option<Self> {
        let letters: String = name
            .trim()
            .chars()
            .skip_while(|c| c.is_ascii_digit())
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        if letters.is_empty() {
            return None;
        }
        let upper = letters.to_ascii_uppercase();
        // Only halogens are read as two-letter symbols; "CA" is an alpha carbon.
        if upper.starts_with("CL") || upper.starts_with("BR") {
            return SYMBOL_TO_NUMBER.get(&upper[..2]).map(|&z| Element(z));
        }
        SYMBOL_TO_NUMBER.get(&upper[..1]).map(|&z| Element(z))
    }

    fn data(&self) -> &'static ElementData {
        ELEMENT_TABLE
            .iter()
            .find(|e| e.atomic_number == self.0)
            .unwrap_or(&ELEMENT_TABLE[0])
    }

    pub fn atomic_number(&self) -> u8 {
        self.0
    }

    pub fn symbol(&self) -> &'static str {
        self.data().symbol
    }

    pub fn mass(&self) -> f64 {
        self.data().mass
    }

    pub fn covalent_radius(&self) -> f64 {
        self.data().covalent_radius
    }

    pub fn is_dummy(&self) -> bool {
        self.0 == 0
    }

    pub fn is_hydrogen(&self) -> bool {
        self.0 == 1
    }
}

impl Default for Element {
    fn default() -> Self {
        Element::DUMMY
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SYMBOL_TO_NUMBER
            .get(s.trim().to_ascii_uppercase().as_str())
            .map(|&z| Element(z))
            .ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
