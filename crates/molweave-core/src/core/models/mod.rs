//! # Core Models Module
//!
//! Data structures describing molecules and the relationships between them.
//!
//! ## Key Components
//!
//! - [`element`] - Chemical elements with masses and covalent radii
//! - [`properties`] - Per-atom property tables and the caller-supplied [`properties::PropertyMap`]
//! - [`atom`] - Individual atoms with residue bookkeeping
//! - [`topology`] - Bonds and bond orders
//! - [`molecule`] - Molecules with connectivity, bond perception and ring detection
//! - [`mapping`] - Atom index correspondences between two molecules
//! - [`merged`] - Dual-topology molecules built from a mapping
//!
//! ## Usage
//!
//! ```ignore
//! use molweave::core::models::{atom::Atom, element::Element, molecule::Molecule};
//!
//! let mut mol = Molecule::new("water");
//! let o = mol.add_atom(Atom::new("O", Element::OXYGEN, Point3::origin()));
//! let h = mol.add_atom(Atom::new("H1", Element::HYDROGEN, Point3::new(0.96, 0.0, 0.0)));
//! mol.add_bond(o, h, BondOrder::Single)?;
//! ```

pub mod atom;
pub mod element;
pub mod mapping;
pub mod merged;
pub mod molecule;
pub mod properties;
pub mod topology;
