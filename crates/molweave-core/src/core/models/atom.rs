use super::element::Element;
use super::properties::{PropertyMap, PropertyValue, Properties, names};
use nalgebra::Point3;

/// An atom of a [`Molecule`](super::molecule::Molecule).
///
/// Identity and residue bookkeeping live in plain fields; everything a
/// caller may want to rename (coordinates, element, charges, types) lives in
/// the property table and is always accessed through a [`PropertyMap`].
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g. "CA", "H12").
    pub name: String,
    /// Three-letter name of the residue this atom belongs to.
    pub residue_name: String,
    /// Residue sequence number as read from the input file.
    pub residue_number: isize,
    /// Single-character chain identifier.
    pub chain_id: char,
    /// Name-indirected attribute table.
    pub properties: Properties,
}

impl Atom {
    /// Creates an atom with its element and position stored under the
    /// canonical property names.
    pub fn new(name: &str, element: Element, position: Point3<f64>) -> Self {
        let mut properties = Properties::new();
        properties.set(names::ELEMENT, PropertyValue::Element(element));
        properties.set(names::COORDINATES, PropertyValue::Point(position));
        Self {
            name: name.to_string(),
            residue_name: "MOL".to_string(),
            residue_number: 1,
            chain_id: 'A',
            properties,
        }
    }

    pub fn with_residue(mut self, residue_name: &str, residue_number: isize) -> Self {
        self.residue_name = residue_name.to_string();
        self.residue_number = residue_number;
        self
    }

    pub fn position(&self, map: &PropertyMap) -> Option<Point3<f64>> {
        self.properties.point(map.get(names::COORDINATES))
    }

    pub fn set_position(&mut self, map: &PropertyMap, position: Point3<f64>) {
        self.properties
            .set(map.get(names::COORDINATES), PropertyValue::Point(position));
    }

    /// Returns the element, guessing from the atom name when the property is
    /// absent and falling back to the dummy element.
    pub fn element(&self, map: &PropertyMap) -> Element {
        self.properties
            .element(map.get(names::ELEMENT))
            .or_else(|| Element::guess_from_atom_name(&self.name))
            .unwrap_or(Element::DUMMY)
    }

    pub fn charge(&self, map: &PropertyMap) -> Option<f64> {
        self.properties.real(map.get(names::CHARGE))
    }

    pub fn set_charge(&mut self, map: &PropertyMap, charge: f64) {
        self.properties
            .set(map.get(names::CHARGE), PropertyValue::Real(charge));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_stores_element_and_position_under_canonical_names() {
        let atom = Atom::new("C1", Element::CARBON, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(
            atom.properties.point("coordinates"),
            Some(Point3::new(1.0, 2.0, 3.0))
        );
        assert_eq!(atom.properties.element("element"), Some(Element::CARBON));
        assert_eq!(atom.residue_name, "MOL");
        assert_eq!(atom.chain_id, 'A');
    }

    #[test]
    fn accessors_honour_property_aliases() {
        let map = PropertyMap::new()
            .with_alias("coordinates", "coords")
            .with_alias("charge", "my-charge");
        let mut atom = Atom::new("O", Element::OXYGEN, Point3::origin());

        assert_eq!(atom.position(&map), None);
        atom.set_position(&map, Point3::new(0.5, 0.0, 0.0));
        atom.set_charge(&map, -0.8);

        assert_eq!(atom.position(&map), Some(Point3::new(0.5, 0.0, 0.0)));
        assert_eq!(atom.properties.real("my-charge"), Some(-0.8));
        assert_eq!(atom.charge(&PropertyMap::new()), None);
    }

    #[test]
    fn element_falls_back_to_name_guess() {
        let mut atom = Atom::new("N1", Element::NITROGEN, Point3::origin());
        atom.properties.remove("element");
        assert_eq!(atom.element(&PropertyMap::new()), Element::NITROGEN);

        atom.name = "123".to_string();
        assert_eq!(atom.element(&PropertyMap::new()), Element::DUMMY);
    }

    #[test]
    fn with_residue_sets_residue_fields() {
        let atom = Atom::new("CA", Element::CARBON, Point3::origin()).with_residue("ALA", 7);
        assert_eq!(atom.residue_name, "ALA");
        assert_eq!(atom.residue_number, 7);
    }
}
