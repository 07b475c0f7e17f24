use super::element::Element;
use nalgebra::Point3;
use std::collections::HashMap;

/// Canonical property names used throughout the library.
pub mod names {
    pub const COORDINATES: &str = "coordinates";
    pub const ELEMENT: &str = "element";
    pub const CHARGE: &str = "charge";
    pub const MASS: &str = "mass";
    pub const AMBER_TYPE: &str = "ambertype";
    pub const FORMAL_CHARGE: &str = "formal_charge";
}

/// A caller-supplied renaming table for molecular attribute names.
///
/// Every read or write of an atom property inside the library asks the map
/// for the name to use, so a caller storing charges under `"my-charge"`
/// passes `{"charge": "my-charge"}` and nothing else changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    aliases: HashMap<String, String>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, canonical: &str, alias: &str) -> Self {
        self.aliases.insert(canonical.to_string(), alias.to_string());
        self
    }

    /// Resolves a canonical property name to the name the caller uses for it.
    pub fn get<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.aliases
            .get(canonical)
            .map(String::as_str)
            .unwrap_or(canonical)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            aliases: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Point(Point3<f64>),
    Element(Element),
    Real(f64),
    Integer(i64),
    Text(String),
}

/// Per-atom property table keyed by (possibly aliased) property name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    values: HashMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: PropertyValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.values.iter()
    }

    pub fn point(&self, name: &str) -> Option<Point3<f64>> {
        match self.values.get(name) {
            Some(PropertyValue::Point(p)) => Some(*p),
            _ => None,
        }
    }

    pub fn element(&self, name: &str) -> Option<Element> {
        match self.values.get(name) {
            Some(PropertyValue::Element(e)) => Some(*e),
            _ => None,
        }
    }

    pub fn real(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(PropertyValue::Real(v)) => Some(*v),
            Some(PropertyValue::Integer(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(PropertyValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}
