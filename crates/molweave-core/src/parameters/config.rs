use super::net_charge::NetCharge;
use crate::core::models::properties::PropertyMap;
use std::path::PathBuf;

/// Options for [`parameterise`](super::parameterise).
#[derive(Debug, Clone, Default)]
pub struct ParameteriseOptions {
    /// Where to run the tool-chain. `None` creates a fresh directory under
    /// the system temporary directory, which is kept after the run.
    pub work_dir: Option<PathBuf>,
    pub property_map: PropertyMap,
    /// Net charge for the GAFF protocols. Ignored by the other force fields.
    pub net_charge: Option<NetCharge>,
}

impl ParameteriseOptions {
    pub fn builder() -> ParameteriseOptionsBuilder {
        ParameteriseOptionsBuilder::default()
    }
}

#[derive(Default)]
pub struct ParameteriseOptionsBuilder {
    work_dir: Option<PathBuf>,
    property_map: Option<PropertyMap>,
    net_charge: Option<NetCharge>,
}

impl ParameteriseOptionsBuilder {
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }
    pub fn property_map(mut self, map: PropertyMap) -> Self {
        self.property_map = Some(map);
        self
    }
    pub fn net_charge(mut self, charge: impl Into<NetCharge>) -> Self {
        self.net_charge = Some(charge.into());
        self
    }

    pub fn build(self) -> ParameteriseOptions {
        ParameteriseOptions {
            work_dir: self.work_dir,
            property_map: self.property_map.unwrap_or_default(),
            net_charge: self.net_charge,
        }
    }
}
