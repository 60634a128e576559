//! Typed resource descriptors: named, indexed pin groups with electrical attributes.
//!
//! Board tables are written with the small builder API on
//! [`ResourceDescriptor`] and [`PinGroup`]:
//!
//! ```
//! use kiln_resource::{AttrKey, PinGroup, ResourceDescriptor};
//!
//! let serial = ResourceDescriptor::new("serial", 0)
//!     .subsignal(PinGroup::subsignal("tx", "C22"))
//!     .subsignal(PinGroup::subsignal("rx", "B20"))
//!     .io_standard("LVCMOS33");
//! assert_eq!(serial.groups.len(), 2);
//! assert_eq!(serial.attrs[&AttrKey::IoStandard], "LVCMOS33");
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An electrical attribute key attached to a resource or one of its subsignals.
///
/// Keys render with the Xilinx property names used in XDC constraints.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AttrKey {
    /// Signaling standard (`IOSTANDARD`).
    IoStandard,
    /// Output slew rate (`SLEW`).
    Slew,
    /// Internal pull-up (`PULLUP`).
    Pullup,
    /// Output drive strength in mA (`DRIVE`).
    Drive,
    /// Auxiliary I/O supply level (`VCCAUX_IO`).
    VccauxIo,
    /// Any other vendor property, stored upper-cased.
    Misc(String),
}

impl AttrKey {
    /// Returns the property name as written in constraint files.
    pub fn property_name(&self) -> &str {
        match self {
            AttrKey::IoStandard => "IOSTANDARD",
            AttrKey::Slew => "SLEW",
            AttrKey::Pullup => "PULLUP",
            AttrKey::Drive => "DRIVE",
            AttrKey::VccauxIo => "VCCAUX_IO",
            AttrKey::Misc(name) => name,
        }
    }

    /// Splits a free-form `"KEY=VALUE"` or `"KEY VALUE"` attribute into a typed pair.
    ///
    /// Values are upper-cased; a bare key with no value becomes `TRUE`.
    pub fn parse_misc(text: &str) -> (AttrKey, String) {
        let text = text.trim();
        let (key, value) = match text.split_once(['=', ' ']) {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (text, "TRUE"),
        };
        (AttrKey::from(key.to_string()), value.to_ascii_uppercase())
    }
}

impl From<String> for AttrKey {
    fn from(name: String) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "IOSTANDARD" | "IO_STANDARD" => AttrKey::IoStandard,
            "SLEW" => AttrKey::Slew,
            "PULLUP" => AttrKey::Pullup,
            "DRIVE" => AttrKey::Drive,
            "VCCAUX_IO" => AttrKey::VccauxIo,
            other => AttrKey::Misc(other.to_string()),
        }
    }
}

impl From<AttrKey> for String {
    fn from(key: AttrKey) -> Self {
        key.property_name().to_string()
    }
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.property_name())
    }
}

/// Ordered electrical attribute map.
pub type Attrs = BTreeMap<AttrKey, String>;

/// The catalog key of a resource: its logical name and instance index.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Logical resource name (e.g. `user_led`).
    pub name: String,
    /// Instance index (e.g. `3` for the fourth LED).
    pub index: u32,
}

impl ResourceKey {
    /// Creates a key from a name and index.
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.index)
    }
}

/// One group of pins, optionally named as a subsignal (e.g. `tx`, `dq`).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PinGroup {
    /// Subsignal name; `None` for single-signal resources such as `clk50`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsignal: Option<String>,
    /// Package pins in bit order.
    #[serde(deserialize_with = "deserialize_pins")]
    pub pins: Vec<String>,
    /// Attributes overriding the resource-level ones for this group.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,
}

impl PinGroup {
    /// Creates an unnamed pin group from a whitespace-separated pin list.
    pub fn pins(pins: &str) -> Self {
        Self {
            subsignal: None,
            pins: split_pins(pins),
            attrs: Attrs::new(),
        }
    }

    /// Creates a named subsignal from a whitespace-separated pin list.
    pub fn subsignal(name: &str, pins: &str) -> Self {
        Self {
            subsignal: Some(name.to_string()),
            ..Self::pins(pins)
        }
    }

    /// Sets the signaling standard of this group.
    pub fn io_standard(self, standard: &str) -> Self {
        self.attr(AttrKey::IoStandard, standard)
    }

    /// Adds a free-form attribute such as `"PULLUP True"`.
    pub fn misc(self, text: &str) -> Self {
        let (key, value) = AttrKey::parse_misc(text);
        self.attr(key, &value)
    }

    /// Sets an attribute on this group.
    pub fn attr(mut self, key: AttrKey, value: &str) -> Self {
        self.attrs.insert(key, value.to_string());
        self
    }

    /// Returns the number of pins (bus width) in this group.
    pub fn width(&self) -> usize {
        self.pins.len()
    }
}

/// A named, indexed physical resource with one or more pin groups.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Logical name shared by all instances (e.g. `user_btn`).
    pub name: String,
    /// Instance index, unique per name.
    #[serde(default)]
    pub index: u32,
    /// Pin groups in declaration order.
    #[serde(default, rename = "subsignals")]
    pub groups: Vec<PinGroup>,
    /// Attributes applied to every group unless overridden.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,
}

impl ResourceDescriptor {
    /// Starts a descriptor with no pin groups.
    pub fn new(name: &str, index: u32) -> Self {
        Self {
            name: name.to_string(),
            index,
            groups: Vec::new(),
            attrs: Attrs::new(),
        }
    }

    /// Adds an unnamed pin group.
    pub fn pins(mut self, pins: &str) -> Self {
        self.groups.push(PinGroup::pins(pins));
        self
    }

    /// Adds a named subsignal.
    pub fn subsignal(mut self, group: PinGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Sets the resource-wide signaling standard.
    pub fn io_standard(self, standard: &str) -> Self {
        self.attr(AttrKey::IoStandard, standard)
    }

    /// Adds a resource-wide free-form attribute such as `"SLEW=FAST"`.
    pub fn misc(self, text: &str) -> Self {
        let (key, value) = AttrKey::parse_misc(text);
        self.attr(key, &value)
    }

    /// Sets a resource-wide drive strength in mA.
    pub fn drive(self, milliamps: u32) -> Self {
        self.attr(AttrKey::Drive, &milliamps.to_string())
    }

    /// Sets a resource-wide attribute.
    pub fn attr(mut self, key: AttrKey, value: &str) -> Self {
        self.attrs.insert(key, value.to_string());
        self
    }

    /// Returns the catalog key of this descriptor.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.name.clone(), self.index)
    }

    /// Returns the group with the given subsignal name.
    pub fn group(&self, subsignal: &str) -> Option<&PinGroup> {
        self.groups
            .iter()
            .find(|g| g.subsignal.as_deref() == Some(subsignal))
    }

    /// Returns the attributes in force for `group`: resource attrs overlaid by group attrs.
    pub fn effective_attrs(&self, group: &PinGroup) -> Attrs {
        let mut attrs = self.attrs.clone();
        for (key, value) in &group.attrs {
            attrs.insert(key.clone(), value.clone());
        }
        attrs
    }

    /// Iterates over every package pin of this resource.
    pub fn all_pins(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|g| g.pins.iter().map(String::as_str))
    }
}

fn split_pins(pins: &str) -> Vec<String> {
    pins.split_whitespace().map(str::to_string).collect()
}

/// Accepts pins either as one whitespace-separated string or as a list.
fn deserialize_pins<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PinList;

    impl<'de> Visitor<'de> for PinList {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a pin string or a list of pins")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(split_pins(v))
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut pins = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                pins.extend(split_pins(&val));
            }
            Ok(pins)
        }
    }

    deserializer.deserialize_any(PinList)
}
