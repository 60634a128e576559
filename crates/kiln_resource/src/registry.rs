//! The resource catalog and its per-composition allocation set.

use crate::descriptor::{ResourceDescriptor, ResourceKey};
use crate::error::ResourceError;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Immutable catalog of a board's physical resources.
///
/// Entries are keyed by `(name, index)`. The registry itself never records
/// which resources are in use; that state lives in an [`Allocation`], so one
/// catalog can back any number of independent compositions.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    entries: BTreeMap<String, BTreeMap<u32, ResourceDescriptor>>,
    order: Vec<ResourceKey>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a pin table, stopping at the first invalid entry.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ResourceDescriptor>,
    ) -> Result<Self, ResourceError> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Adds a descriptor to the catalog.
    ///
    /// Fails with [`ResourceError::DuplicateResource`] if `(name, index)` is
    /// already present and [`ResourceError::EmptyPins`] if the descriptor has
    /// no pins or an empty pin group.
    pub fn register(&mut self, descriptor: ResourceDescriptor) -> Result<(), ResourceError> {
        if descriptor.groups.is_empty() || descriptor.groups.iter().any(|g| g.pins.is_empty()) {
            return Err(ResourceError::EmptyPins {
                name: descriptor.name,
                index: descriptor.index,
            });
        }
        let instances = self.entries.entry(descriptor.name.clone()).or_default();
        if instances.contains_key(&descriptor.index) {
            return Err(ResourceError::DuplicateResource {
                name: descriptor.name,
                index: descriptor.index,
            });
        }
        self.order.push(descriptor.key());
        instances.insert(descriptor.index, descriptor);
        Ok(())
    }

    /// Returns the descriptor for `(name, index)` without binding it.
    pub fn lookup(&self, name: &str, index: u32) -> Option<&ResourceDescriptor> {
        self.entries.get(name).and_then(|m| m.get(&index))
    }

    /// Returns `true` if `(name, index)` is registered.
    pub fn contains(&self, name: &str, index: u32) -> bool {
        self.lookup(name, index).is_some()
    }

    /// Iterates over every instance registered under `name`, in index order.
    pub fn instances<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a ResourceDescriptor> {
        self.entries.get(name).into_iter().flat_map(|m| m.values())
    }

    /// Returns the number of instances registered under `name`.
    pub fn instance_count(&self, name: &str) -> usize {
        self.entries.get(name).map_or(0, BTreeMap::len)
    }

    /// Iterates over all descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.order
            .iter()
            .filter_map(|key| self.lookup(&key.name, key.index))
    }

    /// Returns the number of registered descriptors.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Opens a fresh allocation set against this catalog.
    pub fn allocate(&self) -> Allocation<'_> {
        Allocation {
            registry: self,
            bound: HashSet::new(),
            order: Vec::new(),
        }
    }
}

/// The set of resources bound during one composition.
///
/// Every `(name, index)` can be bound at most once. Dropping the allocation
/// releases everything, which is how a failed composition discards its
/// partial state.
#[derive(Debug)]
pub struct Allocation<'r> {
    registry: &'r ResourceRegistry,
    bound: HashSet<ResourceKey>,
    order: Vec<ResourceKey>,
}

impl<'r> Allocation<'r> {
    /// Returns the catalog this allocation binds from.
    pub fn registry(&self) -> &'r ResourceRegistry {
        self.registry
    }

    /// Binds `(name, index)` and returns its descriptor.
    pub fn request(&mut self, name: &str, index: u32) -> Result<&'r ResourceDescriptor, ResourceError> {
        let descriptor =
            self.registry
                .lookup(name, index)
                .ok_or_else(|| ResourceError::UnknownResource {
                    name: name.to_string(),
                    index: Some(index),
                })?;
        self.bind(descriptor)?;
        Ok(descriptor)
    }

    /// Probes for `(name, index)`, binding it if present.
    ///
    /// Returns `None` instead of failing when the resource is not on the
    /// board. A resource that is already bound is returned as-is.
    pub fn request_loose(&mut self, name: &str, index: u32) -> Option<&'r ResourceDescriptor> {
        let descriptor = self.registry.lookup(name, index)?;
        if !self.is_bound(name, index) {
            // Cannot fail: the key was just checked as unbound.
            let _ = self.bind(descriptor);
        }
        Some(descriptor)
    }

    /// Binds every instance of `name` and returns them in index order.
    ///
    /// Either all instances are bound or none are.
    pub fn request_all(&mut self, name: &str) -> Result<Vec<&'r ResourceDescriptor>, ResourceError> {
        let registry = self.registry;
        let instances: Vec<&'r ResourceDescriptor> = registry.instances(name).collect();
        if instances.is_empty() {
            return Err(ResourceError::UnknownResource {
                name: name.to_string(),
                index: None,
            });
        }
        if let Some(taken) = instances.iter().find(|d| self.is_bound(&d.name, d.index)) {
            return Err(ResourceError::ResourceAlreadyBound {
                name: taken.name.clone(),
                index: taken.index,
            });
        }
        for descriptor in &instances {
            self.bind(descriptor)?;
        }
        Ok(instances)
    }

    /// Returns `true` if `(name, index)` is bound in this allocation.
    pub fn is_bound(&self, name: &str, index: u32) -> bool {
        self.bound.contains(&ResourceKey::new(name, index))
    }

    /// Returns the bound keys in binding order.
    pub fn bound(&self) -> &[ResourceKey] {
        &self.order
    }

    /// Consumes the allocation, publishing the bound keys in binding order.
    pub fn into_bindings(self) -> Vec<ResourceKey> {
        self.order
    }

    fn bind(&mut self, descriptor: &ResourceDescriptor) -> Result<(), ResourceError> {
        let key = descriptor.key();
        if !self.bound.insert(key.clone()) {
            return Err(ResourceError::ResourceAlreadyBound {
                name: key.name,
                index: key.index,
            });
        }
        debug!(resource = %key, "bound resource");
        self.order.push(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PinGroup;

    fn catalog() -> ResourceRegistry {
        ResourceRegistry::from_descriptors([
            ResourceDescriptor::new("clk50", 0)
                .pins("G22")
                .io_standard("LVCMOS33"),
            ResourceDescriptor::new("user_led", 0).pins("A23"),
            ResourceDescriptor::new("user_led", 2).pins("D23"),
            ResourceDescriptor::new("user_led", 1).pins("A24"),
            ResourceDescriptor::new("serial", 0)
                .subsignal(PinGroup::subsignal("tx", "C22"))
                .subsignal(PinGroup::subsignal("rx", "B20")),
        ])
        .unwrap()
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut reg = catalog();
        let err = reg
            .register(ResourceDescriptor::new("user_led", 1).pins("Z1"))
            .unwrap_err();
        assert_eq!(
            err,
            ResourceError::DuplicateResource {
                name: "user_led".to_string(),
                index: 1
            }
        );
        assert_eq!(reg.len(), 5);
    }

    #[test]
    fn empty_pin_groups_rejected() {
        let mut reg = ResourceRegistry::new();
        assert!(matches!(
            reg.register(ResourceDescriptor::new("nothing", 0)),
            Err(ResourceError::EmptyPins { .. })
        ));
        assert!(matches!(
            reg.register(ResourceDescriptor::new("blank", 0).pins("   ")),
            Err(ResourceError::EmptyPins { .. })
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn request_binds_once() {
        let reg = catalog();
        let mut alloc = reg.allocate();
        let clk = alloc.request("clk50", 0).unwrap();
        assert_eq!(clk.all_pins().collect::<Vec<_>>(), vec!["G22"]);
        assert!(alloc.is_bound("clk50", 0));
        let err = alloc.request("clk50", 0).unwrap_err();
        assert!(matches!(err, ResourceError::ResourceAlreadyBound { .. }));
    }

    #[test]
    fn request_unknown_fails() {
        let reg = catalog();
        let mut alloc = reg.allocate();
        let err = alloc.request("user_led", 7).unwrap_err();
        assert_eq!(
            err,
            ResourceError::UnknownResource {
                name: "user_led".to_string(),
                index: Some(7)
            }
        );
        assert!(alloc.bound().is_empty());
    }

    #[test]
    fn loose_request_returns_absent() {
        let reg = catalog();
        let mut alloc = reg.allocate();
        assert!(alloc.request_loose("cpu_reset_n", 0).is_none());
        assert!(alloc.request_loose("clk50", 0).is_some());
        assert!(alloc.request_loose("clk50", 0).is_some());
        assert_eq!(alloc.bound().len(), 1);
    }

    #[test]
    fn strict_after_loose_fails() {
        let reg = catalog();
        let mut alloc = reg.allocate();
        alloc.request_loose("serial", 0).unwrap();
        assert!(matches!(
            alloc.request("serial", 0),
            Err(ResourceError::ResourceAlreadyBound { .. })
        ));
    }

    #[test]
    fn request_all_in_index_order() {
        let reg = catalog();
        let mut alloc = reg.allocate();
        let leds = alloc.request_all("user_led").unwrap();
        let indices: Vec<u32> = leds.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(alloc.bound().len(), 3);
    }

    #[test]
    fn request_all_unknown_family() {
        let reg = catalog();
        let mut alloc = reg.allocate();
        assert_eq!(
            alloc.request_all("user_btn").unwrap_err(),
            ResourceError::UnknownResource {
                name: "user_btn".to_string(),
                index: None
            }
        );
    }

    #[test]
    fn request_all_is_atomic() {
        let reg = catalog();
        let mut alloc = reg.allocate();
        alloc.request("user_led", 1).unwrap();
        let err = alloc.request_all("user_led").unwrap_err();
        assert_eq!(
            err,
            ResourceError::ResourceAlreadyBound {
                name: "user_led".to_string(),
                index: 1
            }
        );
        assert!(!alloc.is_bound("user_led", 0));
        assert!(!alloc.is_bound("user_led", 2));
    }

    #[test]
    fn allocations_are_independent() {
        let reg = catalog();
        let mut a = reg.allocate();
        let mut b = reg.allocate();
        a.request("clk50", 0).unwrap();
        b.request("clk50", 0).unwrap();
        assert_eq!(a.into_bindings(), vec![ResourceKey::new("clk50", 0)]);
    }

    #[test]
    fn iteration_keeps_registration_order() {
        let reg = catalog();
        let names: Vec<String> = reg.iter().map(|d| d.key().to_string()).collect();
        assert_eq!(
            names,
            vec!["clk50:0", "user_led:0", "user_led:2", "user_led:1", "serial:0"]
        );
        assert_eq!(reg.instance_count("user_led"), 3);
        assert_eq!(reg.instance_count("eth"), 0);
        assert!(reg.contains("serial", 0));
    }
}
