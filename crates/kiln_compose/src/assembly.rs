//! The composed, read-only target.

use crate::capability::{SubsystemHandle, SubsystemKind};
use crate::features::FeatureSet;
use kiln_board::{DefaultClock, DeviceDescriptor};
use kiln_clock::FinalizedClockGraph;
use kiln_common::{ContentHash, Frequency};
use kiln_resource::{ResourceDescriptor, ResourceKey, ResourceRegistry};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// One instantiated subsystem and what it consumed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsystemBinding {
    /// Subsystem kind.
    pub kind: SubsystemKind,
    /// Clock domains the subsystem runs on, beyond `sys`.
    pub required_domains: BTreeSet<String>,
    /// Resources bound for the subsystem, in request order.
    pub required_resources: Vec<ResourceKey>,
    /// Opaque handle returned by the provider.
    pub handle: SubsystemHandle,
}

/// A fully composed SoC target.
///
/// Produced only by [`Composer::compose`](crate::Composer::compose) and
/// immutable afterwards. It serializes to the JSON manifest consumed by the
/// build collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct TargetAssembly {
    pub(crate) ident: String,
    pub(crate) board: String,
    pub(crate) device: DeviceDescriptor,
    pub(crate) sys_clk_freq: Frequency,
    pub(crate) features: FeatureSet,
    pub(crate) clocks: FinalizedClockGraph,
    pub(crate) bindings: Vec<SubsystemBinding>,
    pub(crate) resources: Vec<ResourceKey>,
    pub(crate) notes: Vec<String>,
    #[serde(skip)]
    pub(crate) registry: Arc<ResourceRegistry>,
}

impl TargetAssembly {
    /// Returns the SoC identification string.
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Returns the board catalog name.
    pub fn board(&self) -> &str {
        &self.board
    }

    /// Returns the device part number.
    pub fn device(&self) -> &str {
        &self.device.part
    }

    /// Returns the device descriptor handed to programmers.
    pub fn device_descriptor(&self) -> &DeviceDescriptor {
        &self.device
    }

    /// Returns the board's primary oscillator.
    pub fn default_clock(&self) -> &DefaultClock {
        &self.device.default_clock
    }

    /// Returns the system clock frequency.
    pub fn sys_clk_freq(&self) -> Frequency {
        self.sys_clk_freq
    }

    /// Returns the features the target was composed with.
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Returns the finalized clock graph.
    pub fn clock_graph(&self) -> &FinalizedClockGraph {
        &self.clocks
    }

    /// Returns the subsystem bindings in composition order.
    pub fn bindings(&self) -> &[SubsystemBinding] {
        &self.bindings
    }

    /// Returns the binding of a subsystem kind, if it was composed in.
    pub fn subsystem(&self, kind: SubsystemKind) -> Option<&SubsystemBinding> {
        self.bindings.iter().find(|b| b.kind == kind)
    }

    /// Returns every bound resource in bind order.
    pub fn resources(&self) -> &[ResourceKey] {
        &self.resources
    }

    /// Iterates over the descriptors of the bound resources, in bind order.
    pub fn bound_descriptors(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources
            .iter()
            .filter_map(|key| self.registry.lookup(&key.name, key.index))
    }

    /// Returns the board's full pin catalog.
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Returns informational notes recorded during composition.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Returns a hash identifying everything that affects build outputs.
    ///
    /// Covers the canonical JSON manifest plus the pins and electrical
    /// attributes of every bound resource. Two assemblies with equal
    /// fingerprints write identical manifests, constraint files and build
    /// scripts.
    pub fn fingerprint(&self) -> ContentHash {
        // Every map in the manifest is string-keyed, so serialization cannot fail.
        let mut parts: Vec<Vec<u8>> = vec![serde_json::to_vec(self).unwrap_or_default()];
        for descriptor in self.bound_descriptors() {
            parts.push(descriptor.key().to_string().into_bytes());
            for group in &descriptor.groups {
                parts.push(group.pins.join(" ").into_bytes());
                for (key, value) in descriptor.effective_attrs(group) {
                    parts.push(format!("{key}={value}").into_bytes());
                }
            }
        }
        ContentHash::from_parts(parts.iter().map(Vec::as_slice))
    }

    /// Renders the assembly manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
