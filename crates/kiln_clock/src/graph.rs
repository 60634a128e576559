//! The append-only clock graph builder and its finalized form.

use crate::domain::{ClockDomain, DeriveSpec, DomainSource, FalsePath, Purpose};
use crate::error::ClockError;
use crate::ids::SynthesizerId;
use crate::synthesizer::{self, OutputRequest, SolvedSynthesizer, Synthesizer, SynthesizerLimits};
use kiln_common::Frequency;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Builder for a clock-domain derivation graph.
///
/// Nodes are domains; an edge runs from each derived domain's upstream to the
/// domain itself. Because [`derive`](Self::derive) rejects unknown upstreams
/// and nothing is ever removed, node insertion order is a topological order.
#[derive(Debug, Default)]
pub struct ClockGraph {
    graph: DiGraph<ClockDomain, ()>,
    by_name: HashMap<String, NodeIndex>,
    synthesizers: BTreeMap<SynthesizerId, Synthesizer>,
    next_synthesizer: u32,
    false_paths: BTreeSet<FalsePath>,
}

impl ClockGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root domain driven by an external oscillator.
    pub fn add_root(&mut self, name: &str, frequency: Frequency) -> Result<(), ClockError> {
        self.insert_root(name, frequency, None)
    }

    /// Adds a root domain and records the pin resource the oscillator enters on.
    pub fn add_root_from(
        &mut self,
        name: &str,
        frequency: Frequency,
        resource: &str,
    ) -> Result<(), ClockError> {
        self.insert_root(name, frequency, Some(resource.to_string()))
    }

    fn insert_root(
        &mut self,
        name: &str,
        frequency: Frequency,
        resource: Option<String>,
    ) -> Result<(), ClockError> {
        if self.by_name.contains_key(name) {
            return Err(ClockError::DuplicateDomain {
                name: name.to_string(),
            });
        }
        check_frequency(name, frequency)?;
        let node = self.graph.add_node(ClockDomain {
            name: name.to_string(),
            frequency,
            source: DomainSource::Root { resource },
            margin: 0.0,
            purpose: Purpose::Reference,
        });
        self.by_name.insert(name.to_string(), node);
        debug!(domain = name, %frequency, "added root clock domain");
        Ok(())
    }

    /// Reserves the next synthesizer id under a human-readable instance name.
    ///
    /// Ids are handed out as 0, 1, 2, ... so a fixed sequence of calls always
    /// yields the same ids.
    pub fn new_synthesizer(&mut self, name: &str) -> SynthesizerId {
        let id = SynthesizerId::from_raw(self.next_synthesizer);
        self.next_synthesizer += 1;
        self.synthesizers.insert(
            id,
            Synthesizer {
                id,
                name: name.to_string(),
                upstream: None,
                outputs: Vec::new(),
            },
        );
        id
    }

    /// Derives `out_name` at an exact frequency from `upstream` through `synthesizer`.
    pub fn derive(
        &mut self,
        synthesizer: SynthesizerId,
        upstream: &str,
        out_name: &str,
        frequency: Frequency,
    ) -> Result<(), ClockError> {
        let spec = DeriveSpec::exact(frequency, Purpose::Custom(out_name.to_string()));
        self.derive_with(synthesizer, upstream, out_name, spec)
    }

    /// Derives `out_name` from `upstream` through `synthesizer` with explicit parameters.
    ///
    /// The first output of a synthesizer fixes its upstream; later outputs
    /// must name the same one. An id never returned by
    /// [`new_synthesizer`](Self::new_synthesizer) creates the instance on
    /// first use.
    pub fn derive_with(
        &mut self,
        synthesizer: SynthesizerId,
        upstream: &str,
        out_name: &str,
        spec: DeriveSpec,
    ) -> Result<(), ClockError> {
        let Some(&upstream_node) = self.by_name.get(upstream) else {
            return Err(ClockError::UnknownUpstream {
                name: out_name.to_string(),
                upstream: upstream.to_string(),
            });
        };
        if self.by_name.contains_key(out_name) {
            return Err(ClockError::DuplicateDomain {
                name: out_name.to_string(),
            });
        }
        check_frequency(out_name, spec.frequency)?;

        let instance = self.synthesizers.entry(synthesizer).or_insert_with(|| Synthesizer {
            id: synthesizer,
            name: synthesizer.to_string(),
            upstream: None,
            outputs: Vec::new(),
        });
        match &instance.upstream {
            Some(expected) if expected != upstream => {
                return Err(ClockError::SynthesizerUpstreamMismatch {
                    synthesizer,
                    expected: expected.clone(),
                    found: upstream.to_string(),
                });
            }
            Some(_) => {}
            None => instance.upstream = Some(upstream.to_string()),
        }
        instance.outputs.push(out_name.to_string());
        self.next_synthesizer = self.next_synthesizer.max(synthesizer.as_raw() + 1);

        let node = self.graph.add_node(ClockDomain {
            name: out_name.to_string(),
            frequency: spec.frequency,
            source: DomainSource::Derived {
                upstream: upstream.to_string(),
                synthesizer,
            },
            margin: spec.margin,
            purpose: spec.purpose,
        });
        self.graph.add_edge(upstream_node, node, ());
        self.by_name.insert(out_name.to_string(), node);
        debug!(
            domain = out_name,
            upstream,
            %synthesizer,
            frequency = %spec.frequency,
            "derived clock domain"
        );
        Ok(())
    }

    /// Declares that timing between `a` and `b` should not be analyzed.
    ///
    /// Purely declarative; the pair is carried through to the constraint
    /// output. Declaring the same pair twice (in either order) is a no-op.
    pub fn false_path(&mut self, a: &str, b: &str) -> Result<(), ClockError> {
        for name in [a, b] {
            if !self.by_name.contains_key(name) {
                return Err(ClockError::UnknownDomain {
                    name: name.to_string(),
                });
            }
        }
        self.false_paths.insert(FalsePath::between(a, b));
        Ok(())
    }

    /// Returns `true` if a domain with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Returns the domain with this name.
    pub fn domain(&self, name: &str) -> Option<&ClockDomain> {
        self.by_name.get(name).map(|&n| &self.graph[n])
    }

    /// Returns the first domain with this exact frequency and purpose.
    pub fn find_by_purpose(&self, frequency: Frequency, purpose: &Purpose) -> Option<&ClockDomain> {
        self.domains()
            .find(|d| d.frequency.key() == frequency.key() && &d.purpose == purpose)
    }

    /// Iterates over domains in insertion order.
    pub fn domains(&self) -> impl Iterator<Item = &ClockDomain> {
        self.graph.node_indices().map(|n| &self.graph[n])
    }

    /// Returns the synthesizer with this id.
    pub fn synthesizer(&self, id: SynthesizerId) -> Option<&Synthesizer> {
        self.synthesizers.get(&id)
    }

    /// Returns the number of domains.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if the graph has no domains.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Validates the graph and solves every synthesizer against `limits`.
    ///
    /// Fails with [`ClockError::OrphanDomain`] if any domain sits on a cycle
    /// or cannot be reached from a root, and with
    /// [`ClockError::UnsolvableSynthesizer`] if a synthesizer's outputs
    /// cannot all be produced within their margins.
    pub fn finalize(self, limits: &SynthesizerLimits) -> Result<FinalizedClockGraph, ClockError> {
        if let Err(cycle) = toposort(&self.graph, None) {
            return Err(ClockError::OrphanDomain {
                name: self.graph[cycle.node_id()].name.clone(),
            });
        }

        let mut reachable = HashSet::new();
        for root in self.graph.node_indices().filter(|&n| self.graph[n].is_root()) {
            let mut dfs = Dfs::new(&self.graph, root);
            while let Some(node) = dfs.next(&self.graph) {
                reachable.insert(node);
            }
        }
        if let Some(orphan) = self.graph.node_indices().find(|n| !reachable.contains(n)) {
            return Err(ClockError::OrphanDomain {
                name: self.graph[orphan].name.clone(),
            });
        }

        let mut solved = Vec::new();
        for instance in self.synthesizers.values() {
            let Some(upstream) = &instance.upstream else {
                continue;
            };
            let input = self
                .domain(upstream)
                .ok_or_else(|| ClockError::UnknownDomain {
                    name: upstream.clone(),
                })?
                .frequency;
            let requests: Vec<OutputRequest<'_>> = instance
                .outputs
                .iter()
                .filter_map(|out| self.domain(out))
                .map(|d| OutputRequest {
                    domain: &d.name,
                    frequency: d.frequency,
                    margin: d.margin,
                })
                .collect();
            let config = synthesizer::solve(limits, &instance.name, input, &requests)?;
            debug!(
                synthesizer = %instance.id,
                name = %instance.name,
                vco = ?config.vco,
                "solved synthesizer"
            );
            solved.push(SolvedSynthesizer {
                id: instance.id,
                name: instance.name.clone(),
                upstream: upstream.clone(),
                primitive: limits.primitive().to_string(),
                config,
            });
        }

        let domains = self
            .graph
            .node_indices()
            .map(|n| self.graph[n].clone())
            .collect();
        Ok(FinalizedClockGraph {
            domains,
            synthesizers: solved,
            false_paths: self.false_paths.into_iter().collect(),
        })
    }
}

fn check_frequency(name: &str, frequency: Frequency) -> Result<(), ClockError> {
    if frequency.is_valid() {
        Ok(())
    } else {
        Err(ClockError::InvalidFrequency {
            name: name.to_string(),
            hz: frequency.hz(),
        })
    }
}

/// A validated, read-only clock graph with solved synthesizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedClockGraph {
    domains: Vec<ClockDomain>,
    synthesizers: Vec<SolvedSynthesizer>,
    false_paths: Vec<FalsePath>,
}

impl FinalizedClockGraph {
    /// Returns all domains in topological (insertion) order.
    pub fn domains(&self) -> &[ClockDomain] {
        &self.domains
    }

    /// Returns the domain with this name.
    pub fn domain(&self, name: &str) -> Option<&ClockDomain> {
        self.domains.iter().find(|d| d.name == name)
    }

    /// Iterates over root domains.
    pub fn roots(&self) -> impl Iterator<Item = &ClockDomain> {
        self.domains.iter().filter(|d| d.is_root())
    }

    /// Iterates over domains fed directly by `upstream`.
    pub fn children<'a>(&'a self, upstream: &'a str) -> impl Iterator<Item = &'a ClockDomain> {
        self.domains
            .iter()
            .filter(move |d| d.upstream() == Some(upstream))
    }

    /// Returns the solved synthesizers in id order.
    pub fn synthesizers(&self) -> &[SolvedSynthesizer] {
        &self.synthesizers
    }

    /// Returns the synthesizer driving `domain`.
    pub fn synthesizer_for(&self, domain: &str) -> Option<&SolvedSynthesizer> {
        let id = self.domain(domain)?.synthesizer()?;
        self.synthesizers.iter().find(|s| s.id == id)
    }

    /// Returns the frequency a domain actually runs at.
    ///
    /// Roots run at their nominal frequency; derived domains at the solved
    /// synthesizer output.
    pub fn achieved_frequency(&self, domain: &str) -> Option<Frequency> {
        let d = self.domain(domain)?;
        if d.is_root() {
            return Some(d.frequency);
        }
        self.synthesizer_for(domain)?
            .config
            .outputs
            .iter()
            .find(|o| o.domain == domain)
            .map(|o| o.achieved)
    }

    /// Returns the declared false paths in sorted order.
    pub fn false_paths(&self) -> &[FalsePath] {
        &self.false_paths
    }

    /// Returns the number of domains.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns `true` if the graph has no domains.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
