//! The composition algorithm: features in, target assembly out.

use crate::assembly::{SubsystemBinding, TargetAssembly};
use crate::capability::{
    Capability, ClockTree, Ddr3Sdram, DomainRequest, HdmiVideo, LedChaser, ResourceRequest,
    RgmiiEthernet, SdCard, SpiFlash, Uart, DEFAULT_MARGIN,
};
use crate::error::ComposeError;
use crate::features::{FeatureSet, MemoryFeature};
use kiln_board::Board;
use kiln_clock::{ClockGraph, DeriveSpec, Purpose, SynthesizerId};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Name of the mandatory system clock domain.
pub const SYS_DOMAIN: &str = "sys";

/// Composes targets for one board.
#[derive(Debug, Clone, Copy)]
pub struct Composer<'b> {
    board: &'b dyn Board,
}

/// Synthesizers of one composition, the video one created on first use.
struct Trees {
    root: String,
    crg: SynthesizerId,
    video: Option<SynthesizerId>,
}

impl<'b> Composer<'b> {
    /// Creates a composer for `board`.
    pub fn new(board: &'b dyn Board) -> Self {
        Self { board }
    }

    /// Composes a target with the given features.
    ///
    /// Steps run in a fixed order: validate the feature set, bind the
    /// oscillator and create the root and `sys` domains, then add memory,
    /// storage, network, video and on-board I/O in that order, and finally
    /// solve the clock graph against the board's synthesizer limits. All
    /// scratch state is local, so an error leaves nothing behind.
    pub fn compose(&self, features: &FeatureSet) -> Result<TargetAssembly, ComposeError> {
        features.validate()?;

        let registry = self.board.resources();
        let mut allocation = registry.allocate();
        let mut graph = ClockGraph::new();

        let clock = self.board.default_clock();
        allocation.request(&clock.name, 0)?;
        graph.add_root_from(&clock.name, clock.frequency, &clock.name)?;

        let crg = graph.new_synthesizer("crg_pll");
        graph.derive_with(
            crg,
            &clock.name,
            SYS_DOMAIN,
            DeriveSpec::exact(features.sys_clk_freq, Purpose::System).with_margin(DEFAULT_MARGIN),
        )?;
        // The SoC reset crosses from sys back into the synthesizer input domain.
        graph.false_path(SYS_DOMAIN, &clock.name)?;

        let mut trees = Trees {
            root: clock.name.clone(),
            crg,
            video: None,
        };
        let mut notes = Vec::new();
        let mut bindings = Vec::new();
        for capability in plan(features, &mut notes) {
            let mut domains = BTreeSet::new();
            for request in capability.domain_requests(features.sys_clk_freq) {
                domains.insert(ensure_domain(&mut graph, &mut trees, &request)?);
            }

            let mut bound = Vec::new();
            for request in capability.resource_requests() {
                match request {
                    ResourceRequest::One { name, index } => {
                        bound.push(allocation.request(&name, index)?);
                    }
                    ResourceRequest::All { name } => {
                        bound.extend(allocation.request_all(&name)?);
                    }
                }
            }

            let handle = capability.instantiate(&bound);
            debug!(
                subsystem = %capability.kind(),
                core = %handle.core,
                resources = bound.len(),
                "instantiated subsystem"
            );
            bindings.push(SubsystemBinding {
                kind: capability.kind(),
                required_domains: domains,
                required_resources: bound.iter().map(|d| d.key()).collect(),
                handle,
            });
        }

        let clocks = graph.finalize(&self.board.synthesizer_limits())?;
        let resources = allocation.into_bindings();
        let ident = features
            .ident
            .clone()
            .unwrap_or_else(|| self.board.default_ident());

        info!(
            board = self.board.name(),
            domains = clocks.len(),
            subsystems = bindings.len(),
            resources = resources.len(),
            "composed target"
        );
        Ok(TargetAssembly {
            ident,
            board: self.board.name().to_string(),
            device: self.board.descriptor().clone(),
            sys_clk_freq: features.sys_clk_freq,
            features: features.clone(),
            clocks,
            bindings,
            resources,
            notes,
            registry,
        })
    }
}

/// Lists the enabled capabilities in precedence order.
fn plan(features: &FeatureSet, notes: &mut Vec<String>) -> Vec<Box<dyn Capability>> {
    let mut capabilities: Vec<Box<dyn Capability>> = Vec::new();

    if features.memory == MemoryFeature::Sdram {
        if features.integrated_main_ram_size > 0 {
            warn!(
                size = features.integrated_main_ram_size,
                "skipping SDRAM, main memory is integrated"
            );
            notes.push(format!(
                "memory satisfied by integrated main RAM ({} bytes); SDRAM not instantiated",
                features.integrated_main_ram_size
            ));
        } else {
            capabilities.push(Box::new(Ddr3Sdram::default()));
        }
    }

    if features.storage.spi_flash {
        capabilities.push(Box::new(SpiFlash));
    }
    if let Some(sdcard) = SdCard::new(features.storage.sdcard) {
        capabilities.push(Box::new(sdcard));
    }
    if let Some(phy) = RgmiiEthernet::new(features.network) {
        capabilities.push(Box::new(phy));
    }
    if let Some(video) = HdmiVideo::new(features.video) {
        capabilities.push(Box::new(video));
    }
    if features.led_chaser {
        capabilities.push(Box::new(LedChaser));
    }
    if features.uart {
        capabilities.push(Box::new(Uart::default()));
    }
    capabilities
}

/// Returns the domain satisfying `request`, creating it if no domain with
/// the same frequency and purpose exists yet.
fn ensure_domain(
    graph: &mut ClockGraph,
    trees: &mut Trees,
    request: &DomainRequest,
) -> Result<String, ComposeError> {
    if let Some(existing) = graph.find_by_purpose(request.frequency, &request.purpose) {
        debug!(
            domain = %existing.name,
            purpose = %request.purpose,
            "sharing clock domain"
        );
        return Ok(existing.name.clone());
    }

    let synthesizer = match request.tree {
        ClockTree::System => trees.crg,
        ClockTree::Video => match trees.video {
            Some(id) => id,
            None => {
                let id = graph.new_synthesizer("video_pll");
                trees.video = Some(id);
                id
            }
        },
    };
    graph.derive_with(
        synthesizer,
        &trees.root,
        &request.name,
        DeriveSpec::exact(request.frequency, request.purpose.clone()).with_margin(DEFAULT_MARGIN),
    )?;
    Ok(request.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::SubsystemKind;
    use crate::features::{NetworkFeature, SdCardMode, VideoMode, VideoTimings};
    use kiln_board::load_board;
    use kiln_common::Frequency;
    use kiln_resource::{ResourceError, ResourceKey};

    fn compose(features: &FeatureSet) -> Result<TargetAssembly, ComposeError> {
        let board = load_board("bochen_kintex7_base").unwrap();
        Composer::new(board.as_ref()).compose(features)
    }

    fn sdram() -> FeatureSet {
        FeatureSet {
            memory: MemoryFeature::Sdram,
            ..FeatureSet::default()
        }
    }

    #[test]
    fn empty_features_give_root_and_sys() {
        let assembly = compose(&FeatureSet::default()).unwrap();
        let names: Vec<&str> = assembly
            .clock_graph()
            .domains()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["clk50", "sys"]);
        assert!(assembly.bindings().is_empty());
        // The synthesizer reset is driven by the SoC, not by a board pin.
        assert_eq!(assembly.resources(), &[ResourceKey::new("clk50", 0)]);
        assert!(!assembly
            .bound_descriptors()
            .any(|d| d.name == "cpu_reset_n"));
        assert_eq!(assembly.ident(), "Kiln SoC on Bochen Kintex7 Base");
    }

    #[test]
    fn sdram_adds_4x_and_idelay() {
        let assembly = compose(&sdram()).unwrap();
        let graph = assembly.clock_graph();
        assert_eq!(graph.domain("sys").unwrap().upstream(), Some("clk50"));
        assert_eq!(
            graph.domain("sys4x").unwrap().frequency,
            Frequency::from_mhz(400.0)
        );
        assert_eq!(
            graph.domain("idelay").unwrap().frequency,
            Frequency::from_mhz(200.0)
        );
        let binding = assembly.subsystem(SubsystemKind::Sdram).unwrap();
        assert_eq!(binding.required_resources, vec![ResourceKey::new("ddram", 0)]);
        assert!(binding.required_domains.contains("sys4x"));
        assert_eq!(binding.handle.params["data_width"], "32");
    }

    #[test]
    fn odd_sys_clock_with_ethernet_uses_fractional_divider() {
        let features = FeatureSet {
            sys_clk_freq: Frequency::from_mhz(90.0),
            network: NetworkFeature {
                ethernet: true,
                ..NetworkFeature::default()
            },
            ..FeatureSet::default()
        };
        let assembly = compose(&features).unwrap();
        let graph = assembly.clock_graph();
        let sys = graph.achieved_frequency("sys").unwrap();
        assert!(sys.within(Frequency::from_mhz(90.0), DEFAULT_MARGIN));
        let idelay = graph.achieved_frequency("idelay").unwrap();
        assert!(idelay.within(Frequency::from_mhz(200.0), DEFAULT_MARGIN));
        let crg = graph.synthesizer_for("sys").unwrap();
        let fractional = crg.config.clkfbout_mult.fract() != 0.0
            || crg.config.outputs[0].divide.fract() != 0.0;
        assert!(fractional);
        assert_eq!(crg.config.outputs[1].divide.fract(), 0.0);
    }

    #[test]
    fn crg_is_synthesizer_zero() {
        let assembly = compose(&sdram()).unwrap();
        let crg = assembly.clock_graph().synthesizer_for("sys").unwrap();
        assert_eq!(crg.id.as_raw(), 0);
        assert_eq!(crg.name, "crg_pll");
        assert_eq!(crg.config.outputs.len(), 3);
    }

    #[test]
    fn memory_and_network_share_idelay() {
        let mut features = sdram();
        features.network = NetworkFeature {
            ethernet: true,
            ..NetworkFeature::default()
        };
        let assembly = compose(&features).unwrap();
        let idelay = assembly
            .clock_graph()
            .domains()
            .iter()
            .filter(|d| d.purpose == Purpose::DelayCalibration)
            .count();
        assert_eq!(idelay, 1);
        let eth = assembly.subsystem(SubsystemKind::Ethernet).unwrap();
        assert!(eth.required_domains.contains("idelay"));
    }

    #[test]
    fn video_gets_its_own_synthesizer() {
        let features = FeatureSet {
            video: VideoMode::Terminal(VideoTimings::Svga800x600),
            ..FeatureSet::default()
        };
        let assembly = compose(&features).unwrap();
        let graph = assembly.clock_graph();
        let video = graph.synthesizer_for("hdmi").unwrap();
        assert_eq!(video.id.as_raw(), 1);
        assert_eq!(video.upstream, "clk50");
        assert_eq!(graph.synthesizer_for("hdmi5x").unwrap().id, video.id);
        assert_ne!(graph.synthesizer_for("sys").unwrap().id, video.id);
    }

    #[test]
    fn integrated_ram_skips_sdram() {
        let mut features = sdram();
        features.integrated_main_ram_size = 0x4000;
        let assembly = compose(&features).unwrap();
        assert!(assembly.subsystem(SubsystemKind::Sdram).is_none());
        assert!(assembly.clock_graph().domain("sys4x").is_none());
        assert!(!assembly.resources().contains(&ResourceKey::new("ddram", 0)));
        assert_eq!(assembly.notes().len(), 1);
    }

    #[test]
    fn etherbone_with_dynamic_ip_fails_early() {
        let features = FeatureSet {
            network: NetworkFeature {
                etherbone: true,
                dynamic_ip: true,
                ..NetworkFeature::default()
            },
            ..FeatureSet::default()
        };
        assert!(matches!(
            compose(&features),
            Err(ComposeError::InvalidFeatureCombination(_))
        ));
    }

    #[test]
    fn missing_phy_index_is_unknown_resource() {
        let features = FeatureSet {
            network: NetworkFeature {
                ethernet: true,
                phy_index: 2,
                ..NetworkFeature::default()
            },
            ..FeatureSet::default()
        };
        let err = compose(&features).unwrap_err();
        assert_eq!(
            err,
            ComposeError::Resource(ResourceError::UnknownResource {
                name: "eth_clocks".to_string(),
                index: Some(2)
            })
        );
    }

    #[test]
    fn every_feature_at_once() {
        let features = FeatureSet {
            memory: MemoryFeature::Sdram,
            storage: crate::features::StorageFeature {
                spi_flash: true,
                sdcard: SdCardMode::Native,
            },
            network: NetworkFeature {
                ethernet: true,
                etherbone: true,
                ..NetworkFeature::default()
            },
            video: VideoMode::Framebuffer(VideoTimings::Vga640x480),
            led_chaser: true,
            uart: true,
            ..FeatureSet::default()
        };
        let assembly = compose(&features).unwrap();
        let kinds: Vec<SubsystemKind> = assembly.bindings().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SubsystemKind::Sdram,
                SubsystemKind::SpiFlash,
                SubsystemKind::SdCard,
                SubsystemKind::Ethernet,
                SubsystemKind::VideoFramebuffer,
                SubsystemKind::LedChaser,
                SubsystemKind::Uart,
            ]
        );
        let leds = assembly.subsystem(SubsystemKind::LedChaser).unwrap();
        assert_eq!(leds.required_resources.len(), 8);
        assert_eq!(assembly.clock_graph().roots().count(), 1);
    }

    #[test]
    fn unsolvable_sys_clock() {
        let features = FeatureSet {
            sys_clk_freq: Frequency::from_mhz(2000.0),
            ..FeatureSet::default()
        };
        assert!(matches!(
            compose(&features),
            Err(ComposeError::Clock(kiln_clock::ClockError::UnsolvableSynthesizer { .. }))
        ));
    }

    #[test]
    fn ident_override() {
        let features = FeatureSet {
            ident: Some("blinky".to_string()),
            ..FeatureSet::default()
        };
        assert_eq!(compose(&features).unwrap().ident(), "blinky");
    }

    #[test]
    fn fingerprint_tracks_features() {
        let a = compose(&FeatureSet::default()).unwrap();
        let b = compose(&FeatureSet::default()).unwrap();
        let c = compose(&sdram()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn fingerprint_covers_whole_manifest() {
        let plain = compose(&FeatureSet::default()).unwrap();
        let with_ram = compose(&FeatureSet {
            integrated_main_ram_size: 0x1000,
            ..FeatureSet::default()
        })
        .unwrap();
        assert_ne!(plain.to_json().unwrap(), with_ram.to_json().unwrap());
        assert_ne!(plain.fingerprint(), with_ram.fingerprint());
    }

    #[test]
    fn manifest_is_json() {
        let assembly = compose(&sdram()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&assembly.to_json().unwrap()).unwrap();
        assert_eq!(json["board"], "bochen_kintex7_base");
        assert_eq!(json["device"]["part"], "xc7k325t-ffg676-2");
        assert_eq!(json["bindings"][0]["kind"], "sdram");
    }
}
