//! RGMII Ethernet PHY carrying a CPU MAC, an Etherbone bridge, or both.

use super::memory::IDELAY_FREQUENCY;
use super::{Capability, DomainRequest, ResourceRequest, SubsystemHandle, SubsystemKind};
use crate::features::NetworkFeature;
use kiln_clock::Purpose;
use kiln_common::Frequency;
use kiln_resource::ResourceDescriptor;

/// A 7-series RGMII PHY selected by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgmiiEthernet {
    feature: NetworkFeature,
}

impl RgmiiEthernet {
    /// Creates the PHY capability; `None` if neither Ethernet nor Etherbone is enabled.
    pub fn new(feature: NetworkFeature) -> Option<Self> {
        feature.enabled().then_some(Self { feature })
    }
}

impl Capability for RgmiiEthernet {
    fn kind(&self) -> SubsystemKind {
        if self.feature.ethernet {
            SubsystemKind::Ethernet
        } else {
            SubsystemKind::Etherbone
        }
    }

    // RGMII input delays need a calibrated IDELAYCTRL.
    fn domain_requests(&self, _sys_clk_freq: Frequency) -> Vec<DomainRequest> {
        vec![DomainRequest::system(
            "idelay",
            IDELAY_FREQUENCY,
            Purpose::DelayCalibration,
        )]
    }

    fn resource_requests(&self) -> Vec<ResourceRequest> {
        let index = self.feature.phy_index;
        vec![
            ResourceRequest::one("eth_clocks", index),
            ResourceRequest::one("eth", index),
        ]
    }

    fn instantiate(&self, _resources: &[&ResourceDescriptor]) -> SubsystemHandle {
        SubsystemHandle::new("S7RGMIIPHY")
            .param("phy_index", self.feature.phy_index)
            .param("mac", self.feature.ethernet)
            .param("etherbone", self.feature.etherbone)
            .param("dynamic_ip", self.feature.dynamic_ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_network_has_no_capability() {
        assert!(RgmiiEthernet::new(NetworkFeature::default()).is_none());
    }

    #[test]
    fn phy_index_addresses_resources() {
        let phy = RgmiiEthernet::new(NetworkFeature {
            etherbone: true,
            phy_index: 1,
            ..NetworkFeature::default()
        })
        .unwrap();
        assert_eq!(phy.kind(), SubsystemKind::Etherbone);
        assert_eq!(
            phy.resource_requests(),
            vec![
                ResourceRequest::one("eth_clocks", 1),
                ResourceRequest::one("eth", 1)
            ]
        );
    }

    #[test]
    fn shares_idelay_with_memory() {
        let phy = RgmiiEthernet::new(NetworkFeature {
            ethernet: true,
            ..NetworkFeature::default()
        })
        .unwrap();
        let reqs = phy.domain_requests(Frequency::from_mhz(100.0));
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].purpose, Purpose::DelayCalibration);
        assert_eq!(reqs[0].frequency, Frequency::from_mhz(200.0));
        assert_eq!(phy.instantiate(&[]).params["mac"], "true");
    }
}
