//! DDR3 SDRAM through the Kintex-7 DDR PHY.

use super::{Capability, DomainRequest, ResourceRequest, SubsystemHandle, SubsystemKind};
use kiln_clock::Purpose;
use kiln_common::Frequency;
use kiln_resource::ResourceDescriptor;

/// IDELAYCTRL reference frequency required by 7-series input delays.
pub const IDELAY_FREQUENCY: Frequency = Frequency::new(200e6);

/// DDR3 SDRAM controller with a 4-phase PHY (1:4 controller to DRAM ratio).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ddr3Sdram {
    /// DRAM module part.
    pub module: String,
    /// PHY phases per system clock.
    pub nphases: u32,
    /// L2 cache size in bytes.
    pub l2_cache_size: u32,
}

impl Default for Ddr3Sdram {
    fn default() -> Self {
        Self {
            module: "MT41K256M16".to_string(),
            nphases: 4,
            l2_cache_size: 8192,
        }
    }
}

impl Capability for Ddr3Sdram {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Sdram
    }

    fn domain_requests(&self, sys_clk_freq: Frequency) -> Vec<DomainRequest> {
        vec![
            DomainRequest::system(
                "sys4x",
                sys_clk_freq * f64::from(self.nphases),
                Purpose::System4x,
            ),
            DomainRequest::system("idelay", IDELAY_FREQUENCY, Purpose::DelayCalibration),
        ]
    }

    fn resource_requests(&self) -> Vec<ResourceRequest> {
        vec![ResourceRequest::one("ddram", 0)]
    }

    fn instantiate(&self, resources: &[&ResourceDescriptor]) -> SubsystemHandle {
        let data_width = resources
            .first()
            .and_then(|ddram| ddram.group("dq"))
            .map_or(0, |dq| dq.width());
        SubsystemHandle::new("K7DDRPHY")
            .param("memtype", "DDR3")
            .param("module", &self.module)
            .param("nphases", self.nphases)
            .param("rate", format!("1:{}", self.nphases))
            .param("data_width", data_width)
            .param("l2_cache_size", self.l2_cache_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_resource::PinGroup;

    #[test]
    fn requests_4x_and_idelay() {
        let reqs = Ddr3Sdram::default().domain_requests(Frequency::from_mhz(100.0));
        assert_eq!(reqs[0].frequency, Frequency::from_mhz(400.0));
        assert_eq!(reqs[0].purpose, Purpose::System4x);
        assert_eq!(reqs[1].frequency, Frequency::from_mhz(200.0));
        assert_eq!(reqs[1].name, "idelay");
    }

    #[test]
    fn handle_reports_data_width() {
        let ddram = ResourceDescriptor::new("ddram", 0)
            .subsignal(PinGroup::subsignal("dq", "A1 A2 A3 A4 A5 A6 A7 A8"));
        let handle = Ddr3Sdram::default().instantiate(&[&ddram]);
        assert_eq!(handle.core, "K7DDRPHY");
        assert_eq!(handle.params["data_width"], "8");
        assert_eq!(handle.params["module"], "MT41K256M16");
        assert_eq!(handle.params["rate"], "1:4");
    }
}
