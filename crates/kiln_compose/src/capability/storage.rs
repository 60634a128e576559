//! SPI flash and SD card storage.

use super::{Capability, ResourceRequest, SubsystemHandle, SubsystemKind};
use crate::features::SdCardMode;
use kiln_resource::ResourceDescriptor;

/// Memory-mapped quad SPI configuration flash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpiFlash;

impl Capability for SpiFlash {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::SpiFlash
    }

    fn resource_requests(&self) -> Vec<ResourceRequest> {
        vec![ResourceRequest::one("spiflash4x", 0)]
    }

    fn instantiate(&self, resources: &[&ResourceDescriptor]) -> SubsystemHandle {
        let lanes = resources
            .first()
            .and_then(|flash| flash.group("dq"))
            .map_or(1, |dq| dq.width());
        SubsystemHandle::new("SpiFlash")
            .param("mode", format!("{lanes}x"))
            .param("clk_source", "STARTUPE2")
    }
}

/// SD card controller in SPI or native mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdCard {
    mode: SdCardMode,
}

impl SdCard {
    /// Creates a controller for an enabled mode; `None` for [`SdCardMode::None`].
    pub fn new(mode: SdCardMode) -> Option<Self> {
        (mode != SdCardMode::None).then_some(Self { mode })
    }

    fn resource_name(&self) -> &'static str {
        match self.mode {
            SdCardMode::Spi => "spisdcard",
            _ => "sdcard",
        }
    }
}

impl Capability for SdCard {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::SdCard
    }

    fn resource_requests(&self) -> Vec<ResourceRequest> {
        vec![ResourceRequest::one(self.resource_name(), 0)]
    }

    fn instantiate(&self, _resources: &[&ResourceDescriptor]) -> SubsystemHandle {
        match self.mode {
            SdCardMode::Spi => SubsystemHandle::new("SPISDCard").param("mode", "spi"),
            _ => SubsystemHandle::new("SDCard").param("mode", "native"),
        }
    }
}
