//! On-board I/O: LED chaser and serial console.

use super::{Capability, ResourceRequest, SubsystemHandle, SubsystemKind};
use kiln_resource::ResourceDescriptor;

/// Walks a light across every user LED.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedChaser;

impl Capability for LedChaser {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::LedChaser
    }

    fn resource_requests(&self) -> Vec<ResourceRequest> {
        vec![ResourceRequest::all("user_led")]
    }

    fn instantiate(&self, resources: &[&ResourceDescriptor]) -> SubsystemHandle {
        SubsystemHandle::new("LedChaser").param("leds", resources.len())
    }
}

/// Serial console on `serial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uart {
    /// Line rate in baud.
    pub baudrate: u32,
}

impl Default for Uart {
    fn default() -> Self {
        Self { baudrate: 115_200 }
    }
}

impl Capability for Uart {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Uart
    }

    fn resource_requests(&self) -> Vec<ResourceRequest> {
        vec![ResourceRequest::one("serial", 0)]
    }

    fn instantiate(&self, _resources: &[&ResourceDescriptor]) -> SubsystemHandle {
        SubsystemHandle::new("UART").param("baudrate", self.baudrate)
    }
}
