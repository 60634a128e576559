//! HDMI output: a text terminal or a framebuffer.

use super::{Capability, DomainRequest, ResourceRequest, SubsystemHandle, SubsystemKind};
use crate::features::{VideoMode, VideoTimings};
use kiln_clock::Purpose;
use kiln_common::Frequency;
use kiln_resource::ResourceDescriptor;

/// TMDS bits serialized per pixel clock (10 bits, DDR).
const SERIALIZER_RATIO: f64 = 5.0;

/// HDMI video PHY on `hdmi_out`, clocked from its own synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdmiVideo {
    framebuffer: bool,
    timings: VideoTimings,
}

impl HdmiVideo {
    /// Creates the video capability; `None` for [`VideoMode::None`].
    pub fn new(mode: VideoMode) -> Option<Self> {
        match mode {
            VideoMode::None => None,
            VideoMode::Terminal(timings) => Some(Self {
                framebuffer: false,
                timings,
            }),
            VideoMode::Framebuffer(timings) => Some(Self {
                framebuffer: true,
                timings,
            }),
        }
    }
}

impl Capability for HdmiVideo {
    fn kind(&self) -> SubsystemKind {
        if self.framebuffer {
            SubsystemKind::VideoFramebuffer
        } else {
            SubsystemKind::VideoTerminal
        }
    }

    fn domain_requests(&self, _sys_clk_freq: Frequency) -> Vec<DomainRequest> {
        let pixel = self.timings.pixel_clock();
        vec![
            DomainRequest::video("hdmi", pixel, Purpose::Pixel),
            DomainRequest::video("hdmi5x", pixel * SERIALIZER_RATIO, Purpose::Serializer),
        ]
    }

    fn resource_requests(&self) -> Vec<ResourceRequest> {
        vec![ResourceRequest::one("hdmi_out", 0)]
    }

    fn instantiate(&self, _resources: &[&ResourceDescriptor]) -> SubsystemHandle {
        let (width, height) = self.timings.resolution();
        let core = if self.framebuffer {
            "VideoFramebuffer"
        } else {
            "VideoTerminal"
        };
        SubsystemHandle::new(core)
            .param("phy", "VideoS7HDMIPHY")
            .param("timings", self.timings)
            .param("resolution", format!("{width}x{height}"))
            .param("clock_domain", "hdmi")
    }
}
