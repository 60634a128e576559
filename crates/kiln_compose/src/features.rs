//! Typed feature selection and the string-keyed flag map it is parsed from.
//!
//! Configuration files and command lines produce a flat [`FlagMap`];
//! [`FeatureSet::from_flags`] turns it into a [`FeatureSet`] in which
//! mutually exclusive choices (SD card mode, video mode) are single enums and
//! therefore cannot both be set.

use crate::error::ComposeError;
use kiln_common::Frequency;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single flag value as written in `kiln.toml` or on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// `true` / `false`.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(v) => write!(f, "{v}"),
            FlagValue::Int(v) => write!(f, "{v}"),
            FlagValue::Float(v) => write!(f, "{v}"),
            FlagValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// Flat flag name to value map.
pub type FlagMap = BTreeMap<String, FlagValue>;

/// Main memory selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryFeature {
    /// No external memory.
    #[default]
    None,
    /// The on-board DDR3 SDRAM.
    Sdram,
}

/// SD card interface mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdCardMode {
    /// No SD card controller.
    #[default]
    None,
    /// SPI-mode controller on the `spisdcard` pins.
    Spi,
    /// Native 4-bit controller on the `sdcard` pins.
    Native,
}

/// Storage peripherals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFeature {
    /// Memory-mapped quad SPI configuration flash.
    pub spi_flash: bool,
    /// SD card controller.
    pub sdcard: SdCardMode,
}

/// Ethernet PHY and the services running over it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFeature {
    /// Ethernet MAC for the CPU.
    pub ethernet: bool,
    /// Etherbone (Wishbone over UDP) bridge.
    pub etherbone: bool,
    /// Acquire the Ethernet IP address at runtime.
    pub dynamic_ip: bool,
    /// Index of the PHY to use on boards with several.
    pub phy_index: u32,
}

impl NetworkFeature {
    /// Returns `true` if a PHY is needed.
    pub fn enabled(&self) -> bool {
        self.ethernet || self.etherbone
    }
}

/// Supported video timings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoTimings {
    /// 640x480 at 60 Hz.
    #[serde(rename = "640x480@60Hz")]
    Vga640x480,
    /// 800x600 at 60 Hz.
    #[default]
    #[serde(rename = "800x600@60Hz")]
    Svga800x600,
    /// 1280x720 at 60 Hz.
    #[serde(rename = "1280x720@60Hz")]
    Hd1280x720,
}

impl VideoTimings {
    const ALL: [VideoTimings; 3] = [
        VideoTimings::Vga640x480,
        VideoTimings::Svga800x600,
        VideoTimings::Hd1280x720,
    ];

    /// Returns the timing name (e.g. `800x600@60Hz`).
    pub fn name(&self) -> &'static str {
        match self {
            VideoTimings::Vga640x480 => "640x480@60Hz",
            VideoTimings::Svga800x600 => "800x600@60Hz",
            VideoTimings::Hd1280x720 => "1280x720@60Hz",
        }
    }

    /// Returns the pixel clock.
    pub fn pixel_clock(&self) -> Frequency {
        match self {
            VideoTimings::Vga640x480 => Frequency::from_mhz(25.0),
            VideoTimings::Svga800x600 => Frequency::from_mhz(40.0),
            VideoTimings::Hd1280x720 => Frequency::from_mhz(74.25),
        }
    }

    /// Returns the active resolution as `(width, height)`.
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            VideoTimings::Vga640x480 => (640, 480),
            VideoTimings::Svga800x600 => (800, 600),
            VideoTimings::Hd1280x720 => (1280, 720),
        }
    }
}

impl fmt::Display for VideoTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VideoTimings {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown video timings '{s}'"))
    }
}

/// Video output selection. Terminal and framebuffer share one PHY, so only one can be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoMode {
    /// No video output.
    #[default]
    None,
    /// Text terminal on the HDMI output.
    Terminal(VideoTimings),
    /// Memory-backed framebuffer on the HDMI output.
    Framebuffer(VideoTimings),
}

impl VideoMode {
    /// Returns the timings if video is enabled.
    pub fn timings(&self) -> Option<VideoTimings> {
        match self {
            VideoMode::None => None,
            VideoMode::Terminal(t) | VideoMode::Framebuffer(t) => Some(*t),
        }
    }
}

/// The set of features a target is composed with.
///
/// The default enables nothing and runs the system clock at 100 MHz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// System clock frequency.
    pub sys_clk_freq: Frequency,
    /// Main memory.
    pub memory: MemoryFeature,
    /// Storage peripherals.
    pub storage: StorageFeature,
    /// Networking.
    pub network: NetworkFeature,
    /// Video output.
    pub video: VideoMode,
    /// LED chaser on all user LEDs.
    pub led_chaser: bool,
    /// Serial console.
    pub uart: bool,
    /// Size in bytes of on-chip RAM already serving as main memory.
    pub integrated_main_ram_size: u64,
    /// Identification string override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<String>,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            sys_clk_freq: Frequency::from_mhz(100.0),
            memory: MemoryFeature::None,
            storage: StorageFeature::default(),
            network: NetworkFeature::default(),
            video: VideoMode::None,
            led_chaser: false,
            uart: false,
            integrated_main_ram_size: 0,
            ident: None,
        }
    }
}

/// Names accepted by [`FeatureSet::from_flags`].
pub const KNOWN_FLAGS: &[&str] = &[
    "sys_clk_freq",
    "with_sdram",
    "with_spi_flash",
    "with_spi_sdcard",
    "with_sdcard",
    "with_ethernet",
    "with_etherbone",
    "eth_dynamic_ip",
    "eth_phy",
    "with_video_terminal",
    "with_video_framebuffer",
    "video_timings",
    "with_led_chaser",
    "with_uart",
    "integrated_main_ram_size",
    "ident",
];

impl FeatureSet {
    /// Parses a flag map, starting from the defaults.
    ///
    /// Flag names may use `-` or `_`. Fails with [`ComposeError::UnknownFlag`]
    /// for unrecognized names, [`ComposeError::InvalidFlagValue`] for values
    /// of the wrong type, and [`ComposeError::InvalidFeatureCombination`] when
    /// both members of an exclusive family are enabled.
    pub fn from_flags(flags: &FlagMap) -> Result<Self, ComposeError> {
        let mut features = FeatureSet::default();
        let mut spi_sdcard = false;
        let mut native_sdcard = false;
        let mut terminal = false;
        let mut framebuffer = false;
        let mut timings = VideoTimings::default();

        for (raw_name, value) in flags {
            let name = raw_name.replace('-', "_");
            match name.as_str() {
                "sys_clk_freq" => features.sys_clk_freq = frequency_flag(&name, value)?,
                "with_sdram" => {
                    features.memory = if bool_flag(&name, value)? {
                        MemoryFeature::Sdram
                    } else {
                        MemoryFeature::None
                    }
                }
                "with_spi_flash" => features.storage.spi_flash = bool_flag(&name, value)?,
                "with_spi_sdcard" => spi_sdcard = bool_flag(&name, value)?,
                "with_sdcard" => native_sdcard = bool_flag(&name, value)?,
                "with_ethernet" => features.network.ethernet = bool_flag(&name, value)?,
                "with_etherbone" => features.network.etherbone = bool_flag(&name, value)?,
                "eth_dynamic_ip" => features.network.dynamic_ip = bool_flag(&name, value)?,
                "eth_phy" => {
                    features.network.phy_index =
                        u32::try_from(int_flag(&name, value)?).map_err(|_| {
                            invalid(&name, "a non-negative integer", value)
                        })?
                }
                "with_video_terminal" => terminal = bool_flag(&name, value)?,
                "with_video_framebuffer" => framebuffer = bool_flag(&name, value)?,
                "video_timings" => {
                    timings = str_flag(&name, value)?.parse().map_err(|_| {
                        invalid(&name, "640x480@60Hz, 800x600@60Hz or 1280x720@60Hz", value)
                    })?
                }
                "with_led_chaser" => features.led_chaser = bool_flag(&name, value)?,
                "with_uart" => features.uart = bool_flag(&name, value)?,
                "integrated_main_ram_size" => {
                    features.integrated_main_ram_size = u64::try_from(int_flag(&name, value)?)
                        .map_err(|_| invalid(&name, "a non-negative integer", value))?
                }
                "ident" => features.ident = Some(str_flag(&name, value)?.to_string()),
                _ => return Err(ComposeError::UnknownFlag(raw_name.clone())),
            }
        }

        features.storage.sdcard = match (spi_sdcard, native_sdcard) {
            (true, true) => {
                return Err(ComposeError::InvalidFeatureCombination(
                    "with_spi_sdcard and with_sdcard are mutually exclusive".to_string(),
                ))
            }
            (true, false) => SdCardMode::Spi,
            (false, true) => SdCardMode::Native,
            (false, false) => SdCardMode::None,
        };
        features.video = match (terminal, framebuffer) {
            (true, true) => {
                return Err(ComposeError::InvalidFeatureCombination(
                    "with_video_terminal and with_video_framebuffer are mutually exclusive"
                        .to_string(),
                ))
            }
            (true, false) => VideoMode::Terminal(timings),
            (false, true) => VideoMode::Framebuffer(timings),
            (false, false) => VideoMode::None,
        };
        Ok(features)
    }

    /// Checks cross-feature constraints that the types alone cannot express.
    pub fn validate(&self) -> Result<(), ComposeError> {
        let reject = |msg: &str| Err(ComposeError::InvalidFeatureCombination(msg.to_string()));
        if !self.sys_clk_freq.is_valid() {
            return reject("sys_clk_freq must be a positive frequency");
        }
        if self.network.etherbone && self.network.dynamic_ip {
            return reject("etherbone cannot use a dynamic IP address");
        }
        if self.network.dynamic_ip && !self.network.ethernet {
            return reject("eth_dynamic_ip requires with_ethernet");
        }
        if matches!(self.video, VideoMode::Framebuffer(_)) && !self.has_main_memory() {
            return reject("a video framebuffer requires main memory (SDRAM or integrated RAM)");
        }
        Ok(())
    }

    /// Returns `true` if SDRAM or integrated RAM provides main memory.
    pub fn has_main_memory(&self) -> bool {
        self.memory == MemoryFeature::Sdram || self.integrated_main_ram_size > 0
    }

    /// Returns the names of enabled features, for summaries.
    pub fn enabled(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.memory == MemoryFeature::Sdram {
            names.push("sdram");
        }
        if self.storage.spi_flash {
            names.push("spi_flash");
        }
        match self.storage.sdcard {
            SdCardMode::Spi => names.push("spi_sdcard"),
            SdCardMode::Native => names.push("sdcard"),
            SdCardMode::None => {}
        }
        if self.network.ethernet {
            names.push("ethernet");
        }
        if self.network.etherbone {
            names.push("etherbone");
        }
        match self.video {
            VideoMode::Terminal(_) => names.push("video_terminal"),
            VideoMode::Framebuffer(_) => names.push("video_framebuffer"),
            VideoMode::None => {}
        }
        if self.led_chaser {
            names.push("led_chaser");
        }
        if self.uart {
            names.push("uart");
        }
        names
    }
}

fn invalid(name: &str, expected: &'static str, value: &FlagValue) -> ComposeError {
    ComposeError::InvalidFlagValue {
        name: name.to_string(),
        expected,
        found: value.to_string(),
    }
}

fn bool_flag(name: &str, value: &FlagValue) -> Result<bool, ComposeError> {
    match value {
        FlagValue::Bool(b) => Ok(*b),
        _ => Err(invalid(name, "a boolean", value)),
    }
}

fn int_flag(name: &str, value: &FlagValue) -> Result<i64, ComposeError> {
    match value {
        FlagValue::Int(i) => Ok(*i),
        _ => Err(invalid(name, "an integer", value)),
    }
}

fn str_flag<'a>(name: &str, value: &'a FlagValue) -> Result<&'a str, ComposeError> {
    match value {
        FlagValue::Str(s) => Ok(s),
        _ => Err(invalid(name, "a string", value)),
    }
}

fn frequency_flag(name: &str, value: &FlagValue) -> Result<Frequency, ComposeError> {
    let expected = "a frequency such as 100e6 or \"100MHz\"";
    match value {
        FlagValue::Int(i) => Ok(Frequency::new(*i as f64)),
        FlagValue::Float(f) => Ok(Frequency::new(*f)),
        FlagValue::Str(s) => s.parse().map_err(|_| invalid(name, expected, value)),
        FlagValue::Bool(_) => Err(invalid(name, expected, value)),
    }
}
