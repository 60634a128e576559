//! Bochen Kintex-7 Base board (XC7K325T, FFG676, speed grade -2).
//!
//! 50 MHz oscillator, 8 LEDs, 4 buttons, quad SPI configuration flash,
//! micro-SD slot, one DDR3 x32 bank, an RTL8211 RGMII PHY, and HDMI in/out.

use crate::device::{DefaultClock, DeviceDescriptor, ProgrammerInfo, ToolchainCommands};
use crate::error::BoardError;
use crate::Board;
use kiln_common::Frequency;
use kiln_resource::{PinGroup, ResourceDescriptor, ResourceRegistry};
use std::sync::Arc;

/// Catalog name of this board.
pub const NAME: &str = "bochen_kintex7_base";

const PART: &str = "xc7k325t-ffg676-2";

const LED_PINS: [&str; 8] = ["A23", "A24", "D23", "C24", "C26", "D24", "D25", "E25"];
const BUTTON_PINS: [&str; 4] = ["D26", "J26", "E26", "G26"];

/// The Bochen Kintex-7 Base board.
#[derive(Debug)]
pub struct BochenKintex7Base {
    descriptor: DeviceDescriptor,
    resources: Arc<ResourceRegistry>,
}

impl BochenKintex7Base {
    /// Builds the board's pin catalog and device metadata.
    pub fn new() -> Result<Self, BoardError> {
        let mut descriptor = DeviceDescriptor::new(
            PART,
            DefaultClock {
                name: "clk50".to_string(),
                frequency: Frequency::from_mhz(50.0),
            },
        )?;
        descriptor.toolchain = ToolchainCommands {
            bitstream: vec![
                "set_property BITSTREAM.GENERAL.COMPRESS True [current_design]".to_string(),
                "set_property BITSTREAM.CONFIG.SPI_BUSWIDTH 4 [current_design]".to_string(),
                "set_property BITSTREAM.CONFIG.CONFIGRATE 50 [current_design]".to_string(),
            ],
            additional: vec![
                "write_cfgmem -force -format bin -interface spix4 -size 16 \
                 -loadbit \"up 0x0 {build_name}.bit\" -file {build_name}.bin"
                    .to_string(),
            ],
            platform: vec!["set_property DCI_CASCADE {32} [get_iobanks 33]".to_string()],
        };
        descriptor.programmer = ProgrammerInfo {
            openocd_config: Some("openocd_xc7_ft232.cfg".to_string()),
            openocd_proxy: Some("bscan_spi_xc7a325t.bit".to_string()),
            flash_part: Some("mx25l25645g-spi-x1_x2_x4".to_string()),
        };
        let resources = ResourceRegistry::from_descriptors(pin_table())?;
        Ok(Self {
            descriptor,
            resources: Arc::new(resources),
        })
    }
}

impl Board for BochenKintex7Base {
    fn name(&self) -> &str {
        NAME
    }

    fn title(&self) -> &str {
        "Bochen Kintex7 Base"
    }

    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn resources(&self) -> Arc<ResourceRegistry> {
        Arc::clone(&self.resources)
    }
}

fn lvcmos33(name: &str, index: u32, pins: &str) -> ResourceDescriptor {
    ResourceDescriptor::new(name, index)
        .pins(pins)
        .io_standard("LVCMOS33")
}

fn pin_table() -> Vec<ResourceDescriptor> {
    let mut io = vec![
        lvcmos33("clk50", 0, "G22"),
        lvcmos33("cpu_reset_n", 0, "H26"),
    ];
    io.extend(
        (0u32..)
            .zip(LED_PINS)
            .map(|(i, pin)| lvcmos33("user_led", i, pin)),
    );
    io.extend(
        (0u32..)
            .zip(BUTTON_PINS)
            .map(|(i, pin)| lvcmos33("user_btn", i, pin)),
    );

    // The flash clock is driven through STARTUPE2 and has no user pin.
    io.push(
        ResourceDescriptor::new("spiflash4x", 0)
            .subsignal(PinGroup::subsignal("cs_n", "C23"))
            .subsignal(PinGroup::subsignal("dq", "B24 A25 B22 A22"))
            .io_standard("LVCMOS33"),
    );

    io.push(
        ResourceDescriptor::new("serial", 0)
            .subsignal(PinGroup::subsignal("tx", "C22"))
            .subsignal(PinGroup::subsignal("rx", "B20"))
            .io_standard("LVCMOS33"),
    );

    // Both SD card modes share the same slot pins.
    io.push(
        ResourceDescriptor::new("spisdcard", 0)
            .subsignal(PinGroup::subsignal("clk", "G24"))
            .subsignal(PinGroup::subsignal("cs_n", "F24").misc("PULLUP True"))
            .subsignal(PinGroup::subsignal("mosi", "G25").misc("PULLUP True"))
            .subsignal(PinGroup::subsignal("miso", "F23").misc("PULLUP True"))
            .misc("SLEW=FAST")
            .io_standard("LVCMOS33"),
    );
    io.push(
        ResourceDescriptor::new("sdcard", 0)
            .subsignal(PinGroup::subsignal("clk", "G24"))
            .subsignal(PinGroup::subsignal("cmd", "G25").misc("PULLUP True"))
            .subsignal(PinGroup::subsignal("data", "F23 E23 F25 F24").misc("PULLUP True"))
            .misc("SLEW=FAST")
            .io_standard("LVCMOS33"),
    );

    io.push(ddram());

    io.push(
        ResourceDescriptor::new("eth_clocks", 0)
            .subsignal(PinGroup::subsignal("tx", "AC2"))
            .subsignal(PinGroup::subsignal("rx", "AB2"))
            .io_standard("LVCMOS18"),
    );
    io.push(
        ResourceDescriptor::new("eth", 0)
            .subsignal(PinGroup::subsignal("rst_n", "Y2"))
            .subsignal(PinGroup::subsignal("mdio", "AF5"))
            .subsignal(PinGroup::subsignal("mdc", "W1"))
            .subsignal(PinGroup::subsignal("rx_ctl", "AF4"))
            .subsignal(PinGroup::subsignal("rx_data", "AF3 AC3 AE2 AE1"))
            .subsignal(PinGroup::subsignal("tx_ctl", "Y1"))
            .subsignal(PinGroup::subsignal("tx_data", "AC1 AB1 AB4 Y3"))
            .io_standard("LVCMOS18"),
    );

    io.push(hdmi(
        "hdmi_in",
        &[
            ("clk", "F17", "E17"),
            ("data0", "J15", "J16"),
            ("data1", "E15", "E16"),
            ("data2", "G17", "F18"),
        ],
    )
    .subsignal(PinGroup::subsignal("scl", "H19").io_standard("LVCMOS33"))
    .subsignal(PinGroup::subsignal("sda", "F19").io_standard("LVCMOS33")));
    io.push(hdmi(
        "hdmi_out",
        &[
            ("clk", "E18", "D18"),
            ("data0", "D19", "D20"),
            ("data1", "H17", "H18"),
            ("data2", "G19", "F20"),
        ],
    ));

    io
}

fn ddram() -> ResourceDescriptor {
    let sstl15 = |name: &str, pins: &str| PinGroup::subsignal(name, pins).io_standard("SSTL15");
    let diff = |name: &str, pins: &str| PinGroup::subsignal(name, pins).io_standard("DIFF_SSTL15");
    ResourceDescriptor::new("ddram", 0)
        .subsignal(sstl15(
            "a",
            "AF8 AB10 V9 Y7 AC9 W8 Y11 V8 AA8 AC11 AD9 AA10 AF9 V7 Y8",
        ))
        .subsignal(sstl15("ba", "AA7 AB11 AF7"))
        .subsignal(sstl15("ras_n", "AD8"))
        .subsignal(sstl15("cas_n", "W10"))
        .subsignal(sstl15("we_n", "W9"))
        .subsignal(sstl15("cs_n", "AB7"))
        .subsignal(sstl15("dm", "AF15 AA15 AB19 V14"))
        .subsignal(
            PinGroup::subsignal(
                "dq",
                "AF14 AF17 AE15 AE17 AD16 AF20 AD15 AF19 \
                 AB15 AC14 AA18 AA14 AB16 AB14 AA17 AD14 \
                 AD19 AC19 AD18 AA19 AC17 AA20 AC18 AB17 \
                 Y17 V16 V17 W14 V18 W15 V19 W16",
            )
            .io_standard("SSTL15_T_DCI"),
        )
        .subsignal(diff("dqs_p", "AE18 Y15 AD20 W18"))
        .subsignal(diff("dqs_n", "AF18 Y16 AE20 W19"))
        .subsignal(diff("clk_p", "AA9"))
        .subsignal(diff("clk_n", "AB9"))
        .subsignal(sstl15("cke", "AF10"))
        .subsignal(sstl15("odt", "AC8"))
        .subsignal(PinGroup::subsignal("reset_n", "Y10").io_standard("LVCMOS15"))
        .misc("SLEW=FAST")
        .misc("VCCAUX_IO=HIGH")
}

/// Builds a TMDS port from `(lane, p, n)` triples.
fn hdmi(name: &str, lanes: &[(&str, &str, &str)]) -> ResourceDescriptor {
    lanes
        .iter()
        .fold(ResourceDescriptor::new(name, 0), |desc, (lane, p, n)| {
            desc.subsignal(PinGroup::subsignal(&format!("{lane}_p"), p).io_standard("TMDS_33"))
                .subsignal(PinGroup::subsignal(&format!("{lane}_n"), n).io_standard("TMDS_33"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_resource::AttrKey;

    fn board() -> BochenKintex7Base {
        BochenKintex7Base::new().unwrap()
    }

    #[test]
    fn device_metadata() {
        let b = board();
        assert_eq!(b.device(), "xc7k325t-ffg676-2");
        assert_eq!(b.descriptor().speedgrade, -2);
        assert_eq!(b.default_clock().frequency, Frequency::from_mhz(50.0));
        assert_eq!(
            b.descriptor().programmer.flash_part.as_deref(),
            Some("mx25l25645g-spi-x1_x2_x4")
        );
        assert_eq!(b.descriptor().toolchain.bitstream.len(), 3);
    }

    #[test]
    fn pin_table_families() {
        let reg = board().resources();
        assert_eq!(reg.instance_count("user_led"), 8);
        assert_eq!(reg.instance_count("user_btn"), 4);
        for name in [
            "clk50",
            "cpu_reset_n",
            "spiflash4x",
            "serial",
            "spisdcard",
            "sdcard",
            "ddram",
            "eth_clocks",
            "eth",
            "hdmi_in",
            "hdmi_out",
        ] {
            assert!(reg.contains(name, 0), "missing {name}");
        }
    }

    #[test]
    fn ddram_widths_and_standards() {
        let reg = board().resources();
        let ddram = reg.lookup("ddram", 0).unwrap();
        let dq = ddram.group("dq").unwrap();
        assert_eq!(dq.width(), 32);
        assert_eq!(ddram.group("a").unwrap().width(), 15);
        assert_eq!(ddram.effective_attrs(dq)[&AttrKey::IoStandard], "SSTL15_T_DCI");
        assert_eq!(ddram.effective_attrs(dq)[&AttrKey::VccauxIo], "HIGH");
    }

    #[test]
    fn hdmi_out_lanes() {
        let reg = board().resources();
        let hdmi = reg.lookup("hdmi_out", 0).unwrap();
        assert_eq!(hdmi.groups.len(), 8);
        assert_eq!(hdmi.group("clk_p").unwrap().pins, vec!["E18"]);
        assert_eq!(hdmi.group("data2_n").unwrap().pins, vec!["F20"]);
    }

    #[test]
    fn catalog_is_shared() {
        let b = board();
        assert!(Arc::ptr_eq(&b.resources(), &b.resources()));
    }
}
