//! End-to-end composition scenarios on the built-in Kintex-7 board.

use kiln_clock::Purpose;
use kiln_common::Frequency;
use kiln_compose::{ComposeError, FlagMap, FlagValue, SubsystemKind};
use kiln_conformance::{check_graph, compose_flags, flags, switch_subsets, switches};
use kiln_resource::ResourceKey;

#[test]
fn empty_flags_give_root_and_sys_only() {
    let assembly = compose_flags(&FlagMap::new()).unwrap();
    let graph = assembly.clock_graph();
    assert_eq!(graph.len(), 2);
    assert!(graph.domain("clk50").unwrap().is_root());
    assert_eq!(graph.domain("sys").unwrap().upstream(), Some("clk50"));
    assert!(assembly.bindings().is_empty());
}

#[test]
fn sdram_target() {
    let assembly = compose_flags(&switches(&["with_sdram"])).unwrap();
    let graph = assembly.clock_graph();

    let sys = graph.domain("sys").unwrap();
    assert_eq!(sys.frequency, Frequency::from_mhz(100.0));
    assert_eq!(sys.upstream(), Some("clk50"));
    assert_eq!(
        graph.domain("sys4x").unwrap().frequency,
        Frequency::from_mhz(400.0)
    );
    assert_eq!(
        graph.domain("idelay").unwrap().frequency,
        Frequency::from_mhz(200.0)
    );

    let ddram = ResourceKey::new("ddram", 0);
    let bound = assembly.resources().iter().filter(|k| **k == ddram).count();
    assert_eq!(bound, 1);
    assert_eq!(
        assembly.subsystem(SubsystemKind::Sdram).unwrap().required_resources,
        vec![ddram]
    );
}

#[test]
fn sdram_solution_is_exact() {
    let assembly = compose_flags(&switches(&["with_sdram"])).unwrap();
    let graph = assembly.clock_graph();
    let crg = graph.synthesizer_for("sys").unwrap();
    assert_eq!(crg.config.vco, Some(Frequency::from_mhz(1200.0)));
    for domain in ["sys", "sys4x", "idelay"] {
        assert_eq!(
            graph.achieved_frequency(domain),
            Some(graph.domain(domain).unwrap().frequency),
            "{domain}"
        );
    }
}

#[test]
fn idelay_is_shared_between_memory_and_network() {
    let assembly = compose_flags(&switches(&["with_sdram", "with_ethernet"])).unwrap();
    let delay_domains: Vec<&str> = assembly
        .clock_graph()
        .domains()
        .iter()
        .filter(|d| d.purpose == Purpose::DelayCalibration)
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(delay_domains, vec!["idelay"]);
    for kind in [SubsystemKind::Sdram, SubsystemKind::Ethernet] {
        assert!(assembly
            .subsystem(kind)
            .unwrap()
            .required_domains
            .contains("idelay"));
    }
}

#[test]
fn etherbone_with_dynamic_ip_is_rejected() {
    let err = compose_flags(&switches(&["with_etherbone", "eth_dynamic_ip"])).unwrap_err();
    assert!(matches!(err, ComposeError::InvalidFeatureCombination(_)));
}

#[test]
fn both_video_modes_are_rejected() {
    let err = compose_flags(&switches(&["with_video_terminal", "with_video_framebuffer"]))
        .unwrap_err();
    assert!(matches!(err, ComposeError::InvalidFeatureCombination(_)));
}

#[test]
fn both_sdcard_modes_are_rejected() {
    let err = compose_flags(&switches(&["with_spi_sdcard", "with_sdcard"])).unwrap_err();
    assert!(matches!(err, ComposeError::InvalidFeatureCombination(_)));
}

#[test]
fn unknown_flag_is_rejected() {
    let err = compose_flags(&switches(&["with_pcie"])).unwrap_err();
    assert_eq!(err, ComposeError::UnknownFlag("with_pcie".to_string()));
}

#[test]
fn wrong_value_type_is_rejected() {
    let err = compose_flags(&flags(&[("with_sdram", FlagValue::Int(1))])).unwrap_err();
    assert!(matches!(err, ComposeError::InvalidFlagValue { .. }));
}

#[test]
fn every_switch_subset_is_valid_or_rejected_as_a_combination() {
    let mut composed = 0;
    for subset in switch_subsets() {
        match compose_flags(&subset) {
            Ok(assembly) => {
                composed += 1;
                if let Err(msg) = check_graph(assembly.clock_graph()) {
                    panic!("{subset:?}: {msg}");
                }
                let mut keys = assembly.resources().to_vec();
                keys.sort();
                keys.dedup();
                assert_eq!(keys.len(), assembly.resources().len(), "{subset:?}");
            }
            Err(ComposeError::InvalidFeatureCombination(_)) => {}
            Err(other) => panic!("{subset:?}: unexpected {other}"),
        }
    }
    assert!(composed > 0);
}

#[test]
fn video_runs_on_its_own_synthesizer() {
    let assembly = compose_flags(&flags(&[
        ("with_sdram", FlagValue::Bool(true)),
        ("with_video_framebuffer", FlagValue::Bool(true)),
        ("video_timings", FlagValue::Str("1280x720@60Hz".to_string())),
    ]))
    .unwrap();
    let graph = assembly.clock_graph();
    let crg = graph.synthesizer_for("sys").unwrap();
    let video = graph.synthesizer_for("hdmi").unwrap();
    assert_ne!(crg.id, video.id);
    assert_eq!(graph.synthesizers().len(), 2);
    let pixel = graph.achieved_frequency("hdmi").unwrap();
    assert!(pixel.within(Frequency::from_mhz(74.25), 1e-2));
}

#[test]
fn sys_clock_from_flag_string() {
    let assembly = compose_flags(&flags(&[(
        "sys_clk_freq",
        FlagValue::Str("125MHz".to_string()),
    )]))
    .unwrap();
    assert_eq!(
        assembly.clock_graph().domain("sys").unwrap().frequency,
        Frequency::from_mhz(125.0)
    );
}

#[test]
fn compositions_are_independent() {
    let first = compose_flags(&switches(&["with_sdram", "with_led_chaser"])).unwrap();
    let second = compose_flags(&switches(&["with_sdram", "with_led_chaser"])).unwrap();
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.resources(), second.resources());
}
