//! Conformance test helpers for Kiln target composition.
//!
//! Provides shorthand for building flag maps, composing them on the built-in
//! board, and checking the structural properties every composed clock graph
//! must have.

#![warn(missing_docs)]

use kiln_clock::FinalizedClockGraph;
use kiln_compose::{ComposeError, Composer, FeatureSet, FlagMap, FlagValue, TargetAssembly};

/// The board every scenario composes on unless stated otherwise.
pub const BOARD: &str = "bochen_kintex7_base";

/// Boolean feature switches, in the order used by [`switch_subsets`].
pub const SWITCHES: &[&str] = &[
    "with_sdram",
    "with_spi_flash",
    "with_spi_sdcard",
    "with_sdcard",
    "with_ethernet",
    "with_etherbone",
    "eth_dynamic_ip",
    "with_video_terminal",
    "with_video_framebuffer",
    "with_led_chaser",
    "with_uart",
];

/// Builds a flag map with every named switch set to `true`.
pub fn switches(names: &[&str]) -> FlagMap {
    names
        .iter()
        .map(|name| (name.to_string(), FlagValue::Bool(true)))
        .collect()
}

/// Builds a flag map from explicit name/value pairs.
pub fn flags(pairs: &[(&str, FlagValue)]) -> FlagMap {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Iterates over every subset of [`SWITCHES`] as a flag map.
pub fn switch_subsets() -> impl Iterator<Item = FlagMap> {
    (0u32..1 << SWITCHES.len()).map(|mask| {
        let names: Vec<&str> = SWITCHES
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect();
        switches(&names)
    })
}

/// Parses `flags` and composes them on the built-in board.
pub fn compose_flags(flags: &FlagMap) -> Result<TargetAssembly, ComposeError> {
    let features = FeatureSet::from_flags(flags)?;
    compose_features(&features)
}

/// Composes a feature set on the built-in board.
pub fn compose_features(features: &FeatureSet) -> Result<TargetAssembly, ComposeError> {
    let board = kiln_board::load_board(BOARD).expect("built-in board loads");
    Composer::new(board.as_ref()).compose(features)
}

/// Checks that the graph has exactly one root and every derived domain
/// reaches it through existing upstreams.
pub fn check_graph(graph: &FinalizedClockGraph) -> Result<(), String> {
    let roots: Vec<&str> = graph.roots().map(|d| d.name.as_str()).collect();
    if roots.len() != 1 {
        return Err(format!("expected one root, found {roots:?}"));
    }
    for domain in graph.domains() {
        let mut current = domain;
        let mut steps = 0;
        while let Some(upstream) = current.upstream() {
            current = graph
                .domain(upstream)
                .ok_or_else(|| format!("'{}' derives from missing '{upstream}'", current.name))?;
            steps += 1;
            if steps > graph.len() {
                return Err(format!("cycle through '{}'", domain.name));
            }
        }
        if current.name != roots[0] {
            return Err(format!("'{}' does not reach the root", domain.name));
        }
    }
    Ok(())
}
