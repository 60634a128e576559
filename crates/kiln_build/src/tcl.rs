//! Vivado batch build script rendering.

use kiln_compose::TargetAssembly;

/// Placeholder replaced with the build name in board commands.
const BUILD_NAME: &str = "{build_name}";

/// Renders the non-project-mode Vivado script for `build_name`.
///
/// The script expects `<build_name>.v` (the SoC generator's top level) and
/// `<build_name>.xdc` next to it, and leaves `<build_name>.bit` plus whatever
/// the board's additional commands produce.
pub fn render_tcl(assembly: &TargetAssembly, build_name: &str) -> String {
    let part = assembly.device();
    let commands = &assembly.device_descriptor().toolchain;
    let mut out = String::new();

    out.push_str(&format!("# {} ({})\n", assembly.ident(), assembly.fingerprint()));
    out.push('\n');
    out.push_str("# Create Project\n\n");
    out.push_str(&format!("create_project -force -name {build_name} -part {part}\n"));
    out.push_str("set_msg_config -id {Common 17-55} -new_severity {Warning}\n");
    out.push('\n');

    out.push_str("# Add Sources\n\n");
    out.push_str(&format!("read_verilog {{{build_name}.v}}\n"));
    out.push('\n');

    out.push_str("# Add constraints\n\n");
    out.push_str(&format!("read_xdc {build_name}.xdc\n"));
    out.push_str(&format!("set_property PROCESSING_ORDER EARLY [get_files {build_name}.xdc]\n"));
    out.push('\n');

    out.push_str("# Synthesis\n\n");
    out.push_str(&format!("synth_design -directive default -top {build_name} -part {part}\n"));
    out.push_str(&format!("report_timing_summary -file {build_name}_timing_synth.rpt\n"));
    out.push_str(&format!(
        "report_utilization -hierarchical -file {build_name}_utilization_hierarchical_synth.rpt\n"
    ));
    out.push('\n');

    out.push_str("# Optimize, place and route\n\n");
    out.push_str("opt_design -directive default\n");
    out.push_str("place_design -directive default\n");
    out.push_str("route_design -directive default\n");
    out.push_str("phys_opt_design -directive default\n");
    out.push_str("report_timing_summary -no_header -no_detailed_paths\n");
    out.push_str(&format!("report_route_status -file {build_name}_route_status.rpt\n"));
    out.push_str(&format!(
        "report_timing_summary -datasheet -max_paths 10 -file {build_name}_timing.rpt\n"
    ));
    out.push('\n');

    out.push_str("# Bitstream generation\n\n");
    for line in &commands.bitstream {
        out.push_str(&format!("{}\n", line.replace(BUILD_NAME, build_name)));
    }
    out.push_str(&format!("write_bitstream -force {build_name}.bit\n"));
    for line in &commands.additional {
        out.push_str(&format!("{}\n", line.replace(BUILD_NAME, build_name)));
    }
    out.push('\n');

    out.push_str("# End\n\n");
    out.push_str("quit\n");
    out
}
