//! Xilinx Design Constraints rendering.
//!
//! Port names follow the SoC generator's convention: the resource name, the
//! instance index when the board has more than one instance of the resource,
//! and the subsignal name, joined with `_`. Multi-pin groups are buses indexed
//! with `[i]`.

use kiln_clock::{ClockDomain, DomainSource};
use kiln_compose::TargetAssembly;
use kiln_resource::{PinGroup, ResourceDescriptor, ResourceRegistry};

/// Returns the top-level port name of one pin group.
pub fn port_name(
    registry: &ResourceRegistry,
    descriptor: &ResourceDescriptor,
    group: &PinGroup,
) -> String {
    let mut name = descriptor.name.clone();
    if registry.instance_count(&descriptor.name) > 1 {
        name.push_str(&descriptor.index.to_string());
    }
    if let Some(subsignal) = &group.subsignal {
        name.push('_');
        name.push_str(subsignal);
    }
    name
}

/// Renders the full constraint file for an assembly.
pub fn render_xdc(assembly: &TargetAssembly) -> String {
    let registry = assembly.registry();
    let mut out = String::new();

    section(&mut out, "IO constraints");
    for descriptor in assembly.bound_descriptors() {
        for group in &descriptor.groups {
            render_group(&mut out, registry, descriptor, group);
        }
    }

    let platform = &assembly.device_descriptor().toolchain.platform;
    if !platform.is_empty() {
        section(&mut out, "Design constraints");
        for line in platform {
            out.push_str(&format!("{line}\n"));
        }
        out.push('\n');
    }

    section(&mut out, "Clock constraints");
    let graph = assembly.clock_graph();
    for domain in graph.roots() {
        out.push_str(&format!(
            "create_clock -name {} -period {:.3} {}\n",
            domain.name,
            domain.frequency.period_ns(),
            clock_object(registry, domain),
        ));
    }
    for synthesizer in graph.synthesizers() {
        let vco = synthesizer
            .config
            .vco
            .map(|v| format!(", VCO {v}"))
            .unwrap_or_default();
        out.push_str(&format!(
            "# {} ({}) from {}: DIVCLK {}, MULT {}{vco}\n",
            synthesizer.name,
            synthesizer.primitive,
            synthesizer.upstream,
            synthesizer.config.divclk_divide,
            synthesizer.config.clkfbout_mult,
        ));
        for (index, output) in synthesizer.config.outputs.iter().enumerate() {
            out.push_str(&format!(
                "#   CLKOUT{index} -> {}: divide {}, {}\n",
                output.domain,
                output.divide,
                output.achieved,
            ));
        }
    }
    out.push('\n');

    let false_paths = graph.false_paths();
    if !false_paths.is_empty() {
        section(&mut out, "False path constraints");
        for path in false_paths {
            let (Some(from), Some(to)) = (graph.domain(&path.from), graph.domain(&path.to)) else {
                continue;
            };
            out.push_str(&format!(
                "set_clock_groups -group [get_clocks -include_generated_clocks -of [get_nets {}]] \
                 -group [get_clocks -include_generated_clocks -of [get_nets {}]] -asynchronous\n",
                net_name(registry, from),
                net_name(registry, to),
            ));
        }
        out.push('\n');
    }

    out
}

fn section(out: &mut String, title: &str) {
    let rule = "#".repeat(80);
    out.push_str(&format!("{rule}\n# {title}\n{rule}\n\n"));
}

fn render_group(
    out: &mut String,
    registry: &ResourceRegistry,
    descriptor: &ResourceDescriptor,
    group: &PinGroup,
) {
    let base = port_name(registry, descriptor, group);
    match &group.subsignal {
        Some(sub) => {
            out.push_str(&format!("## {}.{sub}\n", descriptor.key()));
        }
        None => {
            out.push_str(&format!("## {}\n", descriptor.key()));
        }
    }
    let attrs = descriptor.effective_attrs(group);
    let bus = group.width() > 1;
    for (bit, pin) in group.pins.iter().enumerate() {
        let port = if bus {
            format!("{base}[{bit}]")
        } else {
            base.clone()
        };
        out.push_str(&format!("set_property LOC {pin} [get_ports {{{port}}}]\n"));
        for (key, value) in &attrs {
            out.push_str(&format!("set_property {key} {value} [get_ports {{{port}}}]\n"));
        }
    }
    out.push('\n');
}

/// The pin port an oscillator enters on, if it is bound to a resource.
fn root_port(registry: &ResourceRegistry, domain: &ClockDomain) -> Option<String> {
    let DomainSource::Root {
        resource: Some(resource),
    } = &domain.source
    else {
        return None;
    };
    let descriptor = registry.lookup(resource, 0)?;
    let group = descriptor.groups.first()?;
    Some(port_name(registry, descriptor, group))
}

fn clock_object(registry: &ResourceRegistry, domain: &ClockDomain) -> String {
    match root_port(registry, domain) {
        Some(port) => format!("[get_ports {{{port}}}]"),
        None => format!("[get_nets {{{}_clk}}]", domain.name),
    }
}

fn net_name(registry: &ResourceRegistry, domain: &ClockDomain) -> String {
    root_port(registry, domain).unwrap_or_else(|| format!("{}_clk", domain.name))
}
