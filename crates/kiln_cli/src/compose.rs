//! `kiln compose`: compose a target and report what it contains.


use kiln_compose::{Composer, TargetAssembly};

use crate::project::{self, Selection};
use crate::{ComposeArgs, GlobalArgs, ReportFormat};

/// Runs the `kiln compose` command.
pub fn run(args: &ComposeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let selection = project::select(&args.select, global)?;
    let assembly = compose(&selection, global)?;
    match args.format {
        ReportFormat::Text => print!("{}", render_summary(&assembly)),
        ReportFormat::Json => println!("{}", assembly.to_json()?),
    }
    Ok(0)
}

/// Composes the selection, printing the status header.
pub fn compose(
    selection: &Selection,
    global: &GlobalArgs,
) -> Result<TargetAssembly, kiln_compose::ComposeError> {
    if !global.quiet {
        eprintln!(
            "  Composing {} on {} ({})",
            selection.name,
            selection.board.title(),
            selection.board.device()
        );
        if let Some(target) = &selection.target {
            eprintln!("     Target {target}");
        }
    }
    Composer::new(selection.board.as_ref()).compose(&selection.features)
}

/// Renders the human-readable summary of an assembly.
pub fn render_summary(assembly: &TargetAssembly) -> String {
    let mut out = String::new();
    out.push_str(&format!("ident:       {}\n", assembly.ident()));
    out.push_str(&format!("board:       {} ({})\n", assembly.board(), assembly.device()));
    out.push_str(&format!("fingerprint: {}\n", assembly.fingerprint()));

    let graph = assembly.clock_graph();
    out.push_str("\nclocks:\n");
    for domain in graph.domains() {
        let source = match domain.upstream() {
            None => "oscillator".to_string(),
            Some(upstream) => {
                let synth = graph
                    .synthesizer_for(&domain.name)
                    .map(|s| s.name.as_str())
                    .unwrap_or("?");
                format!("{synth} <- {upstream}")
            }
        };
        let achieved = graph
            .achieved_frequency(&domain.name)
            .unwrap_or(domain.frequency);
        out.push_str(&format!(
            "  {:<10} {:>12}  {:<18} {}\n",
            domain.name,
            achieved.to_string(),
            domain.purpose.to_string(),
            source,
        ));
    }

    if !assembly.bindings().is_empty() {
        out.push_str("\nsubsystems:\n");
        for binding in assembly.bindings() {
            let resources: Vec<String> = binding
                .required_resources
                .iter()
                .map(ToString::to_string)
                .collect();
            out.push_str(&format!(
                "  {:<18} {:<16} {}\n",
                binding.kind.to_string(),
                binding.handle.core,
                resources.join(" "),
            ));
        }
    }

    let resources: Vec<String> = assembly.resources().iter().map(ToString::to_string).collect();
    out.push_str(&format!("\nresources:   {}\n", resources.join(" ")));
    for note in assembly.notes() {
        out.push_str(&format!("note:        {note}\n"));
    }
    out
}
