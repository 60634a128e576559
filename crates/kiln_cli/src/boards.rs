//! `kiln boards`: list the built-in board catalog.

use crate::ReportFormat;

/// Runs the `kiln boards` command.
pub fn run(format: ReportFormat) -> Result<i32, Box<dyn std::error::Error>> {
    let mut entries = Vec::new();
    for name in kiln_board::builtin_boards() {
        let board = kiln_board::load_board(name)?;
        let clock = board.default_clock();
        entries.push(serde_json::json!({
            "name": board.name(),
            "title": board.title(),
            "part": board.device(),
            "default_clock": clock.name,
            "default_clock_freq": clock.frequency.hz(),
            "resources": board.resources().len(),
        }));
        if format == ReportFormat::Text {
            println!(
                "{:<24} {:<20} {} ({} @ {})",
                board.name(),
                board.device(),
                board.title(),
                clock.name,
                clock.frequency
            );
        }
    }
    if format == ReportFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }
    Ok(0)
}
