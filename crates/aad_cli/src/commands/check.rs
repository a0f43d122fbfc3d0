//! Check command: prints the resolved configuration and engine capabilities.

use std::fmt::Write;

use aad_core::config::MAX_TAPE_NODES;
use aad_core::OperatorType;

use super::OutputFormat;
use crate::config::CliConfig;
use crate::Result;

/// Renders the check report.
pub fn render(config: &CliConfig, source: &str, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(config)?),
        OutputFormat::Table => {
            let operators: Vec<&str> = OperatorType::ALL.iter().map(|op| op.name()).collect();

            let mut out = String::new();
            let _ = writeln!(out, "========================================");
            let _ = writeln!(out, "AAD Configuration Check");
            let _ = writeln!(out, "========================================");
            let _ = writeln!(out, "Config file:      {}", source);
            let _ = writeln!(out, "Tape node limit:  {}", MAX_TAPE_NODES);
            let _ = writeln!(out, "Operators:        {}", operators.join(", "));
            let _ = writeln!(out, "----------------------------------------");
            out.push_str(&toml::to_string_pretty(config)?);
            Ok(out)
        }
    }
}

/// Runs the check command.
pub fn run(config: &CliConfig, source: &str, format: OutputFormat) -> Result<()> {
    print!("{}", render(config, source, format)?);
    if format == OutputFormat::Json {
        println!();
    }
    Ok(())
}
