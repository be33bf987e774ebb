use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::changelog::ChangelogOutput;
use crate::error::Result;

const DELIMITER: &str = "TAG_RELEASE_BRIDGE_EOF";

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Markdown,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Text printed to stdout for a finished run.
pub fn format_output(output: &ChangelogOutput, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(output.body.clone()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(output)?),
    }
}

/// Appends `body`, `prev_tag` and `count` to a workflow output file.
pub fn write_workflow_outputs(path: &Path, output: &ChangelogOutput) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(workflow_outputs(output).as_bytes())?;
    Ok(())
}

fn workflow_outputs(output: &ChangelogOutput) -> String {
    let mut delimiter = DELIMITER.to_string();
    while output.body.contains(&delimiter) {
        delimiter.push('_');
    }

    format!(
        "body<<{delimiter}\n{}\n{delimiter}\nprev_tag={}\ncount={}\n",
        output.body, output.prev_tag, output.count
    )
}
