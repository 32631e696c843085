//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docplan - document planning assistant
#[derive(Parser)]
#[command(
    name = "dp",
    about = "Plan a document's sections, track their progress and keep them in sync with its headings",
    version,
    after_help = "Logs are written to: ~/.local/share/docplan/logs/docplan.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// JSON document to plan; without it sync and drafting are unavailable
    #[arg(short, long, global = true, value_name = "FILE")]
    pub document: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Replace the outline and plan with the built-in template
    Template,

    /// Generate a plan from a description
    Generate {
        /// What the document is about
        prompt: String,

        /// Update the current plan instead of replacing it
        #[arg(short, long)]
        update: bool,
    },

    /// Synchronize the plan with the document headings
    Sync,

    /// Refresh section statistics from the document
    Stats,

    /// Add a custom section
    Add {
        /// Section title
        title: Option<String>,

        /// 1 for a section, 2 for a subsection
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=2))]
        level: u8,
    },

    /// Delete a section from the outline and the plan
    Delete {
        id: u32,

        /// Only delete from the outline (refused for default sections still in the plan)
        #[arg(long)]
        outline: bool,
    },

    /// Add an outline section to the plan
    Include { id: u32 },

    /// Remove a section from the plan, keeping it in the outline
    Exclude { id: u32 },

    /// Set a section's status
    Status {
        id: u32,

        /// empty, created, drafted, checked, referenced, edited, verified or finalized
        status: String,
    },

    /// Set a section's comments
    Comment { id: u32, text: String },

    /// Rename a section
    Rename { id: u32, title: String },

    /// Draft a section's content from its comments
    Draft { id: u32 },

    /// Show the plan
    Show {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the outline as JSON
    ExportToc,

    /// Replace the outline from a JSON file
    ImportToc { file: PathBuf },

    /// Print the outline and plan as JSON
    SavePlan,

    /// Replace the outline and plan from a JSON file
    LoadPlan { file: PathBuf },

    /// Store an API key locally
    SetKey { key: String },

    /// Delete every section and start over
    Reset,
}

/// Output format for the show command
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["dp"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_generate_update() {
        let cli = Cli::parse_from(["dp", "generate", "--update", "add a budget section"]);
        if let Some(Command::Generate { prompt, update }) = cli.command {
            assert_eq!(prompt, "add a budget section");
            assert!(update);
        } else {
            panic!("Expected Generate command");
        }
    }

    #[test]
    fn test_cli_parse_add_level() {
        let cli = Cli::parse_from(["dp", "add", "Budget", "--level", "2"]);
        assert!(matches!(cli.command, Some(Command::Add { level: 2, .. })));
        assert!(Cli::try_parse_from(["dp", "add", "Budget", "--level", "3"]).is_err());
    }

    #[test]
    fn test_cli_parse_delete_outline() {
        let cli = Cli::parse_from(["dp", "delete", "5", "--outline"]);
        assert!(matches!(cli.command, Some(Command::Delete { id: 5, outline: true })));
    }

    #[test]
    fn test_cli_global_document() {
        let cli = Cli::parse_from(["dp", "sync", "--document", "report.json"]);
        assert_eq!(cli.document, Some(PathBuf::from("report.json")));
        assert!(matches!(cli.command, Some(Command::Sync)));
    }

    #[test]
    fn test_output_format_from_str() {
        assert!(matches!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text)));
        assert!(matches!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::parse_from(["dp", "-c", "/path/to/config.yml", "show"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
    }
}
