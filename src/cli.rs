//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ClassInsight - grade statistics and AI insights for teachers
///
/// Computes class and student statistics from a school dataset and asks a
/// local Ollama model for pedagogical insights. Results are saved per class
/// and period, per student, and for the whole roster.
///
/// Examples:
///   classinsight class --class 10 --period 1
///   classinsight class --class 10 --force
///   classinsight student --student 4 --format json
///   classinsight roster
///   classinsight stats --class 10
///   classinsight init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the school dataset (JSON)
    #[arg(short, long, global = true, value_name = "FILE", env = "CLASSINSIGHT_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Path to the SQLite database holding saved analyses
    #[arg(long, global = true, value_name = "FILE", env = "CLASSINSIGHT_DATABASE")]
    pub database: Option<PathBuf>,

    /// Id of the user the analyses are generated for
    #[arg(short, long, global = true, value_name = "ID", env = "CLASSINSIGHT_USER")]
    pub user: Option<i64>,

    /// Ollama model to use for insights
    #[arg(short, long, global = true, env = "CLASSINSIGHT_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, global = true, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .classinsight.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, global = true, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the result to a file instead of stdout
    #[arg(short, long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Analyze one class in one grading period
    Class {
        /// Class id
        #[arg(long, value_name = "ID")]
        class: u64,

        /// Period id (defaults to the latest period)
        #[arg(long, value_name = "ID")]
        period: Option<u64>,

        /// Regenerate even when a saved analysis exists
        #[arg(long)]
        force: bool,
    },

    /// Analyze one student across all periods
    Student {
        /// Student id
        #[arg(long, value_name = "ID")]
        student: u64,

        /// Regenerate even when a saved analysis exists
        #[arg(long)]
        force: bool,
    },

    /// Summarize enrollment across classes
    Roster {
        /// Regenerate even when a saved analysis exists
        #[arg(long)]
        force: bool,
    },

    /// Print class statistics without calling the model
    Stats {
        /// Class id
        #[arg(long, value_name = "ID")]
        class: u64,

        /// Period id (defaults to the latest period)
        #[arg(long, value_name = "ID")]
        period: Option<u64>,
    },

    /// Generate a default .classinsight.toml configuration file
    InitConfig,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn make_args() -> Args {
        Args {
            command: Command::Roster { force: false },
            dataset: None,
            database: None,
            user: None,
            model: None,
            ollama_url: None,
            temperature: None,
            timeout: None,
            config: None,
            format: OutputFormat::Markdown,
            output: None,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_parse_class_command() {
        let args = Args::try_parse_from([
            "classinsight",
            "class",
            "--class",
            "10",
            "--period",
            "2",
            "--force",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(
            args.command,
            Command::Class {
                class: 10,
                period: Some(2),
                force: true
            }
        );
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["classinsight", "student", "--student", "4", "--user", "9"])
                .unwrap();
        assert_eq!(args.user, Some(9));
        assert_eq!(
            args.command,
            Command::Student {
                student: 4,
                force: false
            }
        );
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_temperature_range() {
        let mut args = make_args();
        args.temperature = Some(1.5);
        assert!(args.validate().is_err());
        args.temperature = Some(0.3);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
