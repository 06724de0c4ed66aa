//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "ssemcp.toml";

#[derive(Parser, Debug)]
#[command(name = "ssemcp")]
#[command(about = "Talk to an MCP server over an SSE event stream")]
#[command(version)]
pub struct Cli {
    /// Event stream URL (overrides the config file and SSEMCP_BASE_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Path to configuration file (TOML or JSON)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Seconds to wait for each operation
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the tools the server offers
    Tools,

    /// Invoke a tool and print its outcome
    Call {
        /// Tool name
        name: String,

        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Check that the server answers
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_with_args() {
        let cli = Cli::try_parse_from([
            "ssemcp",
            "--url",
            "http://localhost:9000/a/mcp",
            "call",
            "echo",
            "--args",
            r#"{"text":"hi"}"#,
        ])
        .unwrap();

        assert_eq!(cli.url.as_deref(), Some("http://localhost:9000/a/mcp"));
        match cli.command {
            Commands::Call { name, args } => {
                assert_eq!(name, "echo");
                assert_eq!(args, r#"{"text":"hi"}"#);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ssemcp", "tools"]).unwrap();
        assert_eq!(cli.timeout, 30);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Tools));
    }

    #[test]
    fn test_call_args_default_to_empty_object() {
        let cli = Cli::try_parse_from(["ssemcp", "-v", "call", "noop"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Call { args, .. } => assert_eq!(args, "{}"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["ssemcp"]).is_err());
    }
}
