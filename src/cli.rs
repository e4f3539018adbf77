//! CLI - Command Line Interface for zapcast
//!
//! Everything the TUI reads can be fetched from a script. All output is
//! JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # List live channels
//! zapcast channels --json
//!
//! # One catalog page
//! zapcast browse --type series --page 2
//!
//! # Resolve and cast
//! zapcast resolve file-123
//! zapcast cast file-123 --device "Living Room TV" --start 600
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::ContentType;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// No cast device given or configured
    DeviceNotFound = 4,
    /// Nothing playable behind the reference
    NoStream = 5,
    /// Cast failed
    CastFailed = 6,
    /// Progress store unreadable or unwritable
    StorageError = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// zapcast - remote-driven TUI for IPTV-style catalogs
///
/// Run without arguments to launch interactive TUI.
/// Use subcommands for scriptable automation.
#[derive(Parser, Debug)]
#[command(
    name = "zapcast",
    version,
    about = "Remote-driven TUI media browser and player",
    long_about = "Browse movies, series and live TV from a catalog server, \
                  play them in mpv, zap between channels, and pick up where you left off.\n\n\
                  Run without arguments to launch the interactive TUI.\n\
                  Use subcommands for automation and scripting.",
    after_help = "EXAMPLES:\n\
                  zapcast                             Launch interactive TUI\n\
                  zapcast channels                    List live channels\n\
                  zapcast browse -t movie -p 2        Second page of movies\n\
                  zapcast continue --json             Continue-watching list"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Target Chromecast device name
    #[arg(long, short = 'd', global = true)]
    pub device: Option<String>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Catalog server base URL (overrides config and ZAPCAST_SERVER)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Content shown at startup in the TUI
    #[arg(long = "type", short = 't', value_parser = parse_content_type)]
    pub content: Option<ContentType>,

    /// Keep watch progress in memory only
    #[arg(long, global = true)]
    pub no_save: bool,

    /// Subcommand to run (omit for TUI mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Check if running in CLI mode (has subcommand)
    pub fn is_cli_mode(&self) -> bool {
        self.command.is_some()
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

/// Accepts "movie", "movies", "series", "shows", "tv", "live", ...
pub fn parse_content_type(s: &str) -> Result<ContentType, String> {
    ContentType::from_str_loose(s)
        .ok_or_else(|| format!("unknown content type '{}' (movie, series, tv)", s))
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List live TV channels with what is on now
    #[command(visible_alias = "ch")]
    Channels(ChannelsCmd),

    /// Fetch one catalog page
    #[command(visible_alias = "b")]
    Browse(BrowseCmd),

    /// Resolve a file or channel reference into its stream
    #[command(visible_alias = "r")]
    Resolve(ResolveCmd),

    /// List in-progress movies and series
    #[command(name = "continue", visible_alias = "cw")]
    Continue(ContinueCmd),

    /// Forget the watch progress of a movie or series
    Forget(ForgetCmd),

    /// Resolve a reference and cast it to a device
    Cast(CastCmd),
}

// =============================================================================
// Channels Command
// =============================================================================

/// List live channels
#[derive(Args, Debug)]
pub struct ChannelsCmd {
    /// Only channels whose title contains this text
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Maximum number of channels
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

// =============================================================================
// Browse Command
// =============================================================================

/// Fetch one page of the catalog
#[derive(Args, Debug)]
pub struct BrowseCmd {
    /// Content type
    #[arg(long = "type", short = 't', default_value = "movie", value_parser = parse_content_type)]
    pub content: ContentType,

    /// Page number (1-based)
    #[arg(long, short = 'p', default_value = "1")]
    pub page: usize,

    /// Free-text search
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Category id
    #[arg(long)]
    pub category: Option<String>,

    /// Series id (lists its seasons)
    #[arg(long)]
    pub series: Option<String>,

    /// Season id (lists its episodes, needs --series)
    #[arg(long, requires = "series")]
    pub season: Option<String>,
}

// =============================================================================
// Resolve Command
// =============================================================================

/// Resolve a reference into the raw command and proxied URL
#[derive(Args, Debug)]
pub struct ResolveCmd {
    /// File id, channel id or stream command
    #[arg(required = true)]
    pub reference: String,
}

// =============================================================================
// Progress Commands
// =============================================================================

/// List the continue-watching entries, newest first
#[derive(Args, Debug)]
pub struct ContinueCmd {
    /// Maximum number of entries
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

/// Remove stored progress
#[derive(Args, Debug)]
pub struct ForgetCmd {
    /// Movie or series id
    #[arg(required = true)]
    pub media_id: String,
}

// =============================================================================
// Cast Command
// =============================================================================

/// Cast a resolved stream to a Chromecast device
#[derive(Args, Debug)]
pub struct CastCmd {
    /// File id, channel id or stream command
    #[arg(required = true)]
    pub reference: String,

    /// Start position in seconds
    #[arg(long)]
    pub start: Option<u64>,
}

/// Effective cast device: `--device`, then the configured default
pub fn effective_device<'a>(
    global: &'a Option<String>,
    configured: &'a Option<String>,
) -> Option<&'a str> {
    global.as_deref().or(configured.as_deref())
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Status OK response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusOk {
    pub status: &'static str,
}

impl Default for StatusOk {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

/// Resolve response
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub reference: String,
    pub command: String,
    pub proxied: String,
}

/// Cast success response
#[derive(Debug, Serialize, Deserialize)]
pub struct CastResponse {
    pub status: &'static str,
    pub device: String,
    pub stream_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print human-readable lines, or `data` as JSON in JSON mode
    pub fn print_lines<T: Serialize>(&self, data: T, lines: &[String]) -> anyhow::Result<()> {
        if self.json {
            return self.print(data);
        }
        for line in lines {
            println!("{}", line);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args_is_tui_mode() {
        let cli = Cli::parse_from::<_, &str>([]);
        assert!(!cli.is_cli_mode());
        assert!(!cli.no_save);
    }

    #[test]
    fn test_tui_start_content() {
        let cli = Cli::parse_from(["zapcast", "-t", "live", "--no-save"]);
        assert_eq!(cli.content, Some(ContentType::Tv));
        assert!(cli.no_save);
    }

    #[test]
    fn test_browse_defaults() {
        let cli = Cli::parse_from(["zapcast", "browse"]);
        if let Some(Command::Browse(cmd)) = cli.command {
            assert_eq!(cmd.content, ContentType::Movie);
            assert_eq!(cmd.page, 1);
            assert!(cmd.search.is_none());
        } else {
            panic!("Expected Browse command");
        }
    }

    #[test]
    fn test_season_requires_series() {
        assert!(Cli::try_parse_from(["zapcast", "browse", "--season", "s1"]).is_err());
        assert!(
            Cli::try_parse_from(["zapcast", "browse", "--series", "x", "--season", "s1"]).is_ok()
        );
    }

    #[test]
    fn test_unknown_content_type_rejected() {
        assert!(Cli::try_parse_from(["zapcast", "browse", "-t", "radio"]).is_err());
    }

    #[test]
    fn test_cast_device_precedence() {
        let cli = Cli::parse_from(["zapcast", "--device", "Global", "cast", "f1", "--start", "90"]);
        let configured = Some("Configured".to_string());
        if let Some(Command::Cast(cmd)) = &cli.command {
            assert_eq!(cmd.start, Some(90));
            assert_eq!(effective_device(&cli.device, &configured), Some("Global"));
            assert_eq!(effective_device(&None, &configured), Some("Configured"));
        } else {
            panic!("Expected Cast command");
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::NetworkError), 3);
        assert_eq!(i32::from(ExitCode::StorageError), 7);
    }
}
