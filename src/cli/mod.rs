//! Command-line interface for kbrowse.
//!
//! Streams search results from a KBrowse server into the terminal:
//! - `search`: Run a live search
//! - `cached`: Replay a shared result set
//! - `curl`: Print a reproduction command
//! - `link`: Encode or decode shareable links
//! - `configs`: Show the server's clusters and topics
//! - `partition`: Look up the default partition of a key

mod commands;

pub use commands::*;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{KbrowseError, Result};
use crate::model::{Endpoint, QueryState};

/// Streaming search client for KBrowse.
#[derive(Debug, Parser)]
#[command(name = "kbrowse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// KBrowse server URL (default from config: http://localhost:4000).
    #[arg(short = 's', long, global = true, env = "KBROWSE_SERVER")]
    pub server: Option<String>,

    /// Output format for structured data.
    #[arg(short = 'o', long, global = true, default_value = "text", env = "KBROWSE_OUTPUT")]
    pub output: OutputFormat,

    /// Suppress non-essential output.
    #[arg(short = 'q', long, global = true, env = "KBROWSE_QUIET")]
    pub quiet: bool,

    /// Output as JSON (shorthand for -o json).
    #[arg(long, global = true, env = "KBROWSE_JSON")]
    pub json: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn", env = "KBROWSE_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Log format (text, json, compact, pretty).
    #[arg(long, global = true, default_value = "text", env = "KBROWSE_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Path to custom configuration file.
    #[arg(long, global = true, env = "KBROWSE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Log level options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    #[default]
    Warn,
    /// Errors, warnings, and informational messages.
    Info,
    /// All of the above plus debug messages.
    Debug,
    /// All messages including trace-level details.
    Trace,
}

/// Log format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format.
    #[default]
    Text,
    /// Structured JSON format for machine consumption.
    Json,
    /// Compact single-line format.
    Compact,
    /// Pretty format with full details.
    Pretty,
}

impl LogLevel {
    /// Convert to tracing filter level.
    #[must_use]
    pub fn to_filter_string(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Output format for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON output; search results become one object per line.
    Json,
}

impl Cli {
    /// Get effective output format.
    #[must_use]
    pub fn effective_output(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.output
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search a topic, streaming matches as they are found.
    #[command(alias = "s")]
    Search(SearchArgs),

    /// Replay a previously shared result set.
    Cached(SearchArgs),

    /// Print a curl command reproducing a search.
    Curl(CurlArgs),

    /// Encode or decode shareable links.
    Link(LinkArgs),

    /// Show the server's clusters, topics and deserializers.
    Configs(ConfigsArgs),

    /// Look up the partition a key is written to.
    Partition(PartitionArgs),

    /// View and initialize configuration.
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Query parameters shared by every command that builds a search.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct QueryArgs {
    /// Topic to search.
    #[arg(short = 't', long)]
    pub topic: Option<String>,

    /// Bootstrap servers, or a cluster label from the server's configs.
    #[arg(short = 'b', long, env = "KBROWSE_BOOTSTRAP_SERVERS")]
    pub bootstrap_servers: Option<String>,

    /// Key regex, matched as given.
    #[arg(short = 'k', long)]
    pub key: Option<String>,

    /// Value regex, matched anywhere in the value.
    #[arg(short = 'r', long)]
    pub val_regex: Option<String>,

    /// Start offset: non-negative counts from the earliest record, negative from the latest.
    #[arg(long, allow_hyphen_values = true)]
    pub relative_offset: Option<i64>,

    /// Keep the search open and stream new records.
    #[arg(short = 'f', long)]
    pub follow: bool,

    /// Stop at the end of the topic, even if a shared link says to follow.
    #[arg(long, conflicts_with = "follow")]
    pub no_follow: bool,

    /// Let the server pick the partition from the key.
    #[arg(long, conflicts_with = "partitions")]
    pub default_partition: bool,

    /// Search the given partitions, even if a shared link selects the default one.
    #[arg(long, conflicts_with = "default_partition")]
    pub no_default_partition: bool,

    /// Comma-separated partitions to search.
    #[arg(short = 'p', long)]
    pub partitions: Option<String>,

    /// Value deserializer name.
    #[arg(long)]
    pub value_deserializer: Option<String>,

    /// Schema registry URL for deserializers that need one.
    #[arg(long)]
    pub schema_registry_url: Option<String>,

    /// Start from a shared link; explicit flags override its fields.
    ///
    /// `--follow` and `--default-partition` can only turn a flag on. Use
    /// `--no-follow` or `--no-default-partition` to turn off one the link set.
    #[arg(long, value_name = "LINK")]
    pub from_link: Option<String>,
}

impl QueryArgs {
    /// Build the query: config defaults, then the shared link, then flags.
    pub fn to_query(&self, config: &Config) -> Result<QueryState> {
        let search = &config.search;
        let mut query = QueryState::default()
            .with_bootstrap_servers(search.bootstrap_servers.clone().unwrap_or_default())
            .with_topic(search.topic.clone().unwrap_or_default())
            .with_value_deserializer(search.value_deserializer.clone().unwrap_or_default())
            .with_schema_registry_url(search.schema_registry_url.clone().unwrap_or_default());

        if let Some(link) = &self.from_link {
            query = query.overlay(&QueryState::decode(link)?);
        }

        query = query.overlay(&self.flags());
        if self.no_follow {
            query = query.with_follow(false);
        }
        if self.no_default_partition {
            query = query.with_default_partition(false);
        }
        Ok(query)
    }

    fn flags(&self) -> QueryState {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        QueryState::new(text(&self.bootstrap_servers), text(&self.topic))
            .with_key(text(&self.key))
            .with_val_regex(text(&self.val_regex))
            .with_relative_offset(self.relative_offset)
            .with_follow(self.follow)
            .with_default_partition(self.default_partition)
            .with_partitions(text(&self.partitions))
            .with_value_deserializer(text(&self.value_deserializer))
            .with_schema_registry_url(text(&self.schema_registry_url))
    }
}

/// Arguments for the search and cached commands.
#[derive(Debug, Clone, clap::Args)]
pub struct SearchArgs {
    /// Query parameters.
    #[command(flatten)]
    pub query: QueryArgs,

    /// Stop after this long (e.g. "30s", "5m").
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Do not show the loading indicator.
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the curl command.
#[derive(Debug, Clone, clap::Args)]
pub struct CurlArgs {
    /// Query parameters.
    #[command(flatten)]
    pub query: QueryArgs,

    /// Target the cached endpoint instead of the live search.
    #[arg(long)]
    pub cached: bool,
}

/// Arguments for the link command.
#[derive(Debug, Clone, clap::Args)]
pub struct LinkArgs {
    /// Link action.
    #[command(subcommand)]
    pub action: LinkAction,
}

/// Link actions.
#[derive(Debug, Clone, Subcommand)]
pub enum LinkAction {
    /// Encode query flags into a shareable link.
    Encode {
        /// Query parameters.
        #[command(flatten)]
        query: QueryArgs,

        /// Page URL to prefix the link with.
        #[arg(long, value_name = "URL")]
        base: Option<String>,
    },
    /// Decode a shareable link.
    Decode {
        /// The link, its query component, or the encoded JSON.
        link: String,
    },
}

/// Arguments for the configs command.
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigsArgs {
    /// Refresh the topic list of this cluster.
    #[arg(short = 'b', long)]
    pub bootstrap_servers: Option<String>,
}

/// Arguments for the partition command.
#[derive(Debug, Clone, clap::Args)]
pub struct PartitionArgs {
    /// Query parameters; `--key` is required.
    #[command(flatten)]
    pub query: QueryArgs,
}

/// Arguments for the config command.
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    /// Config action.
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration.
    Show,
    /// Print the configuration file path.
    Path,
    /// Write a configuration file with defaults.
    Init,
}

/// Arguments for the completions command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// PowerShell.
    Powershell,
    /// Elvish shell.
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::Powershell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Generate shell completions and print to stdout.
pub fn generate_completions(shell: CompletionShell) {
    let mut cmd = Cli::command();
    let shell: Shell = shell.into();
    generate(shell, &mut cmd, "kbrowse", &mut io::stdout());
}

/// Initialize tracing/logging based on CLI options.
fn init_logging(cli: &Cli) {
    use tracing_subscriber::{
        fmt::{self, format::FmtSpan},
        layer::SubscriberExt,
        util::SubscriberInitExt,
        EnvFilter,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_filter_string()));

    let result = match cli.log_format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        }
        LogFormat::Text => {
            let layer = fmt::layer().with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        }
    };

    if let Err(e) = result {
        eprintln!("Warning: Could not initialize logging: {e}");
    }
}

/// Load the configuration named on the command line, or the default one.
fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path),
        None => match std::env::current_dir() {
            Ok(dir) => Config::load_for_project(&dir),
            Err(_) => Ok(Config::load().unwrap_or_default()),
        },
    }
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli);

    let config = match load_config(&cli) {
        Ok(config) => config,
        // `config init` is how a missing file gets created.
        Err(KbrowseError::FileNotFound { .. }) if matches!(cli.command, Commands::Config(_)) => {
            Config::default()
        }
        Err(KbrowseError::FileNotFound { path }) => {
            return Err(KbrowseError::ConfigError {
                message: format!("config file not found: {}", path.display()),
            })
        }
        Err(e) => return Err(e),
    };

    match &cli.command {
        Commands::Search(args) => commands::search::run(&cli, &config, args, Endpoint::Search),
        Commands::Cached(args) => commands::search::run(&cli, &config, args, Endpoint::Cached),
        Commands::Curl(args) => commands::curl::run(&cli, &config, args),
        Commands::Link(args) => commands::link::run(&cli, &config, args),
        Commands::Configs(args) => commands::configs::run(&cli, &config, args),
        Commands::Partition(args) => commands::partition::run(&cli, &config, args),
        Commands::Config(args) => commands::config::run(&cli, &config, args),
        Commands::Completions(args) => {
            generate_completions(args.shell);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_to_filter() {
        assert_eq!(LogLevel::Error.to_filter_string(), "error");
        assert_eq!(LogLevel::Warn.to_filter_string(), "warn");
        assert_eq!(LogLevel::Trace.to_filter_string(), "trace");
    }

    #[test]
    fn test_json_flag_overrides_output() {
        let cli = Cli::parse_from(["kbrowse", "--json", "configs"]);
        assert_eq!(cli.effective_output(), OutputFormat::Json);
    }

    #[test]
    fn test_negative_relative_offset() {
        let cli = Cli::parse_from(["kbrowse", "search", "-t", "orders", "--relative-offset", "-100"]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.query.relative_offset, Some(-100));
    }

    #[test]
    fn test_default_partition_conflicts_with_partitions() {
        let result = Cli::try_parse_from([
            "kbrowse",
            "search",
            "--default-partition",
            "--partitions",
            "0,1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_query_layering() {
        let mut config = Config::default();
        config.search.bootstrap_servers = Some("kafka-1:9092".into());
        config.search.value_deserializer = Some("string".into());

        let link = QueryState::new("", "orders")
            .with_key("user-1")
            .with_follow(true)
            .encode();
        let args = QueryArgs {
            key: Some("user-2".into()),
            from_link: Some(link),
            ..QueryArgs::default()
        };

        let query = args.to_query(&config).unwrap();
        assert_eq!(query.bootstrap_servers(), "kafka-1:9092");
        assert_eq!(query.topic(), "orders");
        assert_eq!(query.key(), Some("user-2"));
        assert!(query.follow());
        assert_eq!(query.value_deserializer(), Some("string"));
    }

    #[test]
    fn test_negated_flags_override_shared_link() {
        let link = QueryState::new("kafka-1:9092", "orders")
            .with_follow(true)
            .with_default_partition(true)
            .encode();
        let args = QueryArgs {
            from_link: Some(link.clone()),
            no_follow: true,
            no_default_partition: true,
            partitions: Some("0,1".into()),
            ..QueryArgs::default()
        };

        let query = args.to_query(&Config::default()).unwrap();
        assert!(!query.follow());
        assert!(!query.default_partition());
        assert_eq!(query.partitions(), Some("0,1"));

        let kept = QueryArgs {
            from_link: Some(link),
            ..QueryArgs::default()
        };
        assert!(kept.to_query(&Config::default()).unwrap().follow());
    }

    #[test]
    fn test_no_follow_conflicts_with_follow() {
        let result = Cli::try_parse_from(["kbrowse", "curl", "-t", "orders", "-f", "--no-follow"]);
        assert!(result.is_err());
    }
}
