//! Clap derive structures for the `kubecloud` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// kubecloud -- manage KubeCloud clusters from the command line
#[derive(Debug, Parser)]
#[command(
    name = "kubecloud",
    version,
    about = "Manage KubeCloud clusters from the command line",
    long_about = "Create, inspect and drive the lifecycle of managed clusters.\n\n\
        Runs against the simulated backend by default; set mock.enabled = false\n\
        (or KUBECLOUD_MOCK__ENABLED=false) to talk to a real API.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to use instead of the platform default
    #[arg(long, env = "KUBECLOUD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "KUBECLOUD_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Attempts for read requests, with exponential backoff between them
    #[arg(long, default_value = "1", global = true)]
    pub attempts: u32,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if stderr is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage clusters
    #[command(alias = "c")]
    Clusters(ClustersArgs),

    /// Sign in, register and manage the current session
    Auth(AuthArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Clusters ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClustersArgs {
    #[command(subcommand)]
    pub command: ClustersCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClustersCommand {
    /// List clusters
    #[command(alias = "ls")]
    List {
        /// Only clusters in this status
        #[arg(long, short = 's')]
        status: Option<StatusFilter>,

        /// Only clusters in this region
        #[arg(long, short = 'r')]
        region: Option<String>,
    },

    /// Show one cluster
    Get {
        /// Cluster ID
        id: String,
    },

    /// Provision a new cluster
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        region: String,

        /// Node count (1-100)
        #[arg(long, default_value = "3")]
        nodes: u32,

        /// Node machine type
        #[arg(long, default_value = "standard-4")]
        node_type: String,

        /// Tag to attach (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Delete a cluster
    #[command(alias = "rm")]
    Delete {
        /// Cluster ID
        id: String,
    },

    /// Start a stopped cluster
    Start {
        /// Cluster ID
        id: String,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Stop a running cluster
    Stop {
        /// Cluster ID
        id: String,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Change cluster fields
    Update {
        /// Cluster ID
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        region: Option<String>,

        #[arg(long)]
        nodes: Option<u32>,

        /// Replace the tag list (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
    },

    /// Show utilization metrics for a cluster
    Metrics {
        /// Cluster ID
        id: String,
    },

    /// Status counts, total cost and clusters per region
    Summary,
}

/// Block until a lifecycle action settles.
#[derive(Debug, Clone, Copy, Args)]
pub struct WaitArgs {
    /// Wait for the cluster to reach its terminal status
    #[arg(long, short = 'w')]
    pub wait: bool,

    /// Give up waiting after this many seconds
    #[arg(long, default_value = "60", requires = "wait")]
    pub wait_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    Running,
    Stopped,
    Starting,
    Stopping,
    Error,
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in and persist the session
    Login {
        /// Account email (prompted when omitted)
        #[arg(long, short = 'e')]
        email: Option<String>,

        /// Read the password from this environment variable instead of prompting
        #[arg(long, value_name = "VAR")]
        password_env: Option<String>,
    },

    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,

        #[arg(long, short = 'e')]
        email: String,

        /// Read the password from this environment variable instead of prompting
        #[arg(long, value_name = "VAR")]
        password_env: Option<String>,
    },

    /// End the session and forget stored credentials
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Update the signed-in user's profile
    Profile {
        #[arg(long)]
        name: Option<String>,

        #[arg(long, short = 'e')]
        email: Option<String>,

        /// Avatar image URL
        #[arg(long)]
        avatar: Option<String>,
    },

    /// Exchange the session token for a fresh one
    Refresh,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file populated with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }
}
