use clap::{Parser, Subcommand, ValueEnum};
use converge_core::State;

#[derive(Parser)]
#[command(name = "converge")]
#[command(about = "Make a DNA Center inventory match a declared config file")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Controller base URL (overrides config and CONVERGE_URL env var)
    #[arg(short, long, global = true, env = "CONVERGE_URL")]
    pub server: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "CONVERGE_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Log filter for stderr, e.g. `debug` or `converge_core=trace` (RUST_LOG wins)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Converge a resource collection onto a config file
    Apply(ApplyArgs),
    /// Show the operations `apply` would run, without running them
    Plan(PlanArgs),
    /// List the current remote records of a resource type
    Inventory(InventoryArgs),
    /// List the built-in resource types and their fields
    Resources,
    /// Store credentials for a controller
    Login(LoginArgs),
    /// Logout (remove stored credentials)
    Logout,
    /// Show current auth info
    Whoami,
    /// Manage CLI configuration
    Config(ConfigArgs),
}

/// Whether the declared records should exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    Present,
    Absent,
}

impl From<StateArg> for State {
    fn from(value: StateArg) -> Self {
        match value {
            StateArg::Present => State::Present,
            StateArg::Absent => State::Absent,
        }
    }
}

#[derive(clap::Args)]
pub struct ApplyArgs {
    /// Resource type (see `converge resources`)
    pub resource: String,
    /// Path to a JSON or TOML config file (reads JSON from stdin if omitted)
    #[arg(long)]
    pub file: Option<String>,
    /// Desired state; overrides the file's `state` key
    #[arg(long)]
    pub state: Option<StateArg>,
    /// Report what would change without changing anything
    #[arg(long)]
    pub check: bool,
}

#[derive(clap::Args)]
pub struct PlanArgs {
    /// Resource type (see `converge resources`)
    pub resource: String,
    /// Path to a JSON or TOML config file (reads JSON from stdin if omitted)
    #[arg(long)]
    pub file: Option<String>,
    /// Desired state; overrides the file's `state` key
    #[arg(long)]
    pub state: Option<StateArg>,
}

#[derive(clap::Args)]
pub struct InventoryArgs {
    /// Resource type (see `converge resources`)
    pub resource: String,
}

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Username
    #[arg(short, long)]
    pub username: Option<String>,
    /// Password
    #[arg(long)]
    pub password: Option<String>,
    /// Store a pre-issued session token instead of a username and password
    #[arg(long, conflicts_with_all = ["username", "password"])]
    pub token: Option<String>,
    /// Skip the token exchange that checks the credentials
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, format, log_level, timeout_secs)
    pub key: String,
    /// Value
    pub value: String,
}
