use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Vitrine binary.
#[derive(Debug, Parser)]
#[command(name = "vitrine", version, about = "Vitrine portfolio content engine")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "VITRINE_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the records of one entity store.
    List(ListArgs),
    /// Cache maintenance.
    Cache(CacheArgs),
    /// Apply the embedded database migrations.
    Migrate,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityKind {
    Documents,
    Projects,
    Tags,
    Assets,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// Entity store to list.
    #[arg(value_enum)]
    pub entity: EntityKind,

    /// Named sort view, e.g. `byName` or `byCreated`.
    #[arg(long, value_name = "KEY")]
    pub sort: Option<String>,

    /// Named group view, e.g. `byCreated`.
    #[arg(long, value_name = "KEY")]
    pub group: Option<String>,

    /// Only list records carrying this tag.
    #[arg(long, value_name = "VALUE")]
    pub tag: Option<String>,

    /// Include projects hidden from the public listing.
    #[arg(long = "include-hidden", action = clap::ArgAction::SetTrue)]
    pub include_hidden: bool,
}

#[derive(Debug, Args, Clone)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CacheCommand {
    /// Delete expired rows from the persisted cache table.
    Purge,
}
