//! Command-line interface for t0
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;

mod config;
mod id;
mod sync;
mod todo;

/// t0 - todo.txt with tracker sync
///
/// Keeps a todo.txt file normalized (dates, stable ids, default tags) and
/// merges issues from GitHub, GitLab and OpenProject into it.
#[derive(Parser, Debug)]
#[command(name = "t0")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true, env = "T0_CONFIG")]
    pub config: Option<PathBuf>,

    /// todo.txt file to operate on
    #[arg(long, global = true, env = "T0_TODO_FILE")]
    pub todo_file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Work with the todo.txt file
    #[command(subcommand)]
    Todo(TodoCommands),

    /// Merge tracker issues into the todo.txt file
    #[command(subcommand)]
    Sync(SyncCommands),

    /// Show the resolved configuration
    Config,

    /// Identity utilities
    #[command(subcommand)]
    Id(IdCommands),
}

#[derive(Subcommand, Debug)]
pub enum TodoCommands {
    /// Fill in dates, identities and default tags, then save
    Update {
        /// Store identities as `uuid:` instead of short `id:`
        #[arg(long)]
        long_ids: bool,

        /// Do not add completion dates to completed tasks
        #[arg(long)]
        no_completion_date: bool,

        /// Do not add creation dates
        #[arg(long)]
        no_creation_date: bool,

        /// Extra default tag (key:value); repeatable
        #[arg(long = "tag", value_name = "KEY:VALUE")]
        tags: Vec<String>,

        /// Write to this file instead of the todo file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print tasks with their line numbers
    List,
}

/// Flags shared by every sync target
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Merge and report without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Write to this file instead of the todo file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// GitHub issues and pull requests assigned to you
    Github {
        #[command(flatten)]
        common: SyncArgs,

        /// Personal access token
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// API base URL
        #[arg(long)]
        api_base_url: Option<String>,
    },

    /// GitLab issues
    Gitlab {
        #[command(flatten)]
        common: SyncArgs,

        /// Personal access token
        #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// API base URL
        #[arg(long)]
        api_base_url: Option<String>,
    },

    /// OpenProject work packages from a saved query
    Openproject {
        #[command(flatten)]
        common: SyncArgs,

        /// Instance URL
        #[arg(long)]
        url: Option<String>,

        /// API key
        #[arg(long, env = "OPENPROJECT_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Saved query id
        #[arg(long)]
        query_id: Option<String>,
    },

    /// Every configured tracker
    All {
        #[command(flatten)]
        common: SyncArgs,

        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
        gitlab_token: Option<String>,

        #[arg(long, env = "OPENPROJECT_API_KEY", hide_env_values = true)]
        openproject_api_key: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum IdCommands {
    /// Generate a new identity
    New {
        /// Print the 36-character form
        #[arg(long)]
        long: bool,
    },

    /// Decode a short or long identity
    Decode {
        value: String,
    },
}

/// Settings every command sees after config resolution.
pub(crate) struct Context {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub output: OutputOptions,
}

impl Context {
    fn resolve(
        cli_config: Option<PathBuf>,
        todo_file: Option<PathBuf>,
        output: OutputOptions,
    ) -> Result<Self> {
        let mut config = Config::resolve(cli_config.as_deref())?;
        if let Some(path) = todo_file {
            config.todo_file = path;
        }
        let config_path = cli_config.or_else(Config::default_path);
        Ok(Self {
            config,
            config_path,
            output,
        })
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let Cli {
            config: config_path,
            todo_file,
            json,
            quiet,
            command,
            ..
        } = self;
        let output = OutputOptions { json, quiet };
        let context = || Context::resolve(config_path, todo_file, output);

        match command {
            Commands::Todo(TodoCommands::Update {
                long_ids,
                no_completion_date,
                no_creation_date,
                tags,
                output: output_path,
            }) => todo::run_update(
                context()?,
                todo::UpdateOptions {
                    long_ids,
                    no_completion_date,
                    no_creation_date,
                    tags,
                    output: output_path,
                },
            ),
            Commands::Todo(TodoCommands::List) => todo::run_list(context()?),
            Commands::Sync(cmd) => sync::run(context()?, sync::SyncOptions::from(cmd)),
            Commands::Config => config::run(context()?),
            Commands::Id(IdCommands::New { long }) => {
                id::run_new(id::NewOptions { long, output })
            }
            Commands::Id(IdCommands::Decode { value }) => {
                id::run_decode(id::DecodeOptions { value, output })
            }
        }
    }
}
