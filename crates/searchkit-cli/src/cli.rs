//! CLI argument definitions for the searchkit driver.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use searchkit_core::UiEvent;

#[derive(Parser)]
#[command(
    name = "searchkit",
    version,
    about = "Drive a searchkit filter formset outside the browser",
    long_about = "Mount a saved admin page containing a searchkit formset, replay UI events \
                  against it and apply partial reloads from recorded fragments or a live \
                  render endpoint.\n\n\
                  Events: click:<id>, change:<name>=<value>, focusout:<name>, toggle:<position>"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with formset markup conventions and heading options.
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Mount a saved page and list its rows.
    Inspect(InspectArgs),

    /// Apply UI events offline, serving reloads from recorded fragments.
    Replay(ReplayArgs),

    /// Apply UI events, fetching reloads from a live render endpoint.
    Reload(ReloadArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    /// Saved HTML page containing the formset.
    #[arg(value_name = "PAGE")]
    pub page: PathBuf,

    /// Print rows as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct SessionArgs {
    /// Saved HTML page containing the formset.
    #[arg(value_name = "PAGE")]
    pub page: PathBuf,

    /// UI event to apply; repeat to apply several in order.
    #[arg(long = "event", value_name = "EVENT")]
    pub events: Vec<UiEvent>,

    /// Write the resulting page to this file.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print rows and steps as JSON instead of tables.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Directory holding `<sequence>.html` response fragments.
    #[arg(long = "responses", value_name = "DIR")]
    pub responses: Option<PathBuf>,
}

#[derive(Args)]
pub struct ReloadArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Base URL the formset's `data-url` is resolved against.
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: String,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
