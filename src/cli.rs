//! Command-line interface.
//!
//! Three modes: start the server (optionally with an explicit config
//! path), or write one of the two config templates and exit.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SMS webhook to email relay.
#[derive(Debug, Parser)]
#[command(name = "sms2mail", version, about, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Explicit path to the global configuration file. Without it the
    /// standard search order applies.
    pub config: Option<PathBuf>,

    /// Mail-submission program to invoke. Must behave like msmtp
    /// (`-a <account>`, `-t`).
    #[arg(long, default_value = "msmtp")]
    pub msmtp: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a global configuration template to PATH, or to stdout.
    Config { path: Option<PathBuf> },

    /// Write a per-profile configuration template to PATH, or to stdout.
    #[command(name = "profile-config", alias = "profileConfig")]
    ProfileConfig { path: Option<PathBuf> },
}
