//! Command-line interface for Stockroom.

mod commands;

use clap::{Parser, Subcommand};

use crate::models::Role;

/// Stockroom - inventory of stock pieces grouped by FINIS code
#[derive(Parser)]
#[command(name = "stockroom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    Serve,

    /// Create a default config.toml in the current directory
    Init,

    /// Manage user accounts
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List all accounts
    #[command(alias = "ls")]
    List,

    /// Create an account
    Add {
        username: String,
        /// Role of the new account
        #[arg(long, default_value_t = Role::User)]
        role: Role,
        /// Password; prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Prevent an account from logging in
    Lock { username: String },

    /// Allow a locked account to log in again
    Unlock { username: String },

    /// Replace an account's password
    SetPassword {
        username: String,
        /// New password; prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

pub use commands::*;
