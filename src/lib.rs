pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;
pub mod web;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands, UserCommands};
pub use config::Config;

fn init_tracing(config: &config::GeneralConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let (plain, json) = if config.log_json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(plain)
        .with(json)
        .init();
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        return cli::cmd_init();
    }

    config.validate()?;
    init_tracing(&config.general);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cli::cmd_serve(config).await,
        Commands::Init => cli::cmd_init(),
        Commands::Users { command } => match command {
            UserCommands::List => cli::cmd_users_list(&config).await,
            UserCommands::Add {
                username,
                role,
                password,
            } => cli::cmd_users_add(&config, &username, role, password).await,
            UserCommands::Lock { username } => {
                cli::cmd_users_set_locked(&config, &username, true).await
            }
            UserCommands::Unlock { username } => {
                cli::cmd_users_set_locked(&config, &username, false).await
            }
            UserCommands::SetPassword { username, password } => {
                cli::cmd_users_set_password(&config, &username, password).await
            }
        },
    }
}
