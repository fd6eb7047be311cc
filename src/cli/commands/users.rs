//! User maintenance commands. They talk to the users database directly, so
//! they work while the server is stopped.

use anyhow::Context;
use std::io::{self, BufRead, Write};

use crate::config::Config;
use crate::db::UsersStore;
use crate::models::Role;
use crate::services::{NewUser, SeaOrmUserService, UserService};

async fn user_service(config: &Config) -> anyhow::Result<SeaOrmUserService> {
    let store = UsersStore::with_pool_options(
        &config.database.users_url,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    Ok(SeaOrmUserService::new(store, config.security.clone()))
}

fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    print!("Password: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn cmd_users_list(config: &Config) -> anyhow::Result<()> {
    let users = user_service(config).await?.list().await?;

    if users.is_empty() {
        println!("No accounts yet. The first server start creates the admin account.");
        return Ok(());
    }

    println!("{:>4}  {:<24} {:<6} {:<7} Created", "Id", "Username", "Role", "Status");
    println!("{:-<70}", "");
    for user in users {
        println!(
            "{:>4}  {:<24} {:<6} {:<7} {}",
            user.id,
            user.username,
            user.role,
            if user.locked { "locked" } else { "active" },
            user.created_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

pub async fn cmd_users_add(
    config: &Config,
    username: &str,
    role: Role,
    password: Option<String>,
) -> anyhow::Result<()> {
    let service = user_service(config).await?;
    let password = password_or_prompt(password)?;

    let user = service
        .create(NewUser {
            username: username.to_string(),
            password,
            role,
        })
        .await?;

    println!("Created {} '{}' (id {}).", user.role, user.username, user.id);
    Ok(())
}

pub async fn cmd_users_set_locked(
    config: &Config,
    username: &str,
    locked: bool,
) -> anyhow::Result<()> {
    let service = user_service(config).await?;
    let user = service.get_by_username(username).await?;
    service.set_locked(None, user.id, locked).await?;

    println!(
        "{} '{}'.",
        if locked { "Locked" } else { "Unlocked" },
        user.username
    );
    Ok(())
}

pub async fn cmd_users_set_password(
    config: &Config,
    username: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let service = user_service(config).await?;
    let user = service.get_by_username(username).await?;
    let password = password_or_prompt(password)?;
    service.set_password(user.id, &password).await?;

    println!("Password updated for '{}'.", user.username);
    Ok(())
}
