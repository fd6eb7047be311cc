use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use std::collections::HashMap;
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{prelude::*, users};
use crate::models::time;
use crate::models::{Role, User};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: users::Model) -> Result<User> {
        Ok(User {
            id: model.id,
            role: model
                .role
                .parse::<Role>()
                .map_err(|e| anyhow::anyhow!("User {}: {e}", model.id))?,
            locked: model.locked,
            created_at: time::from_db(&model.created_at)?,
            updated_at: time::from_db(&model.updated_at)?,
            username: model.username,
        })
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = Users::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        rows.into_iter().map(Self::map_model).collect()
    }

    pub async fn count(&self) -> Result<u64> {
        Users::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        user.map(Self::map_model).transpose()
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        user.map(Self::map_model).transpose()
    }

    /// Id to username for every account, used to label audit columns.
    pub async fn username_map(&self) -> Result<HashMap<i32, String>> {
        let rows: Vec<(i32, String)> = Users::find()
            .select_only()
            .column(users::Column::Id)
            .column(users::Column::Username)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to load usernames")?;

        Ok(rows.into_iter().collect())
    }

    /// Returns the user when `password` matches the stored hash.
    /// Note: verification runs on the blocking pool because Argon2 is
    /// CPU-intensive. An unknown username costs one hash with the configured
    /// params, so both failures take about as long.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            hash_in_background(password, security).await?;
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .context("Password verification task panicked")??;

        if is_valid {
            Self::map_model(user).map(Some)
        } else {
            Ok(None)
        }
    }

    pub async fn create(
        &self,
        username: &str,
        password: &str,
        role: Role,
        security: &SecurityConfig,
    ) -> Result<User> {
        let password_hash = hash_in_background(password, security).await?;
        let now = time::to_db(&time::now());

        let model = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            role: Set(role.as_str().to_string()),
            locked: Set(false),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert user")?;

        Self::map_model(model)
    }

    /// Updates username and role, and the password when one is given.
    pub async fn update(
        &self,
        id: i32,
        username: &str,
        role: Role,
        password: Option<&str>,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        let Some(user) = Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(None);
        };

        let new_hash = match password {
            Some(password) => Some(hash_in_background(password, security).await?),
            None => None,
        };

        let mut active: users::ActiveModel = user.into();
        active.username = Set(username.to_string());
        active.role = Set(role.as_str().to_string());
        if let Some(hash) = new_hash {
            active.password_hash = Set(hash);
        }
        active.updated_at = Set(time::to_db(&time::now()));

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;

        Self::map_model(model).map(Some)
    }

    pub async fn set_password(
        &self,
        id: i32,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        let hash = hash_in_background(password, security).await?;

        let result = Users::update_many()
            .col_expr(users::Column::PasswordHash, sea_orm::sea_query::Expr::value(hash))
            .col_expr(
                users::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(time::to_db(&time::now())),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update password")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn set_locked(&self, id: i32, locked: bool) -> Result<bool> {
        let result = Users::update_many()
            .col_expr(users::Column::Locked, sea_orm::sea_query::Expr::value(locked))
            .col_expr(
                users::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(time::to_db(&time::now())),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update lock state")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Users::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }
}

/// True when `err` comes from a UNIQUE constraint, e.g. a username taken by a
/// concurrent request between the pre-check and the insert.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DbErr>()
        .and_then(DbErr::sql_err)
        .is_some_and(|e| matches!(e, SqlErr::UniqueConstraintViolation(_)))
}

async fn hash_in_background(password: &str, security: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let security = security.clone();

    task::spawn_blocking(move || hash_password(&password, &security))
        .await
        .context("Password hashing task panicked")?
}

/// Hash a password using Argon2id with the configured params.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

    let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Checks `password` against a PHC hash string. The params are read from the
/// hash itself, so hashes made with older settings keep verifying.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse", &fast_config()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same", &fast_config()).unwrap();
        let b = hash_password("same", &fast_config()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("x", "not-a-hash").is_err());
    }
}
