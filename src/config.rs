use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub database: DatabaseConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub bootstrap: BootstrapConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human-readable format.
    pub log_json: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum connections per database pool (default: 5)
    pub max_db_connections: u32,

    /// Minimum connections per database pool (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Accounts and sessions. Overridden by `USERS_DATABASE_URL`.
    pub users_url: String,

    /// Items and movements. Overridden by `STOCK_DATABASE_URL`.
    pub stock_url: String,
}

impl DatabaseConfig {
    fn normalize_urls(&mut self) {
        self.users_url = normalize_sqlite_url(&self.users_url);
        self.stock_url = normalize_sqlite_url(&self.stock_url);
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            users_url: "sqlite:users.db".to_string(),
            stock_url: "sqlite:stock.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    /// Whether to set the Secure flag on session cookies.
    /// Enable when the app is served over HTTPS.
    pub secure_cookies: bool,

    /// Sessions expire after this many minutes without a request.
    pub session_inactivity_minutes: i64,

    /// Signs session cookies. Usually supplied through `SECRET_KEY`.
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            secure_cookies: false,
            session_inactivity_minutes: 8 * 60,
            secret_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Minimum length for passwords set through the admin pages or the CLI.
    pub min_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Overridden by `ADMIN_USER`.
    pub admin_user: Option<String>,

    /// Overridden by `ADMIN_PASS`.
    #[serde(skip_serializing)]
    pub admin_pass: Option<String>,

    /// Create `admin`/`admin` when the users table is empty and no
    /// bootstrap credentials were given.
    pub create_default_admin: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_user: None,
            admin_pass: None,
            create_default_admin: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Loads `config.toml` (if any) and applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(&path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.database.normalize_urls();

        Ok(config)
    }

    /// Overlays the deployment variables on top of the file values.
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("USERS_DATABASE_URL") {
            self.database.users_url = normalize_sqlite_url(&url);
        }
        if let Some(url) = var("STOCK_DATABASE_URL") {
            self.database.stock_url = normalize_sqlite_url(&url);
        }
        if let Some(key) = var("SECRET_KEY") {
            self.server.secret_key = Some(key);
        }
        if let Some(user) = var("ADMIN_USER") {
            self.bootstrap.admin_user = Some(user);
        }
        if let Some(pass) = var("ADMIN_PASS") {
            self.bootstrap.admin_pass = Some(pass);
        }
        if let Some(port) = var("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("stockroom").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.users_url.trim().is_empty() || self.database.stock_url.trim().is_empty() {
            anyhow::bail!("Both database URLs must be set");
        }

        if self.database.users_url == self.database.stock_url {
            anyhow::bail!("The users and stock databases must be different");
        }

        if self.server.session_inactivity_minutes <= 0 {
            anyhow::bail!("Session inactivity must be at least one minute");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("min_db_connections cannot exceed max_db_connections");
        }

        argon2::Params::new(
            self.security.argon2_memory_cost_kib,
            self.security.argon2_time_cost,
            self.security.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 settings: {e}"))?;

        if self.bootstrap.admin_user.is_some() != self.bootstrap.admin_pass.is_some() {
            anyhow::bail!("ADMIN_USER and ADMIN_PASS must be provided together");
        }

        Ok(())
    }
}

/// Accepts both `sqlite:path` and the `sqlite:///path` form used by
/// SQLAlchemy-style URLs (three slashes = relative, four = absolute).
#[must_use]
pub fn normalize_sqlite_url(url: &str) -> String {
    let url = url.trim();
    match url.strip_prefix("sqlite:///") {
        Some(rest) => format!("sqlite:{rest}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.users_url, "sqlite:users.db");
        assert_eq!(config.database.stock_url, "sqlite:stock.db");
        assert_eq!(config.server.port, 5000);
        assert!(config.bootstrap.create_default_admin);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [server]
            port = 8080
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.port, 8080);

        assert_eq!(config.security.min_password_length, 8);
    }

    #[test]
    fn test_config_file_urls_are_normalized() {
        let path = std::env::temp_dir()
            .join(format!("stockroom-config-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
            [database]
            users_url = "sqlite:///users.db"
            stock_url = "sqlite:////var/lib/stockroom/stock.db"
        "#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.database.users_url, "sqlite:users.db");
        assert_eq!(config.database.stock_url, "sqlite:/var/lib/stockroom/stock.db");
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = Config::default();
        config.server.secret_key = Some("super-secret".to_string());
        config.bootstrap.admin_pass = Some("hunter22".to_string());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(!toml_str.contains("super-secret"));
        assert!(!toml_str.contains("hunter22"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("USERS_DATABASE_URL", "sqlite:///data/users.db"),
            ("STOCK_DATABASE_URL", "sqlite:/srv/stock.db"),
            ("SECRET_KEY", "k"),
            ("ADMIN_USER", "root"),
            ("ADMIN_PASS", "   "),
            ("PORT", "9000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.database.users_url, "sqlite:data/users.db");
        assert_eq!(config.database.stock_url, "sqlite:/srv/stock.db");
        assert_eq!(config.server.secret_key.as_deref(), Some("k"));
        assert_eq!(config.bootstrap.admin_user.as_deref(), Some("root"));
        assert_eq!(config.bootstrap.admin_pass, None);
        assert_eq!(config.server.port, 9000);

        // blank ADMIN_PASS leaves the pair incomplete
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalize_sqlite_url() {
        assert_eq!(normalize_sqlite_url("sqlite:///users.db"), "sqlite:users.db");
        assert_eq!(normalize_sqlite_url("sqlite:////var/db/users.db"), "sqlite:/var/db/users.db");
        assert_eq!(normalize_sqlite_url("sqlite:users.db"), "sqlite:users.db");
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[test]
    fn test_invalid_argon2_settings_rejected() {
        let mut config = Config::default();
        config.security.argon2_memory_cost_kib = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_database_rejected() {
        let mut config = Config::default();
        config.database.stock_url = config.database.users_url.clone();
        assert!(config.validate().is_err());
    }
}
