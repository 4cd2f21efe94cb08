use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Table created by the bundled migrations
pub const DEFAULT_TABLE: &str = "payments";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub cors: bool,
    pub compress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Store driver: `postgres`, `sqlite` or `sqlite3`
    pub driver: String,
    pub connection_string: Option<String>,
    pub max_connections: Option<u32>,
    /// Migrations directory. Unset means `migrations/<driver>`, empty disables migrations.
    pub migrations: Option<String>,
    /// Table holding payment records
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub version: String,
    pub external_url: String,
    pub max_results: i64,
    pub admin: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 60,
            cors: false,
            compress: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: "sqlite".to_string(),
            connection_string: None,
            max_connections: Some(20),
            migrations: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            external_url: "http://localhost:8080".to_string(),
            max_results: 20,
            admin: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        // PAYMENTS_DATABASE__DRIVER=postgres -> database.driver
        config = config.add_source(
            config::Environment::with_prefix("PAYMENTS")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api.max_results <= 0 {
            anyhow::bail!(
                "api.max_results must be positive, got {}",
                self.api.max_results
            );
        }
        if self.api.version.is_empty() || self.api.version.contains('/') {
            anyhow::bail!("api.version must be a single path segment, got {:?}", self.api.version);
        }
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("server.request_timeout_secs must be positive");
        }
        if self.database.migrations.is_none() && self.database.table != DEFAULT_TABLE {
            anyhow::bail!(
                "database.table {:?} is not created by the bundled migrations, set database.migrations",
                self.database.table
            );
        }
        Ok(())
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Base of every link rendered by the payments API, e.g. `http://localhost:8080/v1`
    pub fn base_url(&self) -> String {
        format!(
            "{}/{}",
            self.api.external_url.trim_end_matches('/'),
            self.api.version
        )
    }
}

impl DatabaseConfig {
    /// Get the connection string from config or environment
    pub fn connection_string(&self) -> Option<String> {
        if let Some(connection_string) = &self.connection_string {
            if !connection_string.trim().is_empty() {
                return Some(connection_string.clone());
            }
        }

        std::env::var("DATABASE_URL").ok()
    }

    pub fn migrations_dir(&self) -> Option<PathBuf> {
        match &self.migrations {
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir)),
            None => {
                let driver = match self.driver.as_str() {
                    "sqlite3" => "sqlite",
                    other => other,
                };
                Some(PathBuf::from("migrations").join(driver))
            }
        }
    }
}
