use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_media_dir")]
    pub media_dir: String,

    #[serde(default = "default_media_url")]
    pub media_url: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default)]
    pub auto_create_schema: bool,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    listen_addr: Option<String>,
    media_dir: Option<String>,
    media_url: Option<String>,
    log_dir: Option<String>,
    max_upload_bytes: Option<usize>,
    db_max_connections: Option<u32>,
    auto_create_schema: Option<bool>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_media_dir() -> String {
    "media".to_string()
}

fn default_media_url() -> String {
    "/media".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_db_max_connections() -> u32 {
    10
}

impl ServerConfig {
    /// Loads `.env`, then the optional TOML file, then environment variables.
    /// Environment values win over file values.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path_str) => read_config_file(Path::new(path_str))?,
            None => PartialServerConfig::default(),
        };

        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        Self::merge(env_config, file_config)
    }

    fn merge(env_config: PartialServerConfig, file_config: PartialServerConfig) -> Result<Self, String> {
        let media_url = env_config
            .media_url
            .or(file_config.media_url)
            .unwrap_or_else(default_media_url);
        let media_url = format!("/{}", media_url.trim_matches('/'));
        if media_url == "/" {
            return Err("MEDIA_URL must not be the site root".to_string());
        }

        Ok(ServerConfig {
            database_url: env_config.database_url.or(file_config.database_url)
                .ok_or("DATABASE_URL is required")?,
            jwt_secret: env_config.jwt_secret.or(file_config.jwt_secret)
                .ok_or("JWT_SECRET is required")?,
            listen_addr: env_config.listen_addr.or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            media_dir: env_config.media_dir.or(file_config.media_dir)
                .unwrap_or_else(default_media_dir),
            media_url,
            log_dir: env_config.log_dir.or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            max_upload_bytes: env_config.max_upload_bytes.or(file_config.max_upload_bytes)
                .unwrap_or_else(default_max_upload_bytes),
            db_max_connections: env_config.db_max_connections.or(file_config.db_max_connections)
                .unwrap_or_else(default_db_max_connections),
            auto_create_schema: env_config.auto_create_schema.or(file_config.auto_create_schema)
                .unwrap_or(false),
        })
    }
}

/// A missing file is not an error; the other layers may supply everything.
fn read_config_file(path: &Path) -> Result<PartialServerConfig, String> {
    if !path.exists() {
        return Ok(PartialServerConfig::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
    toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
}
