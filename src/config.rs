use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub identity: IdentityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub secret_key: String,
    /// Externally visible base URL, used for identity provider redirects
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub directory: String,
    pub max_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    /// Side length of the square input the model was trained on
    pub input_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1:5000".to_string(),
                secret_key: "your-secret-key-here".to_string(),
                public_url: "http://127.0.0.1:5000".to_string(),
            },
            upload: UploadConfig {
                directory: "static/uploads".to_string(),
                max_bytes: 10 * 1024 * 1024,
                allowed_extensions: ["png", "jpg", "jpeg", "gif"].map(String::from).to_vec(),
            },
            database: DatabaseConfig {
                path: "waste_sorter.db".to_string(),
            },
            model: ModelConfig {
                path: "waste_classifier.onnx".to_string(),
                input_size: 224,
            },
            identity: IdentityConfig {
                domain: "dev-example.us.auth0.com".to_string(),
                client_id: "your-client-id".to_string(),
                client_secret: "your-client-secret".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        // Start with default values
        for (key, value) in Self::default() {
            builder = builder.set_default(key, value)?;
        }

        // Add config files if they exist
        builder = builder
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false));

        if let Some(path) = explicit_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Add environment variables with prefix
        let config = builder
            .add_source(
                Environment::with_prefix("WASTE_SORTER")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("upload.allowed_extensions")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let mut app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        app_config.apply_legacy_env(|name| std::env::var(name).ok());

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Honour the unprefixed variable names older deployments set
    pub fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("SECRET_KEY") {
            self.server.secret_key = secret;
        }
        if let Some(domain) = lookup("AUTH0_DOMAIN") {
            self.identity.domain = domain;
        }
        if let Some(client_id) = lookup("AUTH0_CLIENT_ID") {
            self.identity.client_id = client_id;
        }
        if let Some(client_secret) = lookup("AUTH0_CLIENT_SECRET") {
            self.identity.client_secret = client_secret;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate server config
        if self.server.secret_key.trim().is_empty() {
            return Err(anyhow::anyhow!("secret_key must not be empty"));
        }
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(anyhow::anyhow!(
                "Invalid bind_address: {}",
                self.server.bind_address
            ));
        }

        // Validate upload config
        if self.upload.max_bytes == 0 {
            return Err(anyhow::anyhow!("max_bytes must be greater than 0"));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("allowed_extensions must not be empty"));
        }
        if self
            .upload
            .allowed_extensions
            .iter()
            .any(|ext| ext.is_empty() || ext.contains('.') || ext.contains('/'))
        {
            return Err(anyhow::anyhow!(
                "allowed_extensions must be bare extensions like \"png\": {:?}",
                self.upload.allowed_extensions
            ));
        }

        // Validate model config
        if self.model.input_size == 0 {
            return Err(anyhow::anyhow!("input_size must be greater than 0"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        Ok(())
    }

    /// Upload directory as a path
    #[must_use]
    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.upload.directory)
    }

    /// Allowed extensions, lowercased
    #[must_use]
    pub fn allowed_extensions(&self) -> Vec<String> {
        self.upload
            .allowed_extensions
            .iter()
            .map(|ext| ext.to_ascii_lowercase())
            .collect()
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

impl IntoIterator for AppConfig {
    type Item = (String, config::Value);
    type IntoIter = std::collections::hash_map::IntoIter<String, config::Value>;

    fn into_iter(self) -> Self::IntoIter {
        let mut map = std::collections::HashMap::new();

        // Flatten the configuration into key-value pairs
        map.insert("server.bind_address".to_string(), config::Value::from(self.server.bind_address));
        map.insert("server.secret_key".to_string(), config::Value::from(self.server.secret_key));
        map.insert("server.public_url".to_string(), config::Value::from(self.server.public_url));

        map.insert("upload.directory".to_string(), config::Value::from(self.upload.directory));
        map.insert("upload.max_bytes".to_string(), config::Value::from(self.upload.max_bytes));
        map.insert(
            "upload.allowed_extensions".to_string(),
            config::Value::from(self.upload.allowed_extensions),
        );

        map.insert("database.path".to_string(), config::Value::from(self.database.path));

        map.insert("model.path".to_string(), config::Value::from(self.model.path));
        map.insert("model.input_size".to_string(), config::Value::from(self.model.input_size));

        map.insert("identity.domain".to_string(), config::Value::from(self.identity.domain));
        map.insert("identity.client_id".to_string(), config::Value::from(self.identity.client_id));
        map.insert("identity.client_secret".to_string(), config::Value::from(self.identity.client_secret));

        map.insert("logging.level".to_string(), config::Value::from(self.logging.level));
        if let Some(file_path) = self.logging.file_path {
            map.insert("logging.file_path".to_string(), config::Value::from(file_path));
        }
        map.insert("logging.format".to_string(), config::Value::from(self.logging.format));

        map.into_iter()
    }
}
