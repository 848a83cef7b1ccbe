use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    /// Directory holding the metadata store file
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for blob bytes
    pub root: String,
    /// Base URL that public blob links are built from
    pub public_url: String,
    /// Lowercase file extensions accepted by `/upload`
    pub allowed_file_types: Vec<String>,
    /// Upper bound on blob writes running at the same time
    pub max_concurrent_writes: usize,
}

const DEFAULT_ALLOWED_FILE_TYPES: &str = "jpg,jpeg,png,gif,bmp,webp,svg,ico";

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "./files".to_string(),
            public_url: "http://localhost:8080/images/".to_string(),
            allowed_file_types: parse_file_types(DEFAULT_ALLOWED_FILE_TYPES),
            max_concurrent_writes: 16,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            storage: StorageConfig::default(),
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let bind_address = lookup("BIND_ADDRESS").unwrap_or(defaults.node.bind_address);
        let data_dir = lookup("DATA_DIR").unwrap_or(defaults.node.data_dir);
        let root = lookup("STORAGE_DIR").unwrap_or(defaults.storage.root);
        let public_url = lookup("PUBLIC_URL").unwrap_or(defaults.storage.public_url);

        let allowed_file_types = lookup("ALLOWED_FILE_TYPES")
            .map(|s| parse_file_types(&s))
            .unwrap_or(defaults.storage.allowed_file_types);

        let max_concurrent_writes = match lookup("MAX_CONCURRENT_WRITES") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "MAX_CONCURRENT_WRITES must be a non-negative integer, got '{raw}'"
                ))
            })?,
            None => defaults.storage.max_concurrent_writes,
        };

        let max_upload_size = lookup("MAX_UPLOAD_SIZE")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_upload_size);

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                root,
                public_url,
                allowed_file_types,
                max_concurrent_writes,
            },
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.node.data_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "DATA_DIR cannot be empty".to_string(),
            ));
        }

        if self.storage.root.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "STORAGE_DIR cannot be empty".to_string(),
            ));
        }

        let url = self.storage.public_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "PUBLIC_URL must be an http or https URL, got '{url}'"
            )));
        }

        if self.storage.allowed_file_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "ALLOWED_FILE_TYPES must list at least one extension".to_string(),
            ));
        }

        if self.storage.max_concurrent_writes == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_CONCURRENT_WRITES must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Check a client-supplied filename against the extension allow-list.
    pub fn is_allowed_file_type(&self, filename: &str) -> bool {
        let Some((stem, ext)) = filename.rsplit_once('.') else {
            return false;
        };
        if stem.is_empty() {
            return false;
        }
        let ext = ext.to_ascii_lowercase();
        self.storage.allowed_file_types.iter().any(|t| *t == ext)
    }
}

fn parse_file_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
