//! Admin configuration file.
//!
//! ```toml
//! [storage]
//! data_dir = "/var/lib/socialrecipe"
//!
//! [social]
//! password_min_len = 8
//! default_profile_image_url = "https://img.example.com/blank.png"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use social::service::SocialConfig;
use socialrecipe_core::ServiceConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub storage: ServiceConfig,

    #[serde(default)]
    pub social: SocialConfig,
}

impl AdminConfig {
    /// Default config file path: ./socialrecipe.toml.
    pub fn default_path() -> PathBuf {
        PathBuf::from("socialrecipe.toml")
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AdminConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
