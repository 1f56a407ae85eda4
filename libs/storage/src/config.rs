use std::fmt;

use serde::{Deserialize, Serialize};

/// Where published HLS artifacts end up
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem, mostly useful for development
    Fs {
        /// Root path for storage
        #[serde(default = "default_fs_root")]
        root: String,
    },
    /// In-process memory, lost on exit
    Memory,
    /// AWS S3 or any S3 compatible service (MinIO, R2, Spaces, ...)
    S3 {
        /// S3 bucket name
        bucket: String,
        /// Root path within bucket
        #[serde(default = "default_s3_root")]
        root: String,
        /// AWS region
        #[serde(default)]
        region: Option<String>,
        /// Custom endpoint for S3-compatible services
        #[serde(default)]
        endpoint: Option<String>,
        /// Access key ID
        #[serde(default)]
        access_key_id: Option<String>,
        /// Secret access key
        #[serde(default)]
        secret_access_key: Option<String>,
        /// Disable config/credential auto-loading
        #[serde(default)]
        disable_config_load: bool,
        /// Enable virtual host style addressing
        #[serde(default)]
        enable_virtual_host_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Fs {
            root: default_fs_root(),
        }
    }
}

impl StorageConfig {
    /// Short label for logs, never includes credentials
    pub fn kind(&self) -> &'static str {
        match self {
            StorageConfig::Fs { .. } => "fs",
            StorageConfig::Memory => "memory",
            StorageConfig::S3 { .. } => "s3",
        }
    }
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageConfig::Fs { root } => f.debug_struct("Fs").field("root", root).finish(),
            StorageConfig::Memory => f.write_str("Memory"),
            StorageConfig::S3 {
                bucket,
                root,
                region,
                endpoint,
                access_key_id,
                secret_access_key,
                disable_config_load,
                enable_virtual_host_style,
            } => f
                .debug_struct("S3")
                .field("bucket", bucket)
                .field("root", root)
                .field("region", region)
                .field("endpoint", endpoint)
                .field("access_key_id", &redacted(access_key_id))
                .field("secret_access_key", &redacted(secret_access_key))
                .field("disable_config_load", disable_config_load)
                .field("enable_virtual_host_style", enable_virtual_host_style)
                .finish(),
        }
    }
}

fn default_fs_root() -> String {
    "./storage".to_string()
}

fn default_s3_root() -> String {
    "/".to_string()
}
