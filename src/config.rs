use std::path::PathBuf;
use std::time::Duration;
use std::{env, fmt, fs, net::SocketAddr, str::FromStr};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use storage::StorageConfig;

use crate::hls::WatchConfig;

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub livekit: Livekit,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub hls: Hls,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Livekit {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Lifetime of issued join tokens, in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hls {
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
    #[serde(default = "default_remote_prefix")]
    pub remote_prefix: String,
    /// Public base URL of the bucket, used to build playback links
    #[serde(default)]
    pub public_url: String,
    #[serde(default = "default_rtmp_base")]
    pub rtmp_base: String,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_hls_time")]
    pub hls_time: u32,
    #[serde(default = "default_hls_list_size")]
    pub hls_list_size: u32,
    /// Milliseconds
    #[serde(default = "default_playlist_interval")]
    pub playlist_interval: u64,
    #[serde(default = "default_stable_age")]
    pub stable_age: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout: u64,
    #[serde(default = "default_segment_extensions")]
    pub segment_extensions: Vec<String>,
    #[serde(default = "default_playlist_extensions")]
    pub playlist_extensions: Vec<String>,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("3000"))
    ))
    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000)))
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

impl Default for Livekit {
    fn default() -> Self {
        Self {
            url: Default::default(),
            api_key: Default::default(),
            api_secret: Default::default(),
            token_ttl: default_token_ttl(),
        }
    }
}

fn default_token_ttl() -> u64 {
    60 * 60
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("tokens", &format_args!("[{} redacted]", self.tokens.len()))
            .finish()
    }
}

impl fmt::Debug for Livekit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Livekit")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl Livekit {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl)
    }
}

impl Default for Hls {
    fn default() -> Self {
        Self {
            local_root: default_local_root(),
            remote_prefix: default_remote_prefix(),
            public_url: Default::default(),
            rtmp_base: default_rtmp_base(),
            ffmpeg: default_ffmpeg(),
            hls_time: default_hls_time(),
            hls_list_size: default_hls_list_size(),
            playlist_interval: default_playlist_interval(),
            stable_age: default_stable_age(),
            poll_interval: default_poll_interval(),
            upload_timeout: default_upload_timeout(),
            segment_extensions: default_segment_extensions(),
            playlist_extensions: default_playlist_extensions(),
        }
    }
}

fn default_local_root() -> PathBuf {
    PathBuf::from("/tmp/hls")
}

fn default_remote_prefix() -> String {
    "streaming/vod".to_string()
}

fn default_rtmp_base() -> String {
    "rtmp://localhost/live".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_hls_time() -> u32 {
    10
}

fn default_hls_list_size() -> u32 {
    18
}

fn default_playlist_interval() -> u64 {
    120 * 1000
}

fn default_stable_age() -> u64 {
    1000
}

fn default_poll_interval() -> u64 {
    500
}

fn default_upload_timeout() -> u64 {
    30 * 1000
}

fn default_segment_extensions() -> Vec<String> {
    vec!["ts".to_string()]
}

fn default_playlist_extensions() -> Vec<String> {
    vec!["m3u8".to_string()]
}

impl Hls {
    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            playlist_interval: Duration::from_millis(self.playlist_interval),
            stable_age: Duration::from_millis(self.stable_age),
            poll_interval: Duration::from_millis(self.poll_interval),
            upload_timeout: Duration::from_millis(self.upload_timeout),
            segment_extensions: self.segment_extensions.clone(),
            playlist_extensions: self.playlist_extensions.clone(),
        }
    }

    pub fn stream_dir(&self, stream: &str) -> PathBuf {
        self.local_root.join(stream)
    }

    pub fn stream_prefix(&self, stream: &str) -> String {
        let base = self.remote_prefix.trim_matches('/');
        if base.is_empty() {
            stream.to_string()
        } else {
            format!("{base}/{stream}")
        }
    }

    pub fn rtmp_url(&self, stream: &str) -> String {
        format!("{}/{}", self.rtmp_base.trim_end_matches('/'), stream)
    }

    /// Where players fetch the published playlist
    pub fn playback_url(&self, stream: &str) -> String {
        format!(
            "{}/{}/{}.m3u8",
            self.public_url.trim_end_matches('/'),
            self.stream_prefix(stream),
            stream
        )
    }
}

impl Config {
    /// Read `path`, falling back to `livelite.toml` then the system-wide file.
    /// Missing files yield the defaults; environment overrides apply last.
    pub fn parse(path: Option<String>) -> anyhow::Result<Self> {
        let result = fs::read_to_string(path.unwrap_or(String::from("livelite.toml")))
            .or(fs::read_to_string("/etc/livelite/livelite.toml"))
            .unwrap_or("".to_string());
        let mut cfg: Self = toml::from_str(result.as_str()).context("config parse error")?;
        cfg.apply_env(|key| env::var(key).ok().filter(|v| !v.is_empty()));
        cfg.validate().context("config validate")?;
        Ok(cfg)
    }

    /// Overlay the variables a container deployment sets
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("LIVEKIT_URL") {
            self.livekit.url = url;
        }
        if let Some(key) = var("LIVEKIT_API_KEY") {
            self.livekit.api_key = key;
        }
        if let Some(secret) = var("LIVEKIT_API_SECRET") {
            self.livekit.api_secret = secret;
        }
        if let Some(url) = var("STORAGE_BUCKET_URL") {
            self.hls.public_url = url;
        }

        if let Some(name) = var("STORAGE_BUCKET_NAME") {
            if !matches!(self.storage, StorageConfig::S3 { .. }) {
                self.storage = StorageConfig::S3 {
                    bucket: name.clone(),
                    root: "/".to_string(),
                    region: None,
                    endpoint: None,
                    access_key_id: None,
                    secret_access_key: None,
                    disable_config_load: false,
                    enable_virtual_host_style: false,
                };
            }
        }
        if let StorageConfig::S3 {
            bucket,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
            ..
        } = &mut self.storage
        {
            if let Some(name) = var("STORAGE_BUCKET_NAME") {
                *bucket = name;
            }
            if let Some(v) = var("STORAGE_REGION") {
                *region = Some(v);
            }
            if let Some(v) = var("STORAGE_URL") {
                *endpoint = Some(v);
            }
            if let Some(v) = var("STORAGE_BUCKET_KEY") {
                *access_key_id = Some(v);
            }
            if let Some(v) = var("STORAGE_BUCKET_SECRET") {
                *secret_access_key = Some(v);
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.livekit.url.is_empty() {
            return Err(anyhow!("livekit.url is required"));
        }
        if self.livekit.api_key.is_empty() || self.livekit.api_secret.is_empty() {
            return Err(anyhow!("livekit.api_key and livekit.api_secret are required"));
        }
        if self.livekit.token_ttl == 0 {
            return Err(anyhow!("livekit.token_ttl must be positive"));
        }
        if self.hls.public_url.is_empty() {
            return Err(anyhow!("hls.public_url is required"));
        }
        if self.hls.playlist_interval == 0
            || self.hls.stable_age == 0
            || self.hls.poll_interval == 0
            || self.hls.upload_timeout == 0
        {
            return Err(anyhow!(
                "hls intervals, stable_age and upload_timeout must be positive"
            ));
        }
        if self.hls.segment_extensions.is_empty() || self.hls.playlist_extensions.is_empty() {
            return Err(anyhow!("hls extensions must not be empty"));
        }
        let normalize = |e: &String| e.trim_start_matches('.').to_ascii_lowercase();
        for ext in self.hls.segment_extensions.iter().map(normalize) {
            if self.hls.playlist_extensions.iter().map(normalize).any(|p| p == ext) {
                return Err(anyhow!(
                    "extension {ext} is both a segment and a playlist extension"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> Config {
        let mut cfg = Config::default();
        cfg.livekit.url = "http://localhost:7880".to_string();
        cfg.livekit.api_key = "devkey".to_string();
        cfg.livekit.api_secret = "secret".to_string();
        cfg.hls.public_url = "https://bucket.example.com".to_string();
        cfg
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut cfg = valid();
        cfg.livekit.api_secret = "lk-secret-value".to_string();
        cfg.auth.tokens = vec!["bearer-token-value".to_string()];
        cfg.storage = StorageConfig::S3 {
            bucket: "media".to_string(),
            root: "/".to_string(),
            region: None,
            endpoint: None,
            access_key_id: Some("ak-value".to_string()),
            secret_access_key: Some("sk-value".to_string()),
            disable_config_load: true,
            enable_virtual_host_style: false,
        };
        let debug = format!("{cfg:?}");
        for secret in ["lk-secret-value", "bearer-token-value", "ak-value", "sk-value"] {
            assert!(!debug.contains(secret), "{secret} leaked: {debug}");
        }
        assert!(debug.contains("devkey"));
        assert!(debug.contains("[1 redacted]"));
    }

    #[test]
    fn test_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.hls.local_root, PathBuf::from("/tmp/hls"));
        assert_eq!(cfg.hls.remote_prefix, "streaming/vod");
        assert_eq!(cfg.hls.playlist_interval, 120_000);
        assert_eq!(cfg.hls.hls_list_size, 18);
        assert_eq!(cfg.livekit.token_ttl, 3600);
        assert!(matches!(cfg.storage, StorageConfig::Fs { .. }));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_sections() {
        let cfg: Config = toml::from_str(
            r#"
            [livekit]
            url = "wss://rtc.example.com"
            api_key = "key"
            api_secret = "secret"

            [storage]
            type = "s3"
            bucket = "vod"
            region = "us-east-1"

            [hls]
            public_url = "https://vod.example.com"
            playlist_interval = 2000
            "#,
        )
        .unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(
            cfg.hls.watch_config().playlist_interval,
            Duration::from_secs(2)
        );
        assert!(matches!(cfg.storage, StorageConfig::S3 { ref bucket, .. } if bucket == "vod"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LIVEKIT_URL", "http://rtc:7880"),
            ("STORAGE_BUCKET_NAME", "media"),
            ("STORAGE_URL", "https://s3.example.com"),
            ("STORAGE_BUCKET_KEY", "ak"),
            ("STORAGE_BUCKET_URL", "https://media.example.com"),
        ]);
        let mut cfg = valid();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.livekit.url, "http://rtc:7880");
        assert_eq!(cfg.hls.public_url, "https://media.example.com");
        match cfg.storage {
            StorageConfig::S3 {
                bucket,
                endpoint,
                access_key_id,
                secret_access_key,
                ..
            } => {
                assert_eq!(bucket, "media");
                assert_eq!(endpoint.as_deref(), Some("https://s3.example.com"));
                assert_eq!(access_key_id.as_deref(), Some("ak"));
                assert_eq!(secret_access_key, None);
            }
            other => panic!("unexpected storage {:?}", other.kind()),
        }
    }

    #[test]
    fn test_validate_rejects() {
        let mut cfg = valid();
        cfg.hls.stable_age = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.hls.playlist_extensions = vec![".TS".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.livekit.api_secret.clear();
        assert!(cfg.validate().is_err());

        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_stream_urls() {
        let mut cfg = valid();
        cfg.hls.public_url = "https://bucket.example.com/".to_string();
        assert_eq!(cfg.hls.stream_prefix("demo"), "streaming/vod/demo");
        assert_eq!(
            cfg.hls.playback_url("demo"),
            "https://bucket.example.com/streaming/vod/demo/demo.m3u8"
        );
        assert_eq!(cfg.hls.rtmp_url("demo"), "rtmp://localhost/live/demo");
        assert_eq!(cfg.hls.stream_dir("demo"), PathBuf::from("/tmp/hls/demo"));
    }
}
