use crate::engine::BucketBounds;
use serde::Deserialize;
use std::path::Path;

/// Service configuration loaded from a TOML file and environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Dashboard origin for CORS restrictions on the analysis route.
    /// If not set, any origin is allowed.
    #[serde(default)]
    pub dashboard_origin: Option<String>,
    /// Report cache TTL in seconds (default: 300). 0 = no caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Maximum number of cached reports (default: 1000). 0 = no caching.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    /// Maximum accepted request body in bytes (default: 16 MiB).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Inclusive upper bounds of the rank buckets (default: 3, 10, 20).
    #[serde(default = "default_rank_buckets")]
    pub rank_buckets: Vec<u32>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

const fn default_cache_ttl_secs() -> u64 {
    300
}

const fn default_cache_max_entries() -> usize {
    1000
}

const fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

const fn default_request_timeout_secs() -> u64 {
    30
}

fn default_rank_buckets() -> Vec<u32> {
    BucketBounds::default().into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dashboard_origin: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
            rank_buckets: default_rank_buckets(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `RANKSHIFT_HOST` → host
    /// - `RANKSHIFT_PORT` → port
    /// - `RANKSHIFT_DASHBOARD_ORIGIN` → dashboard_origin
    /// - `RANKSHIFT_CACHE_TTL` → cache_ttl_secs
    /// - `RANKSHIFT_CACHE_MAX_ENTRIES` → cache_max_entries
    /// - `RANKSHIFT_MAX_BODY_BYTES` → max_body_bytes
    /// - `RANKSHIFT_REQUEST_TIMEOUT` → request_timeout_secs
    /// - `RANKSHIFT_RANK_BUCKETS` → rank_buckets (comma-separated, e.g. `3,10,20`)
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        if let Ok(host) = std::env::var("RANKSHIFT_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("RANKSHIFT_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(origin) = std::env::var("RANKSHIFT_DASHBOARD_ORIGIN") {
            config.dashboard_origin = Some(origin);
        }
        if let Ok(val) = std::env::var("RANKSHIFT_CACHE_TTL") {
            if let Ok(t) = val.parse() {
                config.cache_ttl_secs = t;
            }
        }
        if let Ok(val) = std::env::var("RANKSHIFT_CACHE_MAX_ENTRIES") {
            if let Ok(n) = val.parse() {
                config.cache_max_entries = n;
            }
        }
        if let Ok(val) = std::env::var("RANKSHIFT_MAX_BODY_BYTES") {
            if let Ok(b) = val.parse() {
                config.max_body_bytes = b;
            }
        }
        if let Ok(val) = std::env::var("RANKSHIFT_REQUEST_TIMEOUT") {
            if let Ok(t) = val.parse() {
                config.request_timeout_secs = t;
            }
        }
        if let Ok(val) = std::env::var("RANKSHIFT_RANK_BUCKETS") {
            let parsed: Result<Vec<u32>, _> =
                val.split(',').map(|part| part.trim().parse()).collect();
            match parsed {
                Ok(bounds) => config.rank_buckets = bounds,
                Err(e) => tracing::warn!("Ignoring RANKSHIFT_RANK_BUCKETS={val}: {e}"),
            }
        }

        config
    }

    /// Rank bucket definition, falling back to the default on an invalid list.
    pub fn bucket_bounds(&self) -> BucketBounds {
        BucketBounds::new(self.rank_buckets.clone()).unwrap_or_else(|e| {
            tracing::warn!("{e}, using default rank buckets");
            BucketBounds::default()
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Serializes tests that call `Config::load`, which reads process-wide
    /// environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(config.dashboard_origin.is_none());
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.cache_max_entries, 1000);
        assert_eq!(config.max_body_bytes, 16 * 1024 * 1024);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.rank_buckets, vec![3, 10, 20]);
    }

    #[test]
    fn test_load_from_toml() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        write!(
            file,
            r#"
host = "127.0.0.1"
port = 9000
dashboard_origin = "https://seo.example.com"
cache_ttl_secs = 0
cache_max_entries = 50
max_body_bytes = 1024
request_timeout_secs = 5
rank_buckets = [1, 5, 10, 50]
"#
        )
        .unwrap();

        let config = Config::load(Some(&config_path));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.dashboard_origin.as_deref(),
            Some("https://seo.example.com")
        );
        assert_eq!(config.cache_ttl_secs, 0);
        assert_eq!(config.cache_max_entries, 50);
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(
            config.bucket_bounds().labels(),
            vec!["1", "2-5", "6-10", "11-50", "51+"]
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_load_no_path_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = Config::load(None);
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_toml_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "this is not valid toml {{{").unwrap();

        let config = Config::load(Some(&config_path));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_env_var_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();

        let orig_port = std::env::var("RANKSHIFT_PORT").ok();
        let orig_buckets = std::env::var("RANKSHIFT_RANK_BUCKETS").ok();
        let orig_max_entries = std::env::var("RANKSHIFT_CACHE_MAX_ENTRIES").ok();

        std::env::set_var("RANKSHIFT_PORT", "3000");
        std::env::set_var("RANKSHIFT_RANK_BUCKETS", "5, 15");
        std::env::set_var("RANKSHIFT_CACHE_MAX_ENTRIES", "25");
        let config = Config::load(None);
        assert_eq!(config.port, 3000);
        assert_eq!(config.rank_buckets, vec![5, 15]);
        assert_eq!(config.cache_max_entries, 25);

        match orig_port {
            Some(v) => std::env::set_var("RANKSHIFT_PORT", v),
            None => std::env::remove_var("RANKSHIFT_PORT"),
        }
        match orig_buckets {
            Some(v) => std::env::set_var("RANKSHIFT_RANK_BUCKETS", v),
            None => std::env::remove_var("RANKSHIFT_RANK_BUCKETS"),
        }
        match orig_max_entries {
            Some(v) => std::env::set_var("RANKSHIFT_CACHE_MAX_ENTRIES", v),
            None => std::env::remove_var("RANKSHIFT_CACHE_MAX_ENTRIES"),
        }
    }

    #[test]
    fn test_invalid_bucket_list_falls_back() {
        let config = Config {
            rank_buckets: vec![10, 3],
            ..Config::default()
        };
        assert_eq!(config.bucket_bounds(), BucketBounds::default());
    }

    #[test]
    fn test_bind_addr() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 9100,
            ..Config::default()
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:9100");
    }
}
