use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Directory for rolling file logs; `None` logs to stdout only.
    pub log_dir: Option<PathBuf>,
    pub model_dir: PathBuf,
    /// SQLite URL; `None` selects the in-memory answer store.
    pub database_url: Option<String>,
    pub syntax_analysis_enabled: bool,
    pub default_min_samples: usize,
    /// Answers a question needs before its performance statistics are reported.
    pub min_performance_samples: usize,
    pub comprehension_clusters: usize,
    pub mistake_min_frequency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8000,
            log_level: "info".to_string(),
            log_dir: None,
            model_dir: PathBuf::from("./trained_models"),
            database_url: None,
            syntax_analysis_enabled: true,
            default_min_samples: 50,
            min_performance_samples: 3,
            comprehension_clusters: 5,
            mistake_min_frequency: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(defaults.host);

        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let log_dir = env_bool("ENABLE_FILE_LOGS").unwrap_or(false).then(|| {
            std::env::var("LOG_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./logs"))
        });

        let model_dir = std::env::var("MODEL_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.model_dir);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Self {
            host,
            port,
            log_level,
            log_dir,
            model_dir,
            database_url,
            syntax_analysis_enabled: env_bool("SYNTAX_ANALYSIS_ENABLED")
                .unwrap_or(defaults.syntax_analysis_enabled),
            default_min_samples: env_usize("DEFAULT_MIN_SAMPLES")
                .unwrap_or(defaults.default_min_samples),
            min_performance_samples: env_usize("MIN_PERFORMANCE_SAMPLES")
                .unwrap_or(defaults.min_performance_samples),
            comprehension_clusters: env_usize("COMPREHENSION_CLUSTERS")
                .filter(|&k| k > 0)
                .unwrap_or(defaults.comprehension_clusters),
            mistake_min_frequency: env_usize("MISTAKE_MIN_FREQUENCY")
                .unwrap_or(defaults.mistake_min_frequency),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.trim().parse().ok()
}
