use log::warn;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_JSON_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub model_path: Option<PathBuf>,
    pub json_limit: usize,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Valeurs invalides: avertissement puis valeur par défaut.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
            match raw {
                Some(value) => value.trim().parse().unwrap_or_else(|_| {
                    warn!("{}={:?} invalide, valeur par défaut utilisée", key, value);
                    default
                }),
                None => default,
            }
        }

        let workers = parsed("WORKERS", lookup("WORKERS"), num_cpus::get()).max(1);

        ServerConfig {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed("PORT", lookup("PORT"), 5000),
            workers,
            model_path: lookup("MODEL_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            json_limit: parsed("JSON_LIMIT", lookup("JSON_LIMIT"), DEFAULT_JSON_LIMIT),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
