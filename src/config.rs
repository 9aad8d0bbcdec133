use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        base_url: get_env_or_default("GITHUB_BASE_URL", "https://github.com"),
        concurrency: get_env_parsed("SCRAPER_CONCURRENCY", 2),
        timeout_secs: get_env_parsed("SCRAPER_TIMEOUT_SECS", 5),
        max_attempts: get_env_parsed("SCRAPER_MAX_ATTEMPTS", 2),
        backoff_ms: get_env_parsed("SCRAPER_BACKOFF_MS", 1000),
        bind_addr: get_env_or_default("SCRAPER_BIND_ADDR", "127.0.0.1:3000"),
        log_level: get_env_or_default("SCRAPER_LOG_LEVEL", "info"),
    }
});

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub bind_addr: String,
    pub log_level: String,
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}
