use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";
pub const DEFAULT_EMAIL_FROM: &str = "tracker@localhost";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub resend_api_key: Option<String>,
    pub email_api_url: String,
    pub email_from: String,
    pub email_simulation: bool,
    pub email_simulation_delay_ms: u64,
    pub http_timeout_secs: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env_opt("DATABASE_URL"),
            resend_api_key: get_env_opt("RESEND_API_KEY"),
            email_api_url: get_env_opt("EMAIL_API_URL")
                .unwrap_or_else(|| DEFAULT_EMAIL_API_URL.to_string()),
            email_from: get_env_opt("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            email_simulation: get_env_parse_or("EMAIL_SIMULATION", true)?,
            email_simulation_delay_ms: get_env_parse_or("EMAIL_SIMULATION_DELAY_MS", 1000)?,
            http_timeout_secs: get_env_parse_or("HTTP_TIMEOUT_SECS", 30)?,
        })
    }

    /// Settings for running without any external service: in-memory storage,
    /// no provider, instant simulated sends.
    pub fn local(server_address: &str) -> Self {
        Self {
            server_address: server_address.to_string(),
            database_url: None,
            resend_api_key: None,
            email_api_url: DEFAULT_EMAIL_API_URL.to_string(),
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            email_simulation: true,
            email_simulation_delay_ms: 0,
            http_timeout_secs: 30,
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
