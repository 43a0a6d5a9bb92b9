use crate::error::{Error, Result};
use crate::services::plan_catalog::PlanCatalog;
use crate::services::wave_clock::SendWindow;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub drip_api_secret: String,
    pub brevo: BrevoConfig,
    pub drip: DripConfig,
    pub tick_cron: String,
}

#[derive(Debug, Clone)]
pub struct BrevoConfig {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    pub base_url: String,
}

/// Knobs of the wave scheduler, handed to the services at construction.
#[derive(Debug, Clone)]
pub struct DripConfig {
    pub plans: PlanCatalog,
    /// Template ids for waves 1, 2 and 3.
    pub templates: [i64; 3],
    pub dedup_buffer: i64,
    pub send_timeout: Duration,
    pub lease_ttl: Duration,
    pub window: SendWindow,
}

impl Default for DripConfig {
    fn default() -> Self {
        Self {
            plans: PlanCatalog::default(),
            templates: [3, 4, 5],
            dedup_buffer: 10,
            send_timeout: Duration::from_secs(30),
            lease_ttl: Duration::from_secs(30 * 60),
            window: SendWindow::default(),
        }
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let brevo_api_key = get_env("BREVO_API_KEY")?;
        if brevo_api_key.trim().is_empty() {
            return Err(Error::Config("BREVO_API_KEY is empty".to_string()));
        }

        let daily_quota: i32 = get_env_parse_or("DRIP_DAILY_QUOTA", 50)?;
        if daily_quota <= 0 {
            return Err(Error::Config("DRIP_DAILY_QUOTA must be positive".to_string()));
        }
        let default_plan = get_env_or("DRIP_DEFAULT_PLAN", "starter");

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            drip_api_secret: get_env("DRIP_API_SECRET")?,
            brevo: BrevoConfig {
                api_key: brevo_api_key,
                sender_email: get_env_or("BREVO_SENDER_EMAIL", "noreply@resumeblast.ai"),
                sender_name: get_env_or("BREVO_SENDER_NAME", "ResumeBlast.ai"),
                base_url: get_env_or("BREVO_BASE_URL", "https://api.brevo.com"),
            },
            drip: DripConfig {
                plans: PlanCatalog::with_defaults(daily_quota, &default_plan)?,
                templates: [
                    get_env_parse_or("BREVO_TEMPLATE_WAVE1", 3)?,
                    get_env_parse_or("BREVO_TEMPLATE_WAVE2", 4)?,
                    get_env_parse_or("BREVO_TEMPLATE_WAVE3", 5)?,
                ],
                dedup_buffer: get_env_parse_or("DRIP_DEDUP_BUFFER", 10)?,
                send_timeout: Duration::from_secs(get_env_parse_or("DRIP_SEND_TIMEOUT_SECS", 30)?),
                lease_ttl: Duration::from_secs(get_env_parse_or("DRIP_LEASE_TTL_SECS", 1800)?),
                window: SendWindow::default(),
            },
            tick_cron: get_env_or("DRIP_TICK_CRON", "0 */30 * * * *"),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
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
