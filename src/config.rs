use std::net::IpAddr;
use std::ops::RangeInclusive;

pub const MAX_NOTIFY_ATTEMPTS: i32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub log_level: String,
    /// Lifetime of a login session (and of its bearer token), in minutes.
    pub session_ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
    pub notify_poll_secs: u64,
    pub notify_max_attempts: i32,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("TODO_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid TODO_HOST: {e}"))?;

        let port: u16 = env_parse("TODO_PORT", "9000")?;

        let max_body_size: usize = env_parse("TODO_MAX_BODY_SIZE", "1048576")?;
        let log_level = env_or("TODO_LOG_LEVEL", "info");

        let session_ttl_minutes: i64 = env_parse("TODO_SESSION_TTL_MINUTES", "540")?;
        let reset_token_ttl_minutes: i64 = env_parse("TODO_RESET_TOKEN_TTL_MINUTES", "60")?;
        let sweep_interval_secs: u64 = env_parse("TODO_SWEEP_INTERVAL_SECS", "60")?;
        let notify_poll_secs: u64 = env_parse("TODO_NOTIFY_POLL_SECS", "5")?;
        let notify_max_attempts: i32 = env_parse("TODO_NOTIFY_MAX_ATTEMPTS", "3")?;

        if session_ttl_minutes <= 0 || reset_token_ttl_minutes <= 0 {
            return Err("Token lifetimes must be positive".to_string());
        }
        check_range("TODO_NOTIFY_MAX_ATTEMPTS", notify_max_attempts, 1..=MAX_NOTIFY_ATTEMPTS)?;

        let smtp = match (
            std::env::var("TODO_SMTP_HOST").ok(),
            std::env::var("TODO_SMTP_PORT").ok(),
            std::env::var("TODO_SMTP_USER").ok(),
            std::env::var("TODO_SMTP_PASS").ok(),
            std::env::var("TODO_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid TODO_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            max_body_size,
            log_level,
            session_ttl_minutes,
            reset_token_ttl_minutes,
            sweep_interval_secs,
            notify_poll_secs,
            notify_max_attempts,
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn check_range(key: &str, value: i32, range: RangeInclusive<i32>) -> Result<(), String> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "Invalid {key}: {value} is outside {}..={}",
            range.start(),
            range.end()
        ))
    }
}

fn env_parse<T>(key: &str, default: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))
}
