use std::env;
use std::path::PathBuf;

use anyhow::Context;
use chrono::FixedOffset;

#[derive(Clone, Debug)]
pub struct Config {
    /// Without a database the board serves an in-memory source.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub clinic_offset: FixedOffset,
    pub seed_file: Option<PathBuf>,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let offset_minutes = match env::var("CLINIC_UTC_OFFSET_MINUTES") {
            Ok(raw) => raw
                .trim()
                .parse::<i32>()
                .with_context(|| format!("CLINIC_UTC_OFFSET_MINUTES is not an integer: {raw}"))?,
            Err(_) => 0,
        };
        let clinic_offset = clinic_offset_from_minutes(offset_minutes)?;

        let seed_file = env::var("SEED_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(5);

        Ok(Self {
            database_url,
            bind_addr,
            clinic_offset,
            seed_file,
            db_max_connections,
        })
    }
}

pub fn clinic_offset_from_minutes(minutes: i32) -> anyhow::Result<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .with_context(|| format!("clinic UTC offset out of range: {minutes} minutes"))
}
