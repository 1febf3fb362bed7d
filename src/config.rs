use dotenvy::dotenv;
use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
}

/// Unset defaults to 3000; a value that is present but not a port is a
/// configuration error, not a silent fallback.
fn parse_port(raw: Option<String>) -> Result<u16, AppError> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("PORT invalid: {raw}"))),
        None => Ok(3000),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| AppError::Config("JWT_SECRET missing".into()))?;
        if jwt_secret.trim().is_empty() {
            return Err(AppError::Config("JWT_SECRET empty".into()));
        }
        let port = parse_port(env::var("PORT").ok())?;

        Ok(Self {
            database_url,
            jwt_secret,
            port,
        })
    }
}
