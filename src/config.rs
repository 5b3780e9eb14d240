use std::env;

use anyhow::{bail, Context};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin(s), comma-separated; `*` allows any origin.
    pub frontend_url: String,

    /// Trailing number of periods (days or weeks) used for completion rates.
    pub completion_window: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let completion_window: u32 = env::var("COMPLETION_WINDOW")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .context("COMPLETION_WINDOW must be a number")?;
        if !(1..=365).contains(&completion_window) {
            bail!("COMPLETION_WINDOW must be between 1 and 365");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://habits.db".into()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("PORT must be a number")?,
            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| "*".into()),
            completion_window,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.frontend_url.trim() == "*"
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "*".into(),
            completion_window: 30,
        }
    }
}
