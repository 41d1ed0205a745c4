use serde::Deserialize;
use std::env;
use storefront_types::domain::status::TransitionPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub admin_token: Option<String>,
    pub status_policy: TransitionPolicy,
    pub seed_catalog: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT").unwrap_or_else(|_| "3000".into());
        let database_url = env::var("DATABASE_URL").ok();
        let admin_token = env::var("ADMIN_TOKEN").ok().filter(|t| !t.trim().is_empty());
        let status_policy = match env::var("STATUS_POLICY") {
            Ok(raw) => raw.parse().map_err(anyhow::Error::msg)?,
            Err(_) => TransitionPolicy::default(),
        };
        let seed_catalog = match env::var("SEED_CATALOG") {
            Ok(raw) => parse_flag(&raw)?,
            Err(_) => true,
        };
        Ok(Self {
            server_port,
            database_url,
            admin_token,
            status_policy,
            seed_catalog,
        })
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("invalid boolean flag: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag("1").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
