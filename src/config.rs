use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_DATA_DIR: &str = "./data/catalog";

/// Process configuration, read from the environment (and `.env` if present).
pub struct CatalogConfig {
    pub token: String,
    pub guild_id: Option<u64>,
    pub admin_ids: HashSet<u64>,
    pub data_dir: PathBuf,
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self> {
        let token = dotenv::var("DISCORD_TOKEN").context("DISCORD_TOKEN required")?;
        let guild_id = dotenv::var("DISCORD_GUILD_ID")
            .ok()
            .and_then(|s| s.parse::<u64>().ok());
        let admin_ids = parse_admin_ids(&dotenv::var("ADMIN_USER_IDS").unwrap_or_default());
        let data_dir = dotenv::var("CATALOG_DATA_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Ok(Self {
            token,
            guild_id,
            admin_ids,
            data_dir,
        })
    }
}

fn parse_admin_ids(raw: &str) -> HashSet<u64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids_skips_junk() {
        let ids = parse_admin_ids(" 42, 7 ,nope,,");
        assert_eq!(ids, HashSet::from([42, 7]));
        assert!(parse_admin_ids("").is_empty());
    }
}
