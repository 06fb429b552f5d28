//! Helpers shared by the `boards` binary: tracing setup and the JSON inputs it
//! reads (fixtures, block lists, license files).

use anyhow::Context;
use boards_core::models::{Block, License, User};
use boards_core::Config;
use boards_db::{MemoryFixture, MemoryStore};
use boards_services::{CloudLimitsService, StaticHostApi};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Everything an offline run needs: store contents plus the host's users.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(flatten)]
    pub store: MemoryFixture,
    #[serde(default)]
    pub users: Vec<User>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} from {}", what, path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {} in {}", what, path.display()))
}

pub fn load_fixture(path: &Path) -> anyhow::Result<Fixture> {
    read_json(path, "fixture")
}

/// A JSON array of blocks.
pub fn load_blocks(path: &Path) -> anyhow::Result<Vec<Block>> {
    read_json(path, "blocks")
}

pub fn load_license(path: &Path) -> anyhow::Result<License> {
    read_json(path, "license")
}

/// Service over an in-memory store seeded from `fixture`, with the fixture
/// users behind the host API. The store handle is returned alongside so
/// callers can read back what the service wrote.
pub fn memory_service(fixture: Fixture, config: &Config) -> (CloudLimitsService, MemoryStore) {
    let store = MemoryStore::from_fixture(fixture.store);
    let host_api = StaticHostApi::new(fixture.users);

    let service = CloudLimitsService::new(Arc::new(store.clone()))
        .with_host_api(Arc::new(host_api))
        .with_admin_page_size(config.admin_page_size);
    if let Some(card_limit) = config.card_limit {
        service.set_card_limit(card_limit);
    }
    (service, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn fixture_reads_store_and_users() {
        let file = write_temp(
            r#"{
                "license": {"features": {"cloud": true}},
                "cardLimitTimestamp": 150,
                "blocks": [{"id": "board1", "type": "board", "workspaceId": "0"}],
                "users": [{"id": "u1", "username": "michael", "roles": "system_admin"}]
            }"#,
        );

        let fixture = load_fixture(file.path()).unwrap();
        assert_eq!(fixture.store.card_limit_timestamp, 150);
        assert_eq!(fixture.store.blocks.len(), 1);
        assert_eq!(fixture.users.len(), 1);
        assert!(fixture.users[0].has_role("system_admin"));
    }

    #[test]
    fn empty_fixture_object_is_valid() {
        let file = write_temp("{}");
        let fixture = load_fixture(file.path()).unwrap();
        assert!(fixture.store.license.is_none());
        assert!(fixture.users.is_empty());
    }

    #[test]
    fn parse_errors_name_the_file() {
        let file = write_temp("[not json");
        let err = load_blocks(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse blocks"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_license(Path::new("/nonexistent/license.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read license"));
    }

    #[tokio::test]
    async fn memory_service_applies_configured_card_limit() {
        let fixture = Fixture {
            store: MemoryFixture {
                license: Some(License::cloud()),
                ..Default::default()
            },
            users: Vec::new(),
        };
        let config = Config {
            card_limit: Some(10),
            ..Config::default()
        };

        let (service, _store) = memory_service(fixture, &config);
        assert_eq!(service.card_limit(), 10);
        assert!(service.is_cloud_limited().await);
    }
}
