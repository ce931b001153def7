//! JSON-file persistence boundary.
//!
//! The pipeline only needs an ordered client list in and an ordered outreach
//! list out; both are plain JSON arrays on disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::domain::client::ClientRecord;
use crate::domain::outreach::OutreachRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read client list `{path}`: {source}")]
    ReadClients { path: PathBuf, source: std::io::Error },
    #[error("client list `{path}` is not a valid JSON array of client records: {source}")]
    ParseClients { path: PathBuf, source: serde_json::Error },
    #[error("could not serialize output for `{path}`: {source}")]
    Serialize { path: PathBuf, source: serde_json::Error },
    #[error("could not write `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

pub fn load_clients(path: &Path) -> Result<Vec<ClientRecord>, StoreError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| StoreError::ReadClients { path: path.to_path_buf(), source })?;

    serde_json::from_str(&raw)
        .map_err(|source| StoreError::ParseClients { path: path.to_path_buf(), source })
}

pub fn write_outreach(path: &Path, records: &[OutreachRecord]) -> Result<(), StoreError> {
    write_json(path, records)
}

/// Writes pretty JSON through a sibling temp file so readers never see a partial file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|source| StoreError::Serialize { path: path.to_path_buf(), source })?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| StoreError::Write { path: path.to_path_buf(), source })?;
    }

    let staging = staging_path(path);
    fs::write(&staging, payload)
        .map_err(|source| StoreError::Write { path: staging.clone(), source })?;
    fs::rename(&staging, path)
        .map_err(|source| StoreError::Write { path: path.to_path_buf(), source })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Utc;
    use tempfile::TempDir;

    use crate::domain::analysis::OpportunityAnalysis;
    use crate::domain::email::EmailContent;
    use crate::domain::outreach::OutreachRecord;

    use super::{load_clients, write_outreach, StoreError};

    const CLIENTS: &str = r#"[
        {
            "client_id": "client_5001",
            "name": "Leah Okafor",
            "email": "leah@okaforbuild.example",
            "company": "Okafor Build",
            "industry": "Construction",
            "revenue_range": "$5M - $20M",
            "company_size": "50-100 employees",
            "key_insights": ["Won municipal contract"],
            "pain_points": ["cash flow"],
            "engagement_score": 72
        },
        {
            "client_id": "client_5002",
            "name": "Tomas Ruiz"
        }
    ]"#;

    #[test]
    fn clients_load_in_file_order() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("client_context.json");
        fs::write(&path, CLIENTS).expect("write fixture");

        let clients = load_clients(&path).expect("clients should load");

        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].name, "Leah Okafor");
        assert_eq!(clients[1].engagement_score, 50);
    }

    #[test]
    fn missing_client_file_names_the_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.json");

        let error = load_clients(&path).expect_err("missing file should fail");

        assert!(matches!(error, StoreError::ReadClients { .. }));
        assert!(error.to_string().contains("absent.json"));
    }

    #[test]
    fn malformed_client_file_is_a_parse_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("client_context.json");
        fs::write(&path, r#"{"not": "an array"}"#).expect("write fixture");

        assert!(matches!(load_clients(&path), Err(StoreError::ParseClients { .. })));
    }

    #[test]
    fn outreach_is_written_and_parent_directories_created() {
        let dir = TempDir::new().expect("temp dir");
        let clients_path = dir.path().join("clients.json");
        fs::write(&clients_path, CLIENTS).expect("write fixture");
        let clients = load_clients(&clients_path).expect("clients should load");

        let records: Vec<OutreachRecord> = clients
            .iter()
            .map(|client| {
                let analysis = OpportunityAnalysis::fallback_for(client);
                let email = EmailContent::templated(client, &analysis, "Advisor");
                OutreachRecord::compose(client, &analysis, &email, Utc::now())
            })
            .collect();

        let output = dir.path().join("nested").join("emails_sent.json");
        write_outreach(&output, &records).expect("write should succeed");

        let written: Vec<OutreachRecord> =
            serde_json::from_str(&fs::read_to_string(&output).expect("read output"))
                .expect("output should parse");
        assert_eq!(written, records);
        assert!(!dir.path().join("nested").join("emails_sent.json.tmp").exists());
    }
}
