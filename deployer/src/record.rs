//! Persists the outcome of a successful run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ethers::types::Address;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::error;

use crate::endpoint::{NetworkInfo, Role};
use crate::error::DeployError;
use crate::provision::ComponentSet;

/// The durable outcome of a run: the address map plus run metadata.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentRecord {
    pub network: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    #[serde(rename = "deployedAt")]
    pub deployed_at: String,
    pub deployer: Address,
    pub usdc: Address,
    pub contracts: BTreeMap<Role, Address>,
}

impl DeploymentRecord {
    pub fn new(
        network: &NetworkInfo,
        deployer: Address,
        usdc: Address,
        components: &ComponentSet,
    ) -> Self {
        let deployed_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        let contracts = Role::ALL
            .iter()
            .map(|&role| (role, components.address_of(role)))
            .collect();

        DeploymentRecord {
            network: network.name.clone(),
            chain_id: network.chain_id,
            deployed_at,
            deployer,
            usdc,
            contracts,
        }
    }
}

/// Where the two record documents landed.
#[derive(Debug, Clone)]
pub struct RecordedPaths {
    pub timestamped: PathBuf,
    pub latest: PathBuf,
}

/// Write the record twice: a timestamped document that later runs never
/// touch, and a per-chain "latest" document that every run overwrites.
pub fn write_record(
    record: &DeploymentRecord,
    out_dir: &Path,
    prefix: &str,
) -> Result<RecordedPaths, DeployError> {
    write_both(record, out_dir, prefix).map_err(|err| {
        // The contracts are live; make sure their addresses survive in logs.
        error!(
            record = %serde_json::to_string(record).unwrap_or_default(),
            "record persistence failed, the logged record is the only copy"
        );
        DeployError::Persistence(err)
    })
}

fn write_both(
    record: &DeploymentRecord,
    out_dir: &Path,
    prefix: &str,
) -> anyhow::Result<RecordedPaths> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed creating directory {}", out_dir.display()))?;

    let timestamped = out_dir.join(format!(
        "{prefix}-{}-{}.json",
        record.chain_id,
        sanitize_timestamp(&record.deployed_at)
    ));
    let latest = out_dir.join(format!("{prefix}-{}.json", record.chain_id));

    write_json_atomic(&timestamped, record)?;
    write_json_atomic(&latest, record)?;

    Ok(RecordedPaths { timestamped, latest })
}

/// Timestamps carry `:` and `.`, neither of which belongs in a filename.
fn sanitize_timestamp(timestamp: &str) -> String {
    timestamp.replace([':', '.'], "-")
}

fn write_json_atomic(path: &Path, record: &DeploymentRecord) -> anyhow::Result<()> {
    let serialised =
        serde_json::to_string_pretty(record).context("failed serialising deployment record")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(deployed_at: &str) -> DeploymentRecord {
        DeploymentRecord {
            network: "arc".into(),
            chain_id: 421_613,
            deployed_at: deployed_at.into(),
            deployer: Address::from_low_u64_be(1),
            usdc: Address::from_low_u64_be(2),
            contracts: Role::ALL
                .iter()
                .map(|&role| (role, Address::from_low_u64_be(10 + role as u64)))
                .collect(),
        }
    }

    #[test]
    fn sanitizes_path_unsafe_timestamp_characters() {
        assert_eq!(
            sanitize_timestamp("2026-08-06T12:34:56.789Z"),
            "2026-08-06T12-34-56-789Z"
        );
    }

    #[test]
    fn record_serializes_the_documented_schema() {
        let record = sample("2026-08-06T12:34:56Z");
        let value: serde_json::Value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["network"], "arc");
        assert_eq!(value["chainId"], 421_613);
        assert_eq!(value["deployedAt"], "2026-08-06T12:34:56Z");

        let contracts = value["contracts"].as_object().unwrap();
        assert_eq!(contracts.len(), 5);
        for role in Role::ALL {
            assert!(contracts.contains_key(role.name()));
        }

        // Roles appear in creation order in the serialized document.
        let json = serde_json::to_string_pretty(&record).unwrap();
        let positions: Vec<usize> = Role::ALL
            .iter()
            .map(|role| json.find(role.name()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn writes_timestamped_and_latest_documents() {
        let dir = tempfile::tempdir().unwrap();
        let record = sample("2026-08-06T12:34:56.789Z");

        let paths = write_record(&record, dir.path(), "arc").unwrap();

        assert_eq!(
            paths.timestamped.file_name().unwrap().to_str().unwrap(),
            "arc-421613-2026-08-06T12-34-56-789Z.json"
        );
        assert_eq!(
            paths.latest.file_name().unwrap().to_str().unwrap(),
            "arc-421613.json"
        );

        let timestamped = fs::read_to_string(&paths.timestamped).unwrap();
        let latest = fs::read_to_string(&paths.latest).unwrap();
        assert_eq!(timestamped, latest);

        // No temp files left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn latest_is_overwritten_while_timestamped_documents_accumulate() {
        let dir = tempfile::tempdir().unwrap();

        let first = sample("2026-08-06T10:00:00Z");
        let mut second = sample("2026-08-06T11:00:00Z");
        second
            .contracts
            .insert(Role::JobRegistry, Address::from_low_u64_be(99));

        write_record(&first, dir.path(), "arc").unwrap();
        let paths = write_record(&second, dir.path(), "arc").unwrap();

        let latest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.latest).unwrap()).unwrap();
        assert_eq!(
            latest["contracts"]["JobRegistry"],
            format!("{:?}", Address::from_low_u64_be(99))
        );
        // Two timestamped documents plus one latest.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }
}
