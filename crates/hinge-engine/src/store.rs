//! Campaign persistence.
//!
//! The store is the only long-lived holder of campaign state. Callers load a
//! snapshot by value and hand back a successor through
//! [`commit`](CampaignStore::commit), which succeeds only if the version the
//! caller started from is still the stored one.
//!
//! ## File Structure
//!
//! ```text
//! <root>/
//! └── campaigns/
//!     └── <campaign_id>/
//!         ├── campaign.json       # current snapshot
//!         ├── campaign.prev.json  # previous snapshot, kept until the next commit lands
//!         └── receipts/
//!             └── <action_id>.json
//! ```

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hinge_core::{ActionId, Campaign, CampaignId, TurnResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

const CAMPAIGNS_DIR: &str = "campaigns";
const CURRENT_FILE: &str = "campaign.json";
const PREVIOUS_FILE: &str = "campaign.prev.json";
const RECEIPTS_DIR: &str = "receipts";

/// Versioned, atomic storage of campaign snapshots and turn receipts.
pub trait CampaignStore: Send + Sync {
    /// Persist a brand-new campaign.
    fn create(&self, campaign: &Campaign) -> StoreResult<()>;

    /// Load the current snapshot.
    fn load(&self, id: &CampaignId) -> StoreResult<Campaign>;

    /// Replace the stored snapshot if it is still at `expected_version`.
    fn commit(&self, campaign: &Campaign, expected_version: u64) -> StoreResult<()>;

    /// Remove a campaign and everything stored with it.
    fn delete(&self, id: &CampaignId) -> StoreResult<()>;

    /// Ids of all stored campaigns, sorted.
    fn list(&self) -> StoreResult<Vec<CampaignId>>;

    /// Keep the committed result of an action for duplicate submissions.
    fn save_receipt(&self, id: &CampaignId, receipt: &TurnResult) -> StoreResult<()>;

    fn load_receipt(&self, id: &CampaignId, action_id: &ActionId) -> StoreResult<Option<TurnResult>>;

    /// Drop receipts whose action id is not in `keep`. Returns how many were removed.
    fn prune_receipts(&self, id: &CampaignId, keep: &[ActionId]) -> StoreResult<usize>;
}

fn check_commit(stored: u64, expected: u64, next: u64) -> StoreResult<()> {
    if stored != expected {
        return Err(StoreError::StaleVersion {
            expected,
            found: stored,
        });
    }
    if next != expected + 1 {
        return Err(StoreError::VersionSkip {
            from: expected,
            to: next,
        });
    }
    Ok(())
}

// =============================================================================
// File store
// =============================================================================

/// Stores each campaign as JSON snapshots under a root directory.
#[derive(Debug)]
pub struct FileCampaignStore {
    root: PathBuf,
    /// Serializes compare-and-swap within this process.
    commit_lock: Mutex<()>,
}

impl FileCampaignStore {
    /// Create a store rooted at `root`. Nothing is written until first use.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            commit_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn campaigns_dir(&self) -> PathBuf {
        self.root.join(CAMPAIGNS_DIR)
    }

    fn campaign_dir(&self, id: &CampaignId) -> StoreResult<PathBuf> {
        let raw = id.as_str();
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId(raw.to_string()));
        }
        Ok(self.campaigns_dir().join(raw))
    }

    fn receipt_path(&self, id: &CampaignId, action_id: &ActionId) -> StoreResult<PathBuf> {
        Ok(self
            .campaign_dir(id)?
            .join(RECEIPTS_DIR)
            .join(format!("{}.json", receipt_stem(action_id))))
    }

    fn read_snapshot(&self, dir: &Path, id: &CampaignId) -> StoreResult<Campaign> {
        let current = dir.join(CURRENT_FILE);
        if current.exists() {
            let json = fs::read_to_string(&current)?;
            return Ok(serde_json::from_str(&json)?);
        }

        // A crash between the two renames in `commit` leaves only the previous snapshot.
        let previous = dir.join(PREVIOUS_FILE);
        if previous.exists() {
            warn!(
                campaign_id = %id,
                path = %previous.display(),
                "Current snapshot missing, recovering from previous"
            );
            let json = fs::read_to_string(&previous)?;
            return Ok(serde_json::from_str(&json)?);
        }

        Err(StoreError::CampaignNotFound(id.clone()))
    }

    /// Storage statistics across all campaigns.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let mut stats = StoreStats::default();
        let dir = self.campaigns_dir();
        if !dir.exists() {
            return Ok(stats);
        }

        for entry in walkdir::WalkDir::new(&dir)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            stats.total_size += entry.metadata().map(|m| m.len()).unwrap_or(0);
            stats.file_count += 1;
            let in_receipts = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n == RECEIPTS_DIR)
                .unwrap_or(false);
            if in_receipts {
                stats.receipt_count += 1;
            } else if entry.file_name() == CURRENT_FILE {
                stats.campaign_count += 1;
            }
        }

        Ok(stats)
    }
}

/// Write `value` to `path` through a synced temp file and a rename, so a
/// reader sees either the old file or the complete new one.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(value)?;
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// File-name-safe encoding of an action id.
fn receipt_stem(action_id: &ActionId) -> String {
    let mut out = String::with_capacity(action_id.as_str().len());
    for b in action_id.as_str().bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

impl CampaignStore for FileCampaignStore {
    fn create(&self, campaign: &Campaign) -> StoreResult<()> {
        let _guard = self.commit_lock.lock().unwrap_or_else(|e| e.into_inner());
        let dir = self.campaign_dir(&campaign.id)?;
        if dir.join(CURRENT_FILE).exists() || dir.join(PREVIOUS_FILE).exists() {
            return Err(StoreError::CampaignExists(campaign.id.clone()));
        }
        fs::create_dir_all(dir.join(RECEIPTS_DIR))?;
        write_json_atomic(&dir.join(CURRENT_FILE), campaign)?;

        info!(
            campaign_id = %campaign.id,
            path = %dir.display(),
            "Created campaign"
        );
        Ok(())
    }

    fn load(&self, id: &CampaignId) -> StoreResult<Campaign> {
        let dir = self.campaign_dir(id)?;
        let campaign = self.read_snapshot(&dir, id)?;
        debug!(
            campaign_id = %id,
            version = campaign.state_version,
            turn = campaign.turn_count,
            "Loaded campaign"
        );
        Ok(campaign)
    }

    fn commit(&self, campaign: &Campaign, expected_version: u64) -> StoreResult<()> {
        let _guard = self.commit_lock.lock().unwrap_or_else(|e| e.into_inner());
        let dir = self.campaign_dir(&campaign.id)?;
        let stored = self.read_snapshot(&dir, &campaign.id)?;
        check_commit(stored.state_version, expected_version, campaign.state_version)?;

        let current = dir.join(CURRENT_FILE);
        let tmp = dir.join(format!("{CURRENT_FILE}.tmp"));
        let bytes = serde_json::to_vec_pretty(campaign)?;
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        if current.exists() {
            fs::rename(&current, dir.join(PREVIOUS_FILE))?;
        }
        fs::rename(&tmp, &current)?;

        info!(
            campaign_id = %campaign.id,
            version = campaign.state_version,
            turn = campaign.turn_count,
            "Committed campaign snapshot"
        );
        Ok(())
    }

    fn delete(&self, id: &CampaignId) -> StoreResult<()> {
        let _guard = self.commit_lock.lock().unwrap_or_else(|e| e.into_inner());
        let dir = self.campaign_dir(id)?;
        if !dir.exists() {
            return Err(StoreError::CampaignNotFound(id.clone()));
        }
        fs::remove_dir_all(&dir)?;
        info!(campaign_id = %id, path = %dir.display(), "Deleted campaign");
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<CampaignId>> {
        let dir = self.campaigns_dir();
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut ids: Vec<CampaignId> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                let p = e.path();
                p.join(CURRENT_FILE).exists() || p.join(PREVIOUS_FILE).exists()
            })
            .filter_map(|e| e.file_name().to_str().map(CampaignId::from))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn save_receipt(&self, id: &CampaignId, receipt: &TurnResult) -> StoreResult<()> {
        let path = self.receipt_path(id, &receipt.action_id)?;
        write_json_atomic(&path, receipt)?;
        debug!(campaign_id = %id, action_id = %receipt.action_id, "Saved turn receipt");
        Ok(())
    }

    fn load_receipt(&self, id: &CampaignId, action_id: &ActionId) -> StoreResult<Option<TurnResult>> {
        let path = self.receipt_path(id, action_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn prune_receipts(&self, id: &CampaignId, keep: &[ActionId]) -> StoreResult<usize> {
        let dir = self.campaign_dir(id)?.join(RECEIPTS_DIR);
        if !dir.exists() {
            return Ok(0);
        }
        let keep: Vec<String> = keep.iter().map(|a| format!("{}.json", receipt_stem(a))).collect();

        let mut deleted = 0;
        for entry in fs::read_dir(&dir)?.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !keep.contains(&name) && fs::remove_file(entry.path()).is_ok() {
                deleted += 1;
            }
        }
        if deleted > 0 {
            debug!(campaign_id = %id, deleted, "Pruned turn receipts");
        }
        Ok(deleted)
    }
}

/// Storage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub campaign_count: usize,
    pub receipt_count: usize,
    pub file_count: usize,
    /// Total size of all files in bytes.
    pub total_size: u64,
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCampaignStore {
    campaigns: Mutex<HashMap<CampaignId, Campaign>>,
    receipts: Mutex<HashMap<CampaignId, HashMap<ActionId, TurnResult>>>,
}

impl MemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CampaignStore for MemoryCampaignStore {
    fn create(&self, campaign: &Campaign) -> StoreResult<()> {
        let mut campaigns = self.campaigns.lock().unwrap_or_else(|e| e.into_inner());
        if campaigns.contains_key(&campaign.id) {
            return Err(StoreError::CampaignExists(campaign.id.clone()));
        }
        campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(())
    }

    fn load(&self, id: &CampaignId) -> StoreResult<Campaign> {
        self.campaigns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::CampaignNotFound(id.clone()))
    }

    fn commit(&self, campaign: &Campaign, expected_version: u64) -> StoreResult<()> {
        let mut campaigns = self.campaigns.lock().unwrap_or_else(|e| e.into_inner());
        let stored = campaigns
            .get(&campaign.id)
            .ok_or_else(|| StoreError::CampaignNotFound(campaign.id.clone()))?;
        check_commit(stored.state_version, expected_version, campaign.state_version)?;
        campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(())
    }

    fn delete(&self, id: &CampaignId) -> StoreResult<()> {
        let removed = self
            .campaigns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        self.receipts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        removed
            .map(|_| ())
            .ok_or_else(|| StoreError::CampaignNotFound(id.clone()))
    }

    fn list(&self) -> StoreResult<Vec<CampaignId>> {
        let mut ids: Vec<CampaignId> = self
            .campaigns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn save_receipt(&self, id: &CampaignId, receipt: &TurnResult) -> StoreResult<()> {
        self.receipts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id.clone())
            .or_default()
            .insert(receipt.action_id.clone(), receipt.clone());
        Ok(())
    }

    fn load_receipt(&self, id: &CampaignId, action_id: &ActionId) -> StoreResult<Option<TurnResult>> {
        Ok(self
            .receipts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .and_then(|r| r.get(action_id))
            .cloned())
    }

    fn prune_receipts(&self, id: &CampaignId, keep: &[ActionId]) -> StoreResult<usize> {
        let mut receipts = self.receipts.lock().unwrap_or_else(|e| e.into_inner());
        let Some(map) = receipts.get_mut(id) else {
            return Ok(0);
        };
        let before = map.len();
        map.retain(|action_id, _| keep.contains(action_id));
        Ok(before - map.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hinge_core::{CampaignBuilder, ConnectivityTier};
    use tempfile::TempDir;

    fn campaign(id: &str) -> Campaign {
        CampaignBuilder::new(id, "docks")
            .region("docks", "The Docks", ConnectivityTier::Embedded)
            .build()
    }

    fn next(mut c: Campaign) -> Campaign {
        c.state_version += 1;
        c.turn_count += 1;
        c
    }

    #[test]
    fn test_file_store_roundtrip_and_cas() {
        let dir = TempDir::new().unwrap();
        let store = FileCampaignStore::new(dir.path());
        let c0 = campaign("alpha");
        store.create(&c0).unwrap();

        let c1 = next(c0.clone());
        store.commit(&c1, 0).unwrap();
        assert_eq!(store.load(&c0.id).unwrap().state_version, 1);

        // A second writer that also started from version 0 loses.
        let err = store.commit(&c1, 0).unwrap_err();
        assert!(matches!(err, StoreError::StaleVersion { expected: 0, found: 1 }));
    }

    #[test]
    fn test_commit_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = FileCampaignStore::new(dir.path());
        let c0 = campaign("alpha");
        store.create(&c0).unwrap();
        store.commit(&next(c0.clone()), 0).unwrap();

        let campaign_dir = dir.path().join("campaigns").join("alpha");
        let prev: Campaign =
            serde_json::from_str(&fs::read_to_string(campaign_dir.join(PREVIOUS_FILE)).unwrap())
                .unwrap();
        assert_eq!(prev.state_version, 0);
        assert!(!campaign_dir.join("campaign.json.tmp").exists());
    }

    #[test]
    fn test_recovers_from_previous_when_current_missing() {
        let dir = TempDir::new().unwrap();
        let store = FileCampaignStore::new(dir.path());
        let c0 = campaign("alpha");
        store.create(&c0).unwrap();
        store.commit(&next(c0.clone()), 0).unwrap();

        let campaign_dir = dir.path().join("campaigns").join("alpha");
        fs::remove_file(campaign_dir.join(CURRENT_FILE)).unwrap();
        assert_eq!(store.load(&c0.id).unwrap().state_version, 0);
    }

    #[test]
    fn test_version_must_advance_by_one() {
        let store = MemoryCampaignStore::new();
        let c0 = campaign("alpha");
        store.create(&c0).unwrap();
        let mut skipped = c0.clone();
        skipped.state_version = 2;
        assert!(matches!(
            store.commit(&skipped, 0),
            Err(StoreError::VersionSkip { from: 0, to: 2 })
        ));
    }

    #[test]
    fn test_list_delete_and_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileCampaignStore::new(dir.path());
        store.create(&campaign("beta")).unwrap();
        store.create(&campaign("alpha")).unwrap();
        assert!(matches!(
            store.create(&campaign("alpha")),
            Err(StoreError::CampaignExists(_))
        ));
        assert_eq!(
            store.list().unwrap(),
            vec![CampaignId::new("alpha"), CampaignId::new("beta")]
        );

        store.delete(&CampaignId::new("alpha")).unwrap();
        assert!(matches!(
            store.load(&CampaignId::new("alpha")),
            Err(StoreError::CampaignNotFound(_))
        ));
        assert_eq!(store.stats().unwrap().campaign_count, 1);
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let store = FileCampaignStore::new(dir.path());
        assert!(matches!(
            store.load(&CampaignId::new("../etc")),
            Err(StoreError::InvalidId(_))
        ));
    }

    #[test]
    fn test_receipt_stem_escapes_separators() {
        assert_eq!(receipt_stem(&ActionId::new("a/b c")), "a%2Fb%20c");
        assert_eq!(receipt_stem(&ActionId::new("turn-1_x")), "turn-1_x");
    }
}
