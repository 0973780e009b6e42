// src/loader.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::engine::drill::DrillWeighting;
use crate::models::bank::{Bank, BankError, parse_bank, parse_supplementary_pack};

/// Process-wide bank. Loaded once, replaced only by an explicit `reload`.
pub struct BankCache {
    bank_path: PathBuf,
    pack_paths: Vec<PathBuf>,
    current: RwLock<Option<Arc<Bank>>>,
}

impl BankCache {
    pub fn new(bank_path: impl Into<PathBuf>, pack_paths: Vec<PathBuf>) -> Self {
        Self {
            bank_path: bank_path.into(),
            pack_paths,
            current: RwLock::new(None),
        }
    }

    /// Cache seeded with an already-parsed bank (tests, embedded data).
    pub fn from_bank(bank: Bank) -> Self {
        Self {
            bank_path: PathBuf::new(),
            pack_paths: Vec::new(),
            current: RwLock::new(Some(Arc::new(bank))),
        }
    }

    /// Cached bank, loading it on first use.
    pub async fn get(&self) -> Result<Arc<Bank>, BankError> {
        if let Some(bank) = self.current.read().await.as_ref() {
            return Ok(bank.clone());
        }
        let mut slot = self.current.write().await;
        if let Some(bank) = slot.as_ref() {
            return Ok(bank.clone());
        }
        let bank = Arc::new(self.load().await?);
        *slot = Some(bank.clone());
        Ok(bank)
    }

    /// Re-reads the bank and packs from disk. On failure the previous bank
    /// stays in place.
    pub async fn reload(&self) -> Result<Arc<Bank>, BankError> {
        let bank = Arc::new(self.load().await?);
        *self.current.write().await = Some(bank.clone());
        Ok(bank)
    }

    async fn load(&self) -> Result<Bank, BankError> {
        let raw = tokio::fs::read_to_string(&self.bank_path).await?;
        let mut bank = parse_bank(&raw)?;

        for path in &self.pack_paths {
            let raw = match tokio::fs::read_to_string(path).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Skipping pack {}: {}", path.display(), e);
                    continue;
                }
            };
            if let Some(pack) = parse_supplementary_pack(&raw) {
                let name = pack.pack.clone();
                let added = bank.merge_pack(pack);
                tracing::info!("Merged pack '{}' ({} new questions)", name, added);
            }
        }

        tracing::info!(
            "Loaded exam bank {} v{} with {} questions",
            bank.module,
            bank.version,
            bank.bank.len()
        );
        Ok(bank)
    }
}

/// Reads drill keyword weights from a JSON file.
pub async fn load_drill_weighting(path: &Path) -> Result<DrillWeighting, BankError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let weighting: DrillWeighting = serde_json::from_str(&raw).map_err(BankError::InvalidJson)?;
    tracing::info!(
        "Loaded {} drill weighting rules from {}",
        weighting.rules.len(),
        path.display()
    );
    Ok(weighting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bank::tests::{bank_json, mcq};
    use serde_json::json;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}", uuid::Uuid::new_v4(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_merges_packs_and_tolerates_bad_ones() {
        let bank_path = temp_file("bank.json", &bank_json(vec![mcq("MCQ-1", "Demand", "p")]).to_string());
        let good = temp_file(
            "good.json",
            &json!({"pack": "extra", "entries": [mcq("W2-1", "Supply", "s")]}).to_string(),
        );
        let bad = temp_file("bad.json", "{\"pack\": 3}");
        let missing = std::env::temp_dir().join("does-not-exist.json");

        let cache = BankCache::new(&bank_path, vec![good, bad, missing]);
        let bank = cache.get().await.unwrap();
        assert!(bank.question("W2-1").is_some());
        assert_eq!(bank.packs.len(), 1);

        let again = cache.get().await.unwrap();
        assert!(Arc::ptr_eq(&bank, &again));
        let reloaded = cache.reload().await.unwrap();
        assert!(!Arc::ptr_eq(&bank, &reloaded));
    }

    #[tokio::test]
    async fn test_drill_weighting_file() {
        let path = temp_file(
            "weights.json",
            &json!({"base": 2, "rules": [{"keywords": ["tax"], "bonus": 3}]}).to_string(),
        );
        let weighting = load_drill_weighting(&path).await.unwrap();
        assert_eq!(weighting.base, 2);
        assert_eq!(weighting.rules.len(), 1);

        let broken = temp_file("weights-bad.json", "{");
        assert!(matches!(
            load_drill_weighting(&broken).await,
            Err(BankError::InvalidJson(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_bank_is_an_error() {
        let cache = BankCache::new("/nonexistent/bank.json", vec![]);
        assert!(matches!(cache.get().await, Err(BankError::Io(_))));
    }
}
