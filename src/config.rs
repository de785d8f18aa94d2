use std::path::PathBuf;

use thiserror::Error;

use crate::store::{KeyPolicy, RecordStore, SwapMode};

pub const DEFAULT_STORE_PATH: &str = "students.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown key policy {0:?}; expected `unique` or `per-semester`")]
    InvalidKeyPolicy(String),

    #[error("unknown swap mode {0:?}; expected `delete-rename` or `rename`")]
    InvalidSwapMode(String),
}

pub fn parse_key_policy(value: &str) -> Result<KeyPolicy, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "unique" => Ok(KeyPolicy::Unique),
        "per-semester" | "semester" => Ok(KeyPolicy::PerSemester),
        _ => Err(ConfigError::InvalidKeyPolicy(value.to_string())),
    }
}

pub fn parse_swap_mode(value: &str) -> Result<SwapMode, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "delete-rename" => Ok(SwapMode::DeleteThenRename),
        "rename" => Ok(SwapMode::RenameOver),
        _ => Err(ConfigError::InvalidSwapMode(value.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub key_policy: KeyPolicy,
    pub swap_mode: SwapMode,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// - SEMESTER_GPA_STORE: store file path (default: students.txt)
    /// - SEMESTER_GPA_KEYS: `unique` or `per-semester` (default: unique)
    /// - SEMESTER_GPA_SWAP: `delete-rename` or `rename` (default: delete-rename)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let path = set("SEMESTER_GPA_STORE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
        let key_policy = set("SEMESTER_GPA_KEYS")
            .map(|value| parse_key_policy(&value))
            .transpose()?
            .unwrap_or_default();
        let swap_mode = set("SEMESTER_GPA_SWAP")
            .map(|value| parse_swap_mode(&value))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            path,
            key_policy,
            swap_mode,
        })
    }

    pub fn open_store(&self) -> RecordStore {
        RecordStore::new(&self.path)
            .with_key_policy(self.key_policy)
            .with_swap_mode(self.swap_mode)
    }
}
