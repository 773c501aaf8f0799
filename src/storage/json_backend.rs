use chrono::{DateTime, NaiveDateTime, Utc};
use std::{
    cmp::Reverse,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    errors::LedgerError,
    utils::paths::{backups_dir_for, ensure_dir, write_atomic},
};

use super::{ensure_schema_support, LedgerStore, PersistedState, Result};

const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";
const UNREADABLE_MARKER: &str = "unreadable";
pub const DEFAULT_RETENTION: usize = 5;

/// Filesystem-backed JSON persistence for a single ledger document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonFileStore {
    pub fn new(path: PathBuf, retention: Option<usize>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let backups_dir = backups_dir_for(&path);
        Ok(Self {
            path,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Lists backups newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            let name = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let size_bytes = fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);
            entries.push(BackupInfo {
                created_at: parse_backup_timestamp(&name),
                name,
                size_bytes,
                path,
            });
        }
        entries.sort_by_key(|info| {
            Reverse((info.created_at, collision_index(&info.name), info.name.clone()))
        });
        Ok(entries)
    }

    /// Reads a backup without touching the live document.
    ///
    /// Apply it with [`Ledger::restore`](crate::ledger::Ledger::restore) so the write goes
    /// through the ledger that owns this store.
    pub fn read_backup(&self, backup_name: &str) -> Result<PersistedState> {
        if backup_name.contains(['/', '\\']) || backup_name.starts_with('.') {
            return Err(LedgerError::Persistence(format!(
                "invalid backup name `{}`",
                backup_name
            )));
        }
        let backup_path = self.backups_dir.join(backup_name);
        if !backup_path.is_file() {
            return Err(LedgerError::Persistence(format!(
                "backup `{}` not found",
                backup_name
            )));
        }
        load_state_from_path(&backup_path)
    }

    fn backup_existing_file(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.copy_to_backups(None)?;
        self.prune_backups()
    }

    /// Keeps a document that failed to load. These copies are never pruned.
    fn preserve_unreadable(&self) -> Result<PathBuf> {
        self.copy_to_backups(Some(UNREADABLE_MARKER))
    }

    fn copy_to_backups(&self, marker: Option<&str>) -> Result<PathBuf> {
        ensure_dir(&self.backups_dir)?;
        let stem = self
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("ledger");
        let prefix = match marker {
            Some(marker) => format!("{}_{}", stem, marker),
            None => stem.to_string(),
        };
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut backup_path = self
            .backups_dir
            .join(format!("{}_{}.{}", prefix, timestamp, BACKUP_EXTENSION));
        let mut attempt = 1;
        while backup_path.exists() {
            backup_path = self.backups_dir.join(format!(
                "{}_{}-{}.{}",
                prefix, timestamp, attempt, BACKUP_EXTENSION
            ));
            attempt += 1;
        }
        fs::copy(&self.path, &backup_path)?;
        Ok(backup_path)
    }

    fn prune_backups(&self) -> Result<()> {
        let backups = self.list_backups()?;
        for entry in backups
            .into_iter()
            .filter(|entry| !entry.is_unreadable())
            .skip(self.retention)
        {
            if let Err(err) = fs::remove_file(&entry.path) {
                tracing::debug!(path = %entry.path.display(), %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)?;
        match parse_state(&data) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                match self.preserve_unreadable() {
                    Ok(copy) => tracing::warn!(
                        %err,
                        copy = %copy.display(),
                        "ledger document could not be loaded; kept a copy"
                    ),
                    Err(copy_err) => tracing::warn!(
                        %err,
                        %copy_err,
                        "ledger document could not be loaded or copied"
                    ),
                }
                Err(err)
            }
        }
    }

    fn save(&mut self, state: &PersistedState) -> Result<()> {
        self.backup_existing_file()?;
        save_state_to_path(state, &self.path)
    }

    fn clear(&mut self) -> Result<()> {
        self.backup_existing_file()?;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}

/// Writes a ledger document to `path` through a temporary sibling file.
pub fn save_state_to_path(state: &PersistedState, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    write_atomic(path, &json)?;
    Ok(())
}

pub fn load_state_from_path(path: &Path) -> Result<PersistedState> {
    parse_state(&fs::read_to_string(path)?)
}

fn parse_state(data: &str) -> Result<PersistedState> {
    let state: PersistedState = serde_json::from_str(data)?;
    ensure_schema_support(state.schema_version)?;
    Ok(state)
}

#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    pub path: PathBuf,
}

impl BackupInfo {
    /// Copy of a document that failed to load; exempt from retention.
    pub fn is_unreadable(&self) -> bool {
        self.name.contains(&format!("_{}_", UNREADABLE_MARKER))
    }
}

/// Reads `<stem>_YYYYMMDD_HHMMSS[_mmm][-n].json`, using the last date/time pair in the name.
fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let trimmed = name.strip_suffix(&format!(".{}", BACKUP_EXTENSION))?;
    let segments: Vec<&str> = trimmed.split('_').collect();
    let date_index = (0..segments.len().saturating_sub(1))
        .rev()
        .find(|&i| is_digits(segments[i], 8) && is_digits(time_part(segments[i + 1]), 6))?;
    let date = segments[date_index];
    let time = time_part(segments[date_index + 1]);
    let millis = segments
        .get(date_index + 2)
        .map(|segment| time_part(segment))
        .filter(|millis| is_digits(millis, 3))
        .unwrap_or("000");
    let raw = format!("{}{}{}", date, time, millis);
    NaiveDateTime::parse_from_str(&raw, "%Y%m%d%H%M%S%3f")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn collision_index(name: &str) -> u32 {
    name.strip_suffix(&format!(".{}", BACKUP_EXTENSION))
        .and_then(|trimmed| trimmed.rsplit('_').next())
        .and_then(|last| last.split_once('-'))
        .and_then(|(_, index)| index.parse().ok())
        .unwrap_or(0)
}

/// Drops the `-n` collision suffix.
fn time_part(segment: &str) -> &str {
    segment.split('-').next().unwrap_or(segment)
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}
