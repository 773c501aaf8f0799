use dirs::home_dir;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

pub const HOME_ENV_VAR: &str = "NUCLEO_HOME";
const DEFAULT_DIR_NAME: &str = ".nucleo_core";
const LEDGER_FILE: &str = "ledger.json";
const BACKUP_DIR: &str = "backups";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";

/// Returns the application data directory, defaulting to `~/.nucleo_core`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV_VAR) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Default location of the persisted ledger document.
pub fn ledger_file_in(base: &Path) -> PathBuf {
    base.join(LEDGER_FILE)
}

/// Directory holding timestamped copies of previous ledger documents.
pub fn backups_dir_for(ledger_file: &Path) -> PathBuf {
    ledger_file
        .parent()
        .map(|parent| parent.join(BACKUP_DIR))
        .unwrap_or_else(|| PathBuf::from(BACKUP_DIR))
}

pub fn config_file_in(base: &Path) -> PathBuf {
    base.join(CONFIG_DIR).join(CONFIG_FILE)
}

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Sibling path used to stage writes before renaming them into place.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.tmp", existing),
        None => "tmp".to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Writes `data` to a temporary sibling and renames it over `path`.
pub fn write_atomic(path: &Path, data: &str) -> io::Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = tmp_path(path);
    let mut file = fs::File::create(&tmp)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    fs::rename(&tmp, path)?;
    Ok(())
}
