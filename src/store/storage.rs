use super::types::{Database, DATABASE_VERSION};
use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default database path (<data dir>/transfer-rank/db.json)
pub fn get_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("transfer-rank").join("db.json"))
        .unwrap_or_else(|| crate::config::get_config_dir().join("db.json"))
}

/// Load the database from a JSON file.
///
/// A missing file yields an empty database. An unsupported version is an error.
pub fn load_database(path: &Path) -> Result<Database> {
    if !path.exists() {
        debug!(path = %path.display(), "no database yet, starting empty");
        return Ok(Database::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;

    let db: Database = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse database at {}", path.display()))?;

    if db.version != DATABASE_VERSION {
        anyhow::bail!("Unsupported database version: {}", db.version);
    }

    Ok(db)
}

/// Save the database atomically, creating parent directories as needed.
pub fn save_database(path: &Path, db: &Database) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, db).context("Failed to serialize database")?;

    file.commit().context("Failed to save database")?;

    debug!(path = %path.display(), rumours = db.rumours.len(), "saved database");
    Ok(())
}
