use anyhow::Result;
use std::path::PathBuf;

const CODENOTE_DIR: &str = ".codenote";
const DB_FILE: &str = "codenote.db";

/// Environment variable to override the Codenote directory.
const CODENOTE_DIR_ENV: &str = "CODENOTE_DIR";

/// Resolve the Codenote data directory.
/// Priority: CODENOTE_DIR env var > ~/.codenote/
pub fn resolve_codenote_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CODENOTE_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(CODENOTE_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Get the database path: ~/.codenote/codenote.db
pub fn database_path() -> Result<PathBuf> {
    Ok(resolve_codenote_dir()?.join(DB_FILE))
}

/// Ensure the data directory exists and return the database path.
pub fn ensure_database_path() -> Result<PathBuf> {
    let dir = resolve_codenote_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join(DB_FILE))
}
