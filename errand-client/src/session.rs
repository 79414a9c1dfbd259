use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

const TOKEN_FILE_NAME: &str = "auth_token";
const MIN_TOKEN_LEN: usize = 8;
const MAX_TOKEN_LEN: usize = 4096;

/// Checks that a token is plausible: bounded length, no whitespace or
/// control characters.
fn validate_token(token: &str) -> std::result::Result<(), String> {
    if token.len() < MIN_TOKEN_LEN || token.len() > MAX_TOKEN_LEN {
        return Err(format!(
            "length {} outside {}..={}",
            token.len(),
            MIN_TOKEN_LEN,
            MAX_TOKEN_LEN
        ));
    }
    if token.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err("contains whitespace or control characters".to_string());
    }
    Ok(())
}

/// Persists the bearer token in `~/.errand/auth_token`.
///
/// The file is written atomically and restricted to 0600 on unix.
#[derive(Debug, Clone)]
pub struct SessionStore {
    file_path: PathBuf,
}

impl SessionStore {
    /// Creates a store at the default path `~/.errand/auth_token`.
    ///
    /// Fails if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(Self::at(home_dir.join(".errand").join(TOKEN_FILE_NAME)))
    }

    /// Creates a store backed by an explicit file
    pub fn at(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Loads the token.
    ///
    /// - `Ok(Some(token))` if the file holds a plausible token
    /// - `Ok(None)` if the file is missing, empty or corrupted
    /// - `Err(_)` if the file cannot be read
    pub fn load(&self) -> Result<Option<String>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path).context("Failed to read token file")?;
        let token = content.trim();

        if token.is_empty() {
            log::warn!("Token file is empty, treating as logged out");
            return Ok(None);
        }

        if let Err(reason) = validate_token(token) {
            log::warn!("Token file is corrupted ({}), treating as logged out", reason);
            return Ok(None);
        }

        log::debug!("Loaded auth token from {}", self.file_path.display());
        Ok(Some(token.to_string()))
    }

    /// Saves the token, replacing any previous one.
    ///
    /// Rejects tokens that `load` would treat as corrupted.
    pub fn save(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if let Err(reason) = validate_token(token) {
            bail!("Refusing to save auth token: {}", reason);
        }

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).context("Failed to create token directory")?;
        }

        self.cleanup_old_files()?;

        let temp_path = self.file_path.with_extension("tmp");

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&temp_path)
            .context("Failed to create temporary token file")?;
        file.write_all(token.as_bytes())
            .context("Failed to write auth token")?;
        file.sync_all().context("Failed to sync token file to disk")?;
        drop(file);

        fs::rename(&temp_path, &self.file_path).context("Failed to rename temporary token file")?;

        log::info!("Saved auth token to {}", self.file_path.display());
        Ok(())
    }

    /// Deletes the token file. Succeeds if it does not exist.
    pub fn delete(&self) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).context("Failed to delete token file")?;
            log::info!("Deleted auth token at {}", self.file_path.display());
        } else {
            log::debug!("Token file does not exist, nothing to delete");
        }
        Ok(())
    }

    /// Removes leftover `auth_token.*` files (interrupted writes, backups).
    fn cleanup_old_files(&self) -> Result<()> {
        let Some(parent) = self.file_path.parent() else {
            return Ok(());
        };
        if !parent.exists() {
            return Ok(());
        }

        let stem = self
            .file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(TOKEN_FILE_NAME)
            .to_string();

        for entry in fs::read_dir(parent).context("Failed to read token directory")? {
            let path = entry.context("Failed to read directory entry")?.path();
            if path == self.file_path {
                continue;
            }

            let stale = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|name| name.starts_with(&format!("{}.", stem)))
                .unwrap_or(false);

            if stale {
                log::debug!("Removing stale token file: {}", path.display());
                if let Err(e) = fs::remove_file(&path) {
                    log::warn!("Failed to remove stale token file {}: {}", path.display(), e);
                }
            }
        }

        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.file_path
    }
}
