use spotify_api::TokenPair;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AuthError;

/// JSON file mirroring the token pairs held by the store, keyed by client id
pub struct TokenFile {
    token_path: PathBuf,
}

impl TokenFile {
    pub fn new(token_path: PathBuf) -> Result<Self, AuthError> {
        if let Some(dir) = token_path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    AuthError::TokenStorage(format!("Failed to create token directory: {}", e))
                })?;
            }
        }

        Ok(Self { token_path })
    }

    pub fn path(&self) -> &Path {
        &self.token_path
    }

    pub fn save(&self, tokens: &HashMap<String, TokenPair>) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(tokens)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // Owner read/write only, from the moment the file exists
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&self.token_path)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to open token file: {}", e)))?;

        // A file left by an older run may still carry wider permissions
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| {
                    AuthError::TokenStorage(format!("Failed to set file permissions: {}", e))
                })?;
        }

        file.write_all(json.as_bytes())
            .map_err(|e| AuthError::TokenStorage(format!("Failed to save tokens: {}", e)))?;

        Ok(())
    }

    pub fn load(&self) -> Result<HashMap<String, TokenPair>, AuthError> {
        if !self.token_path.exists() {
            return Ok(HashMap::new());
        }

        let json = fs::read_to_string(&self.token_path)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to read tokens: {}", e)))?;

        Ok(serde_json::from_str(&json)?)
    }
}
