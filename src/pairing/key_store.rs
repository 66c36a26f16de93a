//! API Key Persistence
//!
//! Keys are stored one file per gateway, named after the gateway identifier, with
//! the raw key as the whole file content. This matches the layout operators already
//! have on disk, so existing key directories keep working.

use crate::error::{ExporterError, Result};
use secrecy::{ExposeSecret, SecretString};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Storage for gateway API keys
pub trait KeyStore {
    /// Load the key for `gateway_id`, `Ok(None)` if none has been stored
    fn load(&self, gateway_id: &str) -> Result<Option<SecretString>>;

    /// Persist `api_key` for `gateway_id`, replacing any previous key
    fn store(&self, gateway_id: &str, api_key: &SecretString) -> Result<()>;
}

/// [`KeyStore`] backed by a directory of plain files
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    directory: PathBuf,
}

impl FileKeyStore {
    /// Open `directory`, creating it if necessary
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn key_path(&self, gateway_id: &str) -> Result<PathBuf> {
        if gateway_id.is_empty()
            || gateway_id == "."
            || gateway_id.contains("..")
            || gateway_id.contains(['/', '\\'])
        {
            return Err(ExporterError::InvalidGatewayId(gateway_id.to_string()));
        }
        Ok(self.directory.join(gateway_id))
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self, gateway_id: &str) -> Result<Option<SecretString>> {
        let path = self.key_path(gateway_id)?;

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Hand-edited files usually end with a newline
        let key = contents.trim_end_matches(['\r', '\n']);
        if key.is_empty() {
            warn!("Key file {} is empty, gateway will be paired again", path.display());
            return Ok(None);
        }

        debug!("Loaded API key for gateway {} from {}", gateway_id, path.display());
        Ok(Some(SecretString::from(key.to_string())))
    }

    fn store(&self, gateway_id: &str, api_key: &SecretString) -> Result<()> {
        let path = self.key_path(gateway_id)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path)?;

        // `mode` only applies to new files; tighten an existing one before the key lands
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(api_key.expose_secret().as_bytes())?;
        file.sync_all()?;

        debug!("Stored API key for gateway {} in {}", gateway_id, path.display());
        Ok(())
    }
}
