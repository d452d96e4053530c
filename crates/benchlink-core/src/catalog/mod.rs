//! Command Catalog
//!
//! Loads the JSON mapping `device -> command name -> template string` and
//! hands out parsed [`CommandTemplate`]s. The catalog is read once and
//! cached; [`CommandCatalog::invalidate`] drops the cache so the next
//! lookup reloads from disk, which supports live editing of device command
//! sets without a process restart.

mod error;
mod template;

pub use error::CatalogError;
pub use template::{CommandTemplate, TemplateKind};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

type CatalogMap = BTreeMap<String, BTreeMap<String, CommandTemplate>>;

/// Cached, reloadable command catalog
pub struct CommandCatalog {
    path: PathBuf,
    cache: Mutex<Option<Arc<CatalogMap>>>,
}

impl CommandCatalog {
    /// Create a catalog backed by the given JSON file. The file is not
    /// touched until the first lookup.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: Mutex::new(None),
        }
    }

    /// Drop the cached catalog so the next lookup reloads from disk.
    pub fn invalidate(&self) {
        *self.lock_cache() = None;
    }

    /// Look up the template for a (device, command) pair.
    ///
    /// `Ok(None)` means the catalog loaded but has no such entry; `Err`
    /// means the catalog file itself is missing or malformed.
    pub fn lookup(
        &self,
        device: &str,
        command: &str,
    ) -> Result<Option<CommandTemplate>, CatalogError> {
        let map = self.load()?;
        Ok(map
            .get(device)
            .and_then(|commands| commands.get(command))
            .cloned())
    }

    /// List every known command name per device.
    pub fn list_commands(&self) -> Result<BTreeMap<String, Vec<String>>, CatalogError> {
        let map = self.load()?;
        Ok(map
            .iter()
            .map(|(device, commands)| (device.clone(), commands.keys().cloned().collect()))
            .collect())
    }

    fn load(&self) -> Result<Arc<CatalogMap>, CatalogError> {
        let mut cache = self.lock_cache();
        if let Some(map) = cache.as_ref() {
            return Ok(Arc::clone(map));
        }

        let content = fs::read_to_string(&self.path).map_err(|e| CatalogError::Io {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let raw: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(&content)
            .map_err(|e| CatalogError::Parse {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        let map: CatalogMap = raw
            .into_iter()
            .map(|(device, commands)| {
                let parsed = commands
                    .into_iter()
                    .map(|(name, template)| {
                        let t = CommandTemplate::parse(&device, &name, &template);
                        (name, t)
                    })
                    .collect();
                (device, parsed)
            })
            .collect();

        let map = Arc::new(map);
        *cache = Some(Arc::clone(&map));
        Ok(map)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, Option<Arc<CatalogMap>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
