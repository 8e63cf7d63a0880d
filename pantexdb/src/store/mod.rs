use crate::collection::Collection;
use crate::config::Config;
use crate::error::{PantexError, Result};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// The main entry point for pantexdb.
/// Owns `<root>/db/<name>/` and one collection per declared name.
pub struct Database {
    name: String,
    path: PathBuf,
    config: Config,
    collections: BTreeMap<String, Collection>,
}

impl Database {
    /// Open (or create) the database `name` under `root` with the given
    /// collections. Existing directories and documents are left in place.
    pub fn open<S: AsRef<str>>(
        root: impl AsRef<Path>,
        name: &str,
        collections: &[S],
        config: Config,
    ) -> Result<Self> {
        if !crate::id::is_valid(name) {
            return Err(PantexError::Other(format!("Invalid database name: '{name}'")));
        }

        let path = root.as_ref().join("db").join(name);
        if config.verbose {
            log::info!("Initializing database {} at {}", name, path.display());
        }
        if !path.exists() {
            log::debug!("Database directory doesn't exist yet, creating it");
            std::fs::create_dir_all(&path)?;
        }

        // One flag for the whole database so teardown closes every handle at once
        let closed = Arc::new(AtomicBool::new(false));
        let mut map = BTreeMap::new();
        for collection_name in collections {
            let collection_name = collection_name.as_ref();
            let collection =
                Collection::open_shared(&path, collection_name, config.clone(), closed.clone())?;
            map.insert(collection_name.to_string(), collection);
        }

        Ok(Database {
            name: name.to_string(),
            path,
            config,
            collections: map,
        })
    }

    /// Get a handle to a declared collection.
    pub fn collection(&self, name: &str) -> Result<Collection> {
        self.collections
            .get(name)
            .cloned()
            .ok_or_else(|| PantexError::UnknownCollection(name.to_string()))
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The database directory, `<root>/db/<name>`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Remove the whole database directory. Every collection handle obtained
    /// from this database fails with `Closed` afterwards.
    pub fn teardown(self) -> Result<()> {
        if self.config.verbose {
            log::info!("Deleting database {}", self.name);
        }

        // Wait out in-flight operations before pulling the directory away
        let guards: Vec<_> = self
            .collections
            .values()
            .map(|collection| collection.lock.write())
            .collect();
        for collection in self.collections.values() {
            collection.mark_closed();
        }

        let result = match std::fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                log::warn!("Failed to delete database {}: {}", self.path.display(), e);
                Err(e.into())
            }
        };
        drop(guards);
        result
    }
}
