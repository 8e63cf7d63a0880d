// Collection store - one JSON file per document, queries answered by scanning

use crate::config::{Config, OnCollision};
use crate::document::codec::{self, EXTENSION};
use crate::document::{kind_of, Document, ID_FIELD};
use crate::error::{PantexError, Result};
use crate::id;
use crate::query::Query;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handle to a directory of documents.
///
/// Handles are cheap to clone and share the collection's lock, so clones
/// opened from the same database serialize their writes against each other.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    dir: PathBuf,
    config: Config,
    closed: Arc<AtomicBool>,
    pub(crate) lock: Arc<RwLock<()>>,
}

/// Outcome of [`Collection::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Number of document files inspected.
    pub total: usize,
    /// File stems that could not be decoded.
    pub malformed: Vec<String>,
    /// File stems whose `_id` field does not equal the stem.
    pub mismatched: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.malformed.is_empty() && self.mismatched.is_empty()
    }
}

impl Collection {
    /// Open the collection `name` under `parent`, creating its directory if needed.
    pub fn open(parent: &Path, name: &str, config: Config) -> Result<Self> {
        Self::open_shared(parent, name, config, Arc::new(AtomicBool::new(false)))
    }

    pub(crate) fn open_shared(
        parent: &Path,
        name: &str,
        config: Config,
        closed: Arc<AtomicBool>,
    ) -> Result<Self> {
        if !id::is_valid(name) {
            return Err(PantexError::Other(format!(
                "Invalid collection name: '{name}'"
            )));
        }

        let collection = Collection {
            name: name.to_string(),
            dir: parent.join(name),
            config,
            closed,
            lock: Arc::new(RwLock::new(())),
        };
        collection.trace("init");

        if !collection.dir.exists() {
            log::debug!(
                "Collection directory {} doesn't exist yet, creating it",
                collection.dir.display()
            );
            std::fs::create_dir_all(&collection.dir)?;
        }

        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    // ── Public operations ───────────────────────────────────────────

    /// Save a document, generating an identifier if it has none.
    /// An existing file with the same identifier is replaced.
    pub fn save(&self, doc: Document) -> Result<Document> {
        let _guard = self.lock.write();
        self.ensure_open()?;
        self.trace("save");
        self.save_locked(doc)
    }

    /// Return the first document matching the query.
    pub fn find_one(&self, query: &Query) -> Result<Document> {
        let _guard = self.lock.read();
        self.ensure_open()?;
        self.trace("findOne");
        self.find_one_locked(query)
    }

    /// Return every document matching the query, in scan order.
    /// No match is an empty result, not an error.
    pub fn find(&self, query: &Query) -> Result<Vec<Document>> {
        let _guard = self.lock.read();
        self.ensure_open()?;
        self.trace("find");
        Ok(self
            .find_locked(query)?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect())
    }

    /// Shallow-merge `patch` into the document `id` and persist it.
    pub fn update(&self, id: &str, patch: &Document) -> Result<Document> {
        let _guard = self.lock.write();
        self.ensure_open()?;
        self.trace(&format!("update: {id}"));

        let mut doc = self.read_by_id(id)?;
        doc.merge(patch);
        // The file name is authoritative; a stale `_id` must not redirect the write.
        doc.set_id(id);
        self.save_locked(doc)
    }

    /// Delete matching documents and return how many files were removed.
    ///
    /// With an identifier in the query exactly that file is deleted, and a
    /// missing file is an error. Otherwise every match is deleted before
    /// returning; individual failures are logged and left out of the count.
    pub fn delete(&self, query: &Query) -> Result<usize> {
        let _guard = self.lock.write();
        self.ensure_open()?;
        self.trace("delete");

        if let Some(id) = query.identifier() {
            self.delete_file(&id)?;
            return Ok(1);
        }

        let matches = self.find_locked(query)?;
        let mut deleted = 0;
        for (stem, _) in &matches {
            match self.delete_file(stem) {
                Ok(()) => deleted += 1,
                Err(e) => log::warn!("Failed to delete {}/{}: {}", self.name, stem, e),
            }
        }

        if deleted < matches.len() {
            log::warn!(
                "Deleted {deleted} of {} matching documents in '{}'",
                matches.len(),
                self.name
            );
        }
        Ok(deleted)
    }

    /// Number of documents matching the query.
    pub fn count(&self, query: &Query) -> Result<usize> {
        let _guard = self.lock.read();
        self.ensure_open()?;
        Ok(self.find_locked(query)?.len())
    }

    /// Identifiers of all document files, in scan order.
    pub fn ids(&self) -> Result<Vec<String>> {
        let _guard = self.lock.read();
        self.ensure_open()?;
        Ok(self.list_files()?.into_iter().map(|(stem, _)| stem).collect())
    }

    /// Decode every document file and report the ones that are unreadable
    /// or whose `_id` disagrees with their file name.
    pub fn check(&self) -> Result<CheckReport> {
        let _guard = self.lock.read();
        self.ensure_open()?;
        self.trace("check");

        let mut report = CheckReport::default();
        for (stem, path) in self.list_files()? {
            report.total += 1;
            let bytes = std::fs::read(&path)?;
            match codec::decode(&bytes) {
                Ok(doc) => {
                    if doc.id() != Some(stem.as_str()) {
                        report.mismatched.push(stem);
                    }
                }
                Err(e) => {
                    log::warn!("Malformed document {}: {}", path.display(), e);
                    report.malformed.push(stem);
                }
            }
        }
        Ok(report)
    }

    // ── Typed helpers ───────────────────────────────────────────────

    /// Save any value that serializes to a map.
    pub fn save_as<T: Serialize>(&self, value: &T) -> Result<Document> {
        self.save(Document::from_serializable(value)?)
    }

    pub fn find_as<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        self.find(query)?
            .iter()
            .map(|doc| doc.deserialize_into::<T>())
            .collect()
    }

    pub fn find_one_as<T: DeserializeOwned>(&self, query: &Query) -> Result<T> {
        self.find_one(query)?.deserialize_into()
    }

    // ── Internals (caller holds the lock) ───────────────────────────

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(PantexError::Closed {
                collection: self.name.clone(),
            });
        }
        Ok(())
    }

    fn trace(&self, op: &str) {
        if self.config.verbose {
            log::info!("Collection.{op}({})", self.name);
        } else {
            log::trace!("Collection.{op}({})", self.name);
        }
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{EXTENSION}"))
    }

    fn not_found(&self, target: impl Into<String>) -> PantexError {
        PantexError::NotFound {
            collection: self.name.clone(),
            target: target.into(),
        }
    }

    fn save_locked(&self, doc: Document) -> Result<Document> {
        let existing = match doc.get(ID_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) if id::is_valid(s) => Some(s.clone()),
            Some(Value::String(s)) => return Err(PantexError::InvalidIdentifier(s.clone())),
            Some(other) => {
                return Err(PantexError::InvalidIdentifier(format!(
                    "expected a string, got {}",
                    kind_of(other)
                )))
            }
        };

        match existing {
            Some(id) => self.write_document(&id, doc),
            None => {
                let id = id::generate(self.config.id_strategy);
                self.save_generated(doc, id)
            }
        }
    }

    /// Persist `doc` under a freshly generated identifier, honoring the
    /// collision policy.
    pub(crate) fn save_generated(&self, mut doc: Document, id: String) -> Result<Document> {
        if self.config.on_collision == OnCollision::Error && self.document_path(&id).exists() {
            return Err(PantexError::DuplicateIdentifier {
                collection: self.name.clone(),
                id,
            });
        }
        doc.set_id(id.clone());
        self.write_document(&id, doc)
    }

    fn write_document(&self, id: &str, doc: Document) -> Result<Document> {
        let bytes = codec::encode(&doc)?;
        self.write_file(&self.document_path(id), &bytes)?;
        Ok(doc)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if !self.config.atomic_writes {
            std::fs::write(path, bytes)?;
            return Ok(());
        }

        // The temp file is a dotfile, so a concurrent scan never picks it up.
        let mut tmp = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempfile_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| PantexError::Io(e.error))?;
        Ok(())
    }

    /// Read a document by identifier. A missing, unreadable or malformed
    /// file is reported as not found.
    fn read_by_id(&self, id: &str) -> Result<Document> {
        if !id::is_valid(id) {
            return Err(self.not_found(id));
        }

        let path = self.document_path(id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(self.not_found(id)),
            Err(e) => return Err(e.into()),
        };

        codec::decode(&bytes).map_err(|e| {
            log::warn!("Malformed document {}: {}", path.display(), e);
            self.not_found(id)
        })
    }

    fn find_one_locked(&self, query: &Query) -> Result<Document> {
        if let Some(id) = query.identifier() {
            return self.read_by_id(&id);
        }

        self.scan(query, true)?
            .into_iter()
            .next()
            .map(|(_, doc)| doc)
            .ok_or_else(|| self.not_found(query.to_string()))
    }

    fn find_locked(&self, query: &Query) -> Result<Vec<(String, Document)>> {
        if let Some(id) = query.identifier() {
            return match self.read_by_id(&id) {
                Ok(doc) => Ok(vec![(id, doc)]),
                Err(e) if e.is_not_found() => Ok(Vec::new()),
                Err(e) => Err(e),
            };
        }
        self.scan(query, false)
    }

    /// Linear scan over every document file in reverse listing order.
    fn scan(&self, query: &Query, first_only: bool) -> Result<Vec<(String, Document)>> {
        let mut results = Vec::new();

        for (stem, path) in self.list_files()? {
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("Failed to read document {}: {}", path.display(), e);
                    continue;
                }
            };
            let doc = match codec::decode(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    log::warn!("Skipping malformed document {}: {}", path.display(), e);
                    continue;
                }
            };

            if query.matches(&doc) {
                results.push((stem, doc));
                if first_only {
                    break;
                }
            }
        }

        Ok(results)
    }

    /// Document files as (stem, path), sorted descending by file name.
    /// Dotfiles and other extensions are ignored.
    fn list_files(&self) -> Result<Vec<(String, PathBuf)>> {
        // glob yields nothing for a missing directory, so surface that here
        let meta = std::fs::metadata(&self.dir)?;
        if !meta.is_dir() {
            return Err(PantexError::Io(std::io::Error::new(
                ErrorKind::Other,
                format!("{} is not a directory", self.dir.display()),
            )));
        }

        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            EXTENSION
        );
        let options = glob::MatchOptions {
            require_literal_leading_dot: true,
            ..glob::MatchOptions::new()
        };

        let mut files = Vec::new();
        let paths = glob::glob_with(&pattern, options)
            .map_err(|e| PantexError::Other(format!("Glob error: {e}")))?;
        for entry in paths {
            let path = entry.map_err(|e| PantexError::Io(e.into_error()))?;
            if !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((stem.to_string(), path));
            }
        }

        files.sort_by(|a, b| b.1.file_name().cmp(&a.1.file_name()));
        Ok(files)
    }

    /// Remove the file for `id`. A missing file is not found.
    fn delete_file(&self, id: &str) -> Result<()> {
        if !id::is_valid(id) {
            return Err(self.not_found(id));
        }
        match std::fs::remove_file(self.document_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(self.not_found(id)),
            Err(e) => Err(e.into()),
        }
    }
}
