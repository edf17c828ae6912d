//! Main Store struct tying validation, the document and a backend together.

use crate::backend::{FileBackend, KeyValueBackend, MemoryBackend, StorageKeys};
use crate::document::{default_section, Document, REQUIRED_SECTIONS, SEED_CATEGORIES};
use crate::error::{Result, StoreError};
use crate::records::{RecordFilter, Statistics};
use crate::types::{
    Backup, Record, RecordId, RecordInput, RecordPatch, Settings, SettingsPatch, StorageInfo,
    Timestamp,
};
use crate::validation::{
    current_date, format_date, normalize_category, normalize_date, normalize_memo,
    normalize_value, ValidationReport, Validator,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory for the file backend.
    pub path: PathBuf,

    /// Whether to create the directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Prefix for the three storage keys.
    pub key_prefix: String,

    /// Backups kept before the oldest is evicted.
    pub max_backups: usize,

    /// Rules and messages used for every check.
    pub validator: Validator,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./recordbook"),
            create_if_missing: true,
            key_prefix: "recordbook".to_string(),
            max_backups: 10,
            validator: Validator::default(),
        }
    }
}

/// What [`Store::initialize`] found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitOutcome {
    /// No document existed; a fresh one was written.
    Created,
    /// The stored document passed the integrity check.
    Intact,
    /// The stored document was structurally repaired and rewritten.
    Repaired,
    /// The stored document fails the integrity check and structural repair
    /// could not fix it. Reads fall back to defaults; nothing was rewritten.
    Unrepaired(Vec<String>),
}

/// The record book store.
///
/// Holds one [`Document`] under a single backend key. Every mutation loads
/// the whole document, changes it, checks its integrity and writes it back
/// while holding `write_lock`. Reads never fail: they log and fall back to
/// the default document or an empty result.
pub struct Store {
    config: StoreConfig,

    backend: Box<dyn KeyValueBackend>,

    keys: StorageKeys,

    /// Lock for read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl Store {
    /// Open a directory-backed store, creating the directory if allowed.
    pub fn open_or_create(config: StoreConfig) -> Result<Self> {
        let backend = FileBackend::open(&config.path, config.create_if_missing)?;
        Ok(Self::with_backend(backend, config))
    }

    /// Build a store over any backend.
    pub fn with_backend<B: KeyValueBackend + 'static>(backend: B, config: StoreConfig) -> Self {
        let keys = StorageKeys::with_prefix(&config.key_prefix);
        Self {
            config,
            backend: Box::new(backend),
            keys,
            write_lock: Mutex::new(()),
        }
    }

    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::with_backend(MemoryBackend::new(), StoreConfig::default())
    }

    // --- Lifecycle ---

    /// Make sure a usable document exists.
    ///
    /// Writes a fresh document if none is stored. Otherwise runs the
    /// integrity check and repairs the document when it fails.
    pub fn initialize(&self) -> Result<InitOutcome> {
        let _lock = self.write_lock.lock();

        let Some(text) = self.backend.get(&self.keys.document)? else {
            let mut doc = Document::fresh();
            self.persist(&mut doc)?;
            info!(key = %self.keys.document, "Created new document");
            return Ok(InitOutcome::Created);
        };

        let issues = self.health_issues(&text);
        if issues.is_empty() {
            debug!("Stored document is intact");
            return Ok(InitOutcome::Intact);
        }

        warn!(?issues, "Stored document failed integrity check");
        match self.repair_locked() {
            Ok(true) => Ok(InitOutcome::Repaired),
            Ok(false) => Ok(InitOutcome::Unrepaired(issues)),
            Err(e) if e.is_storage_failure() => {
                error!(error = %e, "Repair failed");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Document could not be repaired");
                Ok(InitOutcome::Unrepaired(issues))
            }
        }
    }

    /// Problems with a stored document, from the integrity check or from
    /// decoding it.
    fn health_issues(&self, text: &str) -> Vec<String> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => return vec![format!("Document is not valid JSON: {e}")],
        };

        let mut issues = self.config.validator.validate_data_integrity(&value).issues;
        if issues.is_empty() {
            issues = unstamped_record_issues(&value);
        }
        if issues.is_empty() {
            if let Err(e) = serde_json::from_value::<Document>(value) {
                issues.push(format!("Document does not decode: {e}"));
            }
        }
        issues
    }

    // --- Document Access ---

    /// The stored document, or the default document if it is absent or
    /// unreadable.
    pub fn get_data(&self) -> Document {
        match self.load_document() {
            Ok(doc) => doc,
            Err(StoreError::NotInitialized) => {
                warn!("No stored document, using defaults");
                Document::default()
            }
            Err(e) => {
                error!(error = %e, "Failed to read document, using defaults");
                Document::default()
            }
        }
    }

    /// The stored document, with the reason if it cannot be read.
    pub fn load_document(&self) -> Result<Document> {
        let text = self
            .backend
            .get(&self.keys.document)?
            .ok_or(StoreError::NotInitialized)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Replace the stored document after checking its integrity.
    pub fn save_data(&self, mut document: Document) -> Result<()> {
        let _lock = self.write_lock.lock();
        self.persist(&mut document)
    }

    /// Document a mutation starts from. An absent document starts fresh; an
    /// unreadable one is an error so it is never overwritten by accident.
    fn current_document(&self) -> Result<Document> {
        match self.backend.get(&self.keys.document)? {
            Some(text) => serde_json::from_str(&text).map_err(|e| {
                error!(error = %e, "Stored document does not decode");
                StoreError::from(e)
            }),
            None => Ok(Document::fresh()),
        }
    }

    /// Integrity check, metadata stamp and write. Caller holds `write_lock`.
    fn persist(&self, doc: &mut Document) -> Result<()> {
        let value = serde_json::to_value(&*doc)?;
        let report = self.config.validator.validate_data_integrity(&value);
        if !report.is_valid() {
            warn!(issues = ?report.issues, "Rejected document failing integrity check");
            return Err(StoreError::Integrity(report.issues));
        }

        doc.touch();
        let text = serde_json::to_string_pretty(doc)?;
        self.backend
            .set(&self.keys.document, &text)
            .inspect_err(|e| error!(error = %e, "Failed to write document"))
    }

    fn check(&self, report: ValidationReport, what: &str) -> Result<()> {
        if !report.is_valid() {
            warn!(errors = ?report.errors, "Rejected {}", what);
        }
        report.into_result()
    }

    // --- Record Operations ---

    /// Validate, normalize and append a record. A novel category is added
    /// to the category list.
    pub fn add_record(&self, input: RecordInput) -> Result<Record> {
        let input = trim_text_fields(input);
        self.check(
            self.config.validator.validate_record(&input.to_value()),
            "record input",
        )?;

        let now = Timestamp::now();
        let record = Record {
            id: RecordId::generate(),
            category: normalize_category(&input.category),
            value: normalize_value(&input.value),
            memo: normalize_memo(&input.memo),
            date: normalize_date(&input.date),
            created_at: now,
            updated_at: now,
        };

        let _lock = self.write_lock.lock();
        let mut doc = self.current_document()?;
        doc.data.records.push(record.clone());
        add_category_if_missing(&mut doc, &record.category);
        self.persist(&mut doc)?;

        debug!(id = %record.id, category = %record.category, value = record.value, "Added record");
        Ok(record)
    }

    /// Merge a patch onto an existing record and re-validate the whole
    /// record. `id` and `createdAt` never change.
    pub fn update_record(&self, id: &RecordId, patch: RecordPatch) -> Result<Record> {
        let _lock = self.write_lock.lock();
        let mut doc = self.current_document()?;

        let Some(index) = doc.data.records.iter().position(|r| &r.id == id) else {
            warn!(%id, "Record to update not found");
            return Err(StoreError::RecordNotFound(id.clone()));
        };

        let existing = &doc.data.records[index];
        let merged = trim_text_fields(patch.apply_to(existing.to_input()));
        self.check(
            self.config.validator.validate_record(&merged.to_value()),
            "record update",
        )?;

        let updated = Record {
            id: existing.id.clone(),
            category: normalize_category(&merged.category),
            value: normalize_value(&merged.value),
            memo: normalize_memo(&merged.memo),
            date: normalize_date(&merged.date),
            created_at: existing.created_at,
            updated_at: Timestamp::now(),
        };

        doc.data.records[index] = updated.clone();
        add_category_if_missing(&mut doc, &updated.category);
        self.persist(&mut doc)?;

        debug!(%id, "Updated record");
        Ok(updated)
    }

    /// Remove the record with `id`.
    pub fn delete_record(&self, id: &RecordId) -> Result<()> {
        let _lock = self.write_lock.lock();
        let mut doc = self.current_document()?;

        let Some(index) = doc.data.records.iter().position(|r| &r.id == id) else {
            warn!(%id, "Record to delete not found");
            return Err(StoreError::RecordNotFound(id.clone()));
        };

        doc.data.records.remove(index);
        self.persist(&mut doc)?;

        debug!(%id, "Deleted record");
        Ok(())
    }

    /// Get a record by ID.
    pub fn get_record(&self, id: &RecordId) -> Option<Record> {
        self.get_data()
            .data
            .records
            .into_iter()
            .find(|record| &record.id == id)
    }

    /// Filtered, optionally sorted copy of the records.
    pub fn get_records(&self, filter: &RecordFilter) -> Vec<Record> {
        filter.apply(&self.get_data().data.records)
    }

    // --- Category Operations ---

    /// Category names in insertion order.
    pub fn get_categories(&self) -> Vec<String> {
        self.get_data().data.categories
    }

    /// Add a category. The name is trimmed; exact duplicates are rejected.
    pub fn add_category(&self, name: &str) -> Result<()> {
        let candidate = Value::String(name.trim().to_string());
        if !self.config.validator.validate_category(&candidate) {
            warn!(name, "Rejected category name");
            return Err(StoreError::invalid_field(
                "category",
                &self.config.validator.messages().invalid_format,
            ));
        }
        let name = normalize_category(&candidate);

        let _lock = self.write_lock.lock();
        let mut doc = self.current_document()?;
        if doc.data.categories.contains(&name) {
            warn!(%name, "Category already exists");
            return Err(StoreError::CategoryExists(name));
        }

        doc.data.categories.push(name.clone());
        self.persist(&mut doc)?;

        debug!(%name, "Added category");
        Ok(())
    }

    /// Remove a category that no record references.
    pub fn delete_category(&self, name: &str) -> Result<()> {
        let _lock = self.write_lock.lock();
        let mut doc = self.current_document()?;

        let references = doc.references_to(name);
        if references > 0 {
            warn!(name, references, "Category is still referenced");
            return Err(StoreError::CategoryInUse {
                category: name.to_string(),
                records: references,
            });
        }

        let Some(index) = doc.data.categories.iter().position(|c| c == name) else {
            warn!(name, "Category to delete not found");
            return Err(StoreError::CategoryNotFound(name.to_string()));
        };

        doc.data.categories.remove(index);
        self.persist(&mut doc)?;

        debug!(name, "Deleted category");
        Ok(())
    }

    // --- Settings ---

    /// Defaults overlaid with whatever the document stores.
    pub fn get_settings(&self) -> Settings {
        Settings::default().merged(&self.get_data().settings)
    }

    /// Merge a partial settings object into the stored settings.
    pub fn update_settings(&self, partial: &Value) -> Result<Settings> {
        self.check(self.config.validator.validate_settings(partial), "settings")?;
        let patch: SettingsPatch = serde_json::from_value(partial.clone())?;

        let _lock = self.write_lock.lock();
        let mut doc = self.current_document()?;
        doc.settings.overlay(&patch);
        self.persist(&mut doc)?;

        debug!(?patch, "Updated settings");
        Ok(Settings::default().merged(&doc.settings))
    }

    // --- Bulk Operations ---

    /// Remove the document, the settings key and the backup list.
    pub fn delete_all_data(&self) -> Result<()> {
        let _lock = self.write_lock.lock();
        for key in self.keys.all() {
            self.backend
                .remove(key)
                .inspect_err(|e| error!(key, error = %e, "Failed to remove key"))?;
        }
        info!("Deleted all data");
        Ok(())
    }

    /// Pretty JSON of the stored document, or `None` if it cannot be read.
    pub fn export_data(&self) -> Option<String> {
        let doc = match self.load_document() {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Nothing to export");
                return None;
            }
        };
        match serde_json::to_string_pretty(&doc) {
            Ok(text) => Some(text),
            Err(e) => {
                error!(error = %e, "Failed to serialize export");
                None
            }
        }
    }

    /// Replace the stored document with an exported one.
    pub fn import_data(&self, text: &str) -> Result<()> {
        let value: Value = serde_json::from_str(text)
            .inspect_err(|e| warn!(error = %e, "Import is not valid JSON"))?;

        let report = self.config.validator.validate_data_integrity(&value);
        if !report.is_valid() {
            warn!(issues = ?report.issues, "Rejected import failing integrity check");
            return Err(StoreError::Integrity(report.issues));
        }
        let mut doc: Document = serde_json::from_value(value)?;

        let _lock = self.write_lock.lock();
        self.persist(&mut doc)?;

        info!(records = doc.data.records.len(), "Imported document");
        Ok(())
    }

    // --- Backups ---

    /// Snapshot the current document into the backup list, evicting the
    /// oldest entries beyond `max_backups`.
    pub fn create_backup(&self) -> Result<Backup> {
        let _lock = self.write_lock.lock();
        let doc = self.current_document()?;

        let backup = Backup {
            version: doc.metadata.version.clone(),
            timestamp: Timestamp::now(),
            data: doc,
        };

        let mut backups = self.get_backups();
        backups.push(backup.clone());
        if backups.len() > self.config.max_backups {
            let excess = backups.len() - self.config.max_backups;
            backups = backups.split_off(excess);
        }

        let text = serde_json::to_string(&backups)?;
        self.backend
            .set(&self.keys.backups, &text)
            .inspect_err(|e| error!(error = %e, "Failed to write backups"))?;

        info!(timestamp = %backup.timestamp, kept = backups.len(), "Created backup");
        Ok(backup)
    }

    /// Stored backups, oldest first. Empty if absent or unreadable.
    pub fn get_backups(&self) -> Vec<Backup> {
        let text = match self.backend.get(&self.keys.backups) {
            Ok(Some(text)) => text,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!(error = %e, "Failed to read backups");
                return Vec::new();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(error = %e, "Backup list does not decode");
            Vec::new()
        })
    }

    /// Replace the document with the backup taken at `timestamp`.
    ///
    /// `timestamp` must be the backup's stored string exactly, as returned
    /// by [`Store::get_backups`].
    pub fn restore_backup(&self, timestamp: &str) -> Result<()> {
        let backup = self
            .get_backups()
            .into_iter()
            .find(|b| b.timestamp.to_string() == timestamp);

        let Some(backup) = backup else {
            warn!(timestamp, "Backup not found");
            return Err(StoreError::BackupNotFound(timestamp.to_string()));
        };

        let mut doc = backup.data;
        let _lock = self.write_lock.lock();
        self.persist(&mut doc)?;

        info!(timestamp, "Restored backup");
        Ok(())
    }

    // --- Repair ---

    /// Fill in missing or malformed top-level sections and record/category
    /// lists with defaults, and give records without an id, date or
    /// timestamps permanent ones. Writes only when something changed and returns
    /// whether it did.
    pub fn repair_data(&self) -> Result<bool> {
        let _lock = self.write_lock.lock();
        self.repair_locked()
    }

    fn repair_locked(&self) -> Result<bool> {
        let mut value = match self.backend.get(&self.keys.document)? {
            Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(error = %e, "Stored document is not valid JSON, replacing it");
                Value::Null
            }),
            None => Value::Null,
        };

        if !repair_structure(&mut value)? {
            return Ok(false);
        }

        let report = self.config.validator.validate_data_integrity(&value);
        if !report.is_valid() {
            warn!(issues = ?report.issues, "Document still fails integrity check after repair");
            return Err(StoreError::Integrity(report.issues));
        }

        let mut doc: Document = serde_json::from_value(value)?;
        self.persist(&mut doc)?;

        info!("Repaired document");
        Ok(true)
    }

    // --- Introspection ---

    /// Size and count figures for the current document.
    pub fn get_storage_info(&self) -> StorageInfo {
        let doc = self.get_data();
        let data_size_bytes = serde_json::to_string(&doc).map_or(0, |s| s.len());

        StorageInfo {
            data_size_bytes,
            data_size_kb: (data_size_bytes as f64 / 1024.0 * 100.0).round() / 100.0,
            record_count: doc.data.records.len(),
            category_count: doc.data.categories.len(),
            last_update: doc.metadata.last_update,
        }
    }

    /// Aggregate figures over all records.
    pub fn get_statistics(&self) -> Statistics {
        let doc = self.get_data();
        Statistics::compute(&doc.data.records, &doc.data.categories)
    }

    /// Configuration the store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Backend keys for the document, settings and backups.
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Backend the store writes through.
    pub fn backend(&self) -> &dyn KeyValueBackend {
        self.backend.as_ref()
    }

    /// Directory of the file backend, as configured.
    pub fn path(&self) -> &Path {
        &self.config.path
    }
}

/// Trim string category and memo values; other shapes are left for the
/// validator to reject or the normalizer to default.
fn trim_text_fields(mut input: RecordInput) -> RecordInput {
    for field in [&mut input.category, &mut input.memo] {
        if let Value::String(s) = field {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
    }
    input
}

fn add_category_if_missing(doc: &mut Document, category: &str) {
    if !doc.data.categories.iter().any(|c| c == category) {
        doc.data.categories.push(category.to_string());
    }
}

/// Structural repair of a raw document. Returns whether anything changed.
fn repair_structure(doc: &mut Value) -> Result<bool> {
    if !doc.is_object() {
        *doc = serde_json::to_value(Document::fresh())?;
        return Ok(true);
    }

    let mut changed = false;
    if let Value::Object(root) = doc {
        for section in REQUIRED_SECTIONS {
            let entry = root.entry(section).or_insert(Value::Null);
            if !entry.is_object() {
                *entry = default_section(section);
                changed = true;
            }
        }

        if let Some(Value::Object(data)) = root.get_mut("data") {
            let records = data.entry("records").or_insert(Value::Null);
            if !records.is_array() {
                *records = Value::Array(Vec::new());
                changed = true;
            }

            let categories = data.entry("categories").or_insert(Value::Null);
            if !categories.is_array() {
                *categories = Value::Array(
                    SEED_CATEGORIES
                        .iter()
                        .map(|c| Value::String(c.to_string()))
                        .collect(),
                );
                changed = true;
            }

            if let Some(Value::Array(records)) = data.get_mut("records") {
                changed |= stamp_records(records);
            }
        }
    }

    Ok(changed)
}

/// Record fields that must be stored, or each decode would invent new ones.
const STAMPED_FIELDS: [&str; 4] = ["id", "date", "createdAt", "updatedAt"];

fn is_unset(field: Option<&Value>) -> bool {
    match field {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// One issue per stored record lacking any of [`STAMPED_FIELDS`].
fn unstamped_record_issues(doc: &Value) -> Vec<String> {
    let Some(records) = doc.pointer("/data/records").and_then(Value::as_array) else {
        return Vec::new();
    };

    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let missing: Vec<&str> = STAMPED_FIELDS
                .into_iter()
                .filter(|field| is_unset(record.get(*field)))
                .collect();
            (!missing.is_empty())
                .then(|| format!("Record {} is missing {}", index + 1, missing.join(", ")))
        })
        .collect()
}

/// Fill unset [`STAMPED_FIELDS`] of each record object. Returns whether
/// anything was filled.
fn stamp_records(records: &mut [Value]) -> bool {
    let now = Timestamp::now().to_string();
    let mut changed = false;

    for record in records.iter_mut().filter_map(Value::as_object_mut) {
        for field in STAMPED_FIELDS {
            if !is_unset(record.get(field)) {
                continue;
            }
            let filler = match field {
                "id" => RecordId::generate().to_string(),
                "date" => format_date(current_date()),
                _ => now.clone(),
            };
            record.insert(field.to_string(), Value::String(filler));
            changed = true;
        }
    }
    changed
}
