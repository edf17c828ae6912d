//! The persisted document and its default shape.

use crate::types::{lenient, Record, SettingsPatch, Theme, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current document format version.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Top-level sections every document must carry.
pub const REQUIRED_SECTIONS: [&str; 4] = ["settings", "data", "backup", "metadata"];

/// Categories a fresh document starts with.
pub const SEED_CATEGORIES: [&str; 5] = [
    "Yawns",
    "Eye contact with the cat",
    "Fridge openings",
    "Hiccups",
    "Jumps",
];

/// The single aggregate holding all persisted application state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub settings: SettingsPatch,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub backup: BackupSection,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Records and the category list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub themes: Vec<String>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            categories: SEED_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            themes: Vec::new(),
        }
    }
}

/// In-document backup slots. Carried through untouched; the backup ring
/// buffer lives under its own key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupSection {
    #[serde(default, deserialize_with = "lenient")]
    pub auto: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub manual: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default = "format_version", deserialize_with = "lenient")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_update: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub statistics: Map<String, Value>,
}

fn format_version() -> String {
    FORMAT_VERSION.to_string()
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            version: format_version(),
            created: None,
            last_update: None,
            statistics: Map::new(),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self {
            settings: default_stored_settings(),
            data: DataSection::default(),
            backup: BackupSection::default(),
            metadata: Metadata::default(),
        }
    }
}

impl Document {
    /// A brand-new document with creation timestamps set.
    pub fn fresh() -> Self {
        let now = Timestamp::now();
        let mut doc = Self::default();
        doc.metadata.created = Some(now);
        doc.metadata.last_update = Some(now);
        doc
    }

    /// Stamp metadata for a write.
    pub fn touch(&mut self) {
        self.metadata.last_update = Some(Timestamp::now());
        self.metadata.version = format_version();
    }

    /// Number of records referencing `category`.
    pub fn references_to(&self, category: &str) -> usize {
        self.data
            .records
            .iter()
            .filter(|record| record.category == category)
            .count()
    }
}

/// Settings section of a fresh document.
pub fn default_stored_settings() -> SettingsPatch {
    SettingsPatch {
        theme: Some(Theme::Default),
        notifications: Some(false),
        auto_save: Some(true),
        version: Some(format_version()),
        ..Default::default()
    }
}

/// Default JSON for one top-level section.
pub fn default_section(name: &str) -> Value {
    let doc = Document::default();
    let section = match name {
        "settings" => serde_json::to_value(&doc.settings),
        "data" => serde_json::to_value(&doc.data),
        "backup" => serde_json::to_value(&doc.backup),
        "metadata" => serde_json::to_value(&doc.metadata),
        _ => return Value::Null,
    };
    section.unwrap_or(Value::Null)
}
