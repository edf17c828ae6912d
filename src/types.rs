//! Core types for the record book.

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a record.
///
/// Generated ids are a base-36 millisecond clock followed by a base-36
/// random component, so ids from one session sort roughly by creation time.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let noise: u64 = rand::thread_rng().gen();
        RecordId(format!("{}{}", to_base36(millis), to_base36(noise)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// UTC instant, persisted as an RFC 3339 string with millisecond precision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Current time, truncated to the persisted millisecond precision.
    pub fn now() -> Self {
        Timestamp(Utc::now().trunc_subsecs(3))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({self})")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Timestamp(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc)))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Decode a field, falling back to its default when the stored value has the
/// wrong shape. Used for sections the integrity check does not cover.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(crate::validation::normalize_value(&value))
}

fn lenient_memo<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().unwrap_or_default().to_string())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// A single logged record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier (assigned by store).
    #[serde(default = "RecordId::generate")]
    pub id: RecordId,

    /// Category label; also present in the document's category list.
    pub category: String,

    /// Non-negative count, at most 999999.
    #[serde(deserialize_with = "lenient_value")]
    pub value: u32,

    #[serde(default, deserialize_with = "lenient_memo")]
    pub memo: String,

    /// Calendar day the record belongs to (`YYYY-MM-DD`).
    #[serde(default = "today")]
    pub date: NaiveDate,

    #[serde(default = "Timestamp::now")]
    pub created_at: Timestamp,

    #[serde(default = "Timestamp::now")]
    pub updated_at: Timestamp,
}

impl Record {
    /// Loosely-typed view of the record, as the validator sees it.
    pub fn to_input(&self) -> RecordInput {
        RecordInput {
            category: Value::String(self.category.clone()),
            value: Value::from(self.value),
            memo: Value::String(self.memo.clone()),
            date: Value::String(self.date.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Raw input for a new record, as handed over by a form.
///
/// Fields are untyped JSON values; `Value::Null` means absent. The store
/// coerces and validates them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordInput {
    #[serde(default)]
    pub category: Value,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub memo: Value,
    #[serde(default)]
    pub date: Value,
}

impl RecordInput {
    /// Create an input with a category and value.
    pub fn new(category: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            category: category.into(),
            value: value.into(),
            memo: Value::Null,
            date: Value::Null,
        }
    }

    /// Attach a memo.
    pub fn with_memo(mut self, memo: impl Into<Value>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Attach a date (`YYYY-MM-DD`).
    pub fn with_date(mut self, date: impl Into<Value>) -> Self {
        self.date = date.into();
        self
    }

    /// JSON object form, used for validation.
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (field, value) in [
            ("category", &self.category),
            ("value", &self.value),
            ("memo", &self.memo),
            ("date", &self.date),
        ] {
            if !value.is_null() {
                map.insert(field.to_string(), value.clone());
            }
        }
        Value::Object(map)
    }
}

/// Partial update for an existing record. `None` leaves the field alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Value>,
}

impl RecordPatch {
    pub fn category(mut self, category: impl Into<Value>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn memo(mut self, memo: impl Into<Value>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn date(mut self, date: impl Into<Value>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Overlay this patch on an existing input.
    pub fn apply_to(&self, mut input: RecordInput) -> RecordInput {
        if let Some(category) = &self.category {
            input.category = category.clone();
        }
        if let Some(value) = &self.value {
            input.value = value.clone();
        }
        if let Some(memo) = &self.memo {
            input.memo = memo.clone();
        }
        if let Some(date) = &self.date {
            input.date = date.clone();
        }
        input
    }
}

/// Visual theme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Retro,
    Minimal,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Default, Theme::Dark, Theme::Retro, Theme::Minimal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Dark => "dark",
            Theme::Retro => "retro",
            Theme::Minimal => "minimal",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == s)
            .ok_or_else(|| format!("unknown theme: {s}"))
    }
}

/// Effective user preferences: stored values merged over defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub notifications: bool,
    pub auto_save: bool,
    pub version: String,
    pub language: String,
    pub date_format: String,
    pub time_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Default,
            notifications: false,
            auto_save: true,
            version: crate::document::FORMAT_VERSION.to_string(),
            language: "ja".to_string(),
            date_format: "YYYY-MM-DD".to_string(),
            time_format: "24h".to_string(),
        }
    }
}

impl Settings {
    /// Overlay stored values on these settings.
    pub fn merged(mut self, patch: &SettingsPatch) -> Self {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(notifications) = patch.notifications {
            self.notifications = notifications;
        }
        if let Some(auto_save) = patch.auto_save {
            self.auto_save = auto_save;
        }
        if let Some(version) = &patch.version {
            self.version = version.clone();
        }
        if let Some(language) = &patch.language {
            self.language = language.clone();
        }
        if let Some(date_format) = &patch.date_format {
            self.date_format = date_format.clone();
        }
        if let Some(time_format) = &patch.time_format {
            self.time_format = time_format.clone();
        }
        self
    }
}

/// Settings as stored in the document; any field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub auto_save: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
}

impl SettingsPatch {
    /// Later values win.
    pub fn overlay(&mut self, other: &SettingsPatch) {
        if other.theme.is_some() {
            self.theme = other.theme;
        }
        if other.notifications.is_some() {
            self.notifications = other.notifications;
        }
        if other.auto_save.is_some() {
            self.auto_save = other.auto_save;
        }
        if other.version.is_some() {
            self.version.clone_from(&other.version);
        }
        if other.language.is_some() {
            self.language.clone_from(&other.language);
        }
        if other.date_format.is_some() {
            self.date_format.clone_from(&other.date_format);
        }
        if other.time_format.is_some() {
            self.time_format.clone_from(&other.time_format);
        }
    }
}

/// Timestamped snapshot of the whole document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub data: crate::document::Document,
    pub timestamp: Timestamp,
    pub version: String,
}

/// Size and count figures for display.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    /// Length of the compact JSON encoding, in bytes.
    pub data_size_bytes: usize,
    /// Same, in KiB rounded to two decimals.
    pub data_size_kb: f64,
    pub record_count: usize,
    pub category_count: usize,
    pub last_update: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let ts: Timestamp = "2024-05-01T12:30:00.250Z".parse().unwrap();
        assert_eq!(ts.to_string(), "2024-05-01T12:30:00.250Z");

        let encoded = serde_json::to_string(&ts).unwrap();
        assert_eq!(encoded, "\"2024-05-01T12:30:00.250Z\"");
        let decoded: Timestamp = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, ts);
    }

    #[test]
    fn test_record_wire_format() {
        let record: Record = serde_json::from_value(json!({
            "id": "abc",
            "category": "Jumps",
            "value": 12,
            "memo": "",
            "date": "2024-03-09",
            "createdAt": "2024-03-09T08:00:00.000Z",
            "updatedAt": "2024-03-09T08:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(record.id, RecordId::from("abc"));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());

        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(encoded["date"], "2024-03-09");
        assert_eq!(encoded["createdAt"], "2024-03-09T08:00:00.000Z");
    }

    #[test]
    fn test_record_tolerates_loose_value() {
        let record: Record = serde_json::from_value(json!({
            "id": "x",
            "category": "Hiccups",
            "value": "7.9",
            "memo": null,
            "date": "2024-01-01"
        }))
        .unwrap();

        assert_eq!(record.value, 7);
        assert_eq!(record.memo, "");
    }

    #[test]
    fn test_patch_overlays_only_given_fields() {
        let base = RecordInput::new("Jumps", 3).with_memo("morning");
        let patched = RecordPatch::default().value(5).apply_to(base);

        assert_eq!(patched.category, json!("Jumps"));
        assert_eq!(patched.value, json!(5));
        assert_eq!(patched.memo, json!("morning"));
    }

    #[test]
    fn test_settings_merge_prefers_stored() {
        let stored = SettingsPatch {
            theme: Some(Theme::Dark),
            auto_save: Some(false),
            ..Default::default()
        };
        let settings = Settings::default().merged(&stored);

        assert_eq!(settings.theme, Theme::Dark);
        assert!(!settings.auto_save);
        assert!(!settings.notifications);
        assert_eq!(settings.language, "ja");
    }

    #[test]
    fn test_settings_patch_drops_bad_theme() {
        let patch: SettingsPatch =
            serde_json::from_value(json!({"theme": "neon", "notifications": true})).unwrap();
        assert_eq!(patch.theme, None);
        assert_eq!(patch.notifications, Some(true));
    }
}
