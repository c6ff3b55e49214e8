use recmerge_engine::{AttributeIdentity, DefaultPolicy, MergePolicy, PreferSide, Winner};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub records: RecordSettings,
    #[serde(default)]
    pub merge: MergeSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// How records are recognised inside a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSettings {
    /// Element name of the top-level records compared by `diff`.
    #[serde(default = "default_record_element")]
    pub record_element: String,
    /// Attributes carrying a record's identity; the first present one wins.
    #[serde(default = "default_identity_attributes")]
    pub identity_attributes: Vec<String>,
    #[serde(default = "default_tombstone_attribute")]
    pub tombstone_attribute: String,
    /// File extensions claimed by the record file handler.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for RecordSettings {
    fn default() -> Self {
        Self {
            record_element: default_record_element(),
            identity_attributes: default_identity_attributes(),
            tombstone_attribute: default_tombstone_attribute(),
            extensions: default_extensions(),
        }
    }
}

impl RecordSettings {
    pub fn identity(&self) -> AttributeIdentity {
        AttributeIdentity::new(self.identity_attributes.iter().cloned())
    }

    pub fn claims_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Side kept when both sides edited the same value.
    #[serde(default)]
    pub default_winner: Winner,
}

impl MergeSettings {
    pub fn policy(&self) -> Arc<dyn MergePolicy> {
        match self.default_winner {
            Winner::Ours => Arc::new(DefaultPolicy),
            Winner::Theirs => Arc::new(PreferSide(Winner::Theirs)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log directory, relative to the data directory.
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            filter: default_log_filter(),
        }
    }
}

fn default_record_element() -> String {
    "entry".into()
}
fn default_identity_attributes() -> Vec<String> {
    vec!["guid".into(), "id".into()]
}
fn default_tombstone_attribute() -> String {
    "dateDeleted".into()
}
fn default_extensions() -> Vec<String> {
    vec!["lift".into()]
}
fn default_log_directory() -> String {
    "logs".into()
}
fn default_log_filter() -> String {
    "info".into()
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recmerge_engine::{Identity, Node};

    #[test]
    fn empty_file_yields_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.records.record_element, "entry");
        assert_eq!(settings.records.tombstone_attribute, "dateDeleted");
        assert_eq!(settings.merge.default_winner, Winner::Ours);
        assert_eq!(settings.logging.filter, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{"records": {"extensions": ["lift", "xml"]}, "merge": {"default_winner": "theirs"}}"#,
        )
        .unwrap();
        assert_eq!(settings.records.extensions, vec!["lift", "xml"]);
        assert_eq!(settings.records.identity_attributes, vec!["guid", "id"]);
        assert_eq!(settings.merge.policy().name(), "prefer-theirs");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.records.record_element = "record".into();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.records.record_element, "record");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.records.extensions, vec!["lift"]);
    }

    #[test]
    fn record_settings_build_identity_and_match_extensions() {
        let records = RecordSettings::default();
        let node = Node::new("entry").with_attr("id", "x");
        assert_eq!(records.identity().id_of(&node), Some("x".to_string()));
        assert!(records.claims_extension(Path::new("dict/Dict.LIFT")));
        assert!(!records.claims_extension(Path::new("notes.txt")));
        assert!(!records.claims_extension(Path::new("Makefile")));
    }
}
