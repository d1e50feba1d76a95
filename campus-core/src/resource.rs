//! Resource resolution.
//!
//! The frontend addresses data by resource key. Resolution is total: a key is
//! either a dedicated table, one of the settings partitions, or an opaque
//! document. Unknown keys are accepted as opaque documents.

use crate::manifest::{self, TableSpec};

/// Snapshot section holding the school record itself.
pub const SCHOOL_KEY: &str = "school";

/// The two independently replaceable columns of a school's settings row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsPartition {
    General,
    Financial,
}

impl SettingsPartition {
    pub fn column(&self) -> &'static str {
        match self {
            SettingsPartition::General => "settings",
            SettingsPartition::Financial => "financial",
        }
    }

    pub fn key(&self) -> &'static str {
        self.column()
    }

    pub const ALL: [SettingsPartition; 2] = [SettingsPartition::General, SettingsPartition::Financial];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Structured(&'static TableSpec),
    Settings(SettingsPartition),
    Opaque(String),
}

/// Lookup table from resource keys (and aliases) to resources.
#[derive(Debug, Clone)]
pub struct ResourceMap {
    entries: Vec<(&'static str, Resource)>,
}

impl ResourceMap {
    /// The standard school resources.
    pub fn standard() -> Self {
        let mut entries: Vec<(&'static str, Resource)> = manifest::DOMAIN_TABLES
            .iter()
            .map(|spec| (spec.resource, Resource::Structured(*spec)))
            .collect();

        // Keys older frontend builds still send.
        entries.push(("classes", Resource::Structured(&manifest::TURMAS)));
        entries.push(("academic_years", Resource::Structured(&manifest::ACADEMIC_YEARS)));
        entries.push(("topics", Resource::Structured(&manifest::DISCUSSION_TOPICS)));
        entries.push(("messages", Resource::Structured(&manifest::DISCUSSION_MESSAGES)));

        for partition in SettingsPartition::ALL {
            entries.push((partition.key(), Resource::Settings(partition)));
        }

        Self { entries }
    }

    pub fn resolve(&self, key: &str) -> Resource {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| Resource::Opaque(key.to_string()))
    }

    /// Whether `key` names a section of the school snapshot. An opaque
    /// document stored under such a key would never show up there.
    pub fn is_reserved(&self, key: &str) -> bool {
        key == SCHOOL_KEY || self.entries.iter().any(|(k, _)| *k == key)
    }
}

impl Default for ResourceMap {
    fn default() -> Self {
        Self::standard()
    }
}
