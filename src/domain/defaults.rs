use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const FALLBACK_ASSIGNEE: &str = "Unknown";
pub const FALLBACK_PRIORITIES: [&str; 3] = ["Low", "Medium", "High"];
pub const FALLBACK_TECHNOLOGIES: [&str; 4] = ["Electrical", "Mechanical", "Software", "Civil"];
pub const FALLBACK_NEW_PRIORITY: &str = "Medium";
pub const FALLBACK_NEW_TECHNOLOGY: &str = "Electrical";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Person {
    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }
}

/// The shared defaults singleton: assignee roster plus the priority and
/// technology labels offered by forms.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DefaultValues {
    pub assigned_to: Vec<Person>,
    pub priority: Vec<String>,
    pub technology: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Priority,
    Technology,
}

impl LabelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelKind::Priority => "priority",
            LabelKind::Technology => "technology",
        }
    }
}

impl Default for DefaultValues {
    fn default() -> Self {
        Self {
            assigned_to: vec![Person {
                name: FALLBACK_ASSIGNEE.to_string(),
                email: String::new(),
            }],
            priority: FALLBACK_PRIORITIES.iter().map(|s| s.to_string()).collect(),
            technology: FALLBACK_TECHNOLOGIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDefaults {
    #[serde(default)]
    assigned_to: Option<Vec<StoredAssignee>>,
    #[serde(default)]
    priority: Option<Vec<String>>,
    #[serde(default)]
    technology: Option<Vec<String>>,
}

// Older documents kept the roster as plain names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredAssignee {
    Name(String),
    Person {
        name: String,
        #[serde(default)]
        email: Option<String>,
    },
}

impl From<StoredAssignee> for Person {
    fn from(value: StoredAssignee) -> Self {
        match value {
            StoredAssignee::Name(name) => Person {
                name,
                email: String::new(),
            },
            StoredAssignee::Person { name, email } => Person {
                name,
                email: email.unwrap_or_default(),
            },
        }
    }
}

impl DefaultValues {
    /// Reads a stored defaults document. Legacy string rosters are upgraded
    /// in memory only; a missing label list falls back to the built-ins and a
    /// missing roster reads as empty.
    pub fn from_document(raw: &str) -> Result<Self, serde_json::Error> {
        let stored: StoredDefaults = serde_json::from_str(raw)?;
        let fallback = DefaultValues::default();
        Ok(Self {
            assigned_to: stored
                .assigned_to
                .unwrap_or_default()
                .into_iter()
                .map(Person::from)
                .collect(),
            priority: stored.priority.unwrap_or(fallback.priority),
            technology: stored.technology.unwrap_or(fallback.technology),
        })
    }

    pub fn to_document(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn person(&self, name: &str) -> Option<&Person> {
        self.assigned_to.iter().find(|person| person.name == name)
    }

    pub fn labels(&self, kind: LabelKind) -> &[String] {
        match kind {
            LabelKind::Priority => &self.priority,
            LabelKind::Technology => &self.technology,
        }
    }

    fn labels_mut(&mut self, kind: LabelKind) -> &mut Vec<String> {
        match kind {
            LabelKind::Priority => &mut self.priority,
            LabelKind::Technology => &mut self.technology,
        }
    }

    pub fn initial_priority(&self) -> &str {
        self.priority
            .first()
            .map(String::as_str)
            .unwrap_or(FALLBACK_NEW_PRIORITY)
    }

    pub fn initial_technology(&self) -> &str {
        self.technology
            .first()
            .map(String::as_str)
            .unwrap_or(FALLBACK_NEW_TECHNOLOGY)
    }

    pub fn add_person(&mut self, name: &str, email: Option<&str>) -> Result<(), DefaultsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DefaultsError::EmptyName);
        }
        let lowered = name.to_lowercase();
        if self
            .assigned_to
            .iter()
            .any(|person| person.name.to_lowercase() == lowered)
        {
            return Err(DefaultsError::DuplicatePerson(name.to_string()));
        }
        self.assigned_to.push(Person {
            name: name.to_string(),
            email: email.map(str::trim).unwrap_or_default().to_string(),
        });
        Ok(())
    }

    pub fn remove_person(&mut self, name: &str) -> bool {
        let before = self.assigned_to.len();
        self.assigned_to.retain(|person| person.name != name);
        self.assigned_to.len() != before
    }

    /// Adds a label unless it is blank or already present.
    pub fn add_label(&mut self, kind: LabelKind, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let labels = self.labels_mut(kind);
        if labels.iter().any(|existing| existing == value) {
            return false;
        }
        labels.push(value.to_string());
        true
    }

    pub fn remove_label(&mut self, kind: LabelKind, value: &str) -> bool {
        let labels = self.labels_mut(kind);
        let before = labels.len();
        labels.retain(|existing| existing != value);
        labels.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultsError {
    EmptyName,
    DuplicatePerson(String),
}

impl fmt::Display for DefaultsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultsError::EmptyName => f.write_str("name is required"),
            DefaultsError::DuplicatePerson(name) => {
                write!(f, "assignee '{}' already exists", name)
            }
        }
    }
}

impl Error for DefaultsError {}

#[cfg(test)]
mod tests {
    use super::{DefaultValues, DefaultsError, LabelKind, Person};

    #[test]
    fn upgrades_legacy_string_roster_in_memory() {
        let raw = r#"{"assignedTo":["Dana","Lee"],"priority":["P1"],"technology":["Civil"]}"#;
        let defaults = DefaultValues::from_document(raw).expect("legacy document should parse");
        assert_eq!(
            defaults.assigned_to,
            vec![
                Person {
                    name: "Dana".to_string(),
                    email: String::new()
                },
                Person {
                    name: "Lee".to_string(),
                    email: String::new()
                },
            ]
        );
        assert_eq!(defaults.priority, vec!["P1".to_string()]);
    }

    #[test]
    fn reads_current_roster_shape_with_missing_email() {
        let raw = r#"{"assignedTo":[{"name":"Dana","email":"dana@example.com"},{"name":"Lee"}]}"#;
        let defaults = DefaultValues::from_document(raw).expect("document should parse");
        assert_eq!(defaults.assigned_to[0].email, "dana@example.com");
        assert!(defaults.assigned_to[0].has_email());
        assert_eq!(defaults.assigned_to[1].email, "");
        assert!(!defaults.assigned_to[1].has_email());
    }

    #[test]
    fn missing_label_lists_fall_back_but_missing_roster_is_empty() {
        let defaults = DefaultValues::from_document("{}").expect("empty document should parse");
        assert!(defaults.assigned_to.is_empty());
        assert_eq!(defaults.priority, DefaultValues::default().priority);
        assert_eq!(defaults.technology, DefaultValues::default().technology);
    }

    #[test]
    fn saving_writes_the_object_roster_shape() {
        let defaults = DefaultValues::from_document(r#"{"assignedTo":["Dana"]}"#)
            .expect("legacy document should parse");
        let raw = defaults.to_document().expect("defaults should serialize");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json should parse");
        assert_eq!(value["assignedTo"][0]["name"], "Dana");
        assert_eq!(value["assignedTo"][0]["email"], "");
    }

    #[test]
    fn add_person_requires_unique_non_empty_name() {
        let mut defaults = DefaultValues::default();
        assert_eq!(defaults.add_person("  ", None), Err(DefaultsError::EmptyName));
        defaults
            .add_person(" Dana ", Some(" dana@example.com "))
            .expect("new person should be added");
        assert_eq!(
            defaults.person("Dana").map(|p| p.email.as_str()),
            Some("dana@example.com")
        );
        assert_eq!(
            defaults.add_person("dana", None),
            Err(DefaultsError::DuplicatePerson("dana".to_string()))
        );
        assert!(defaults.remove_person("Dana"));
        assert!(!defaults.remove_person("Dana"));
    }

    #[test]
    fn labels_ignore_blanks_and_duplicates() {
        let mut defaults = DefaultValues::default();
        assert!(!defaults.add_label(LabelKind::Priority, " "));
        assert!(!defaults.add_label(LabelKind::Priority, "High"));
        assert!(defaults.add_label(LabelKind::Technology, " Hydraulics "));
        assert_eq!(
            defaults.labels(LabelKind::Technology).last().map(String::as_str),
            Some("Hydraulics")
        );
        assert!(defaults.remove_label(LabelKind::Priority, "Low"));
        assert_eq!(defaults.initial_priority(), "Medium");
    }

    #[test]
    fn initial_labels_fall_back_when_lists_are_empty() {
        let defaults = DefaultValues {
            assigned_to: Vec::new(),
            priority: Vec::new(),
            technology: Vec::new(),
        };
        assert_eq!(defaults.initial_priority(), "Medium");
        assert_eq!(defaults.initial_technology(), "Electrical");
    }
}
