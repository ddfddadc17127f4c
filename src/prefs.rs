use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::columns::{default_columns, Column};

const COLUMNS_TABLE: &str = "columns";

/// Device-local preferences file. Column layouts live under
/// `[columns]` keyed by identity uid.
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

#[derive(Debug)]
pub enum PrefsError {
    Io(io::Error),
    TomlDe(toml::de::Error),
    TomlSer(toml::ser::Error),
}

impl fmt::Display for PrefsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefsError::Io(err) => write!(f, "prefs I/O error: {}", err),
            PrefsError::TomlDe(err) => write!(f, "invalid prefs TOML: {}", err),
            PrefsError::TomlSer(err) => write!(f, "failed to encode prefs: {}", err),
        }
    }
}

impl Error for PrefsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PrefsError::Io(err) => Some(err),
            PrefsError::TomlDe(err) => Some(err),
            PrefsError::TomlSer(err) => Some(err),
        }
    }
}

impl From<io::Error> for PrefsError {
    fn from(value: io::Error) -> Self {
        PrefsError::Io(value)
    }
}

impl From<toml::de::Error> for PrefsError {
    fn from(value: toml::de::Error) -> Self {
        PrefsError::TomlDe(value)
    }
}

impl From<toml::ser::Error> for PrefsError {
    fn from(value: toml::ser::Error) -> Self {
        PrefsError::TomlSer(value)
    }
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) if !home.is_empty() => PathBuf::from(home)
                .join(".config")
                .join("dvt")
                .join("prefs.toml"),
            _ => PathBuf::from(".dvt").join("prefs.toml"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored layout for `uid`, or the default layout when nothing usable is
    /// stored. Unreadable data is reported and ignored.
    pub fn load_columns(&self, uid: &str) -> Vec<Column> {
        match self.read_columns(uid) {
            Ok(Some(columns)) if !columns.is_empty() => columns,
            Ok(_) => default_columns(),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "ignoring unreadable column layout"
                );
                default_columns()
            }
        }
    }

    fn read_columns(&self, uid: &str) -> Result<Option<Vec<Column>>, PrefsError> {
        let table = self.read_table()?;
        let Some(stored) = table
            .get(COLUMNS_TABLE)
            .and_then(|columns| columns.get(uid))
        else {
            return Ok(None);
        };
        let columns: Vec<Column> = stored.clone().try_into()?;
        Ok(Some(columns))
    }

    pub fn save_columns(&self, uid: &str, columns: &[Column]) -> Result<(), PrefsError> {
        // A corrupt file is replaced rather than blocking the save.
        let mut table = self.read_table().unwrap_or_default();
        let entry = table
            .entry(COLUMNS_TABLE)
            .or_insert(toml::Value::Table(toml::Table::new()));
        if !entry.is_table() {
            *entry = toml::Value::Table(toml::Table::new());
        }
        if let toml::Value::Table(by_user) = entry {
            by_user.insert(uid.to_string(), toml::Value::try_from(columns)?);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, toml::to_string_pretty(&table)?)?;
        tracing::debug!(path = %self.path.display(), uid, "saved column layout");
        Ok(())
    }

    pub fn clear_columns(&self, uid: &str) -> Result<(), PrefsError> {
        let mut table = match self.read_table() {
            Ok(table) => table,
            Err(_) => return Ok(()),
        };
        let removed = table
            .get_mut(COLUMNS_TABLE)
            .and_then(toml::Value::as_table_mut)
            .and_then(|by_user| by_user.remove(uid))
            .is_some();
        if removed {
            fs::write(&self.path, toml::to_string_pretty(&table)?)?;
        }
        Ok(())
    }

    fn read_table(&self) -> Result<toml::Table, PrefsError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(raw.parse::<toml::Table>()?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(err) => Err(err.into()),
        }
    }
}
