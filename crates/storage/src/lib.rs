use anyhow::{Context, Result};
use control_schema::{merge_document, ControlCatalog, ControlSchema, StateSink};
use serde_json::{Map, Value};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Reads a JSON document. A missing file or unparseable content yields
/// `None`; only other IO failures are errors.
pub fn read_json(path: &Path) -> Result<Option<Value>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "json document does not exist yet");
            return Ok(None);
        }
        Err(error) => {
            return Err(error).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(error) => {
            warn!(path = %path.display(), %error, "ignoring json document that does not parse");
            Ok(None)
        }
    }
}

/// Writes `value` as pretty JSON with a trailing newline, creating the
/// parent directory when needed.
pub fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    ensure_parent_dir_exists(path)?;
    let mut rendered = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to encode '{}'", path.display()))?;
    rendered.push('\n');
    fs::write(path, rendered).with_context(|| format!("failed to write '{}'", path.display()))
}

fn ensure_parent_dir_exists(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for '{}'",
            parent.display(),
            path.display()
        )
    })
}

/// The declarative control catalog on disk.
#[derive(Debug, Clone)]
pub struct ControlSource {
    path: PathBuf,
}

impl ControlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: unreadable or malformed sources give an empty catalog.
    pub fn load(&self) -> ControlCatalog {
        match read_json(&self.path) {
            Ok(Some(document)) => ControlCatalog::from_value(&document),
            Ok(None) => ControlCatalog::default(),
            Err(error) => {
                warn!(%error, "control catalog unavailable; using an empty catalog");
                ControlCatalog::default()
            }
        }
    }

    pub fn load_schema(&self) -> ControlSchema {
        ControlSchema::new(self.load())
    }
}

/// The persisted vehicle state document.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored document merged onto `defaults`, with aliased
    /// source paths pruned. Writes the result back if that changed it.
    pub fn load(
        &self,
        defaults: &Map<String, Value>,
        schema: &ControlSchema,
    ) -> Result<Map<String, Value>> {
        let stored = match read_json(&self.path)? {
            Some(Value::Object(stored)) => stored,
            Some(_) => {
                warn!(
                    path = %self.path.display(),
                    "stored state is not an object; starting from defaults"
                );
                Map::new()
            }
            None => Map::new(),
        };

        let mut state = merge_document(defaults, &stored);
        let pruned = schema.prune(&mut state);
        if state != stored {
            info!(
                path = %self.path.display(),
                pruned = pruned.len(),
                "writing merged state document"
            );
            self.save(&state)?;
        }
        Ok(state)
    }

    pub fn save(&self, state: &Map<String, Value>) -> Result<()> {
        write_json(&self.path, state)
    }

    /// Overwrites storage with a fresh copy of `defaults`.
    pub fn reset(&self, defaults: &Map<String, Value>) -> Result<Map<String, Value>> {
        let state = defaults.clone();
        self.save(&state)?;
        Ok(state)
    }
}

impl StateSink for StateStore {
    fn persist(&self, document: &Map<String, Value>) -> Result<()> {
        self.save(document)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
