//! Control schema engine for the vehicle dashboard.
//!
//! A [`ControlCatalog`] of declarative control descriptors is indexed by
//! path, and [`ControlSchema::apply_update`] pushes arbitrary nested update
//! payloads through it: every leaf is looked up, normalized, unit-converted
//! and written into the state document, then aliased source paths are
//! pruned and the document is handed to a [`StateSink`].
//!
//! Bad leaves never fail an update. Unknown paths and rejected values are
//! skipped, and only show up in the returned [`ApplyReport`].

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

mod descriptor;
mod document;
mod normalize;

pub use descriptor::{
    build_index, ControlCatalog, ControlDescriptor, ControlIndex, ControlKind, Conversion,
    ValueType,
};
pub use document::{
    delete_path, flatten_update, get_path, merge_document, merge_state, prune_mapped_entries,
    set_path,
};
pub use normalize::{apply_conversion, normalize_value, ControlValue, Rejection};

use normalize::float_to_i64;

/// Where the state document goes after every apply.
pub trait StateSink {
    fn persist(&self, document: &Map<String, Value>) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum ApplyError {
    /// The in-memory document was updated but could not be stored.
    #[error("failed to persist state document: {0:#}")]
    PersistFailed(anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedChange {
    pub path: String,
    pub target: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    UnknownPath,
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedUpdate {
    pub path: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Per-leaf outcome of one apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<AppliedChange>,
    pub skipped: Vec<SkippedUpdate>,
    pub pruned: Vec<String>,
}

impl ApplyReport {
    pub fn applied_paths(&self) -> impl Iterator<Item = &str> {
        self.applied.iter().map(|change| change.path.as_str())
    }

    pub fn skipped_reason(&self, path: &str) -> Option<&SkipReason> {
        self.skipped
            .iter()
            .find(|skipped| skipped.path == path)
            .map(|skipped| &skipped.reason)
    }
}

/// A catalog together with the index derived from it.
#[derive(Debug, Clone, Default)]
pub struct ControlSchema {
    catalog: ControlCatalog,
    index: ControlIndex,
}

impl ControlSchema {
    pub fn new(catalog: ControlCatalog) -> Self {
        let index = ControlIndex::build(&catalog);
        Self { catalog, index }
    }

    pub fn catalog(&self) -> &ControlCatalog {
        &self.catalog
    }

    pub fn index(&self) -> &ControlIndex {
        &self.index
    }

    /// Applies `payload` to `document`, then persists it through `sink`.
    ///
    /// On [`ApplyError::PersistFailed`] the document has already been
    /// mutated and is ahead of storage.
    pub fn apply_update<S: StateSink + ?Sized>(
        &self,
        document: &mut Map<String, Value>,
        payload: &Map<String, Value>,
        sink: &S,
    ) -> Result<ApplyReport, ApplyError> {
        let report = self.apply_in_memory(document, payload);
        sink.persist(document).map_err(ApplyError::PersistFailed)?;
        Ok(report)
    }

    /// The apply pipeline without the persist step.
    pub fn apply_in_memory(
        &self,
        document: &mut Map<String, Value>,
        payload: &Map<String, Value>,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (path, raw) in flatten_update(payload) {
            let Some(control) = self.index.get(&path) else {
                debug!(%path, "ignoring update for unknown control path");
                report.skipped.push(SkippedUpdate {
                    path,
                    reason: SkipReason::UnknownPath,
                });
                continue;
            };

            let value = match resolve_leaf(control, &raw) {
                Ok(value) => value,
                Err(rejection) => {
                    debug!(%path, %rejection, "dropping rejected control value");
                    report.skipped.push(SkippedUpdate {
                        path,
                        reason: SkipReason::Rejected(rejection),
                    });
                    continue;
                }
            };

            let target = control.maps_to().unwrap_or(&path).to_string();
            set_path(document, &target, value.clone());
            report.applied.push(AppliedChange {
                path,
                target,
                value,
            });
        }

        report.pruned = self.prune(document);
        debug!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            pruned = report.pruned.len(),
            "applied state update"
        );
        report
    }

    /// Removes values left at the source path of aliased controls.
    pub fn prune(&self, document: &mut Map<String, Value>) -> Vec<String> {
        prune_mapped_entries(document, &self.catalog)
    }
}

/// Normalize, convert, then round `int` controls whose conversion produced
/// a fraction.
fn resolve_leaf(control: &ControlDescriptor, raw: &Value) -> Result<Value, Rejection> {
    let normalized = normalize_value(control, raw)?;
    let converted = match (control.value_type(), apply_conversion(control, normalized)) {
        (ValueType::Int, ControlValue::Float(value)) if value.is_finite() => {
            let rounded = float_to_i64(value.round_ties_even()).ok_or(Rejection::Coercion {
                expected: ValueType::Int,
            })?;
            ControlValue::Int(rounded)
        }
        (_, ControlValue::Float(value)) if !value.is_finite() => return Err(Rejection::NonFinite),
        (_, converted) => converted,
    };
    Ok(converted.into())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
