//! The normalized fact set handed over by the front end.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptors::TypeShape;
use crate::error::{AnalysisError, AnalysisResult};
use crate::registration::Registration;
use crate::scope::{ProcedureTrace, StaticAssignment};

/// Everything the engine needs for one compilation unit.
///
/// Facts are produced once per compilation pass and are immutable for the
/// duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSet {
    #[serde(default)]
    pub registrations: Vec<Registration>,
    #[serde(default)]
    pub type_shapes: Vec<TypeShape>,
    #[serde(default)]
    pub procedures: Vec<ProcedureTrace>,
    #[serde(default)]
    pub static_assignments: Vec<StaticAssignment>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> AnalysisResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml_str(text: &str) -> AnalysisResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Loads facts from a `.json`, `.yaml` or `.yml` file.
    pub fn from_path(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            other => Err(AnalysisError::InvalidFacts(format!(
                "unsupported fact file extension: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    pub fn to_json(&self) -> AnalysisResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
            && self.type_shapes.is_empty()
            && self.procedures.is_empty()
            && self.static_assignments.is_empty()
    }
}
