// Calculation Audit Log - named inputs, outputs, and steps per session
//
// One log per calculation session, populated incrementally by the calling
// code and exported for engineering review. Not synchronized: a log shared
// across concurrent writers needs external locking.

use crate::error::{Result, UnitsError};
use crate::quantity::TrackedQuantity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Write as _;
use uuid::Uuid;

// ============================================================================
// STEPS
// ============================================================================

/// Timestamped free-text description of one calculation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStep {
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

// ============================================================================
// AUDIT LOG
// ============================================================================

/// Session-scoped collection of named input/output quantities plus steps.
///
/// Names are unique per role; re-adding a name replaces the value in place
/// (last write wins, insertion order kept).
#[derive(Debug, Clone)]
pub struct AuditLog {
    id: String,
    created_at: DateTime<Utc>,
    inputs: Vec<(String, TrackedQuantity)>,
    outputs: Vec<(String, TrackedQuantity)>,
    steps: Vec<AuditStep>,
}

impl AuditLog {
    pub fn new() -> Self {
        AuditLog {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn add_input(&mut self, name: &str, quantity: TrackedQuantity) {
        Self::upsert(&mut self.inputs, name, quantity);
    }

    pub fn add_output(&mut self, name: &str, quantity: TrackedQuantity) {
        Self::upsert(&mut self.outputs, name, quantity);
    }

    fn upsert(entries: &mut Vec<(String, TrackedQuantity)>, name: &str, quantity: TrackedQuantity) {
        match entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = quantity,
            None => entries.push((name.to_string(), quantity)),
        }
    }

    pub fn add_step(&mut self, description: &str) {
        self.steps.push(AuditStep {
            timestamp: Utc::now(),
            description: description.to_string(),
        });
    }

    pub fn get_input(&self, name: &str) -> Option<&TrackedQuantity> {
        self.inputs.iter().find(|(n, _)| n == name).map(|(_, q)| q)
    }

    pub fn get_output(&self, name: &str) -> Option<&TrackedQuantity> {
        self.outputs.iter().find(|(n, _)| n == name).map(|(_, q)| q)
    }

    /// Input names in insertion order.
    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Output names in insertion order.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn inputs(&self) -> impl Iterator<Item = (&str, &TrackedQuantity)> {
        self.inputs.iter().map(|(n, q)| (n.as_str(), q))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &TrackedQuantity)> {
        self.outputs.iter().map(|(n, q)| (n.as_str(), q))
    }

    pub fn steps(&self) -> &[AuditStep] {
        &self.steps
    }

    // ========================================================================
    // FILTERS (exact unit-string match, not dimensional compatibility)
    // ========================================================================

    pub fn filter_inputs(&self, unit: &str) -> Vec<(&str, &TrackedQuantity)> {
        self.inputs
            .iter()
            .filter(|(_, q)| q.unit() == unit)
            .map(|(n, q)| (n.as_str(), q))
            .collect()
    }

    pub fn filter_outputs(&self, unit: &str) -> Vec<(&str, &TrackedQuantity)> {
        self.outputs
            .iter()
            .filter(|(_, q)| q.unit() == unit)
            .map(|(n, q)| (n.as_str(), q))
            .collect()
    }

    // ========================================================================
    // EXPORTS
    // ========================================================================

    /// Full structured export including per-quantity provenance:
    /// {"inputs": {name: ...}, "outputs": {...}, "steps": [...]}.
    pub fn to_dict(&self) -> serde_json::Value {
        let inputs: serde_json::Map<String, serde_json::Value> = self
            .inputs
            .iter()
            .map(|(n, q)| (n.clone(), q.to_dict()))
            .collect();
        let outputs: serde_json::Map<String, serde_json::Value> = self
            .outputs
            .iter()
            .map(|(n, q)| (n.clone(), q.to_dict()))
            .collect();
        let steps: Vec<serde_json::Value> = self
            .steps
            .iter()
            .map(|s| {
                json!({
                    "timestamp": s.timestamp,
                    "description": s.description,
                })
            })
            .collect();

        json!({
            "id": self.id,
            "created_at": self.created_at,
            "inputs": inputs,
            "outputs": outputs,
            "steps": steps,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_dict())
            .map_err(|e| UnitsError::InvalidSerialized(e.to_string()))
    }

    /// Flat human-readable listing of inputs, outputs, and steps.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Calculation audit log {}", self.id);
        let _ = writeln!(out, "Created: {}", self.created_at.to_rfc3339());

        let _ = writeln!(out, "\nInputs ({}):", self.inputs.len());
        for (name, q) in &self.inputs {
            let _ = writeln!(out, "  {} = {} {}", name, q.magnitude(), q.unit());
        }

        let _ = writeln!(out, "\nOutputs ({}):", self.outputs.len());
        for (name, q) in &self.outputs {
            let _ = writeln!(out, "  {} = {} {}", name, q.magnitude(), q.unit());
        }

        let _ = writeln!(out, "\nSteps ({}):", self.steps.len());
        for step in &self.steps {
            let _ = writeln!(
                out,
                "  [{}] {}",
                step.timestamp.to_rfc3339(),
                step.description
            );
        }
        out
    }

    /// Flat role/name/magnitude/unit table, inputs then outputs, in
    /// insertion order.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer
            .write_record(["role", "name", "magnitude", "unit"])
            .map_err(|e| UnitsError::Csv(e.to_string()))?;

        for (role, entries) in [("input", &self.inputs), ("output", &self.outputs)] {
            for (name, q) in entries.iter() {
                let magnitude = q.magnitude().to_string();
                writer
                    .write_record([role, name.as_str(), magnitude.as_str(), q.unit()])
                    .map_err(|e| UnitsError::Csv(e.to_string()))?;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| UnitsError::Csv(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| UnitsError::Csv(e.to_string()))
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn quantity(magnitude: f64, unit: &str) -> TrackedQuantity {
        TrackedQuantity::new(magnitude, unit, "test").unwrap()
    }

    fn sample_log() -> AuditLog {
        let mut log = AuditLog::new();
        log.add_input("thickness", quantity(25.0, "mm"));
        log.add_input("yield_strength", quantity(450.0, "MPa"));
        log.add_step("checked wall thickness against DNV-ST-F101");
        log.add_output("utilisation", quantity(0.82, "dimensionless"));
        log
    }

    #[test]
    fn test_names_in_insertion_order() {
        let log = sample_log();
        assert_eq!(log.input_names(), vec!["thickness", "yield_strength"]);
        assert_eq!(log.output_names(), vec!["utilisation"]);
    }

    #[test]
    fn test_last_write_wins() {
        let mut log = sample_log();
        log.add_input("thickness", quantity(30.0, "mm"));

        assert_eq!(log.input_names(), vec!["thickness", "yield_strength"]);
        assert_eq!(log.get_input("thickness").unwrap().magnitude(), 30.0);
    }

    #[test]
    fn test_to_dict_shape() {
        let dict = sample_log().to_dict();
        assert!(dict["inputs"]["thickness"]["magnitude"].is_number());
        assert_eq!(dict["inputs"]["thickness"]["unit"], "mm");
        assert!(dict["inputs"]["thickness"]["provenance"].is_array());
        assert_eq!(dict["outputs"]["utilisation"]["unit"], "dimensionless");
        assert_eq!(dict["steps"].as_array().unwrap().len(), 1);
        assert!(dict["steps"][0]["timestamp"].is_string());
        assert_eq!(
            dict["steps"][0]["description"],
            "checked wall thickness against DNV-ST-F101"
        );
    }

    #[test]
    fn test_summary_lists_everything() {
        let text = sample_log().summary();
        assert!(text.contains("thickness = 25 mm"));
        assert!(text.contains("yield_strength = 450 MPa"));
        assert!(text.contains("utilisation = 0.82 dimensionless"));
        assert!(text.contains("checked wall thickness"));
    }

    #[test]
    fn test_filter_is_exact_string_match() {
        let mut log = sample_log();
        // Dimensionally a stress, but a different unit string
        log.add_input("tensile_strength", quantity(535e6, "Pa"));

        let mpa = log.filter_inputs("MPa");
        assert_eq!(mpa.len(), 1);
        assert_eq!(mpa[0].0, "yield_strength");
        assert!(log.filter_inputs("psi").is_empty());
        assert_eq!(log.filter_outputs("dimensionless").len(), 1);
    }

    #[test]
    fn test_csv_export() {
        let csv = sample_log().to_csv().unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("role,name,magnitude,unit"));
        assert_eq!(lines.next(), Some("input,thickness,25,mm"));
        assert_eq!(lines.next(), Some("input,yield_strength,450,MPa"));
        assert_eq!(lines.next(), Some("output,utilisation,0.82,dimensionless"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_json_round_trips_quantities() {
        let log = sample_log();
        let json_text = log.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json_text).unwrap();
        let restored =
            TrackedQuantity::from_dict(&value["inputs"]["thickness"]).unwrap();
        assert_eq!(restored.magnitude(), 25.0);
        assert_eq!(restored.unit(), "mm");
    }
}
