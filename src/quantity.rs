// Tracked Quantity - a number + unit + append-only provenance history
//
// Quantities are immutable value objects: every operation returns a new
// instance carrying a freshly cloned, extended history. Two quantities never
// share mutable provenance state.

use crate::error::{Result, UnitsError};
use crate::registry::{get_registry, render_terms};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PROVENANCE
// ============================================================================

/// What produced a provenance entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Created,
    Converted,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Created => "created",
            Operation::Converted => "converted",
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        };
        write!(f, "{}", name)
    }
}

/// One record in a quantity's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Wall-clock UTC time the operation happened (RFC 3339 on the wire)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    /// Where the value came from ("config:riser.yml", "calculated:stress", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_unit: Option<String>,
}

impl ProvenanceEntry {
    fn now(operation: Operation) -> Self {
        ProvenanceEntry {
            timestamp: Utc::now(),
            operation,
            source: None,
            from_unit: None,
            to_unit: None,
        }
    }

    fn created(source: &str) -> Self {
        ProvenanceEntry {
            source: Some(source.to_string()),
            ..Self::now(Operation::Created)
        }
    }

    fn converted(from_unit: &str, to_unit: &str) -> Self {
        ProvenanceEntry {
            from_unit: Some(from_unit.to_string()),
            to_unit: Some(to_unit.to_string()),
            ..Self::now(Operation::Converted)
        }
    }
}

// ============================================================================
// TRACKED QUANTITY
// ============================================================================

/// A numeric value bound to a unit and its full provenance history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedQuantity {
    magnitude: f64,
    unit: String,
    provenance: Vec<ProvenanceEntry>,
}

impl TrackedQuantity {
    /// Create a quantity with one `created` entry recording the source label.
    /// Fails if the registry does not recognize the unit.
    pub fn new(magnitude: f64, unit: &str, source: &str) -> Result<Self> {
        get_registry().parse(unit)?;
        Ok(TrackedQuantity {
            magnitude,
            unit: unit.to_string(),
            provenance: vec![ProvenanceEntry::created(source)],
        })
    }

    /// Create a quantity whose history starts with the given ancestor entries
    /// followed by its own `created` entry. Used by the computation wrapper
    /// to carry input provenance into a calculated result.
    pub(crate) fn with_history(
        magnitude: f64,
        unit: &str,
        source: &str,
        mut history: Vec<ProvenanceEntry>,
    ) -> Result<Self> {
        get_registry().parse(unit)?;
        history.push(ProvenanceEntry::created(source));
        Ok(TrackedQuantity {
            magnitude,
            unit: unit.to_string(),
            provenance: history,
        })
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn provenance(&self) -> &[ProvenanceEntry] {
        &self.provenance
    }

    // ========================================================================
    // CONVERSION
    // ========================================================================

    /// Convert to another unit. Returns a NEW quantity with a `converted`
    /// entry appended; self is unchanged.
    pub fn to(&self, target_unit: &str) -> Result<Self> {
        let converted = get_registry().convert(self.magnitude, &self.unit, target_unit)?;
        let mut provenance = self.provenance.clone();
        provenance.push(ProvenanceEntry::converted(&self.unit, target_unit));
        Ok(TrackedQuantity {
            magnitude: converted,
            unit: target_unit.to_string(),
            provenance,
        })
    }

    // ========================================================================
    // DIMENSIONAL INSPECTION
    // ========================================================================

    /// Human-readable dimensional signature ("[length]", "dimensionless", ...).
    pub fn dimensions(&self) -> String {
        match get_registry().dimensionality(&self.unit) {
            Ok(dim) => dim.to_string(),
            // Unit was validated at construction; unreachable in practice
            Err(_) => "unknown".to_string(),
        }
    }

    /// True iff the given unit string shares this quantity's dimensionality.
    /// Never errors; unknown units are simply incompatible.
    pub fn is_compatible(&self, unit: &str) -> bool {
        get_registry().compatible(&self.unit, unit)
    }

    /// True iff the other quantity shares this one's dimensionality.
    pub fn is_compatible_with(&self, other: &TrackedQuantity) -> bool {
        self.is_compatible(&other.unit)
    }

    /// Check this quantity against an expected dimensional signature
    /// ("[length]") or unit string ("m"). Errors name both sides.
    pub fn check_dimensions(&self, expected: &str) -> Result<()> {
        let registry = get_registry();
        let actual = registry.dimensionality(&self.unit)?;

        let expected_dim = if expected.trim().starts_with('[') || expected.trim() == "dimensionless"
        {
            parse_signature(expected)?
        } else {
            registry.dimensionality(expected)?
        };

        if actual != expected_dim {
            return Err(UnitsError::DimensionCheck {
                actual: actual.to_string(),
                expected: expected_dim.to_string(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // ARITHMETIC
    // ========================================================================

    /// Add two quantities. Requires compatible dimensions; the result is
    /// expressed in the right operand's unit. Provenance is the concatenation
    /// of both histories plus one `add` entry.
    pub fn add(&self, other: &TrackedQuantity) -> Result<Self> {
        self.linear_op(other, Operation::Add)
    }

    /// Subtract, with the same unit and provenance rules as `add`.
    pub fn subtract(&self, other: &TrackedQuantity) -> Result<Self> {
        self.linear_op(other, Operation::Subtract)
    }

    fn linear_op(&self, other: &TrackedQuantity, op: Operation) -> Result<Self> {
        let registry = get_registry();
        if !registry.compatible(&self.unit, &other.unit) {
            let left_dim = registry
                .dimensionality(&self.unit)
                .map(|d| d.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            let right_dim = registry
                .dimensionality(&other.unit)
                .map(|d| d.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(UnitsError::DimensionMismatch {
                operation: op.to_string(),
                left: self.unit.clone(),
                right: other.unit.clone(),
                left_dim,
                right_dim,
            });
        }

        let left_in_right = registry.convert(self.magnitude, &self.unit, &other.unit)?;
        let magnitude = match op {
            Operation::Add => left_in_right + other.magnitude,
            Operation::Subtract => left_in_right - other.magnitude,
            _ => unreachable!("linear_op only handles add/subtract"),
        };

        let mut provenance = self.provenance.clone();
        provenance.extend(other.provenance.iter().cloned());
        provenance.push(ProvenanceEntry::now(op));

        Ok(TrackedQuantity {
            magnitude,
            unit: other.unit.clone(),
            provenance,
        })
    }

    /// Multiply two quantities; units combine through the registry's term
    /// algebra ("m" * "m" -> "m ** 2"). Always succeeds.
    pub fn multiply(&self, other: &TrackedQuantity) -> Self {
        self.product_op(other, Operation::Multiply)
    }

    /// Divide two quantities; same-symbol terms cancel ("m" / "m" ->
    /// "dimensionless"). Always succeeds.
    pub fn divide(&self, other: &TrackedQuantity) -> Self {
        self.product_op(other, Operation::Divide)
    }

    fn product_op(&self, other: &TrackedQuantity, op: Operation) -> Self {
        let registry = get_registry();
        // Both units were validated at construction, so these parses hold
        let mut terms = registry
            .parse(&self.unit)
            .map(|p| p.terms)
            .unwrap_or_default();
        let other_terms = registry
            .parse(&other.unit)
            .map(|p| p.terms)
            .unwrap_or_default();

        let (magnitude, negate) = match op {
            Operation::Multiply => (self.magnitude * other.magnitude, 1),
            Operation::Divide => (self.magnitude / other.magnitude, -1),
            _ => unreachable!("product_op only handles multiply/divide"),
        };
        for (sym, exp) in other_terms {
            terms.push((sym, exp * negate));
        }

        let mut provenance = self.provenance.clone();
        provenance.extend(other.provenance.iter().cloned());
        provenance.push(ProvenanceEntry::now(op));

        TrackedQuantity {
            magnitude,
            unit: render_terms(&terms),
            provenance,
        }
    }

    // ========================================================================
    // SERIALIZATION
    // ========================================================================

    /// Structured export: {"magnitude": ..., "unit": ..., "provenance": [...]}.
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Rebuild a quantity from `to_dict` output, re-validating the unit.
    pub fn from_dict(value: &serde_json::Value) -> Result<Self> {
        let quantity: TrackedQuantity = serde_json::from_value(value.clone())
            .map_err(|e| UnitsError::InvalidSerialized(e.to_string()))?;
        get_registry().parse(&quantity.unit)?;
        Ok(quantity)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| UnitsError::InvalidSerialized(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let quantity: TrackedQuantity =
            serde_json::from_str(json).map_err(|e| UnitsError::InvalidSerialized(e.to_string()))?;
        get_registry().parse(&quantity.unit)?;
        Ok(quantity)
    }
}

impl fmt::Display for TrackedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

/// Bare magnitude for interop with code expecting a plain number.
impl From<TrackedQuantity> for f64 {
    fn from(q: TrackedQuantity) -> f64 {
        q.magnitude
    }
}

/// Parse a dimensional signature like "[mass] / [length] / [time] ** 2"
/// back into a Dimension.
fn parse_signature(signature: &str) -> Result<crate::registry::Dimension> {
    use crate::registry::Dimension;

    let trimmed = signature.trim();
    if trimmed == "dimensionless" {
        return Ok(Dimension::NONE);
    }

    let normalized = trimmed.replace("**", "^");
    let mut dim = Dimension::NONE;
    let mut pending_sign = 1i32;
    for raw in normalized.split_inclusive(['*', '/']) {
        let (token, next_sign) = if let Some(t) = raw.strip_suffix('*') {
            (t, 1)
        } else if let Some(t) = raw.strip_suffix('/') {
            (t, -1)
        } else {
            (raw, 1)
        };
        let token = token.trim();
        let this_sign = pending_sign;
        pending_sign = next_sign;
        if token.is_empty() {
            return Err(UnitsError::InvalidSerialized(format!(
                "malformed dimension signature '{}'",
                signature
            )));
        }
        if token == "1" {
            continue;
        }

        let (name_part, exp) = match token.split_once('^') {
            Some((n, e)) => {
                let exp: i32 = e.trim().parse().map_err(|_| {
                    UnitsError::InvalidSerialized(format!(
                        "malformed dimension signature '{}'",
                        signature
                    ))
                })?;
                (n.trim(), exp)
            }
            None => (token, 1),
        };
        let name = name_part.trim_matches(['[', ']']).trim();
        let signed = (exp * this_sign) as i8;
        let base = match name {
            "length" => Dimension::LENGTH,
            "mass" => Dimension::MASS,
            "time" => Dimension::TIME,
            "temperature" => Dimension::TEMPERATURE,
            "current" => Dimension {
                current: 1,
                ..Dimension::NONE
            },
            "substance" => Dimension {
                substance: 1,
                ..Dimension::NONE
            },
            "luminosity" => Dimension {
                luminosity: 1,
                ..Dimension::NONE
            },
            other => {
                return Err(UnitsError::InvalidSerialized(format!(
                    "unknown dimension name '{}'",
                    other
                )))
            }
        };
        dim = Dimension {
            length: dim.length + base.length * signed,
            mass: dim.mass + base.mass * signed,
            time: dim.time + base.time * signed,
            temperature: dim.temperature + base.temperature * signed,
            current: dim.current + base.current * signed,
            substance: dim.substance + base.substance * signed,
            luminosity: dim.luminosity + base.luminosity * signed,
        };
    }
    Ok(dim)
}

// ============================================================================
// TESTS
// ============================================================================
