// Input Parser - unit inference for raw configuration values
//
// Raw config values become Tracked Quantities when (a) the value is numeric
// and (b) the field name maps to a quantity type the chosen unit system
// covers. Everything else passes through untouched - pass-through is the
// designed fallback, not an error.

use crate::error::Result;
use crate::quantity::TrackedQuantity;
use crate::systems::unit_system;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// FIELD NAME -> QUANTITY TYPE
// ============================================================================

static FIELD_QUANTITY_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Geometry
        ("thickness", "length"),
        ("wall_thickness", "length"),
        ("length", "length"),
        ("width", "length"),
        ("breadth", "length"),
        ("height", "length"),
        ("depth", "length"),
        ("span", "length"),
        ("diameter", "length"),
        ("outer_diameter", "length"),
        ("inner_diameter", "length"),
        ("radius", "length"),
        // Material
        ("yield_strength", "stress"),
        ("tensile_strength", "stress"),
        ("youngs_modulus", "stress"),
        ("elastic_modulus", "stress"),
        ("shear_modulus", "stress"),
        // Loading
        ("pressure", "pressure"),
        ("design_pressure", "pressure"),
        ("operating_pressure", "pressure"),
        ("internal_pressure", "pressure"),
        ("external_pressure", "pressure"),
        ("force", "force"),
        ("axial_force", "force"),
        ("tension", "force"),
        ("preload", "force"),
        ("moment", "moment"),
        ("bending_moment", "moment"),
        ("torque", "moment"),
        // Environment
        ("temperature", "temperature"),
        ("design_temperature", "temperature"),
        ("operating_temperature", "temperature"),
        // Mass
        ("mass", "mass"),
        ("unit_mass", "mass"),
    ])
});

/// Quantity type inferred from a config field name, if any. Pure lookup -
/// never guesses from partial matches.
pub fn quantity_type_for_field(field_name: &str) -> Option<&'static str> {
    FIELD_QUANTITY_TYPES.get(field_name).copied()
}

// ============================================================================
// PARSED VALUE
// ============================================================================

/// A config value after unit inference: either untouched raw JSON or a
/// Tracked Quantity.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Raw(Value),
    Quantity(TrackedQuantity),
}

impl ParsedValue {
    pub fn is_quantity(&self) -> bool {
        matches!(self, ParsedValue::Quantity(_))
    }

    pub fn as_quantity(&self) -> Option<&TrackedQuantity> {
        match self {
            ParsedValue::Quantity(q) => Some(q),
            ParsedValue::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            ParsedValue::Raw(v) => Some(v),
            ParsedValue::Quantity(_) => None,
        }
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse one config value.
///
/// Non-numeric values come back raw. An explicit unit wraps directly.
/// Otherwise the field name is looked up in the inference table and the
/// quantity type resolved against the named unit system; an unknown system
/// is an error, an unmapped field or quantity type is plain pass-through.
pub fn parse_config_value(
    value: &Value,
    field_name: &str,
    unit_system_name: &str,
    explicit_unit: Option<&str>,
    source: &str,
) -> Result<ParsedValue> {
    let magnitude = match value.as_f64() {
        Some(m) => m,
        None => return Ok(ParsedValue::Raw(value.clone())),
    };

    if let Some(unit) = explicit_unit {
        return Ok(ParsedValue::Quantity(TrackedQuantity::new(
            magnitude, unit, source,
        )?));
    }

    let quantity_type = match quantity_type_for_field(field_name) {
        Some(qt) => qt,
        None => return Ok(ParsedValue::Raw(value.clone())),
    };

    let table = unit_system(unit_system_name)?;
    match table.get(quantity_type) {
        Some(unit) => Ok(ParsedValue::Quantity(TrackedQuantity::new(
            magnitude, unit, source,
        )?)),
        None => Ok(ParsedValue::Raw(value.clone())),
    }
}

/// Parse a flat config section, preserving every key and substituting
/// Tracked Quantities where inference succeeded.
pub fn parse_config_section(
    section: &serde_json::Map<String, Value>,
    unit_system_name: &str,
    source: &str,
) -> Result<HashMap<String, ParsedValue>> {
    let mut parsed = HashMap::with_capacity(section.len());
    for (field, value) in section {
        parsed.insert(
            field.clone(),
            parse_config_value(value, field, unit_system_name, None, source)?,
        );
    }
    Ok(parsed)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_thickness_in_si_becomes_metres() {
        let parsed =
            parse_config_value(&json!(0.025), "thickness", "SI", None, "config:test").unwrap();
        let q = parsed.as_quantity().expect("thickness should be tracked");
        assert_eq!(q.magnitude(), 0.025);
        assert_eq!(q.unit(), "m");
        assert_eq!(
            q.provenance()[0].source.as_deref(),
            Some("config:test"),
            "source label must be recorded"
        );
    }

    #[test]
    fn test_systems_give_system_appropriate_units() {
        let inch = parse_config_value(&json!(12.0), "yield_strength", "inch", None, "t").unwrap();
        assert_eq!(inch.as_quantity().unwrap().unit(), "psi");

        let metric =
            parse_config_value(&json!(355.0), "yield_strength", "metric_engineering", None, "t")
                .unwrap();
        assert_eq!(metric.as_quantity().unwrap().unit(), "MPa");
    }

    #[test]
    fn test_explicit_unit_wins_over_inference() {
        let parsed =
            parse_config_value(&json!(25.0), "thickness", "SI", Some("mm"), "t").unwrap();
        assert_eq!(parsed.as_quantity().unwrap().unit(), "mm");
    }

    #[test]
    fn test_non_numeric_passes_through() {
        let value = json!("X65");
        let parsed = parse_config_value(&value, "thickness", "SI", None, "t").unwrap();
        assert_eq!(parsed, ParsedValue::Raw(value));

        let flag = json!(true);
        let parsed = parse_config_value(&flag, "thickness", "SI", None, "t").unwrap();
        assert_eq!(parsed, ParsedValue::Raw(flag));
    }

    #[test]
    fn test_unmapped_field_passes_through() {
        let value = json!(7.0);
        let parsed = parse_config_value(&value, "safety_class", "SI", None, "t").unwrap();
        assert_eq!(parsed, ParsedValue::Raw(value), "never guess units");
    }

    #[test]
    fn test_unknown_system_is_an_error() {
        let err = parse_config_value(&json!(1.0), "thickness", "cgs", None, "t").unwrap_err();
        assert!(err.to_string().contains("cgs"));
    }

    #[test]
    fn test_unknown_system_irrelevant_for_unmapped_field() {
        // No field mapping means the system table is never consulted
        let parsed = parse_config_value(&json!(1.0), "grade", "cgs", None, "t").unwrap();
        assert!(parsed.as_raw().is_some());
    }

    #[test]
    fn test_parse_section_preserves_all_keys() {
        let section = json!({
            "thickness": 0.025,
            "yield_strength": 450e6,
            "grade": "X65",
            "safety_factor": 1.1
        });
        let map = section.as_object().unwrap();
        let parsed = parse_config_section(map, "SI", "config:pipe").unwrap();

        assert_eq!(parsed.len(), 4);
        assert!(parsed["thickness"].is_quantity());
        assert!(parsed["yield_strength"].is_quantity());
        assert!(parsed["grade"].as_raw().is_some());
        // Numeric but unmapped field name: raw
        assert!(parsed["safety_factor"].as_raw().is_some());
    }
}
