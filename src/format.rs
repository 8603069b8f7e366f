// Output Formatter - text renderings of quantities and audit trails

use crate::audit::AuditLog;
use crate::error::{Result, UnitsError};
use crate::quantity::TrackedQuantity;
use std::fmt::Write as _;

// ============================================================================
// NOTATION
// ============================================================================

/// How the magnitude is printed. Auto switches to scientific outside the
/// comfortable fixed-point range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notation {
    Fixed,
    Scientific,
    #[default]
    Auto,
}

fn format_magnitude(magnitude: f64, precision: usize, notation: Notation) -> String {
    let scientific = match notation {
        Notation::Fixed => false,
        Notation::Scientific => true,
        Notation::Auto => {
            let abs = magnitude.abs();
            abs != 0.0 && !(1e-4..1e7).contains(&abs)
        }
    };
    if scientific {
        format!("{:.*e}", precision, magnitude)
    } else {
        format!("{:.*}", precision, magnitude)
    }
}

// ============================================================================
// TEMPLATES
// ============================================================================

/// Resolve a template argument: a registered name, or an ad-hoc pattern
/// (anything containing a `{` placeholder is used verbatim).
fn resolve_template(template: &str) -> Result<&str> {
    if template.contains('{') {
        return Ok(template);
    }
    match template {
        "plain" => Ok("{value} {unit}"),
        "bare" => Ok("{value}"),
        "annotated" => Ok("{value} {unit} ({source})"),
        other => Err(UnitsError::UnsupportedFormat(format!(
            "format template '{}'",
            other
        ))),
    }
}

// ============================================================================
// QUANTITY FORMATTING
// ============================================================================

/// Render a quantity, optionally converting first.
///
/// The template fills `{value}`, `{unit}` and `{source}` (the quantity's
/// original source label, empty when absent).
pub fn format_quantity(
    quantity: &TrackedQuantity,
    target_unit: Option<&str>,
    precision: usize,
    notation: Notation,
    template: Option<&str>,
) -> Result<String> {
    let converted;
    let quantity = match target_unit {
        Some(unit) => {
            converted = quantity.to(unit)?;
            &converted
        }
        None => quantity,
    };

    let pattern = resolve_template(template.unwrap_or("plain"))?;
    let value = format_magnitude(quantity.magnitude(), precision, notation);
    let source = quantity
        .provenance()
        .first()
        .and_then(|entry| entry.source.as_deref())
        .unwrap_or("");

    Ok(pattern
        .replace("{value}", &value)
        .replace("{unit}", quantity.unit())
        .replace("{source}", source))
}

/// Multiline rendering: the value line plus one line per provenance entry.
pub fn format_with_provenance(
    quantity: &TrackedQuantity,
    target_unit: Option<&str>,
) -> Result<String> {
    let converted;
    let quantity = match target_unit {
        Some(unit) => {
            converted = quantity.to(unit)?;
            &converted
        }
        None => quantity,
    };

    let mut out = String::new();
    let _ = writeln!(out, "{} {}", quantity.magnitude(), quantity.unit());
    for entry in quantity.provenance() {
        let _ = write!(
            out,
            "  - [{}] {}",
            entry.timestamp.to_rfc3339(),
            entry.operation
        );
        if let Some(source) = &entry.source {
            let _ = write!(out, " source={}", source);
        }
        if let (Some(from), Some(to)) = (&entry.from_unit, &entry.to_unit) {
            let _ = write!(out, " {} -> {}", from, to);
        }
        out.push('\n');
    }
    Ok(out)
}

// ============================================================================
// AUDIT TRAIL EXPORT
// ============================================================================

/// Export an audit log as "json", "text" or "csv". Anything else errors;
/// the formatter never guesses.
pub fn export_audit_trail(log: &AuditLog, format: &str) -> Result<String> {
    match format {
        "json" => log.to_json(),
        "text" => Ok(log.summary()),
        "csv" => log.to_csv(),
        other => Err(UnitsError::UnsupportedFormat(format!(
            "export format '{}'",
            other
        ))),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn quantity(magnitude: f64, unit: &str) -> TrackedQuantity {
        TrackedQuantity::new(magnitude, unit, "config:test").unwrap()
    }

    #[test]
    fn test_fixed_and_scientific() {
        let q = quantity(0.0254, "m");
        assert_eq!(
            format_quantity(&q, None, 3, Notation::Fixed, None).unwrap(),
            "0.025 m"
        );
        assert_eq!(
            format_quantity(&q, None, 2, Notation::Scientific, None).unwrap(),
            "2.54e-2 m"
        );
    }

    #[test]
    fn test_auto_notation_picks_scientific_for_extremes() {
        let big = quantity(210e9, "Pa");
        let text = format_quantity(&big, None, 2, Notation::Auto, None).unwrap();
        assert_eq!(text, "2.10e11 Pa");

        let ordinary = quantity(355.0, "MPa");
        let text = format_quantity(&ordinary, None, 1, Notation::Auto, None).unwrap();
        assert_eq!(text, "355.0 MPa");
    }

    #[test]
    fn test_conversion_before_formatting() {
        let q = quantity(1.0, "inch");
        let text = format_quantity(&q, Some("mm"), 1, Notation::Fixed, None).unwrap();
        assert_eq!(text, "25.4 mm");
    }

    #[test]
    fn test_registered_and_adhoc_templates() {
        let q = quantity(25.4, "mm");
        assert_eq!(
            format_quantity(&q, None, 1, Notation::Fixed, Some("bare")).unwrap(),
            "25.4"
        );
        assert_eq!(
            format_quantity(&q, None, 1, Notation::Fixed, Some("annotated")).unwrap(),
            "25.4 mm (config:test)"
        );
        assert_eq!(
            format_quantity(&q, None, 1, Notation::Fixed, Some("t = {value}{unit}")).unwrap(),
            "t = 25.4mm"
        );
    }

    #[test]
    fn test_unknown_template_name_errors() {
        let q = quantity(1.0, "m");
        let err = format_quantity(&q, None, 1, Notation::Fixed, Some("fancy")).unwrap_err();
        assert!(err.to_string().contains("fancy"));
    }

    #[test]
    fn test_provenance_rendering() {
        let q = quantity(1.0, "m").to("mm").unwrap();
        let text = format_with_provenance(&q, None).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3, "value line + 2 provenance entries");
        assert_eq!(lines[0], "1000 mm");
        assert!(lines[1].contains("created"));
        assert!(lines[1].contains("source=config:test"));
        assert!(lines[2].contains("converted"));
        assert!(lines[2].contains("m -> mm"));
    }

    #[test]
    fn test_export_audit_trail_formats() {
        let mut log = AuditLog::new();
        log.add_input("thickness", quantity(25.0, "mm"));
        log.add_step("sized the wall");

        let json_text = export_audit_trail(&log, "json").unwrap();
        assert!(json_text.contains("\"thickness\""));
        let text = export_audit_trail(&log, "text").unwrap();
        assert!(text.contains("sized the wall"));
        let csv_text = export_audit_trail(&log, "csv").unwrap();
        assert!(csv_text.starts_with("role,name,magnitude,unit"));

        let err = export_audit_trail(&log, "xml").unwrap_err();
        assert!(err.to_string().contains("xml"));
    }
}
