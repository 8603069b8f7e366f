// Unit Registry - dimensional analysis engine + process-wide singleton
//
// Holds the unit table (SI/imperial mechanical units plus the custom
// energy-trading tokens), parses unit expressions, and converts values.
// Initialized once via get_registry(); read-only afterwards, so concurrent
// readers need no locking.

use crate::error::{Result, UnitsError};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// DIMENSION
// ============================================================================

/// Signed exponent vector over the seven SI base dimensions.
///
/// Display renders bracketed signatures: "[length]", "[mass] / [length] /
/// [time] ** 2". The zero vector renders the sentinel "dimensionless".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimension {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub temperature: i8,
    pub current: i8,
    pub substance: i8,
    pub luminosity: i8,
}

impl Dimension {
    pub const NONE: Dimension = Dimension {
        length: 0,
        mass: 0,
        time: 0,
        temperature: 0,
        current: 0,
        substance: 0,
        luminosity: 0,
    };

    pub const LENGTH: Dimension = Dimension {
        length: 1,
        ..Self::NONE
    };

    pub const MASS: Dimension = Dimension {
        mass: 1,
        ..Self::NONE
    };

    pub const TIME: Dimension = Dimension {
        time: 1,
        ..Self::NONE
    };

    pub const TEMPERATURE: Dimension = Dimension {
        temperature: 1,
        ..Self::NONE
    };

    /// mass * length / time^2
    pub const FORCE: Dimension = Dimension {
        mass: 1,
        length: 1,
        time: -2,
        ..Self::NONE
    };

    /// mass / length / time^2
    pub const PRESSURE: Dimension = Dimension {
        mass: 1,
        length: -1,
        time: -2,
        ..Self::NONE
    };

    /// mass * length^2 / time^2
    pub const ENERGY: Dimension = Dimension {
        mass: 1,
        length: 2,
        time: -2,
        ..Self::NONE
    };

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::NONE
    }

    fn combine(&self, other: &Dimension, scale: i8) -> Dimension {
        Dimension {
            length: self.length + other.length * scale,
            mass: self.mass + other.mass * scale,
            time: self.time + other.time * scale,
            temperature: self.temperature + other.temperature * scale,
            current: self.current + other.current * scale,
            substance: self.substance + other.substance * scale,
            luminosity: self.luminosity + other.luminosity * scale,
        }
    }

    /// Named exponents in alphabetical order (matches the rendered signature)
    fn exponents(&self) -> Vec<(&'static str, i8)> {
        vec![
            ("current", self.current),
            ("length", self.length),
            ("luminosity", self.luminosity),
            ("mass", self.mass),
            ("substance", self.substance),
            ("temperature", self.temperature),
            ("time", self.time),
        ]
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }

        let mut numerator: Vec<String> = Vec::new();
        let mut denominator: Vec<String> = Vec::new();
        for (name, exp) in self.exponents() {
            if exp > 0 {
                if exp == 1 {
                    numerator.push(format!("[{}]", name));
                } else {
                    numerator.push(format!("[{}] ** {}", name, exp));
                }
            } else if exp < 0 {
                if exp == -1 {
                    denominator.push(format!("[{}]", name));
                } else {
                    denominator.push(format!("[{}] ** {}", name, -exp));
                }
            }
        }

        let mut out = if numerator.is_empty() {
            "1".to_string()
        } else {
            numerator.join(" * ")
        };
        for part in denominator {
            out.push_str(" / ");
            out.push_str(&part);
        }
        write!(f, "{}", out)
    }
}

// ============================================================================
// PARSED UNIT
// ============================================================================

/// A unit expression resolved against the registry.
///
/// `factor`/`offset` map a value in this unit onto SI base units
/// (si = value * factor + offset); `terms` keeps the symbols as written for
/// canonical re-rendering after multiplication/division.
#[derive(Debug, Clone)]
pub struct ParsedUnit {
    pub terms: Vec<(String, i32)>,
    pub factor: f64,
    pub offset: f64,
    pub dim: Dimension,
}

/// Render merged terms back into a canonical unit string.
///
/// Same-symbol exponents collapse ("m * m" -> "m ** 2"), zero exponents drop
/// out, and a purely-denominator result renders as "1 / ...". An empty term
/// list is "dimensionless".
pub fn render_terms(terms: &[(String, i32)]) -> String {
    let mut merged: Vec<(String, i32)> = Vec::new();
    for (sym, exp) in terms {
        if let Some(entry) = merged.iter_mut().find(|(s, _)| s == sym) {
            entry.1 += exp;
        } else {
            merged.push((sym.clone(), *exp));
        }
    }
    merged.retain(|(_, exp)| *exp != 0);

    if merged.is_empty() {
        return "dimensionless".to_string();
    }

    let mut numerator: Vec<String> = Vec::new();
    let mut denominator: Vec<String> = Vec::new();
    for (sym, exp) in &merged {
        if *exp > 0 {
            if *exp == 1 {
                numerator.push(sym.clone());
            } else {
                numerator.push(format!("{} ** {}", sym, exp));
            }
        } else if *exp == -1 {
            denominator.push(sym.clone());
        } else {
            denominator.push(format!("{} ** {}", sym, -exp));
        }
    }

    let mut out = if numerator.is_empty() {
        "1".to_string()
    } else {
        numerator.join(" * ")
    };
    for part in denominator {
        out.push_str(" / ");
        out.push_str(&part);
    }
    out
}

// ============================================================================
// UNIT REGISTRY
// ============================================================================

#[derive(Debug, Clone)]
struct UnitDef {
    factor: f64,
    offset: f64,
    dim: Dimension,
}

/// Catalog of every unit token the crate understands.
///
/// Constructed once by `get_registry()`; the mutable definition path is
/// private, so the shared instance is read-only for its whole life.
pub struct UnitRegistry {
    units: HashMap<String, UnitDef>,
}

// 1 BTU in joules (International Table)
const BTU_J: f64 = 1055.055_852_62;

impl UnitRegistry {
    fn new() -> Self {
        let mut reg = UnitRegistry {
            units: HashMap::new(),
        };
        reg.register_builtin_units();
        reg.register_energy_units();
        reg
    }

    fn define(&mut self, names: &[&str], factor: f64, dim: Dimension) {
        for name in names {
            self.units.insert(
                name.to_string(),
                UnitDef {
                    factor,
                    offset: 0.0,
                    dim,
                },
            );
        }
    }

    fn define_offset(&mut self, names: &[&str], factor: f64, offset: f64) {
        for name in names {
            self.units.insert(
                name.to_string(),
                UnitDef {
                    factor,
                    offset,
                    dim: Dimension::TEMPERATURE,
                },
            );
        }
    }

    fn register_builtin_units(&mut self) {
        // ====================================================================
        // LENGTH
        // ====================================================================
        self.define(&["m", "meter", "metre", "meters"], 1.0, Dimension::LENGTH);
        self.define(&["mm", "millimeter", "millimetre"], 1e-3, Dimension::LENGTH);
        self.define(&["cm", "centimeter", "centimetre"], 1e-2, Dimension::LENGTH);
        self.define(&["km", "kilometer", "kilometre"], 1e3, Dimension::LENGTH);
        self.define(&["inch", "in", "inches"], 0.0254, Dimension::LENGTH);
        self.define(&["ft", "foot", "feet"], 0.3048, Dimension::LENGTH);

        // ====================================================================
        // MASS
        // ====================================================================
        self.define(&["kg", "kilogram", "kilograms"], 1.0, Dimension::MASS);
        self.define(&["g", "gram", "grams"], 1e-3, Dimension::MASS);
        self.define(&["lb", "pound", "pounds", "lbm"], 0.453_592_37, Dimension::MASS);
        self.define(&["tonne", "t"], 1e3, Dimension::MASS);

        // ====================================================================
        // TIME
        // ====================================================================
        self.define(&["s", "second", "seconds", "sec"], 1.0, Dimension::TIME);
        self.define(&["min", "minute", "minutes"], 60.0, Dimension::TIME);
        self.define(&["hr", "h", "hour", "hours"], 3600.0, Dimension::TIME);

        // ====================================================================
        // FORCE
        // ====================================================================
        self.define(&["N", "newton", "newtons"], 1.0, Dimension::FORCE);
        self.define(&["kN", "kilonewton"], 1e3, Dimension::FORCE);
        self.define(&["MN", "meganewton"], 1e6, Dimension::FORCE);
        self.define(&["lbf"], 4.448_221_615_260_5, Dimension::FORCE);
        self.define(&["kip", "kips"], 4448.221_615_260_5, Dimension::FORCE);

        // ====================================================================
        // PRESSURE / STRESS
        // ====================================================================
        self.define(&["Pa", "pascal", "pascals"], 1.0, Dimension::PRESSURE);
        self.define(&["kPa", "kilopascal"], 1e3, Dimension::PRESSURE);
        self.define(&["MPa", "megapascal"], 1e6, Dimension::PRESSURE);
        self.define(&["GPa", "gigapascal"], 1e9, Dimension::PRESSURE);
        self.define(&["bar"], 1e5, Dimension::PRESSURE);
        self.define(&["psi"], 6894.757_293_168, Dimension::PRESSURE);
        // kpsi is the legacy spelling still found in older pipeline specs
        self.define(&["ksi", "kpsi"], 6.894_757_293_168e6, Dimension::PRESSURE);

        // ====================================================================
        // ENERGY
        // ====================================================================
        self.define(&["J", "joule", "joules"], 1.0, Dimension::ENERGY);
        self.define(&["kJ", "kilojoule"], 1e3, Dimension::ENERGY);
        self.define(&["MJ", "megajoule"], 1e6, Dimension::ENERGY);
        self.define(&["GJ", "gigajoule"], 1e9, Dimension::ENERGY);
        self.define(&["kWh", "kilowatt_hour"], 3.6e6, Dimension::ENERGY);

        // ====================================================================
        // TEMPERATURE (affine: si = value * factor + offset)
        // ====================================================================
        self.define_offset(&["K", "kelvin"], 1.0, 0.0);
        self.define_offset(&["degC", "celsius"], 1.0, 273.15);
        self.define_offset(&["degF", "fahrenheit"], 5.0 / 9.0, 255.372_222_222_222_24);
        self.define_offset(&["degR", "rankine"], 5.0 / 9.0, 0.0);
    }

    /// Custom energy-trading tokens, each a fixed multiple of BTU so that
    /// conversions compose through the ordinary unit algebra.
    fn register_energy_units(&mut self) {
        self.define(&["BTU", "btu"], BTU_J, Dimension::ENERGY);
        self.define(&["MMBTU", "mmbtu"], 1e6 * BTU_J, Dimension::ENERGY);
        self.define(&["THERM", "therm"], 1e5 * BTU_J, Dimension::ENERGY);
        // 1 barrel of oil equivalent = 5.8e6 BTU
        self.define(&["BOE", "boe"], 5.8e6 * BTU_J, Dimension::ENERGY);
        // 1 tonne of oil equivalent = 41.868 GJ
        self.define(&["TOE", "toe"], 41.868e9, Dimension::ENERGY);
        // Standard cubic foot of natural gas at 1020 BTU/scf heating value
        self.define(&["SCF", "scf"], 1020.0 * BTU_J, Dimension::ENERGY);
        self.define(&["MCF", "mcf"], 1020.0e3 * BTU_J, Dimension::ENERGY);
        self.define(&["MMCF", "mmcf"], 1020.0e6 * BTU_J, Dimension::ENERGY);
        self.define(&["BCF", "bcf"], 1020.0e9 * BTU_J, Dimension::ENERGY);
        self.define(&["TCF", "tcf"], 1020.0e12 * BTU_J, Dimension::ENERGY);
    }

    /// Parse a unit expression.
    ///
    /// Grammar: terms separated by `*` and `/`, exponents via `**` or `^`,
    /// whitespace ignored. Division is left-associative: everything after a
    /// `/` divides ("kg / m / s" == "kg / (m * s)"). The literal token `1`
    /// is the neutral numerator ("1 / s").
    pub fn parse(&self, unit: &str) -> Result<ParsedUnit> {
        let trimmed = unit.trim();
        if trimmed.is_empty() {
            return Err(UnitsError::UnknownUnit(unit.to_string()));
        }
        if trimmed == "dimensionless" {
            return Ok(ParsedUnit {
                terms: Vec::new(),
                factor: 1.0,
                offset: 0.0,
                dim: Dimension::NONE,
            });
        }

        // Normalize "**" to "^" so "*" is unambiguous as a separator
        let normalized = trimmed.replace("**", "^");

        let mut terms: Vec<(String, i32)> = Vec::new();
        let mut factor = 1.0_f64;
        let mut dim = Dimension::NONE;
        let mut single_offset: Option<f64> = None;

        // Each separator fixes the sign of the token that follows it;
        // left-associative, so "kg / m * s" is (kg / m) * s
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
                return Err(UnitsError::UnknownUnit(unit.to_string()));
            }
            if token == "1" {
                continue;
            }

            let (symbol, exp) = match token.split_once('^') {
                Some((sym, e)) => {
                    let exp: i32 = e
                        .trim()
                        .parse()
                        .map_err(|_| UnitsError::UnknownUnit(unit.to_string()))?;
                    (sym.trim(), exp)
                }
                None => (token, 1),
            };

            let def = self
                .units
                .get(symbol)
                .ok_or_else(|| UnitsError::UnknownUnit(symbol.to_string()))?;

            let signed_exp = exp * this_sign;
            factor *= def.factor.powi(signed_exp);
            dim = dim.combine(&def.dim, signed_exp as i8);
            terms.push((symbol.to_string(), signed_exp));

            if def.offset != 0.0 {
                single_offset = Some(def.offset);
            }
        }

        // Affine offsets (degC, degF) only apply when the unit stands alone
        // with exponent 1; inside compound expressions the scale alone is used
        let offset = match (terms.len(), terms.first()) {
            (1, Some((_, 1))) => single_offset.unwrap_or(0.0),
            _ => 0.0,
        };

        Ok(ParsedUnit {
            terms,
            factor,
            offset,
            dim,
        })
    }

    /// Convert a value between two units of the same dimensionality.
    pub fn convert(&self, value: f64, from: &str, to: &str) -> Result<f64> {
        let pf = self.parse(from)?;
        let pt = self.parse(to)?;
        if pf.dim != pt.dim {
            return Err(UnitsError::DimensionMismatch {
                operation: "convert".to_string(),
                left: from.to_string(),
                right: to.to_string(),
                left_dim: pf.dim.to_string(),
                right_dim: pt.dim.to_string(),
            });
        }
        let si = value * pf.factor + pf.offset;
        Ok((si - pt.offset) / pt.factor)
    }

    /// Dimensional signature of a unit expression.
    pub fn dimensionality(&self, unit: &str) -> Result<Dimension> {
        Ok(self.parse(unit)?.dim)
    }

    /// True iff both unit strings parse and share a dimensionality.
    /// Never errors: unknown units are simply incompatible.
    pub fn compatible(&self, a: &str, b: &str) -> bool {
        match (self.parse(a), self.parse(b)) {
            (Ok(pa), Ok(pb)) => pa.dim == pb.dim,
            _ => false,
        }
    }

    /// True iff the registry knows every token in the expression.
    pub fn knows(&self, unit: &str) -> bool {
        self.parse(unit).is_ok()
    }
}

// ============================================================================
// SINGLETON ACCESS
// ============================================================================

static REGISTRY: Lazy<UnitRegistry> = Lazy::new(UnitRegistry::new);

/// The process-wide registry. First caller initializes; everyone afterwards
/// gets the same read-only instance (Lazy guards the check-and-create).
pub fn get_registry() -> &'static UnitRegistry {
    &REGISTRY
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, rel: f64) -> bool {
        (a - b).abs() <= rel * b.abs().max(1e-300)
    }

    #[test]
    fn test_singleton_identity() {
        let a = get_registry() as *const UnitRegistry;
        let b = get_registry() as *const UnitRegistry;
        assert_eq!(a, b, "get_registry should return one shared instance");
    }

    #[test]
    fn test_simple_conversions() {
        let reg = get_registry();
        assert!(close(reg.convert(1.0, "m", "mm").unwrap(), 1000.0, 1e-12));
        assert!(close(reg.convert(1.0, "inch", "mm").unwrap(), 25.4, 1e-12));
        assert!(close(reg.convert(1.0, "psi", "Pa").unwrap(), 6894.757293168, 1e-12));
        assert!(close(reg.convert(1.0, "ksi", "psi").unwrap(), 1000.0, 1e-12));
        assert!(close(reg.convert(1.0, "kpsi", "psi").unwrap(), 1000.0, 1e-12));
    }

    #[test]
    fn test_conversion_transitivity() {
        let reg = get_registry();
        // m -> inch -> mm must agree with m -> mm
        let via = reg
            .convert(reg.convert(2.5, "m", "inch").unwrap(), "inch", "mm")
            .unwrap();
        let direct = reg.convert(2.5, "m", "mm").unwrap();
        assert!(close(via, direct, 1e-9), "via={} direct={}", via, direct);
    }

    #[test]
    fn test_boe_to_mmbtu() {
        let reg = get_registry();
        let got = reg.convert(1.0, "BOE", "MMBTU").unwrap();
        assert!(close(got, 5.8, 1e-3), "1 BOE should be 5.8 MMBTU, got {}", got);
    }

    #[test]
    fn test_gas_volume_chain() {
        let reg = get_registry();
        assert!(close(reg.convert(1.0, "MCF", "SCF").unwrap(), 1000.0, 1e-9));
        assert!(close(reg.convert(1.0, "BCF", "MMCF").unwrap(), 1000.0, 1e-9));
        assert!(close(reg.convert(1.0, "TCF", "BCF").unwrap(), 1000.0, 1e-9));
        assert!(close(reg.convert(1.0, "MMBTU", "THERM").unwrap(), 10.0, 1e-9));
    }

    #[test]
    fn test_temperature_offsets() {
        let reg = get_registry();
        assert!(close(reg.convert(0.0, "degC", "K").unwrap(), 273.15, 1e-9));
        assert!(close(reg.convert(212.0, "degF", "degC").unwrap(), 100.0, 1e-9));
        assert!(close(reg.convert(100.0, "degC", "degF").unwrap(), 212.0, 1e-9));
    }

    #[test]
    fn test_compound_units() {
        let reg = get_registry();
        // density
        let p = reg.parse("kg / m ** 3").unwrap();
        assert_eq!(
            p.dim,
            Dimension {
                mass: 1,
                length: -3,
                ..Dimension::NONE
            }
        );
        // moment: N * m has energy dimensionality
        assert!(reg.compatible("N * m", "J"));
        assert!(close(reg.convert(1.0, "kN * m", "N * m").unwrap(), 1000.0, 1e-12));
    }

    #[test]
    fn test_unknown_unit() {
        let reg = get_registry();
        let err = reg.parse("furlongs_per_fortnight").unwrap_err();
        assert!(err.to_string().contains("furlongs_per_fortnight"));
        assert!(!reg.compatible("m", "no_such_unit"));
    }

    #[test]
    fn test_incompatible_conversion() {
        let reg = get_registry();
        let err = reg.convert(1.0, "Pa", "m").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Pa") && msg.contains("m"), "message: {}", msg);
        assert!(msg.contains("convert"));
    }

    #[test]
    fn test_dimension_display() {
        assert_eq!(Dimension::LENGTH.to_string(), "[length]");
        assert_eq!(
            Dimension::PRESSURE.to_string(),
            "[mass] / [length] / [time] ** 2"
        );
        assert_eq!(
            Dimension::ENERGY.to_string(),
            "[length] ** 2 * [mass] / [time] ** 2"
        );
        assert_eq!(Dimension::NONE.to_string(), "dimensionless");
    }

    #[test]
    fn test_render_terms() {
        assert_eq!(
            render_terms(&[("m".to_string(), 1), ("m".to_string(), 1)]),
            "m ** 2"
        );
        assert_eq!(
            render_terms(&[("m".to_string(), 1), ("s".to_string(), -1)]),
            "m / s"
        );
        assert_eq!(render_terms(&[("s".to_string(), -1)]), "1 / s");
        assert_eq!(
            render_terms(&[("m".to_string(), 1), ("m".to_string(), -1)]),
            "dimensionless"
        );
    }

    #[test]
    fn test_one_over_parses() {
        let reg = get_registry();
        let p = reg.parse("1 / s").unwrap();
        assert_eq!(
            p.dim,
            Dimension {
                time: -1,
                ..Dimension::NONE
            }
        );
    }
}
