// Unit System Policy - project-wide unit conventions
//
// A unit system maps abstract quantity types (length, stress, force, ...)
// onto one canonical unit each. Policies check quantities against that table
// by exact unit-string equality: the point is canonical-unit conformance,
// not dimensional compatibility.

use crate::error::{Result, UnitsError};
use crate::quantity::TrackedQuantity;
use once_cell::sync::Lazy;
use std::collections::HashMap;

// ============================================================================
// UNIT SYSTEM TABLES
// ============================================================================

type SystemTable = HashMap<&'static str, &'static str>;

static UNIT_SYSTEMS: Lazy<HashMap<&'static str, SystemTable>> = Lazy::new(|| {
    let mut systems = HashMap::new();

    systems.insert(
        "SI",
        HashMap::from([
            ("length", "m"),
            ("stress", "Pa"),
            ("pressure", "Pa"),
            ("force", "N"),
            ("moment", "N * m"),
            ("temperature", "K"),
            ("mass", "kg"),
        ]),
    );

    systems.insert(
        "inch",
        HashMap::from([
            ("length", "inch"),
            ("stress", "psi"),
            ("pressure", "psi"),
            ("force", "lbf"),
            ("moment", "lbf * inch"),
            ("temperature", "degF"),
            ("mass", "lb"),
        ]),
    );

    systems.insert(
        "metric_engineering",
        HashMap::from([
            ("length", "mm"),
            ("stress", "MPa"),
            ("pressure", "MPa"),
            ("force", "kN"),
            ("moment", "kN * m"),
            ("temperature", "degC"),
            ("mass", "kg"),
        ]),
    );

    systems
});

/// Look up a unit system's quantity-type table by name.
pub fn unit_system(name: &str) -> Result<&'static SystemTable> {
    UNIT_SYSTEMS
        .get(name)
        .ok_or_else(|| UnitsError::UnknownUnitSystem {
            name: name.to_string(),
            known: unit_system_names().join(", "),
        })
}

/// Registered unit system names, sorted.
pub fn unit_system_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = UNIT_SYSTEMS.keys().copied().collect();
    names.sort_unstable();
    names
}

// ============================================================================
// POLICY
// ============================================================================

/// Enforces one unit system's conventions on Tracked Quantities.
///
/// `strict` without `auto_convert` turns violations into errors;
/// `auto_convert` (the default) silently converts, preserving provenance.
#[derive(Debug, Clone)]
pub struct UnitSystemPolicy {
    system: String,
    strict: bool,
    auto_convert: bool,
    table: &'static SystemTable,
}

impl UnitSystemPolicy {
    /// Build a policy for a registered system. Fails at construction when
    /// the system name is unknown.
    pub fn new(system: &str, strict: bool, auto_convert: bool) -> Result<Self> {
        Ok(UnitSystemPolicy {
            system: system.to_string(),
            strict,
            auto_convert,
            table: unit_system(system)?,
        })
    }

    /// Default posture: non-strict, auto-converting.
    pub fn for_system(system: &str) -> Result<Self> {
        Self::new(system, false, true)
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Canonical unit for a quantity type, if this system maps it.
    pub fn canonical_unit(&self, quantity_type: &str) -> Option<&'static str> {
        self.table.get(quantity_type).copied()
    }

    /// True iff the quantity's unit string exactly equals the canonical unit
    /// for the quantity type. Unmapped quantity types always pass; the policy
    /// only governs what it knows about.
    pub fn validate(&self, quantity: &TrackedQuantity, quantity_type: &str) -> bool {
        match self.canonical_unit(quantity_type) {
            Some(expected) => quantity.unit() == expected,
            None => true,
        }
    }

    /// Bring a quantity into conformance.
    ///
    /// Already-valid or unmapped quantities come back unchanged. Violations
    /// fail under strict-without-auto-convert, otherwise auto-convert routes
    /// through `to()` so the conversion lands in the provenance history. With
    /// neither flag set the policy is validation-only and passes the quantity
    /// through.
    pub fn enforce(
        &self,
        quantity: &TrackedQuantity,
        quantity_type: &str,
    ) -> Result<TrackedQuantity> {
        let expected = match self.canonical_unit(quantity_type) {
            Some(expected) => expected,
            None => return Ok(quantity.clone()),
        };

        if quantity.unit() == expected {
            return Ok(quantity.clone());
        }

        if self.auto_convert {
            return quantity.to(expected);
        }

        if self.strict {
            return Err(UnitsError::PolicyViolation {
                quantity_type: quantity_type.to_string(),
                expected: expected.to_string(),
                actual: quantity.unit().to_string(),
            });
        }

        Ok(quantity.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================
