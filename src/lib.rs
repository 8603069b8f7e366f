// Unit Trace - engineering-units provenance tracker
// Every numeric value carries its unit and a full audit trail through
// config parsing, conversion, arithmetic, and wrapped calculations.

pub mod error;
pub mod registry;
pub mod quantity;
pub mod wrapper;
pub mod systems;
pub mod config;
pub mod audit;
pub mod format;
pub mod lineage;

// Re-export commonly used types
pub use error::{Result, UnitsError};
pub use registry::{get_registry, Dimension, ParsedUnit, UnitRegistry};
pub use quantity::{Operation, ProvenanceEntry, TrackedQuantity};
pub use wrapper::{Argument, CalcOutput, CheckedCalc};
pub use systems::{unit_system, unit_system_names, UnitSystemPolicy};
pub use config::{parse_config_section, parse_config_value, quantity_type_for_field, ParsedValue};
pub use audit::{AuditLog, AuditStep};
pub use format::{export_audit_trail, format_quantity, format_with_provenance, Notation};
pub use lineage::{LineageEdge, LineageGraph, LineageNode, NodeRole};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
