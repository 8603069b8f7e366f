// Computation Wrapper - unit-checked calculation calls
//
// Wraps a plain-number calculation with a parameter-to-unit map. Tracked
// arguments are converted to the declared units before the call and their
// provenance flows into the result; plain floats pass through untouched, so
// calculations written for bare numbers keep working unchanged.

use crate::error::{Result, UnitsError};
use crate::quantity::{ProvenanceEntry, TrackedQuantity};

// ============================================================================
// ARGUMENTS & RESULTS
// ============================================================================

/// One call argument: either a bare number or a Tracked Quantity.
#[derive(Debug, Clone)]
pub enum Argument {
    Plain(f64),
    Tracked(TrackedQuantity),
}

impl From<f64> for Argument {
    fn from(value: f64) -> Self {
        Argument::Plain(value)
    }
}

impl From<TrackedQuantity> for Argument {
    fn from(quantity: TrackedQuantity) -> Self {
        Argument::Tracked(quantity)
    }
}

/// What a checked call produced. Plain in, plain out: the wrapper never
/// forces tracking on callers who pass bare numbers.
#[derive(Debug, Clone)]
pub enum CalcOutput {
    Plain(f64),
    Tracked(TrackedQuantity),
}

impl CalcOutput {
    /// Bare magnitude regardless of variant.
    pub fn as_f64(&self) -> f64 {
        match self {
            CalcOutput::Plain(value) => *value,
            CalcOutput::Tracked(quantity) => quantity.magnitude(),
        }
    }

    pub fn tracked(&self) -> Option<&TrackedQuantity> {
        match self {
            CalcOutput::Tracked(quantity) => Some(quantity),
            CalcOutput::Plain(_) => None,
        }
    }

    pub fn into_tracked(self) -> Option<TrackedQuantity> {
        match self {
            CalcOutput::Tracked(quantity) => Some(quantity),
            CalcOutput::Plain(_) => None,
        }
    }
}

// ============================================================================
// CHECKED CALCULATION
// ============================================================================

#[derive(Debug, Clone)]
struct ParamSpec {
    name: String,
    expected_unit: Option<String>,
    default: Option<f64>,
}

type CalcFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// A calculation with a declared signature and unit expectations.
///
/// Built once, called many times. The name and doc string survive wrapping
/// so tooling can still identify the calculation.
pub struct CheckedCalc {
    name: String,
    doc: String,
    params: Vec<ParamSpec>,
    return_unit: Option<String>,
    func: CalcFn,
}

impl std::fmt::Debug for CheckedCalc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckedCalc")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .field("params", &self.params)
            .field("return_unit", &self.return_unit)
            .finish_non_exhaustive()
    }
}

impl CheckedCalc {
    /// Wrap a calculation. `params` is the positional signature; units and
    /// defaults attach afterwards by name.
    pub fn new<F>(name: &str, params: &[&str], func: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        CheckedCalc {
            name: name.to_string(),
            doc: String::new(),
            params: params
                .iter()
                .map(|p| ParamSpec {
                    name: p.to_string(),
                    expected_unit: None,
                    default: None,
                })
                .collect(),
            return_unit: None,
            func: Box::new(func),
        }
    }

    /// Declare expected units for named parameters. A name outside the
    /// signature fails here, at construction, not silently at call time.
    pub fn with_units(mut self, units: &[(&str, &str)]) -> Result<Self> {
        for (param, unit) in units {
            let spec = self.param_mut(param)?;
            spec.expected_unit = Some(unit.to_string());
        }
        Ok(self)
    }

    /// Declare the unit a tracked result is tagged with.
    pub fn with_return_unit(mut self, unit: &str) -> Self {
        self.return_unit = Some(unit.to_string());
        self
    }

    /// Attach a default for a trailing parameter.
    pub fn with_default(mut self, param: &str, value: f64) -> Result<Self> {
        let spec = self.param_mut(param)?;
        spec.default = Some(value);
        Ok(self)
    }

    pub fn with_doc(mut self, doc: &str) -> Self {
        self.doc = doc.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    fn param_mut(&mut self, param: &str) -> Result<&mut ParamSpec> {
        let name = self.name.clone();
        self.params
            .iter_mut()
            .find(|spec| spec.name == param)
            .ok_or(UnitsError::UnknownParameter {
                calc: name,
                param: param.to_string(),
            })
    }

    /// Run the calculation.
    ///
    /// Arguments bind positionally; trailing parameters fall back to their
    /// defaults. Tracked arguments with a declared unit are converted first
    /// (recording provenance); tracked arguments without one contribute their
    /// magnitude and history as-is. When a return unit is declared and at
    /// least one input was tracked, the raw result is wrapped with source
    /// "calculated:<name>" and the accumulated input provenance prepended.
    pub fn call(&self, args: &[Argument]) -> Result<CalcOutput> {
        if args.len() > self.params.len() {
            return Err(UnitsError::TooManyArguments {
                calc: self.name.clone(),
                expected: self.params.len(),
                given: args.len(),
            });
        }

        let mut magnitudes = Vec::with_capacity(self.params.len());
        let mut input_history: Vec<ProvenanceEntry> = Vec::new();
        let mut any_tracked = false;

        for (index, spec) in self.params.iter().enumerate() {
            let magnitude = match args.get(index) {
                Some(Argument::Plain(value)) => *value,
                Some(Argument::Tracked(quantity)) => {
                    any_tracked = true;
                    let bound = match &spec.expected_unit {
                        Some(unit) => quantity.to(unit)?,
                        None => quantity.clone(),
                    };
                    input_history.extend(bound.provenance().iter().cloned());
                    bound.magnitude()
                }
                None => spec.default.ok_or_else(|| UnitsError::MissingArgument {
                    calc: self.name.clone(),
                    param: spec.name.clone(),
                })?,
            };
            magnitudes.push(magnitude);
        }

        let raw = (self.func)(&magnitudes);

        match (&self.return_unit, any_tracked) {
            (Some(unit), true) => {
                let source = format!("calculated:{}", self.name);
                let result = TrackedQuantity::with_history(raw, unit, &source, input_history)?;
                Ok(CalcOutput::Tracked(result))
            }
            _ => Ok(CalcOutput::Plain(raw)),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
