// Demo: parse a config section, run a unit-checked calculation, and
// export the audit trail (JSON + CSV) and lineage graph (HTML).

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;

use serde_json::json;
use unit_trace::{
    export_audit_trail, AuditLog, CheckedCalc, LineageGraph, ParsedValue, UnitSystemPolicy,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let out_dir = args.get(1).map(String::as_str).unwrap_or("out");

    println!("unit-trace v{} demo", unit_trace::VERSION);

    // 1. A config section as it would come out of a project YAML,
    //    written in the metric-engineering convention
    let section = json!({
        "thickness": 25.0,
        "breadth": 300.0,
        "youngs_modulus": 210e3,
        "grade": "X65"
    });
    let parsed = unit_trace::parse_config_section(
        section.as_object().expect("inline object"),
        "metric_engineering",
        "config:plate.yml",
    )?;
    println!("✓ Parsed {} config fields", parsed.len());

    // 2. Enforce the SI convention at the calculation boundary
    let policy = UnitSystemPolicy::for_system("SI")?;
    let mut log = AuditLog::new();
    let mut args_si = Vec::new();
    for name in ["youngs_modulus", "thickness", "breadth"] {
        let quantity = match &parsed[name] {
            ParsedValue::Quantity(q) => q.clone(),
            ParsedValue::Raw(v) => anyhow::bail!("expected '{}' to carry a unit, got {}", name, v),
        };
        let quantity_type = unit_trace::quantity_type_for_field(name)
            .context("field should be in the inference table")?;
        let si = policy.enforce(&quantity, quantity_type)?;
        log.add_input(name, si.clone());
        args_si.push(si.into());
    }
    log.add_step("converted inputs to SI and ran plate bending stress");

    // 3. Unit-checked calculation
    let calc = CheckedCalc::new(
        "plate_bending_stress",
        &["youngs_modulus", "thickness", "breadth"],
        |a| a[0] * (a[1] / a[2]).powi(2),
    )
    .with_units(&[
        ("youngs_modulus", "Pa"),
        ("thickness", "m"),
        ("breadth", "m"),
    ])?
    .with_return_unit("Pa")
    .with_doc("Bending stress in a thin rectangular plate");

    let output = calc.call(&args_si)?;
    let stress = output
        .into_tracked()
        .context("tracked inputs should give a tracked result")?;
    println!(
        "✓ {} = {}",
        calc.name(),
        unit_trace::format_quantity(
            &stress,
            Some("MPa"),
            2,
            unit_trace::Notation::Auto,
            None
        )?
    );
    log.add_output("bending_stress", stress);

    // 4. Export artifacts
    let out = Path::new(out_dir);
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    fs::write(out.join("audit.json"), export_audit_trail(&log, "json")?)
        .context("writing audit.json")?;
    fs::write(out.join("audit.csv"), export_audit_trail(&log, "csv")?)
        .context("writing audit.csv")?;
    fs::write(
        out.join("lineage.html"),
        LineageGraph::from_audit_log(&log).to_html(),
    )
    .context("writing lineage.html")?;

    println!("✓ Wrote audit.json, audit.csv, lineage.html to {}/", out_dir);
    println!("\n{}", export_audit_trail(&log, "text")?);
    Ok(())
}
