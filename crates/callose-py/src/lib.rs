use callose_core::{MemoryRecorder, Scenario, SimConfig, Simulation};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::str::FromStr;

/// Minimal PyO3 module exposing callose-core to Python.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Run one scenario and return `{"summary": ..., "steps": [...]}` as JSON.
#[pyfunction]
#[pyo3(signature = (scenario, config_json=None))]
fn run_scenario(scenario: &str, config_json: Option<&str>) -> PyResult<String> {
    let scenario = Scenario::from_str(scenario)
        .map_err(|_| PyValueError::new_err(format!("unknown scenario: {scenario}")))?;
    let config = match config_json {
        Some(json) => SimConfig::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))?,
        None => SimConfig::default(),
    };
    let mut sim = Simulation::new(config).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let mut recorder = MemoryRecorder::new(false);
    let summary = sim
        .run(scenario, &mut recorder)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    let output = serde_json::json!({
        "summary": summary,
        "steps": recorder.steps,
    });
    serde_json::to_string(&output).map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(run_scenario, m)?)?;
    Ok(())
}
