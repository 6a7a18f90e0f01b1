//! Python bindings for Warrior Sim using PyO3

use crate::config::FightConfig;
use crate::simulation::run_batch;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

/// Run a batch from a JSON config and return the JSON AggregateResult
#[pyfunction]
fn simulate(py: Python<'_>, config_json: &str) -> PyResult<String> {
    let config = FightConfig::from_json(config_json)
        .map_err(|e| PyErr::new::<PyValueError, _>(format!("Invalid config JSON: {}", e)))?;

    // Release GIL during computation to prevent GUI freezing
    let result = py
        .allow_threads(|| run_batch(&config))
        .map_err(|e| PyErr::new::<PyValueError, _>(e.to_string()))?;

    serde_json::to_string(&result)
        .map_err(|e| PyErr::new::<PyRuntimeError, _>(format!("Failed to serialize results: {}", e)))
}

/// The default configuration as JSON, for building forms
#[pyfunction]
fn default_config() -> PyResult<String> {
    serde_json::to_string(&FightConfig::default())
        .map_err(|e| PyErr::new::<PyRuntimeError, _>(format!("Failed to serialize config: {}", e)))
}

/// Python module definition
#[pymodule]
fn warrior_sim_lib(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(simulate, m)?)?;
    m.add_function(wrap_pyfunction!(default_config, m)?)?;
    Ok(())
}
