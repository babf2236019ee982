//! Spatiotemporal model of a leaf pathogen spreading across a cellular grid,
//! held back by callose deposition and optionally by antibiotic treatment.

pub mod config;
pub mod defense;
pub mod field;
pub mod grid;
pub mod infection;
pub mod pharmacokinetics;
pub mod simulation;

pub use config::{DrugParams, DrugParamsError, SimConfig, SimConfigError};
pub use simulation::{
    Frame, MemoryRecorder, NullRecorder, Recorder, RunPhase, RunSummary, Scenario, Simulation,
    SimulationError, StepRecord,
};
