use super::Scenario;
use serde::{Deserialize, Serialize};
use std::io;

/// Aggregate state at the end of one simulated day.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub day: usize,
    pub mean_infection: f64,
    pub mean_callose: f64,
    pub drug_concentration: f64,
}

/// One cell of a per-day frame. `drug` is the grid-wide concentration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub i: usize,
    pub j: usize,
    pub infection: f64,
    pub callose: f64,
    pub drug: f64,
}

/// Full per-cell snapshot of both fields at the end of a day.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub day: usize,
    pub drug_concentration: f64,
    pub size: usize,
    pub infection: Vec<f64>,
    pub callose: Vec<f64>,
}

impl Frame {
    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellRecord> + '_ {
        self.infection
            .iter()
            .zip(&self.callose)
            .enumerate()
            .map(move |(idx, (&infection, &callose))| CellRecord {
                i: idx / self.size,
                j: idx % self.size,
                infection,
                callose,
                drug: self.drug_concentration,
            })
    }
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub scenario: Scenario,
    pub seed: u64,
    pub steps: usize,
    pub treatment_start: usize,
    pub initial_cell: [usize; 2],
    pub final_record: StepRecord,
    pub peak_mean_infection: f64,
    pub peak_drug_concentration: f64,
    pub final_infected_cells: usize,
}

/// Sink for the records a run emits, one call per simulated day.
pub trait Recorder {
    fn record_step(&mut self, scenario: Scenario, record: &StepRecord) -> io::Result<()>;

    fn record_frame(&mut self, _scenario: Scenario, _frame: &Frame) -> io::Result<()> {
        Ok(())
    }

    /// Frames are only built when this returns true.
    fn wants_frames(&self) -> bool {
        false
    }
}

/// Keeps everything in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecorder {
    pub keep_frames: bool,
    pub steps: Vec<StepRecord>,
    pub frames: Vec<Frame>,
}

impl MemoryRecorder {
    pub fn new(keep_frames: bool) -> Self {
        Self {
            keep_frames,
            ..Self::default()
        }
    }
}

impl Recorder for MemoryRecorder {
    fn record_step(&mut self, _scenario: Scenario, record: &StepRecord) -> io::Result<()> {
        self.steps.push(*record);
        Ok(())
    }

    fn record_frame(&mut self, _scenario: Scenario, frame: &Frame) -> io::Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn wants_frames(&self) -> bool {
        self.keep_frames
    }
}

/// Discards all records.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn record_step(&mut self, _scenario: Scenario, _record: &StepRecord) -> io::Result<()> {
        Ok(())
    }
}
