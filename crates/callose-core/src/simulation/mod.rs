pub mod records;
#[cfg(test)]
mod tests;

pub use records::*;

use crate::config::{DrugParams, SimConfig, SimConfigError};
use crate::defense::CalloseField;
use crate::grid::{saturation, Grid};
use crate::infection::{InfectionField, Mechanism, DRUG_PRESENCE_THRESHOLD};
use crate::pharmacokinetics::{DoseSchedule, DoseScheduleError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt, io};
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info};

/// Days between progress events in the log.
const LOG_INTERVAL_DAYS: usize = 500;

/// Treatment applied during one run.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Scenario {
    /// No drug.
    Control,
    /// Bactericidal treatment.
    Ctx,
    /// Bacteriostatic treatment.
    Tetra,
}

impl Scenario {
    /// Drug profile and mechanism for this scenario; `None` for control.
    pub fn treatment(self, config: &SimConfig) -> Option<(DrugParams, Mechanism)> {
        match self {
            Scenario::Control => None,
            Scenario::Ctx => Some((config.ctx, Mechanism::Bactericidal)),
            Scenario::Tetra => Some((config.tetracycline, Mechanism::Bacteriostatic)),
        }
    }

    /// Fraction by which the drug throttles spread. Only the bacteriostatic
    /// treatment acts on spread.
    pub fn spread_inhibition(self, params: &DrugParams, concentration: f64) -> f64 {
        if self != Scenario::Tetra || concentration <= DRUG_PRESENCE_THRESHOLD {
            return 0.0;
        }
        (saturation(concentration, params.ec50, params.hill_n) * params.kill_scale).min(1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Initialized,
    /// `day` is the next day to simulate.
    Running { day: usize },
    Completed,
}

#[derive(Debug)]
pub enum SimulationError {
    Config(SimConfigError),
    NotInitialized,
    RunCompleted { steps: usize },
    /// Control runs carry no drug.
    NoTreatment { scenario: Scenario },
    /// Extra doses are accepted once the treatment-start dose is on record.
    TreatmentNotStarted { treatment_start: usize },
    Dose(DoseScheduleError),
    Recorder(io::Error),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(e) => write!(f, "{e}"),
            SimulationError::NotInitialized => {
                write!(f, "simulation must be initialized with a scenario before stepping")
            }
            SimulationError::RunCompleted { steps } => {
                write!(f, "run already completed all {steps} steps")
            }
            SimulationError::NoTreatment { scenario } => {
                write!(f, "scenario {scenario} does not administer a drug")
            }
            SimulationError::TreatmentNotStarted { treatment_start } => write!(
                f,
                "extra doses can only be added after the first dose on day {treatment_start}"
            ),
            SimulationError::Dose(e) => write!(f, "{e}"),
            SimulationError::Recorder(e) => write!(f, "failed to record simulation output: {e}"),
        }
    }
}

impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimulationError::Config(e) => Some(e),
            SimulationError::Dose(e) => Some(e),
            SimulationError::Recorder(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SimConfigError> for SimulationError {
    fn from(err: SimConfigError) -> Self {
        SimulationError::Config(err)
    }
}

impl From<DoseScheduleError> for SimulationError {
    fn from(err: DoseScheduleError) -> Self {
        SimulationError::Dose(err)
    }
}

impl From<io::Error> for SimulationError {
    fn from(err: io::Error) -> Self {
        SimulationError::Recorder(err)
    }
}

/// Couples infection, callose and drug exposure on one leaf, one day at a time.
pub struct Simulation<R = ChaCha12Rng> {
    config: SimConfig,
    grid: Grid,
    infection: InfectionField,
    callose: CalloseField,
    doses: DoseSchedule,
    rng: R,
    phase: RunPhase,
    scenario: Scenario,
    initial_cell: [usize; 2],
    next_day: usize,
    drug_concentration: f64,
}

impl Simulation<ChaCha12Rng> {
    /// Build a simulation whose spread trials draw from a ChaCha stream seeded by `config.seed`.
    pub fn new(config: SimConfig) -> Result<Self, SimulationError> {
        let rng = ChaCha12Rng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Simulation<R> {
    pub fn with_rng(config: SimConfig, rng: R) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            grid: Grid::new(config.grid_size, config.signal_radius),
            infection: InfectionField::new(&config),
            callose: CalloseField::new(&config),
            doses: DoseSchedule::new(),
            rng,
            phase: RunPhase::Idle,
            scenario: Scenario::Control,
            initial_cell: [0, 0],
            next_day: 0,
            drug_concentration: 0.0,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn infection(&self) -> &InfectionField {
        &self.infection
    }

    pub fn callose(&self) -> &CalloseField {
        &self.callose
    }

    pub fn doses(&self) -> &DoseSchedule {
        &self.doses
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn drug_concentration(&self) -> f64 {
        self.drug_concentration
    }

    /// Reset both fields and the dose history for a fresh run of `scenario`.
    pub fn initialize(&mut self, scenario: Scenario) {
        self.initial_cell = self.infection.reset(self.config.initial_cell, &mut self.rng);
        self.callose.reset();
        self.doses.clear();
        self.scenario = scenario;
        self.next_day = 0;
        self.drug_concentration = 0.0;
        self.phase = RunPhase::Initialized;
    }

    /// Record an extra administration `relative_time` days after treatment start.
    ///
    /// Only treatment scenarios accept doses, and only once the day of
    /// treatment start has been simulated, so the automatic first dose is
    /// always the earliest entry of the schedule.
    pub fn administer_dose(&mut self, relative_time: f64) -> Result<(), SimulationError> {
        match self.phase {
            RunPhase::Idle => return Err(SimulationError::NotInitialized),
            RunPhase::Completed => {
                return Err(SimulationError::RunCompleted {
                    steps: self.config.total_steps(),
                })
            }
            RunPhase::Initialized | RunPhase::Running { .. } => {}
        }
        if self.scenario.treatment(&self.config).is_none() {
            return Err(SimulationError::NoTreatment {
                scenario: self.scenario,
            });
        }
        let treatment_start = self.config.treatment_start();
        if self.next_day <= treatment_start {
            return Err(SimulationError::TreatmentNotStarted { treatment_start });
        }
        self.record_dose(relative_time)
    }

    fn record_dose(&mut self, relative_time: f64) -> Result<(), SimulationError> {
        self.doses.administer(relative_time)?;
        info!(scenario = %self.scenario, relative_time, "dose administered");
        Ok(())
    }

    /// Simulate one day: dosing, spread, intra-cellular update, then callose.
    pub fn step(&mut self) -> Result<StepRecord, SimulationError> {
        let day = match self.phase {
            RunPhase::Idle => return Err(SimulationError::NotInitialized),
            RunPhase::Completed => {
                return Err(SimulationError::RunCompleted {
                    steps: self.config.total_steps(),
                })
            }
            RunPhase::Initialized | RunPhase::Running { .. } => self.next_day,
        };
        let treatment_start = self.config.treatment_start();
        let treatment = self.scenario.treatment(&self.config);

        if day == treatment_start && treatment.is_some() {
            self.record_dose(0.0)?;
        }

        let concentration = treatment
            .map(|(params, _)| {
                self.doses
                    .total_concentration(&params, day as f64 - treatment_start as f64)
            })
            .unwrap_or(0.0);
        let inhibition = treatment
            .map(|(params, _)| self.scenario.spread_inhibition(&params, concentration))
            .unwrap_or(0.0);

        self.infection.spread(
            self.callose.field(),
            self.config.spread_rate,
            inhibition,
            &self.grid,
            &mut self.rng,
        );

        // Control runs through the bacteriostatic branch with no drug, which
        // collapses to the drug-free dynamics.
        let (params, mechanism) =
            treatment.unwrap_or((self.config.tetracycline, Mechanism::Bacteriostatic));
        self.infection
            .update(self.callose.field(), concentration, mechanism, &params);

        self.callose.update(self.infection.field(), &self.grid);

        self.drug_concentration = concentration;
        let record = StepRecord {
            day,
            mean_infection: self.infection.mean(),
            mean_callose: self.callose.mean(),
            drug_concentration: concentration,
        };
        if day % LOG_INTERVAL_DAYS == 0 {
            debug!(
                scenario = %self.scenario,
                day,
                mean_infection = record.mean_infection,
                mean_callose = record.mean_callose,
                drug = concentration,
                "progress"
            );
        }

        self.next_day += 1;
        self.phase = if self.next_day >= self.config.total_steps() {
            RunPhase::Completed
        } else {
            RunPhase::Running {
                day: self.next_day,
            }
        };
        Ok(record)
    }

    /// Per-cell snapshot of the current state.
    pub fn frame(&self) -> Frame {
        Frame {
            day: self.next_day.saturating_sub(1),
            drug_concentration: self.drug_concentration,
            size: self.grid.size(),
            infection: self.infection.field().data().to_vec(),
            callose: self.callose.field().data().to_vec(),
        }
    }

    /// Run `scenario` from a fresh state to completion, pushing every day into `recorder`.
    pub fn run<W: Recorder + ?Sized>(
        &mut self,
        scenario: Scenario,
        recorder: &mut W,
    ) -> Result<RunSummary, SimulationError> {
        self.initialize(scenario);
        let steps = self.config.total_steps();
        info!(
            %scenario,
            steps,
            seed = self.config.seed,
            initial_cell = ?self.initial_cell,
            "starting run"
        );

        let mut peak_mean_infection = 0.0f64;
        let mut peak_drug_concentration = 0.0f64;
        let mut final_record = None;
        while self.phase != RunPhase::Completed {
            let record = self.step()?;
            recorder.record_step(scenario, &record)?;
            if recorder.wants_frames() {
                recorder.record_frame(scenario, &self.frame())?;
            }
            peak_mean_infection = peak_mean_infection.max(record.mean_infection);
            peak_drug_concentration = peak_drug_concentration.max(record.drug_concentration);
            final_record = Some(record);
        }

        let final_record = final_record.ok_or(SimulationError::NotInitialized)?;
        let summary = RunSummary {
            schema_version: 1,
            scenario,
            seed: self.config.seed,
            steps,
            treatment_start: self.config.treatment_start(),
            initial_cell: self.initial_cell,
            final_record,
            peak_mean_infection,
            peak_drug_concentration,
            final_infected_cells: self.infection.infected_cells(),
        };
        info!(
            %scenario,
            mean_infection = final_record.mean_infection,
            mean_callose = final_record.mean_callose,
            infected_cells = summary.final_infected_cells,
            "run finished"
        );
        Ok(summary)
    }
}
