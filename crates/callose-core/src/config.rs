use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Pharmacological profile of one drug. Immutable once built.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrugParams {
    /// Normalized administered dose (peak concentration).
    pub dose: f64,
    /// Concentration giving half-maximal effect.
    pub ec50: f64,
    pub hill_n: f64,
    /// Maximum efficacy multiplier; the effect is capped at 1.
    pub kill_scale: f64,
    /// Days from administration to peak concentration.
    pub t_max: f64,
    /// Elimination half-life in days.
    pub half_life: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrugParamsError {
    InvalidDose(f64),
    InvalidEc50(f64),
    InvalidHillN(f64),
    InvalidKillScale(f64),
    InvalidTmax(f64),
    InvalidHalfLife(f64),
}

impl fmt::Display for DrugParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrugParamsError::InvalidDose(v) => write!(f, "dose must be finite and >= 0 (got {v})"),
            DrugParamsError::InvalidEc50(v) => write!(f, "ec50 must be finite and > 0 (got {v})"),
            DrugParamsError::InvalidHillN(v) => {
                write!(f, "hill_n must be finite and > 0 (got {v})")
            }
            DrugParamsError::InvalidKillScale(v) => {
                write!(f, "kill_scale must be finite and >= 0 (got {v})")
            }
            DrugParamsError::InvalidTmax(v) => write!(f, "t_max must be finite and > 0 (got {v})"),
            DrugParamsError::InvalidHalfLife(v) => {
                write!(f, "half_life must be finite and > 0 (got {v})")
            }
        }
    }
}

impl Error for DrugParamsError {}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

impl DrugParams {
    pub fn new(
        dose: f64,
        ec50: f64,
        hill_n: f64,
        kill_scale: f64,
        t_max: f64,
        half_life: f64,
    ) -> Result<Self, DrugParamsError> {
        let params = Self {
            dose,
            ec50,
            hill_n,
            kill_scale,
            t_max,
            half_life,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), DrugParamsError> {
        if !non_negative(self.dose) {
            return Err(DrugParamsError::InvalidDose(self.dose));
        }
        if !positive(self.ec50) {
            return Err(DrugParamsError::InvalidEc50(self.ec50));
        }
        if !positive(self.hill_n) {
            return Err(DrugParamsError::InvalidHillN(self.hill_n));
        }
        if !non_negative(self.kill_scale) {
            return Err(DrugParamsError::InvalidKillScale(self.kill_scale));
        }
        if !positive(self.t_max) {
            return Err(DrugParamsError::InvalidTmax(self.t_max));
        }
        if !positive(self.half_life) {
            return Err(DrugParamsError::InvalidHalfLife(self.half_life));
        }
        Ok(())
    }

    /// Cefotaxime-like bactericidal reference profile.
    pub fn ctx() -> Self {
        Self {
            dose: 15.0 / 80.0,
            ec50: 0.40,
            hill_n: 2.0,
            kill_scale: 3.0,
            t_max: 14.0,
            half_life: 100.0,
        }
    }

    /// Oxytetracycline-like bacteriostatic reference profile.
    pub fn tetracycline() -> Self {
        Self {
            dose: 150.0 / 80.0,
            ec50: 1.0,
            hill_n: 2.0,
            kill_scale: 3.0,
            t_max: 14.0,
            half_life: 200.0,
        }
    }

    /// Fraction of maximal drug effect at `concentration`, capped at 1.
    pub fn effect(&self, concentration: f64) -> f64 {
        let ratio = (concentration / self.ec50).powf(self.hill_n);
        (ratio / (ratio + 1.0) * self.kill_scale).min(1.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub grid_size: usize,
    /// Days simulated before treatment starts.
    pub pre_treatment_steps: usize,
    /// Days simulated from treatment start onwards.
    pub post_treatment_steps: usize,

    pub spread_rate: f64,
    pub growth_rate: f64,
    pub carrying_capacity: f64,
    /// Efficacy of callose in suppressing the local load.
    pub callose_suppression: f64,
    pub infection_death_rate: f64,

    pub callose_production_rate: f64,
    pub callose_degradation_rate: f64,
    pub callose_limit: f64,
    pub signal_radius: usize,

    pub ctx: DrugParams,
    pub tetracycline: DrugParams,

    pub seed: u64,
    /// Cell seeded at the start of every run. Drawn from the run RNG when unset.
    pub initial_cell: Option<[usize; 2]>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: 50,
            pre_treatment_steps: 1000,
            post_treatment_steps: 1500,
            spread_rate: 0.07,
            growth_rate: 0.15,
            carrying_capacity: 1.0,
            callose_suppression: 0.7,
            infection_death_rate: 0.001,
            callose_production_rate: 0.6,
            callose_degradation_rate: 0.01,
            callose_limit: 1.0,
            signal_radius: 6,
            ctx: DrugParams::ctx(),
            tetracycline: DrugParams::tetracycline(),
            seed: 42,
            initial_cell: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimConfigError {
    InvalidGridSize { max: usize, actual: usize },
    InvalidStepCount { max: usize, actual: usize },
    InvalidRate { name: &'static str, value: f64 },
    InitialCellOutOfBounds { cell: [usize; 2], grid_size: usize },
    InvalidSignalRadius { max: usize, actual: usize },
    Drug { name: &'static str, source: DrugParamsError },
    Parse(String),
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::InvalidGridSize { max, actual } => {
                write!(f, "grid_size must be in 1..={max} (got {actual})")
            }
            SimConfigError::InvalidStepCount { max, actual } => {
                write!(f, "total step count must be in 1..={max} (got {actual})")
            }
            SimConfigError::InvalidRate { name, value } => {
                write!(f, "{name} is out of range (got {value})")
            }
            SimConfigError::InitialCellOutOfBounds { cell, grid_size } => write!(
                f,
                "initial_cell ({}, {}) lies outside a {grid_size}x{grid_size} grid",
                cell[0], cell[1]
            ),
            SimConfigError::InvalidSignalRadius { max, actual } => {
                write!(f, "signal_radius must be at most {max} (got {actual})")
            }
            SimConfigError::Drug { name, source } => write!(f, "{name}: {source}"),
            SimConfigError::Parse(msg) => write!(f, "invalid config document: {msg}"),
        }
    }
}

impl Error for SimConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimConfigError::Drug { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl SimConfig {
    pub const MAX_GRID_SIZE: usize = 1024;
    pub const MAX_TOTAL_STEPS: usize = 1_000_000;
    /// Widest Manhattan distance on the largest allowed grid.
    pub const MAX_SIGNAL_RADIUS: usize = 2 * (Self::MAX_GRID_SIZE - 1);

    pub fn total_steps(&self) -> usize {
        self.pre_treatment_steps
            .saturating_add(self.post_treatment_steps)
    }

    /// Day on which treatment scenarios receive their first dose.
    pub fn treatment_start(&self) -> usize {
        self.pre_treatment_steps
    }

    /// Parse a JSON document; absent keys keep their defaults. The result is validated.
    pub fn from_json(json: &str) -> Result<Self, SimConfigError> {
        let config: SimConfig =
            serde_json::from_str(json).map_err(|e| SimConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.grid_size == 0 || self.grid_size > Self::MAX_GRID_SIZE {
            return Err(SimConfigError::InvalidGridSize {
                max: Self::MAX_GRID_SIZE,
                actual: self.grid_size,
            });
        }
        let total = self.total_steps();
        if total == 0 || total > Self::MAX_TOTAL_STEPS {
            return Err(SimConfigError::InvalidStepCount {
                max: Self::MAX_TOTAL_STEPS,
                actual: total,
            });
        }

        let unit_rates = [
            ("spread_rate", self.spread_rate),
            ("callose_degradation_rate", self.callose_degradation_rate),
        ];
        for (name, value) in unit_rates {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(SimConfigError::InvalidRate { name, value });
            }
        }
        let rates = [
            ("growth_rate", self.growth_rate),
            ("callose_suppression", self.callose_suppression),
            ("infection_death_rate", self.infection_death_rate),
            ("callose_production_rate", self.callose_production_rate),
        ];
        for (name, value) in rates {
            if !non_negative(value) {
                return Err(SimConfigError::InvalidRate { name, value });
            }
        }
        let capacities = [
            ("carrying_capacity", self.carrying_capacity),
            ("callose_limit", self.callose_limit),
        ];
        for (name, value) in capacities {
            if !positive(value) {
                return Err(SimConfigError::InvalidRate { name, value });
            }
        }

        if self.signal_radius > Self::MAX_SIGNAL_RADIUS {
            return Err(SimConfigError::InvalidSignalRadius {
                max: Self::MAX_SIGNAL_RADIUS,
                actual: self.signal_radius,
            });
        }

        if let Some(cell) = self.initial_cell {
            if cell[0] >= self.grid_size || cell[1] >= self.grid_size {
                return Err(SimConfigError::InitialCellOutOfBounds {
                    cell,
                    grid_size: self.grid_size,
                });
            }
        }

        self.ctx
            .validate()
            .map_err(|source| SimConfigError::Drug { name: "ctx", source })?;
        self.tetracycline
            .validate()
            .map_err(|source| SimConfigError::Drug {
                name: "tetracycline",
                source,
            })?;
        Ok(())
    }
}
