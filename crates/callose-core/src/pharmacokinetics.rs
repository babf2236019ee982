use crate::config::DrugParams;
use std::{error::Error, fmt};

/// Concentration contributed by one dose `elapsed` days after administration.
///
/// Linear absorption up to `t_max`, then first-order elimination from the
/// peak. Both phases meet at exactly `dose` when `elapsed == t_max`.
pub fn concentration(dose: f64, elapsed: f64, t_max: f64, half_life: f64) -> f64 {
    if elapsed < 0.0 {
        return 0.0;
    }
    if elapsed <= t_max {
        return dose * (elapsed / t_max);
    }
    let k = std::f64::consts::LN_2 / half_life;
    dose * (-k * (elapsed - t_max)).exp()
}

#[derive(Debug, Clone, PartialEq)]
pub enum DoseScheduleError {
    NonFiniteTime(f64),
    OutOfOrder { last: f64, requested: f64 },
}

impl fmt::Display for DoseScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseScheduleError::NonFiniteTime(t) => write!(f, "dose time must be finite (got {t})"),
            DoseScheduleError::OutOfOrder { last, requested } => write!(
                f,
                "dose at {requested} precedes the last recorded dose at {last}"
            ),
        }
    }
}

impl Error for DoseScheduleError {}

/// Administration times relative to treatment start, in non-decreasing order.
#[derive(Clone, Debug, Default)]
pub struct DoseSchedule {
    times: Vec<f64>,
}

impl DoseSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn administer(&mut self, relative_time: f64) -> Result<(), DoseScheduleError> {
        if !relative_time.is_finite() {
            return Err(DoseScheduleError::NonFiniteTime(relative_time));
        }
        if let Some(&last) = self.times.last() {
            if relative_time < last {
                return Err(DoseScheduleError::OutOfOrder {
                    last,
                    requested: relative_time,
                });
            }
        }
        self.times.push(relative_time);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.times.clear();
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Superposed concentration `since_treatment_start` days after treatment began.
    pub fn total_concentration(&self, params: &DrugParams, since_treatment_start: f64) -> f64 {
        self.times
            .iter()
            .map(|&t| {
                concentration(
                    params.dose,
                    since_treatment_start - t,
                    params.t_max,
                    params.half_life,
                )
            })
            .sum()
    }
}
