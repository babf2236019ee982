use crate::config::SimConfig;
use crate::field::ScalarField;
use crate::grid::{saturation, Grid};
use rayon::prelude::*;

/// Half-activation of callose production by the local infection signal.
pub const CALLOSE_SIGNAL_EC50: f64 = 0.5;
/// Hill coefficient of callose production.
pub const CALLOSE_HILL_COEFFICIENT: f64 = 2.0;

/// Host callose deposition on the leaf grid.
///
/// Healthy cells bordering the infection front produce callose in proportion
/// to a saturating function of the surrounding infection signal; every cell
/// degrades first-order.
#[derive(Clone, Debug)]
pub struct CalloseField {
    field: ScalarField,
    production_rate: f64,
    degradation_rate: f64,
    limit: f64,
}

impl CalloseField {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            field: ScalarField::new(config.grid_size, 0.0),
            production_rate: config.callose_production_rate,
            degradation_rate: config.callose_degradation_rate,
            limit: config.callose_limit,
        }
    }

    pub fn reset(&mut self) {
        self.field.fill(0.0);
    }

    pub fn field(&self) -> &ScalarField {
        &self.field
    }

    pub fn mean(&self) -> f64 {
        self.field.mean()
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Production a healthy cell at (i, j) receives this step: one Hill-scaled
    /// contribution per infected neighbor. Infected cells receive none.
    fn production_at(&self, i: usize, j: usize, infection: &ScalarField, grid: &Grid) -> f64 {
        if infection.get(i, j) != 0.0 {
            return 0.0;
        }
        let infected_neighbors = grid
            .neighbors(i, j)
            .iter()
            .filter(|&&(ni, nj)| infection.get(ni, nj) > 0.0)
            .count();
        if infected_neighbors == 0 {
            return 0.0;
        }
        let signal = grid.local_signal(i, j, infection);
        infected_neighbors as f64
            * self.production_rate
            * saturation(signal, CALLOSE_SIGNAL_EC50, CALLOSE_HILL_COEFFICIENT)
    }

    /// Advance one day against `infection`, reading the current snapshot and
    /// writing a fresh buffer that replaces it once complete.
    pub fn update(&mut self, infection: &ScalarField, grid: &Grid) {
        let size = self.field.size();
        let mut next = ScalarField::new(size, 0.0);
        next.data_mut()
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(i, row)| {
                for (j, out) in row.iter_mut().enumerate() {
                    let c = self.field.get(i, j);
                    let value =
                        c - self.degradation_rate * c + self.production_at(i, j, infection, grid);
                    *out = value.clamp(0.0, self.limit);
                }
            });
        self.field = next;
    }

    #[cfg(test)]
    pub(crate) fn field_mut(&mut self) -> &mut ScalarField {
        &mut self.field
    }
}
