use crate::config::{DrugParams, SimConfig};
use crate::field::ScalarField;
use crate::grid::Grid;
use rand::Rng;
use rayon::prelude::*;

/// Load placed on the single seeded cell at the start of a run.
pub const INITIAL_INFECTION_LOAD: f64 = 0.1;
/// Load given to a healthy cell on a successful spread trial.
pub const SPREAD_INFECTION_LOAD: f64 = 0.05;
/// Loads at or below this are snapped to exactly zero.
pub const NUMERICAL_EXTINCTION_THRESHOLD: f64 = 1e-3;
/// Exponential sensitivity of spread permeability to callose at the target.
pub const CALLOSE_SPREAD_SENSITIVITY: f64 = 5.0;
/// Active clearing induced by a bacteriostatic drug at full effect.
pub const BACTERIOSTATIC_ACTIVE_CLEARING: f64 = 0.015;
/// Concentrations below this count as no drug.
pub const DRUG_PRESENCE_THRESHOLD: f64 = 1e-9;

/// How a drug couples into the intra-cellular dynamics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mechanism {
    /// Adds a first-order kill term.
    Bactericidal,
    /// Throttles growth and adds a slow active-clearing term.
    Bacteriostatic,
}

/// Bacterial load on the leaf grid.
#[derive(Clone, Debug)]
pub struct InfectionField {
    field: ScalarField,
    growth_rate: f64,
    carrying_capacity: f64,
    callose_suppression: f64,
    death_rate: f64,
}

impl InfectionField {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            field: ScalarField::new(config.grid_size, 0.0),
            growth_rate: config.growth_rate,
            carrying_capacity: config.carrying_capacity,
            callose_suppression: config.callose_suppression,
            death_rate: config.infection_death_rate,
        }
    }

    /// Clear the grid and seed a single cell with [`INITIAL_INFECTION_LOAD`].
    /// A random cell is drawn from `rng` when `cell` is `None`.
    pub fn reset<R: Rng + ?Sized>(&mut self, cell: Option<[usize; 2]>, rng: &mut R) -> [usize; 2] {
        self.field.fill(0.0);
        let size = self.field.size();
        let [i0, j0] =
            cell.unwrap_or_else(|| [rng.random_range(0..size), rng.random_range(0..size)]);
        self.field.set(i0, j0, INITIAL_INFECTION_LOAD);
        [i0, j0]
    }

    pub fn field(&self) -> &ScalarField {
        &self.field
    }

    pub fn mean(&self) -> f64 {
        self.field.mean()
    }

    pub fn infected_cells(&self) -> usize {
        self.field.count_where(|v| v > 0.0)
    }

    /// Stochastic spread from infected cells to healthy Von Neumann neighbors.
    ///
    /// Sources are visited row-major and their neighbors in [`Grid::neighbors`]
    /// order; every qualifying edge consumes exactly one uniform draw. A target
    /// infected earlier in the same pass is no longer a target, so several
    /// successful edges leave it at [`SPREAD_INFECTION_LOAD`], never more.
    pub fn spread<R: Rng + ?Sized>(
        &mut self,
        callose: &ScalarField,
        beta: f64,
        inhibition: f64,
        grid: &Grid,
        rng: &mut R,
    ) {
        let size = self.field.size();
        let mut next = self.field.clone();
        let base = beta * (1.0 - inhibition);
        for i in 0..size {
            for j in 0..size {
                if self.field.get(i, j) <= 0.0 {
                    continue;
                }
                for (ni, nj) in grid.neighbors(i, j) {
                    if next.get(ni, nj) >= NUMERICAL_EXTINCTION_THRESHOLD {
                        continue;
                    }
                    let permeability = (-CALLOSE_SPREAD_SENSITIVITY * callose.get(ni, nj)).exp();
                    if rng.random::<f64>() < base * permeability {
                        next.set(ni, nj, SPREAD_INFECTION_LOAD);
                    }
                }
            }
        }
        self.field = next;
    }

    /// Net one-day change of a cell holding load `load` under callose `c`.
    fn net_change(
        &self,
        load: f64,
        c: f64,
        concentration: f64,
        mechanism: Mechanism,
        params: &DrugParams,
    ) -> f64 {
        let growth = self.growth_rate * load * (1.0 - load / self.carrying_capacity);
        let death = self.death_rate * load;
        let suppression = self.callose_suppression * c * load;

        if concentration < DRUG_PRESENCE_THRESHOLD {
            return growth - death - suppression;
        }
        let effect = params.effect(concentration);
        match mechanism {
            Mechanism::Bactericidal => growth - death - suppression - effect * load,
            Mechanism::Bacteriostatic => {
                let clearing = BACTERIOSTATIC_ACTIVE_CLEARING * effect * load;
                growth * (1.0 - effect) - death - suppression - clearing
            }
        }
    }

    /// Explicit Euler step (dt = 1 day) of the intra-cellular dynamics.
    pub fn update(
        &mut self,
        callose: &ScalarField,
        concentration: f64,
        mechanism: Mechanism,
        params: &DrugParams,
    ) {
        let size = self.field.size();
        let mut next = ScalarField::new(size, 0.0);
        next.data_mut()
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(i, row)| {
                for (j, out) in row.iter_mut().enumerate() {
                    let load = self.field.get(i, j);
                    if load <= NUMERICAL_EXTINCTION_THRESHOLD {
                        continue;
                    }
                    let delta = self.net_change(
                        load,
                        callose.get(i, j),
                        concentration,
                        mechanism,
                        params,
                    );
                    let value = (load + delta).clamp(0.0, self.carrying_capacity);
                    *out = if value < NUMERICAL_EXTINCTION_THRESHOLD {
                        0.0
                    } else {
                        value
                    };
                }
            });
        self.field = next;
    }

    #[cfg(test)]
    pub(crate) fn field_mut(&mut self) -> &mut ScalarField {
        &mut self.field
    }
}
