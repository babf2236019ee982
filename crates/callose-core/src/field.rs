/// Dense square scalar field over the leaf grid.
/// Row-major storage: cell (i, j) lives at `i * size + j`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField {
    size: usize,
    data: Vec<f64>,
}

impl ScalarField {
    pub fn new(size: usize, initial_value: f64) -> Self {
        Self {
            size,
            data: vec![initial_value; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.size + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.size + j] = value;
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Arithmetic mean over all cells. Empty fields report 0.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    pub fn count_where(&self, pred: impl Fn(f64) -> bool) -> usize {
        self.data.iter().filter(|&&v| pred(v)).count()
    }

    pub fn min_max(&self) -> (f64, f64) {
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}
