use crate::field::ScalarField;

/// Row/column displacement of the four Von Neumann neighbors: down, up, right, left.
const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Square lattice topology shared by the infection and callose fields.
///
/// Direct neighbors wrap around the edges (torus). The local signal window
/// does not wrap: cells outside the leaf are dropped from both sum and count.
#[derive(Clone, Debug)]
pub struct Grid {
    size: usize,
    /// Manhattan diamond of radius `signal_radius`, centre included.
    signal_offsets: Vec<(isize, isize)>,
}

impl Grid {
    /// Radii beyond the grid diagonal select the whole leaf and are capped there.
    pub fn new(size: usize, signal_radius: usize) -> Self {
        let r = signal_radius.min(2 * size.saturating_sub(1)) as isize;
        let signal_offsets = (-r..=r)
            .flat_map(|di| (-r..=r).map(move |dj| (di, dj)))
            .filter(|(di, dj)| di.abs() + dj.abs() <= r)
            .collect();
        Self {
            size,
            signal_offsets,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The four axis-aligned neighbors of (i, j) under periodic boundaries,
    /// in fixed order: down, up, right, left.
    #[inline]
    pub fn neighbors(&self, i: usize, j: usize) -> [(usize, usize); 4] {
        let n = self.size as isize;
        NEIGHBOR_OFFSETS.map(|(di, dj)| {
            (
                (i as isize + di).rem_euclid(n) as usize,
                (j as isize + dj).rem_euclid(n) as usize,
            )
        })
    }

    /// Mean of `field` over every in-bounds cell within the signal radius
    /// (Manhattan distance) of (i, j).
    pub fn local_signal(&self, i: usize, j: usize, field: &ScalarField) -> f64 {
        let n = self.size as isize;
        let mut total = 0.0;
        let mut count = 0usize;
        for &(di, dj) in &self.signal_offsets {
            let li = i as isize + di;
            let lj = j as isize + dj;
            if (0..n).contains(&li) && (0..n).contains(&lj) {
                total += field.get(li as usize, lj as usize);
                count += 1;
            }
        }
        if count == 0 {
            return 0.0;
        }
        total / count as f64
    }
}

/// Hill saturation `x^n / (x^n + x0^n)` for `x >= 0`, `x0 > 0`, `n > 0`.
#[inline]
pub fn saturation(x: f64, x0: f64, n: f64) -> f64 {
    let x_n = x.powf(n);
    x_n / (x_n + x0.powf(n))
}

/// Element-wise [`saturation`] over a slice.
pub fn saturation_all(xs: &[f64], x0: f64, n: f64) -> Vec<f64> {
    xs.iter().map(|&x| saturation(x, x0, n)).collect()
}
