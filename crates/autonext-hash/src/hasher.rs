use rayon::prelude::*;

use crate::fingerprint::{Fingerprint, FingerprintError};

/// Pivot that selects the true median.
pub const MEDIAN_PIVOT: f64 = 1.0;
/// Pivot used for the bit threshold. Deliberately above the median so only
/// cells that deviate well past the typical spread get a bit; a tuning value
/// carried over from field use, not a percentile with a closed-form meaning.
pub const THRESHOLD_PIVOT: f64 = 1.5;

/// Sorted-position selector generalizing the median.
///
/// Picks the element at `floor(pivot * count / 2)`, clamped to `[1, count]`.
/// With [`MEDIAN_PIVOT`] and an even count the two central elements are
/// averaged. An empty input yields 0.
pub fn median_with_pivot(mut values: Vec<f64>, pivot: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.par_sort_unstable_by(f64::total_cmp);
    let count = values.len();
    let pos = (pivot * count as f64 / 2.0).floor() as usize;
    let pos = pos.clamp(1, count);
    if pivot == MEDIAN_PIVOT && count % 2 == 0 {
        (values[pos - 1] + values[pos]) / 2.0
    } else {
        values[pos.min(count - 1)]
    }
}

pub fn median(values: Vec<f64>) -> f64 {
    median_with_pivot(values, MEDIAN_PIVOT)
}

/// Reduces grayscale frames to [`Fingerprint`]s of a fixed grid size.
#[derive(Debug, Clone, Copy)]
pub struct ImageHasher {
    rows: u32,
    cols: u32,
}

impl ImageHasher {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Fingerprints a grayscale plane.
    ///
    /// The plane is box-filtered down to the hash grid, then each cell gets a
    /// bit when its absolute deviation from the median luma exceeds the
    /// [`THRESHOLD_PIVOT`] deviation cut. Identical planes always produce
    /// identical fingerprints.
    pub fn fingerprint(
        &self,
        luma: &[u8],
        width: usize,
        height: usize,
    ) -> Result<Fingerprint, FingerprintError> {
        if width == 0 || height == 0 {
            return Err(FingerprintError::EmptyPlane { width, height });
        }
        let required = width * height;
        if luma.len() < required {
            return Err(FingerprintError::InsufficientData {
                data_len: luma.len(),
                required,
            });
        }

        let cells = self.downsample(luma, width, height);
        let median_luma = median(cells.clone());
        let deviations: Vec<f64> = cells
            .iter()
            .map(|&cell| (cell - median_luma).abs())
            .collect();
        let threshold = median_with_pivot(deviations.clone(), THRESHOLD_PIVOT);
        Fingerprint::from_bits(
            self.rows,
            self.cols,
            deviations.iter().map(|&deviation| deviation > threshold),
        )
    }

    // Averages source blocks into one value per hash cell. Hosts may return
    // frames far larger than the requested capture size, so this runs the
    // block sums across the pool.
    fn downsample(&self, luma: &[u8], width: usize, height: usize) -> Vec<f64> {
        let rows = self.rows as usize;
        let cols = self.cols as usize;
        (0..rows)
            .into_par_iter()
            .flat_map_iter(|row| {
                let y0 = row * height / rows;
                let y1 = ((row + 1) * height / rows).max(y0 + 1).min(height);
                (0..cols).map(move |col| {
                    let x0 = col * width / cols;
                    let x1 = ((col + 1) * width / cols).max(x0 + 1).min(width);
                    let mut sum = 0u64;
                    for y in y0..y1 {
                        let line = &luma[y * width + x0..y * width + x1];
                        sum += line.iter().map(|&p| u64::from(p)).sum::<u64>();
                    }
                    sum as f64 / ((y1 - y0) * (x1 - x0)) as f64
                })
            })
            .collect()
    }
}
