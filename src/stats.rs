// Summary statistics behind histogram and box charts

/// Number of bins every histogram series uses
pub const HISTOGRAM_BINS: usize = 30;

/// A histogram bin covering `[lower, upper)`; the last bin also includes `upper`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width bins spanning the data's own min..max.
///
/// A constant series is widened to `value +/- 0.5`. Empty input yields no bins.
pub fn histogram(values: &[f64], bin_count: usize) -> Vec<Bin> {
    if values.is_empty() || bin_count == 0 {
        return Vec::new();
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let (min, max) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };

    // Divide before subtracting so extreme spans stay finite
    let width = max / bin_count as f64 - min / bin_count as f64;
    let mut counts = vec![0usize; bin_count];

    for &v in values {
        let idx = (v / width - min / width).floor() as usize;
        counts[idx.min(bin_count - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            lower: min + i as f64 * width,
            upper: if i + 1 == bin_count {
                max
            } else {
                min + (i + 1) as f64 * width
            },
            count,
        })
        .collect()
}

/// Five-number summary plus outliers for one box
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    /// Smallest and largest value drawn, outliers included
    pub fn extent(&self) -> (f64, f64) {
        let low = self
            .outliers
            .iter()
            .cloned()
            .fold(self.lower_whisker, f64::min);
        let high = self
            .outliers
            .iter()
            .cloned()
            .fold(self.upper_whisker, f64::max);
        (low, high)
    }
}

/// Quartiles by linear interpolation, whiskers at the furthest points within
/// 1.5 IQR of the box. Returns `None` for empty input.
pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile(&sorted, 0.25);
    let median = percentile(&sorted, 0.50);
    let q3 = percentile(&sorted, 0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let lower_whisker = sorted
        .iter()
        .cloned()
        .find(|&v| v >= lower_fence)
        .unwrap_or(q1);
    let upper_whisker = sorted
        .iter()
        .rev()
        .cloned()
        .find(|&v| v <= upper_fence)
        .unwrap_or(q3);

    let outliers = sorted
        .iter()
        .cloned()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    Some(BoxSummary {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 { return 0.0; }
    if n == 1 { return sorted_data[0]; }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}
