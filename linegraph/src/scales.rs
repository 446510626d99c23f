use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};

use std::ops::Range;

/// An x axis for concurrency sweeps.
///
/// Key points are the concurrency values that were actually measured, so
/// every tick lines up with a data point. With `log2` set the axis is
/// logarithmic in base two and values must be positive.
pub struct ConcurrencyAxis {
    ticks: Vec<f64>,
    log2: bool,
    lo: f64,
    hi: f64,
}

impl ConcurrencyAxis {
    pub fn new(values: &[f64], log2: bool) -> Self {
        let mut ticks: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| v.is_finite() && (!log2 || *v > 0.0))
            .collect();
        ticks.sort_by(|a, b| a.total_cmp(b));
        ticks.dedup();

        let (lo, hi) = match (ticks.first(), ticks.last()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ if log2 => (1.0, 2.0),
            _ => (0.0, 1.0),
        };
        let (lo, hi) = if log2 {
            // pad by a tenth of the octave span on each side
            let pad = ((hi.log2() - lo.log2()) * 0.1).max(0.25);
            (lo * (-pad).exp2(), hi * pad.exp2())
        } else {
            let pad = ((hi - lo) * 0.05).max(0.5);
            (lo - pad, hi + pad)
        };

        Self {
            ticks,
            log2,
            lo,
            hi,
        }
    }

    fn project(&self, value: f64) -> f64 {
        if self.log2 {
            value.max(f64::MIN_POSITIVE).log2()
        } else {
            value
        }
    }
}

impl Ranged for ConcurrencyAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        let lo = self.project(self.lo);
        let hi = self.project(self.hi);
        let fraction = (self.project(*value) - lo) / (hi - lo);
        limit.0 + (fraction * f64::from(limit.1 - limit.0)).round() as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        let max_points = hint.max_num_points();
        if max_points == 0 {
            return Vec::new();
        }
        if self.ticks.len() <= max_points {
            return self.ticks.clone();
        }
        let stride = (self.ticks.len() + max_points - 1) / max_points;
        self.ticks.iter().copied().step_by(stride).collect()
    }

    fn range(&self) -> Range<f64> {
        self.lo..self.hi
    }
}

/// Tick text for concurrency values, integers without a fractional part.
pub fn concurrency_label(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
