//! Descriptive statistics shared by cleaning and aggregation.
//!
//! All functions take values in input order; those that need sorted data
//! sort a private copy. Empty input yields `None` rather than NaN.

use std::collections::HashMap;

use tabrule_model::{Value, ValueKey};

/// Tukey fence multiplier.
pub const IQR_MULTIPLIER: f64 = 1.5;

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(sum(values) / values.len() as f64)
}

/// Median; the average of the two middle values on even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile by linear interpolation between closest ranks.
///
/// Position is `q * (n - 1)` over the sorted values.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let sorted = sorted(values);
    quantile_sorted(&sorted, q)
}

/// [`quantile`] over values that are already sorted ascending.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Sample variance (divisor `n - 1`). `None` when fewer than two values.
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(squares / (values.len() - 1) as f64)
}

/// Sample standard deviation. `None` when fewer than two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().min_by(f64::total_cmp)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().max_by(f64::total_cmp)
}

/// Inclusive outlier fences `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let sorted = sorted(values);
        let q1 = quantile_sorted(&sorted, 0.25)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - IQR_MULTIPLIER * iqr,
            upper: q3 + IQR_MULTIPLIER * iqr,
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Most frequent non-null value; ties go to the value seen first.
pub fn mode<'a, I>(values: I) -> Option<Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut counts: HashMap<ValueKey, (usize, usize)> = HashMap::new();
    let mut firsts: Vec<&Value> = Vec::new();
    for value in values.into_iter().filter(|v| !v.is_null()) {
        let next_index = firsts.len();
        let entry = counts.entry(value.key()).or_insert_with(|| (0, next_index));
        if entry.1 == next_index && entry.0 == 0 {
            firsts.push(value);
        }
        entry.0 += 1;
    }
    let (_, first_index) = counts
        .values()
        .copied()
        .max_by(|(count_a, first_a), (count_b, first_b)| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })?;
    firsts.get(first_index).map(|value| (*value).clone())
}

/// Number of distinct non-null values.
pub fn distinct_count<'a, I>(values: I) -> usize
where
    I: IntoIterator<Item = &'a Value>,
{
    values
        .into_iter()
        .filter(|v| !v.is_null())
        .map(Value::key)
        .collect::<std::collections::HashSet<_>>()
        .len()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
