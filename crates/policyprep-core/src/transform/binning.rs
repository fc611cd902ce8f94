use polars::prelude::*;

use crate::columns::{numeric_values, string_series, CAR_AGE, CUSTOMER_AGE, CUSTOMER_AGE_GROUP};
use crate::config::AgeGroupBackfill;
use crate::error::Result;

use super::TransformStep;

/// Number of equal-width bins `car_age` is cut into.
pub const CAR_AGE_BINS: usize = 4;

/// Ordered half-open intervals `[edges[i], edges[i + 1])`, one label each.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    edges: Vec<f64>,
    labels: Vec<String>,
}

impl Bins {
    /// Bins labeled by their interval, e.g. `[20, 30)`.
    pub fn from_edges(edges: Vec<f64>) -> Self {
        let labels = edges
            .windows(2)
            .map(|pair| format!("[{}, {})", format_edge(pair[0]), format_edge(pair[1])))
            .collect();
        Self { edges, labels }
    }

    pub fn with_labels(edges: Vec<f64>, labels: Vec<String>) -> Self {
        debug_assert_eq!(edges.len(), labels.len() + 1);
        Self { edges, labels }
    }

    /// `count` equal-width bins spanning the observed range of `values`. The top
    /// edge is pushed out by 0.1% of the range so the maximum lands in the last
    /// bin; a zero range is widened on both sides instead.
    pub fn equal_width(values: &[f64], count: usize) -> Option<Self> {
        let min = values.iter().copied().reduce(f64::min)?;
        let max = values.iter().copied().reduce(f64::max)?;

        let (low, high, top_adjust) = if min == max {
            let adjust = if min == 0.0 { 0.001 } else { min.abs() * 0.001 };
            (min - adjust, max + adjust, 0.0)
        } else {
            (min, max, (max - min) * 0.001)
        };

        let step = (high - low) / count as f64;
        let mut edges: Vec<f64> = (0..=count).map(|i| low + step * i as f64).collect();
        edges[count] = high + top_adjust;
        Some(Self::from_edges(edges))
    }

    pub fn engine_power() -> Self {
        Self::with_labels(
            vec![0.0, 100.0, 250.0, f64::INFINITY],
            vec!["0-100".into(), "100-250".into(), "250+".into()],
        )
    }

    /// Decade bins `[20, 30)` through `[90, 100)`.
    pub fn customer_age() -> Self {
        Self::from_edges((2..=10).map(|decade| f64::from(decade * 10)).collect())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn index_of(&self, value: f64) -> Option<usize> {
        self.edges
            .windows(2)
            .position(|pair| value >= pair[0] && value < pair[1])
    }
}

fn format_edge(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let rounded = (value * 1000.0).round() / 1000.0;
    let text = format!("{rounded:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn group_name(column: &str) -> String {
    format!("{column}_group")
}

fn assign(values: &[Option<f64>], bins: &Bins) -> Vec<Option<usize>> {
    values
        .iter()
        .map(|value| value.and_then(|v| bins.index_of(v)))
        .collect()
}

fn labels_for(indices: &[Option<usize>], bins: &Bins) -> Vec<Option<String>> {
    indices
        .iter()
        .map(|idx| idx.map(|i| bins.labels[i].clone()))
        .collect()
}

/// Adds `<column>_group` holding the label of the bin each value falls in.
/// Values outside every bin get a null label.
pub fn group_column(
    df: &DataFrame,
    column: &'static str,
    bins: &Bins,
    steps: &mut Vec<TransformStep>,
) -> Result<DataFrame> {
    let values = numeric_values(df, column)?;
    let indices = assign(&values, bins);
    let name = group_name(column);

    let mut output = df.clone();
    output.with_column(string_series(&name, &labels_for(&indices, bins)))?;
    steps.push(TransformStep::Grouped {
        column: name,
        labels: bins.labels().to_vec(),
        unbinned: indices.iter().filter(|idx| idx.is_none()).count(),
    });
    Ok(output)
}

/// Groups `car_age` into equal-width bins over its observed range.
pub fn group_car_age(df: &DataFrame, steps: &mut Vec<TransformStep>) -> Result<DataFrame> {
    let values: Vec<f64> = numeric_values(df, CAR_AGE)?.into_iter().flatten().collect();
    match Bins::equal_width(&values, CAR_AGE_BINS) {
        Some(bins) => group_column(df, CAR_AGE, &bins, steps),
        None => {
            // Empty table: emit an empty group column.
            let name = group_name(CAR_AGE);
            let mut output = df.clone();
            output.with_column(string_series(&name, &[]))?;
            steps.push(TransformStep::Grouped {
                column: name,
                labels: Vec::new(),
                unbinned: 0,
            });
            Ok(output)
        }
    }
}

/// Groups `customer_age` into decades and back-fills rows outside every
/// decade according to `backfill`.
pub fn group_customer_age(
    df: &DataFrame,
    backfill: &AgeGroupBackfill,
    steps: &mut Vec<TransformStep>,
) -> Result<DataFrame> {
    let bins = Bins::customer_age();
    let values = numeric_values(df, CUSTOMER_AGE)?;
    let indices = assign(&values, &bins);
    let unbinned = indices.iter().filter(|idx| idx.is_none()).count();

    let fill = match backfill {
        AgeGroupBackfill::LowestObserved => {
            let lowest = indices.iter().flatten().min().copied().unwrap_or(0);
            bins.labels[lowest].clone()
        }
        AgeGroupBackfill::Label(label) => label.clone(),
    };

    let labels: Vec<Option<String>> = labels_for(&indices, &bins)
        .into_iter()
        .map(|label| label.or_else(|| Some(fill.clone())))
        .collect();

    let mut output = df.clone();
    output.with_column(string_series(CUSTOMER_AGE_GROUP, &labels))?;
    steps.push(TransformStep::Grouped {
        column: CUSTOMER_AGE_GROUP.to_string(),
        labels: bins.labels().to_vec(),
        unbinned,
    });
    steps.push(TransformStep::GroupBackfilled {
        column: CUSTOMER_AGE_GROUP,
        label: fill,
        filled: unbinned,
    });
    Ok(output)
}
