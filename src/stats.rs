//! Summary statistics over a batch of AQI results.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::aqi::{AqiCategory, AqiResult};

#[derive(Debug, Default, Serialize)]
pub struct AqiSummary {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    /// Share of each category, 0.0–100.0.
    pub pct_by_category: BTreeMap<String, f64>,
    pub min_aqi: Option<u16>,
    pub max_aqi: Option<u16>,
    pub mean_aqi: f64,
    /// Most frequent category; ties go to the worse one.
    pub dominant_category: Option<AqiCategory>,
}

impl AqiSummary {
    pub fn from_results(results: &[AqiResult]) -> Self {
        let mut counts: BTreeMap<AqiCategory, usize> = BTreeMap::new();
        for r in results {
            *counts.entry(r.category).or_default() += 1;
        }

        let values: Vec<f64> = results.iter().map(|r| f64::from(r.aqi)).collect();

        let dominant_category = counts
            .iter()
            .max_by_key(|(category, count)| (**count, **category))
            .map(|(category, _)| *category);

        let mut summary = AqiSummary {
            total: results.len(),
            by_category: counts
                .into_iter()
                .map(|(category, count)| (category.label().to_string(), count))
                .collect(),
            min_aqi: results.iter().map(|r| r.aqi).min(),
            max_aqi: results.iter().map(|r| r.aqi).max(),
            mean_aqi: mean(&values),
            dominant_category,
            ..Default::default()
        };
        summary.pct_by_category = AqiCategory::ALL
            .iter()
            .filter(|c| summary.by_category.contains_key(c.label()))
            .map(|c| (c.label().to_string(), summary.pct(*c)))
            .collect();
        summary
    }

    /// Share of results in `category`, 0.0–100.0.
    pub fn pct(&self, category: AqiCategory) -> f64 {
        let part = self.by_category.get(category.label()).copied().unwrap_or(0);
        if self.total == 0 {
            0.0
        } else {
            (part as f64 / self.total as f64) * 100.0
        }
    }
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
