//! Statistics Calculator Module
//! Unit-price aggregations behind the dashboard charts.

use crate::data::columns::{LAYOUT, PURPOSE_OF_USE, TRANSACTION_PERIOD, UNIT_PRICE, UNKNOWN};
use crate::data::string_values;
use polars::prelude::*;
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Purposes left out of the trend chart.
pub const TREND_EXCLUDED_PURPOSES: [&str; 2] = [UNKNOWN, "Other"];

/// Descriptive statistics of the unit price for one view.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub p05: f64,
    pub p95: f64,
}

impl Default for PriceSummary {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

impl PriceSummary {
    /// Summary of the unit price column.
    pub fn from_frame(df: &DataFrame) -> PolarsResult<Self> {
        Ok(StatsCalculator::compute_descriptive_stats(
            &StatsCalculator::unit_prices(df)?,
        ))
    }
}

/// Mean unit price of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMean {
    pub label: String,
    pub mean: f64,
    pub count: usize,
}

/// Mean unit price per period for one purpose of use.
#[derive(Debug, Clone, PartialEq)]
pub struct PurposeTrend {
    pub purpose: String,
    /// (period, mean unit price), periods ascending.
    pub points: Vec<(String, f64)>,
}

pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> PriceSummary {
        let n = values.len();
        if n == 0 {
            return PriceSummary::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        PriceSummary {
            count: n,
            mean: values.iter().mean(),
            median: Self::percentile(&sorted, 50.0),
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Unit prices of every row as floats.
    pub fn unit_prices(df: &DataFrame) -> PolarsResult<Vec<f64>> {
        let prices = df.column(UNIT_PRICE)?.i64()?;
        Ok(prices.into_iter().flatten().map(|v| v as f64).collect())
    }

    /// Mean unit price per layout, highest first.
    pub fn mean_unit_price_by_layout(df: &DataFrame) -> PolarsResult<Vec<CategoryMean>> {
        let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
        for (layout, price) in Self::labelled_prices(df, LAYOUT)? {
            groups.entry(layout).or_default().push(price);
        }

        let mut means: Vec<CategoryMean> = groups
            .into_iter()
            .map(|(label, values)| CategoryMean {
                label,
                count: values.len(),
                mean: values.iter().mean(),
            })
            .collect();
        means.sort_by(|a, b| {
            b.mean
                .partial_cmp(&a.mean)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        });
        Ok(means)
    }

    /// Mean unit price per (period, purpose of use), without the catch-all purposes.
    pub fn unit_price_trend_by_purpose(df: &DataFrame) -> PolarsResult<Vec<PurposeTrend>> {
        let periods = string_values(df, TRANSACTION_PERIOD)?;
        let purposes = string_values(df, PURPOSE_OF_USE)?;
        let prices = df.column(UNIT_PRICE)?.i64()?;

        let mut groups: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
        for ((period, purpose), price) in periods.into_iter().zip(purposes).zip(prices.into_iter()) {
            let (Some(period), Some(purpose), Some(price)) = (period, purpose, price) else {
                continue;
            };
            if TREND_EXCLUDED_PURPOSES.contains(&purpose.as_str()) {
                continue;
            }
            groups
                .entry(purpose)
                .or_default()
                .entry(period)
                .or_default()
                .push(price as f64);
        }

        Ok(groups
            .into_iter()
            .map(|(purpose, by_period)| PurposeTrend {
                purpose,
                points: by_period
                    .into_iter()
                    .map(|(period, values)| (period, values.iter().mean()))
                    .collect(),
            })
            .collect())
    }

    /// All periods appearing in a set of trends, ascending.
    pub fn trend_periods(trends: &[PurposeTrend]) -> Vec<String> {
        let periods: BTreeSet<&String> = trends
            .iter()
            .flat_map(|t| t.points.iter().map(|(period, _)| period))
            .collect();
        periods.into_iter().cloned().collect()
    }

    fn labelled_prices(df: &DataFrame, column: &str) -> PolarsResult<Vec<(String, f64)>> {
        let labels = string_values(df, column)?;
        let prices = df.column(UNIT_PRICE)?.i64()?;
        Ok(labels
            .into_iter()
            .zip(prices.into_iter())
            .filter_map(|(label, price)| Some((label?, price? as f64)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rows: &[(&str, &str, &str, i64)]) -> DataFrame {
        DataFrame::new(vec![
            Column::new(TRANSACTION_PERIOD.into(), rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            Column::new(PURPOSE_OF_USE.into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
            Column::new(LAYOUT.into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()),
            Column::new(UNIT_PRICE.into(), rows.iter().map(|r| r.3).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    #[test]
    fn descriptive_stats_match_numpy_interpolation() {
        let stats = StatsCalculator::compute_descriptive_stats(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert!((stats.p05 - 1.15).abs() < 1e-12);
        assert!((stats.p95 - 3.85).abs() < 1e-12);
    }

    #[test]
    fn empty_summary_is_nan() {
        let stats = StatsCalculator::compute_descriptive_stats(&[]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn layout_means_sorted_descending() {
        let df = frame(&[
            ("2021-1", "House", "1LDK", 100),
            ("2021-1", "House", "1LDK", 300),
            ("2021-1", "House", "3LDK", 500),
            ("2021-1", "House", "Unknown", 50),
        ]);
        let means = StatsCalculator::mean_unit_price_by_layout(&df).unwrap();
        let labels: Vec<&str> = means.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["3LDK", "1LDK", "Unknown"]);
        assert_eq!(means[1].count, 2);
        assert!((means[1].mean - 200.0).abs() < 1e-12);
    }

    #[test]
    fn purpose_trend_excludes_catch_all_purposes() {
        let df = frame(&[
            ("2021-2", "House", "1K", 300),
            ("2021-1", "House", "1K", 100),
            ("2021-1", "House", "1K", 200),
            ("2021-1", "Office", "1K", 900),
            ("2021-1", "Unknown", "1K", 10),
            ("2021-1", "Other", "1K", 10),
        ]);
        let trends = StatsCalculator::unit_price_trend_by_purpose(&df).unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].purpose, "House");
        assert_eq!(
            trends[0].points,
            vec![("2021-1".to_string(), 150.0), ("2021-2".to_string(), 300.0)]
        );
        assert_eq!(StatsCalculator::trend_periods(&trends), vec!["2021-1", "2021-2"]);
    }

    #[test]
    fn price_summary_reads_unit_price_column() {
        let df = frame(&[("2021-1", "House", "1K", 10), ("2021-1", "House", "1K", 30)]);
        let summary = PriceSummary::from_frame(&df).unwrap();
        assert_eq!(summary.count, 2);
        assert!((summary.mean - 20.0).abs() < 1e-12);
    }
}
