//! Stats module - unit-price aggregations

mod calculator;

pub use calculator::{CategoryMean, PriceSummary, PurposeTrend, StatsCalculator};
