//! Filtered read view over the cleaned table.
//!
//! The dashboard never keeps a shared "current dataset": every refresh builds a
//! [`TransactionView`] over the table it owns and asks for a [`FilteredView`].

use super::columns::{CITY_NAME, PREFECTURE, PURPOSE_OF_USE, TRANSACTION_PERIOD};
use super::string_values;
use polars::prelude::*;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Zoom of the point map when no city is selected.
pub const SCATTER_ZOOM: u8 = 10;
/// Zoom of the point map once a city filter applies.
pub const CITY_ZOOM: u8 = 12;
/// Zoom of the animated hexbin map.
pub const HEXBIN_ZOOM: u8 = 9;
/// Hexagons across the x extent of the hexbin map.
pub const HEXBIN_HEXAGONS: usize = 20;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Sidebar selection. `None` means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub prefecture: Option<String>,
    pub period: Option<String>,
    pub purpose_of_use: Option<String>,
    pub city: Option<String>,
}

/// Values offered by the period, purpose and city selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub periods: Vec<String>,
    pub purposes: Vec<String>,
    pub cities: Vec<String>,
}

/// Result of applying a [`FilterSelection`].
#[derive(Debug, Clone)]
pub struct FilteredView {
    /// Rows of the selected prefecture across all periods.
    pub region: DataFrame,
    /// Rows of the selected period, narrowed by purpose and city when they apply.
    pub quarter: DataFrame,
    pub purpose_applied: bool,
    pub city_applied: bool,
    pub zoom: u8,
}

pub struct TransactionView<'a> {
    table: &'a DataFrame,
}

impl<'a> TransactionView<'a> {
    pub fn new(table: &'a DataFrame) -> Self {
        Self { table }
    }

    /// Sorted prefectures present in the table.
    pub fn prefectures(&self) -> Result<Vec<String>, ViewError> {
        Ok(unique_values(self.table, PREFECTURE)?)
    }

    pub fn periods(&self) -> Result<Vec<String>, ViewError> {
        Ok(unique_values(self.table, TRANSACTION_PERIOD)?)
    }

    pub fn purposes(&self) -> Result<Vec<String>, ViewError> {
        Ok(unique_values(self.table, PURPOSE_OF_USE)?)
    }

    pub fn cities(&self) -> Result<Vec<String>, ViewError> {
        Ok(unique_values(self.table, CITY_NAME)?)
    }

    /// Selector values inside one prefecture (or the whole table).
    pub fn options(&self, prefecture: Option<&str>) -> Result<FilterOptions, ViewError> {
        let region = self.region(prefecture)?;
        let view = TransactionView::new(&region);
        Ok(FilterOptions {
            periods: view.periods()?,
            purposes: view.purposes()?,
            cities: view.cities()?,
        })
    }

    /// Apply the selection.
    ///
    /// Purpose and city filters only apply when the value occurs in the selected period;
    /// otherwise the period rows are shown unfiltered on that axis.
    pub fn select(&self, selection: &FilterSelection) -> Result<FilteredView, ViewError> {
        let region = self.region(selection.prefecture.as_deref())?;

        let mut quarter = match &selection.period {
            Some(period) => filter_eq(&region, TRANSACTION_PERIOD, period)?,
            None => region.clone(),
        };

        let mut purpose_applied = false;
        if let Some(purpose) = &selection.purpose_of_use {
            if contains_value(&quarter, PURPOSE_OF_USE, purpose)? {
                quarter = filter_eq(&quarter, PURPOSE_OF_USE, purpose)?;
                purpose_applied = true;
            }
        }

        let mut city_applied = false;
        if let Some(city) = &selection.city {
            if contains_value(&quarter, CITY_NAME, city)? {
                quarter = filter_eq(&quarter, CITY_NAME, city)?;
                city_applied = true;
            }
        }

        let zoom = if city_applied { CITY_ZOOM } else { SCATTER_ZOOM };
        debug!(
            region_rows = region.height(),
            quarter_rows = quarter.height(),
            purpose_applied,
            city_applied,
            "Applied filters"
        );

        Ok(FilteredView {
            region,
            quarter,
            purpose_applied,
            city_applied,
            zoom,
        })
    }

    fn region(&self, prefecture: Option<&str>) -> Result<DataFrame, ViewError> {
        match prefecture {
            Some(prefecture) => filter_eq(self.table, PREFECTURE, prefecture),
            None => Ok(self.table.clone()),
        }
    }
}

fn filter_eq(df: &DataFrame, column: &str, value: &str) -> Result<DataFrame, ViewError> {
    let filtered = df
        .clone()
        .lazy()
        .filter(col(column).eq(lit(value)))
        .collect()?;
    Ok(filtered)
}

fn contains_value(df: &DataFrame, column: &str, value: &str) -> PolarsResult<bool> {
    Ok(string_values(df, column)?
        .iter()
        .any(|v| v.as_deref() == Some(value)))
}

/// Sorted, non-null unique values of a string column.
pub(crate) fn unique_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<String>> {
    let values: BTreeSet<String> = string_values(df, column)?.into_iter().flatten().collect();
    Ok(values.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{raw_frame, row, towns_frame};
    use crate::data::Preprocessor;

    fn table() -> DataFrame {
        let raw = raw_frame(&[
            row(&[("Prefecture", "Tokyo"), ("Transaction period", "1st quarter 2021"), ("Purpose of Use", "House"), ("City,Town,Ward,Village", "Chiyoda Ward")]),
            row(&[("Prefecture", "Tokyo"), ("Transaction period", "1st quarter 2021"), ("Purpose of Use", "Office"), ("City,Town,Ward,Village", "Chiyoda Ward")]),
            row(&[("Prefecture", "Tokyo"), ("Transaction period", "2nd quarter 2021"), ("Purpose of Use", "House"), ("City,Town,Ward,Village", "Minato Ward")]),
            row(&[("Prefecture", "Osaka"), ("Transaction period", "4th quarter 2020"), ("Purpose of Use", "Shop"), ("City,Town,Ward,Village", "Kita Ward")]),
        ]);
        let towns = towns_frame(&[("13101", "Marunouchi", "35.681", "139.764")]);
        Preprocessor::clean(&raw, &towns).unwrap().frame
    }

    #[test]
    fn options_are_sorted_and_scoped_to_prefecture() {
        let table = table();
        let view = TransactionView::new(&table);
        assert_eq!(view.prefectures().unwrap(), vec!["Osaka", "Tokyo"]);

        assert_eq!(view.periods().unwrap(), vec!["2020-4", "2021-1", "2021-2"]);
        assert_eq!(view.purposes().unwrap(), vec!["House", "Office", "Shop"]);
        assert_eq!(view.options(None).unwrap().cities.len(), 3);

        let tokyo = view.options(Some("Tokyo")).unwrap();
        assert_eq!(tokyo.periods, vec!["2021-1", "2021-2"]);
        assert_eq!(tokyo.purposes, vec!["House", "Office"]);
        assert_eq!(tokyo.cities, vec!["Chiyoda Ward", "Minato Ward"]);
    }

    #[test]
    fn period_and_purpose_narrow_the_quarter() {
        let table = table();
        let view = TransactionView::new(&table);
        let selection = FilterSelection {
            prefecture: Some("Tokyo".into()),
            period: Some("2021-1".into()),
            purpose_of_use: Some("Office".into()),
            city: None,
        };
        let filtered = view.select(&selection).unwrap();
        assert_eq!(filtered.region.height(), 3);
        assert_eq!(filtered.quarter.height(), 1);
        assert!(filtered.purpose_applied);
        assert_eq!(filtered.zoom, SCATTER_ZOOM);
    }

    #[test]
    fn absent_purpose_is_ignored() {
        let table = table();
        let view = TransactionView::new(&table);
        let selection = FilterSelection {
            prefecture: Some("Tokyo".into()),
            period: Some("2021-2".into()),
            purpose_of_use: Some("Office".into()),
            city: None,
        };
        let filtered = view.select(&selection).unwrap();
        assert_eq!(filtered.quarter.height(), 1);
        assert!(!filtered.purpose_applied);
    }

    #[test]
    fn city_filter_zooms_in() {
        let table = table();
        let view = TransactionView::new(&table);
        let selection = FilterSelection {
            prefecture: None,
            period: Some("2021-1".into()),
            purpose_of_use: None,
            city: Some("Chiyoda Ward".into()),
        };
        let filtered = view.select(&selection).unwrap();
        assert_eq!(filtered.quarter.height(), 2);
        assert!(filtered.city_applied);
        assert_eq!(filtered.zoom, CITY_ZOOM);

        let elsewhere = FilterSelection {
            city: Some("Kita Ward".into()),
            ..selection
        };
        let filtered = view.select(&elsewhere).unwrap();
        assert!(!filtered.city_applied);
        assert_eq!(filtered.zoom, SCATTER_ZOOM);
    }

    #[test]
    fn default_selection_keeps_every_row() {
        let table = table();
        let filtered = TransactionView::new(&table)
            .select(&FilterSelection::default())
            .unwrap();
        assert_eq!(filtered.quarter.height(), table.height());
    }
}
