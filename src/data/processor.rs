//! Data Processor Module
//! Cleans the raw transaction export, derives computed fields and joins town coordinates.

use super::cleaning::{
    normalize_area_name, normalize_period, parse_amount, parse_code, parse_total_area, ParseError,
};
use super::columns::*;
use super::loader::{DataLoader, LoaderError};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Temporary column carrying the input row order through the join.
const ROW_ORDER: &str = "__row_order";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("Row {row}, column {column}: {source}")]
    Parse {
        column: &'static str,
        row: usize,
        source: ParseError,
    },
    #[error("Row {row}, column {column}: {reason}")]
    InvalidValue {
        column: &'static str,
        row: usize,
        reason: String,
    },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Result of one cleaning run.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub frame: DataFrame,
    /// Row count of the raw transaction export.
    pub source_rows: usize,
}

impl CleanedTable {
    /// Transactions dropped because no town coordinates matched.
    pub fn unmatched_rows(&self) -> usize {
        self.source_rows.saturating_sub(self.frame.height())
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

/// Batch cleaning pipeline over one transaction export and one towns reference.
pub struct Preprocessor {
    transactions_path: PathBuf,
    towns_path: PathBuf,
}

impl Preprocessor {
    pub fn new(transactions_path: impl Into<PathBuf>, towns_path: impl Into<PathBuf>) -> Self {
        Self {
            transactions_path: transactions_path.into(),
            towns_path: towns_path.into(),
        }
    }

    /// Load both sources and run every cleaning stage. Any failure aborts the run.
    pub fn process(&self) -> Result<CleanedTable, ProcessorError> {
        let (transactions, towns) = DataLoader::load(&self.transactions_path, &self.towns_path)?;
        Self::clean(&transactions, &towns)
    }

    /// Run the cleaning stages over already-loaded raw frames.
    pub fn clean(transactions: &DataFrame, towns: &DataFrame) -> Result<CleanedTable, ProcessorError> {
        let source_rows = transactions.height();

        let df = Self::rename_columns(transactions)?;
        let df = Self::fill_missing(df)?;
        let df = Self::normalize_area_names(df)?;
        let df = Self::normalize_periods(df)?;
        let df = Self::parse_numeric_columns(df)?;
        let df = Self::derive_total_area(df)?;
        let df = Self::backfill_unit_price(df)?;
        let towns = Self::prepare_towns(towns)?;
        let frame = Self::join(df, towns)?;

        let table = CleanedTable { frame, source_rows };
        info!(
            input_rows = source_rows,
            output_rows = table.height(),
            columns = table.frame.width(),
            "Cleaned transactions"
        );
        if table.unmatched_rows() > 0 {
            warn!(
                unmatched = table.unmatched_rows(),
                "Dropped transactions without town coordinates"
            );
        }
        Ok(table)
    }

    /// Map every source header to its canonical key.
    ///
    /// Unknown headers and missing expected headers are both treated as schema drift.
    pub fn rename_columns(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let headers = DataLoader::column_names(df);

        let unmapped: Vec<&str> = headers
            .iter()
            .map(String::as_str)
            .filter(|h| canonical_key(h).is_none())
            .collect();
        if !unmapped.is_empty() {
            return Err(ProcessorError::SchemaMismatch(format!(
                "unmapped columns: {}",
                unmapped.join(", ")
            )));
        }

        let missing: Vec<&str> = COLUMN_MAPPING
            .iter()
            .map(|(raw, _)| *raw)
            .filter(|raw| !headers.iter().any(|h| h.trim() == *raw))
            .collect();
        if !missing.is_empty() {
            return Err(ProcessorError::SchemaMismatch(format!(
                "missing columns: {}",
                missing.join(", ")
            )));
        }

        let mut columns = Vec::with_capacity(df.width());
        for header in &headers {
            let key = canonical_key(header).ok_or_else(|| {
                ProcessorError::SchemaMismatch(format!("unmapped column: {header}"))
            })?;
            let values = string_values(df, header)?;
            columns.push(Column::new(key.into(), values));
        }

        debug!(columns = columns.len(), "Renamed columns");
        Ok(DataFrame::new(columns)?)
    }

    /// Replace nulls in categorical columns with explicit sentinels.
    pub fn fill_missing(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        for column in CATEGORICAL_COLUMNS {
            fill_column(&mut df, column, UNKNOWN)?;
        }
        fill_column(&mut df, AREA_NAME, MISSING_AREA)?;
        Ok(df)
    }

    /// Rewrite `area_name` into the join key form.
    pub fn normalize_area_names(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let normalized: Vec<String> = string_values(&df, AREA_NAME)?
            .iter()
            .map(|name| normalize_area_name(name.as_deref()))
            .collect();
        df.with_column(Column::new(AREA_NAME.into(), normalized))?;
        Ok(df)
    }

    /// Rewrite `transaction_period` into `"<year>-<quarter>"` tokens.
    pub fn normalize_periods(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut periods = Vec::with_capacity(df.height());
        for (idx, text) in string_values(&df, TRANSACTION_PERIOD)?.iter().enumerate() {
            let period = text
                .as_deref()
                .ok_or(ParseError::Missing)
                .and_then(normalize_period)
                .map_err(|source| parse_error(TRANSACTION_PERIOD, idx, source))?;
            periods.push(period);
        }
        df.with_column(Column::new(TRANSACTION_PERIOD.into(), periods))?;
        debug!("Normalized transaction periods");
        Ok(df)
    }

    /// Convert the city code and total price into integer columns.
    pub fn parse_numeric_columns(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut codes = Vec::with_capacity(df.height());
        for (idx, text) in string_values(&df, CITY_CODE)?.iter().enumerate() {
            codes.push(parse_code(text.as_deref()).map_err(|e| parse_error(CITY_CODE, idx, e))?);
        }

        let mut totals: Vec<Option<i64>> = Vec::with_capacity(df.height());
        for (idx, text) in string_values(&df, PRICE_TOTAL)?.iter().enumerate() {
            let total = parse_amount(text.as_deref()).map_err(|e| parse_error(PRICE_TOTAL, idx, e))?;
            totals.push(total.map(|v| whole_number(v, PRICE_TOTAL, idx)).transpose()?);
        }

        df.with_column(Column::new(CITY_CODE.into(), codes))?;
        df.with_column(Column::new(PRICE_TOTAL.into(), totals))?;
        Ok(df)
    }

    /// Derive `total_area` from the free-text lot area.
    pub fn derive_total_area(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut areas = Vec::with_capacity(df.height());
        for (idx, text) in string_values(&df, AREA_M2)?.iter().enumerate() {
            areas.push(parse_total_area(text.as_deref()).map_err(|e| parse_error(AREA_M2, idx, e))?);
        }
        df.with_column(Column::new(TOTAL_AREA.into(), areas))?;
        debug!("Derived total area");
        Ok(df)
    }

    /// Fill missing unit prices from total price / total area and round every price up.
    pub fn backfill_unit_price(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let unit_prices = string_values(&df, UNIT_PRICE)?;
        let mut backfilled = 0usize;

        let prices = {
            let totals = df.column(PRICE_TOTAL)?.i64()?;
            let areas = df.column(TOTAL_AREA)?.i64()?;

            let mut prices: Vec<i64> = Vec::with_capacity(df.height());
            for (idx, ((unit, total), area)) in unit_prices
                .iter()
                .zip(totals.into_iter())
                .zip(areas.into_iter())
                .enumerate()
            {
                let existing =
                    parse_amount(unit.as_deref()).map_err(|e| parse_error(UNIT_PRICE, idx, e))?;
                let price = match existing {
                    Some(price) => price.ceil(),
                    None => {
                        let total = total.ok_or_else(|| {
                            invalid(UNIT_PRICE, idx, "no unit price and no total price to derive it from")
                        })?;
                        let area = area
                            .filter(|a| *a > 0)
                            .ok_or_else(|| invalid(TOTAL_AREA, idx, "total area must be positive"))?;
                        backfilled += 1;
                        (total as f64 / area as f64).ceil()
                    }
                };
                if !price.is_finite() || price < 1.0 {
                    return Err(invalid(UNIT_PRICE, idx, "unit price must be a positive amount"));
                }
                prices.push(price as i64);
            }
            prices
        };

        df.with_column(Column::new(UNIT_PRICE.into(), prices))?;
        debug!(backfilled, "Backfilled unit prices");
        Ok(df)
    }

    /// Rename, normalize and deduplicate the towns reference on (city code, area name).
    pub fn prepare_towns(towns: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let headers = DataLoader::column_names(towns);
        let missing: Vec<&str> = [TOWN_CITY_CODE, TOWN_AREA_NAME, LATITUDE, LONGITUDE]
            .into_iter()
            .filter(|required| !headers.iter().any(|h| h == required))
            .collect();
        if !missing.is_empty() {
            return Err(ProcessorError::SchemaMismatch(format!(
                "towns reference is missing columns: {}",
                missing.join(", ")
            )));
        }

        let codes = string_values(towns, TOWN_CITY_CODE)?;
        let names = string_values(towns, TOWN_AREA_NAME)?;
        let lats = string_values(towns, LATITUDE)?;
        let lons = string_values(towns, LONGITUDE)?;

        let mut seen: HashSet<(i64, String)> = HashSet::new();
        let mut out_codes = Vec::new();
        let mut out_names = Vec::new();
        let mut out_lats: Vec<Option<f64>> = Vec::new();
        let mut out_lons: Vec<Option<f64>> = Vec::new();

        for (idx, (((code, name), lat), lon)) in codes
            .iter()
            .zip(names.iter())
            .zip(lats.iter())
            .zip(lons.iter())
            .enumerate()
        {
            let code = parse_code(code.as_deref()).map_err(|e| parse_error(CITY_CODE, idx, e))?;
            let name = normalize_area_name(name.as_deref());
            if !seen.insert((code, name.clone())) {
                continue;
            }
            out_codes.push(code);
            out_names.push(name);
            out_lats.push(parse_amount(lat.as_deref()).map_err(|e| parse_error(LATITUDE, idx, e))?);
            out_lons.push(parse_amount(lon.as_deref()).map_err(|e| parse_error(LONGITUDE, idx, e))?);
        }

        debug!(
            rows = towns.height(),
            unique = out_codes.len(),
            "Deduplicated towns reference"
        );
        Ok(DataFrame::new(vec![
            Column::new(CITY_CODE.into(), out_codes),
            Column::new(AREA_NAME.into(), out_names),
            Column::new(LATITUDE.into(), out_lats),
            Column::new(LONGITUDE.into(), out_lons),
        ])?)
    }

    /// Left-join town coordinates and drop rows without both coordinates, keeping input order.
    pub fn join(mut transactions: DataFrame, towns: DataFrame) -> Result<DataFrame, ProcessorError> {
        let order: Vec<i64> = (0..transactions.height() as i64).collect();
        transactions.with_column(Column::new(ROW_ORDER.into(), order))?;

        let keys = [col(CITY_CODE), col(AREA_NAME)];
        let joined = transactions
            .lazy()
            .join(
                towns.lazy(),
                keys.clone(),
                keys,
                JoinArgs::new(JoinType::Left),
            )
            .filter(col(LATITUDE).is_not_null().and(col(LONGITUDE).is_not_null()))
            .sort_by_exprs([col(ROW_ORDER)], SortMultipleOptions::default())
            .collect()?;

        Ok(joined.drop(ROW_ORDER)?)
    }
}

/// Read a string column into owned values.
pub(crate) fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let ca = df.column(name)?.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Blank values count as missing, the same as nulls.
fn fill_column(df: &mut DataFrame, name: &str, sentinel: &str) -> Result<(), ProcessorError> {
    let filled: Vec<String> = string_values(df, name)?
        .into_iter()
        .map(|v| match v {
            Some(value) if !value.trim().is_empty() => value,
            _ => sentinel.to_string(),
        })
        .collect();
    df.with_column(Column::new(name.into(), filled))?;
    Ok(())
}

fn whole_number(value: f64, column: &'static str, idx: usize) -> Result<i64, ProcessorError> {
    if value.is_finite() && value.fract() == 0.0 {
        Ok(value as i64)
    } else {
        Err(invalid(column, idx, "expected a whole amount"))
    }
}

/// Rows are reported 1-based, counting data rows only.
fn parse_error(column: &'static str, idx: usize, source: ParseError) -> ProcessorError {
    ProcessorError::Parse {
        column,
        row: idx + 1,
        source,
    }
}

fn invalid(column: &'static str, idx: usize, reason: &str) -> ProcessorError {
    ProcessorError::InvalidValue {
        column,
        row: idx + 1,
        reason: reason.to_string(),
    }
}
