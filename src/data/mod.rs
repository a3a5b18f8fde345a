//! Data module - raw CSV loading, cleaning pipeline and filtered read views

pub mod cleaning;
pub mod columns;
mod loader;
mod processor;
mod view;

pub use processor::{CleanedTable, Preprocessor};
pub use view::{FilterOptions, FilterSelection, FilteredView, TransactionView};
pub use view::{HEXBIN_HEXAGONS, HEXBIN_ZOOM};

pub(crate) use processor::string_values;

#[cfg(test)]
pub(crate) use processor::tests as fixtures;
