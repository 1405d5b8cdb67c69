//! Row-level transformations applied between loading and merging.

mod expander;

pub use expander::{split_comma_separated, ExpandResult, RowExpander};
