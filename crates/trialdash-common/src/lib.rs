//! Shared utilities for the trialdash crates.
//!
//! Cell-level helpers used on both sides of the pipeline: reading Polars
//! `AnyValue`s into plain Rust values while loading, and formatting counts
//! and percentages while building report tables.

pub mod polars;

pub use polars::{
    any_to_f64, any_to_i64, any_to_string, any_to_string_non_empty, format_numeric,
    format_percent, parse_f64, parse_i64, parse_integral,
};
