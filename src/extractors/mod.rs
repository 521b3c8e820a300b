// src/extractors/mod.rs
pub mod indicators;

pub use indicators::{Indicator, IndicatorRecord, IndicatorValue};
