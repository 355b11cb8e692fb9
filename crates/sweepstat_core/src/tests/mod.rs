//! Scenario and property tests for the statistics engine
//!
//! Tests are organized by topic:
//! - `pipeline` - Raw results through normalization into every aggregation
//! - `properties` - Invariants checked over generated record sets
//! - `bootstrap_spread` - Statistical check that more resamples tighten intervals
