//! Front-end tests
//!
//! Tests are organized by topic:
//! - `cli` - Argument parsing and report assembly over results files on disk
