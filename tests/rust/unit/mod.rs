//! Unit test harness; each module exercises one layer through the public
//! API.

mod pattern_template_tests;
mod sql_generation_tests;
