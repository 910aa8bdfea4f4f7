//! Integration harness: the full compile → execute → decode pipeline
//! against an in-memory fake connection.

mod support;

mod cache_scenarios;
mod conjunction_scenarios;
mod find_scenarios;
mod lifecycle;
