//! Integration tests for the pipeline
//!
//! These use wiremock mock servers and temporary SQLite databases to drive
//! the stages end-to-end.

mod pipeline_tests;
