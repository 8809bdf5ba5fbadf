//! Property-based tests for classification, retry bounds and the error contract

mod classifier;
mod retry_bounds;
