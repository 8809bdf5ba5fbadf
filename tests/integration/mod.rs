//! Integration tests for the studygen generation pipeline

mod cli_commands;
mod config_loading;
mod error_payload;
mod gateway_backpressure;
mod pipeline_end_to_end;
mod quiz_fallback;
mod test_utils;
