pub mod complex_logic;
pub mod config;
pub mod constructor_side_effects;
pub mod demo;
pub mod error;
pub mod global_state;
pub mod hard_coded_dependencies;
pub mod hidden_side_effects;
pub mod logging;
pub mod non_deterministic;
pub mod private_method_complexity;
pub mod providers;
pub mod tight_coupling;

pub use config::{AppConfig, CliArgs, Command, ReorderSettings, SmtpSettings};
pub use demo::{DemoReport, Pattern, Variant};
pub use error::{Error, ErrorCategory, Result};
pub use logging::{LoggingConfig, init_logging};
pub use providers::{
    FixedClock, RandomProvider, SequenceRandom, SystemClock, ThreadRandom, TimeProvider,
};

use serde_json::Value;

/// Runs one CLI command and returns the JSON document to print.
pub fn run(config: &AppConfig, command: &Command) -> anyhow::Result<Value> {
    match command {
        Command::Demo { pattern, variant } => {
            let report = demo::run_demo(config, *pattern, *variant)?;
            Ok(serde_json::to_value(report)?)
        }
        Command::Price { order } => demo::price_order_file(config, order),
        Command::ValidateUser { user } => demo::validate_user_file(user),
    }
}
