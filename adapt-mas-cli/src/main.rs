//! # ADAPT-MAS CLI
//!
//! This crate provides a CLI interface to run experiments with the
//! `adapt-mas` trust library.

#![warn(trivial_casts)]
#![deny(
	absolute_paths_not_starting_with_crate, deprecated, future_incompatible, missing_docs,
	nonstandard_style, unreachable_code, unreachable_patterns
)]
#![forbid(unsafe_code)]
#![deny(
	// Complexity
 	clippy::unnecessary_cast,
	clippy::needless_question_mark,
	// Pedantic
 	clippy::cast_lossless,
 	clippy::cast_possible_wrap,
	// Perf
	clippy::redundant_clone,
	// Restriction
 	clippy::panic,
	// Style
 	clippy::let_and_return,
 	clippy::needless_borrow
)]

mod cli;
mod fs;

use adapt_mas::{error::AdaptError, Config};
use clap::Parser;
use cli::*;
use dotenv::dotenv;
use env_logger::{init_from_env, Env};
use fs::load_config;
use log::info;

fn main() -> Result<(), AdaptError> {
	dotenv().ok();
	init_from_env(Env::default().filter_or("LOG_LEVEL", "info"));
	let mut config: Config = load_config()?;

	match Cli::parse().mode {
		Mode::Analyze(analyze_data) => handle_analyze(config, analyze_data)?,
		Mode::Reviews(simulate_data) => handle_reviews(config, simulate_data)?,
		Mode::Show => {
			let json = serde_json::to_string_pretty(&config)
				.map_err(|e| AdaptError::ParsingError(e.to_string()))?;
			info!("Config:\n{}", json);
		},
		Mode::Simulate(simulate_data) => handle_simulate(config, simulate_data)?,
		Mode::Update(update_data) => {
			handle_update(&mut config, update_data)?;
			info!("Config updated.");
		},
	};

	Ok(())
}
