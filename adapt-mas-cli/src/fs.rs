//! # Filesystem Actions Module.
//!
//! This module provides functionalities for filesystem actions.

use adapt_mas::{
	error::AdaptError,
	storage::{JSONFileStorage, Storage},
	Config,
};
use std::{env::current_dir, path::PathBuf};

/// Configuration file name.
pub const CONFIG_FILENAME: &str = "config";
/// Recorded review rounds file name.
pub const REVIEWS_FILENAME: &str = "reviews";

/// Enum representing the possible file extensions.
pub enum FileType {
	/// CSV file.
	Csv,
	/// JSON file.
	Json,
}

impl FileType {
	/// Converts the enum variant into its corresponding file extension.
	fn as_str(&self) -> &'static str {
		match self {
			FileType::Csv => "csv",
			FileType::Json => "json",
		}
	}
}

/// Retrieves the path to the `assets` directory.
pub fn get_assets_path() -> Result<PathBuf, AdaptError> {
	current_dir().map_err(AdaptError::IOError).map(|current_dir| {
		// Workaround for the tests running in the crate directory.
		#[cfg(test)]
		{
			current_dir.join("assets")
		}

		#[cfg(not(test))]
		{
			current_dir.join("adapt-mas-cli/assets")
		}
	})
}

/// Helper function to get the path of a file in the `assets` directory.
pub fn get_file_path(file_name: &str, file_type: FileType) -> Result<PathBuf, AdaptError> {
	let assets_path = get_assets_path()?;
	Ok(assets_path.join(format!("{}.{}", file_name, file_type.as_str())))
}

/// Loads and validates the configuration file.
pub fn load_config() -> Result<Config, AdaptError> {
	let filepath = get_file_path(CONFIG_FILENAME, FileType::Json)?;
	let config = JSONFileStorage::<Config>::new(filepath).load()?;
	config.validate()?;
	Ok(config)
}

/// Validates and saves the configuration file.
pub fn save_config(config: &Config) -> Result<(), AdaptError> {
	config.validate()?;
	let filepath = get_file_path(CONFIG_FILENAME, FileType::Json)?;
	JSONFileStorage::<Config>::new(filepath).save(config.clone())
}
