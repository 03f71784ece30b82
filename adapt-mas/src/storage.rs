//! # Storage Module.
//!
//! This module contains generic storage traits and implementations.

use crate::{error::AdaptError, review::Review};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{from_reader, to_string_pretty};
use std::{
	collections::BTreeMap,
	fmt::Display,
	fs::File,
	io::{BufReader, Write},
	marker::PhantomData,
	path::PathBuf,
};

/// The main trait to be implemented by different storage types.
pub trait Storage<T> {
	/// The error type.
	type Err;

	/// Loads data from storage.
	fn load(&self) -> Result<T, Self::Err>;
	/// Saves data to storage.
	fn save(&mut self, data: T) -> Result<(), Self::Err>;
}

/// The `CSVFileStorage` struct provides a mechanism for persisting
/// and retrieving structured data to and from CSV files.
///
/// # Examples
///
/// ```no_run
/// use serde::{Serialize, Deserialize};
/// use std::path::PathBuf;
/// use adapt_mas::storage::{CSVFileStorage, Storage};
///
/// #[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
/// struct Record {
///    id: u64,
///    name: String,
/// }
///
/// let filepath = PathBuf::from("/path/to/your/file.csv");
/// let mut storage = CSVFileStorage::<Record>::new(filepath);
///
/// let data = vec![Record { id: 1, name: "Alice".into() }];
///
/// // Save the data to the CSV file.
/// storage.save(data.clone()).unwrap();
///
/// // Load the data from the CSV file.
/// let loaded_data = storage.load().unwrap();
/// assert_eq!(data, loaded_data);
/// ```
pub struct CSVFileStorage<T> {
	filepath: PathBuf,
	phantom: PhantomData<T>,
}

impl<T> CSVFileStorage<T> {
	/// Creates a new CSVFileStorage.
	pub fn new(filepath: PathBuf) -> Self {
		Self { filepath, phantom: PhantomData }
	}

	/// Returns the path to the file.
	pub fn filepath(&self) -> &PathBuf {
		&self.filepath
	}
}

impl<T: Serialize + DeserializeOwned + Clone> Storage<Vec<T>> for CSVFileStorage<T> {
	type Err = AdaptError;

	fn load(&self) -> Result<Vec<T>, AdaptError> {
		let file = File::open(&self.filepath).map_err(AdaptError::IOError)?;
		let mut reader = ReaderBuilder::new().from_reader(BufReader::new(file));

		reader
			.deserialize()
			.map(|result| result.map_err(|e| AdaptError::FileIOError(e.to_string())))
			.collect()
	}

	fn save(&mut self, data: Vec<T>) -> Result<(), AdaptError> {
		let mut writer = WriterBuilder::new()
			.from_path(&self.filepath)
			.map_err(|e| AdaptError::FileIOError(e.to_string()))?;

		for record in &data {
			writer.serialize(record).map_err(|e| AdaptError::FileIOError(e.to_string()))?;
		}

		writer.flush().map_err(|e| AdaptError::FileIOError(e.to_string()))?;

		Ok(())
	}
}

/// The `JSONFileStorage` struct provides a mechanism for persisting
/// and retrieving structured data to and from JSON files.
pub struct JSONFileStorage<T> {
	filepath: PathBuf,
	phantom: PhantomData<T>,
}

impl<T> JSONFileStorage<T> {
	/// Creates a new JSONFileStorage.
	pub fn new(filepath: PathBuf) -> Self {
		Self { filepath, phantom: PhantomData }
	}

	/// Returns the path to the file.
	pub fn filepath(&self) -> &PathBuf {
		&self.filepath
	}
}

impl<T: Serialize + DeserializeOwned + Clone> Storage<T> for JSONFileStorage<T> {
	type Err = AdaptError;

	fn load(&self) -> Result<T, Self::Err> {
		let file = File::open(&self.filepath).map_err(AdaptError::IOError)?;
		let reader = BufReader::new(file);
		from_reader(reader).map_err(|e| AdaptError::ParsingError(e.to_string()))
	}

	fn save(&mut self, data: T) -> Result<(), Self::Err> {
		let json_str =
			to_string_pretty(&data).map_err(|e| AdaptError::ParsingError(e.to_string()))?;

		let mut file = File::create(&self.filepath).map_err(AdaptError::IOError)?;
		file.write_all(json_str.as_bytes()).map_err(AdaptError::IOError)
	}
}

/// Review record, one CSV row per review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
	/// Round the review belongs to.
	round: u32,
	/// Reviewing participant.
	reviewer: String,
	/// Reviewed participant.
	reviewee: String,
	/// Given score.
	score: f64,
}

impl ReviewRecord {
	/// Creates a new review record.
	pub fn new(round: u32, reviewer: String, reviewee: String, score: f64) -> Self {
		Self { round, reviewer, reviewee, score }
	}

	/// Creates a record from a review of any displayable participant type.
	pub fn from_review<P: Display>(round: u32, review: &Review<P>) -> Self {
		Self::new(round, review.reviewer.to_string(), review.reviewee.to_string(), review.score)
	}

	/// Returns the round.
	pub fn round(&self) -> u32 {
		self.round
	}

	/// Returns the reviewer.
	pub fn reviewer(&self) -> &String {
		&self.reviewer
	}

	/// Returns the reviewee.
	pub fn reviewee(&self) -> &String {
		&self.reviewee
	}

	/// Returns the score.
	pub fn score(&self) -> f64 {
		self.score
	}
}

impl From<ReviewRecord> for Review<String> {
	fn from(record: ReviewRecord) -> Self {
		let ReviewRecord { reviewer, reviewee, score, .. } = record;
		Review::new(reviewer, reviewee, score)
	}
}

/// Groups records by round, keeping file order inside each round.
pub fn group_by_round(records: Vec<ReviewRecord>) -> BTreeMap<u32, Vec<Review<String>>> {
	let mut rounds: BTreeMap<u32, Vec<Review<String>>> = BTreeMap::new();
	for record in records {
		rounds.entry(record.round).or_default().push(record.into());
	}
	rounds
}

#[cfg(test)]
mod tests {
	use crate::{config::Config, review::Review, storage::*};
	use serde::{Deserialize, Serialize};
	use std::{env::current_dir, fs};

	// Define the test struct
	#[derive(Debug, Deserialize, PartialEq, Clone, Serialize)]
	struct Record {
		participant: String,
		score: u32,
	}

	#[test]
	fn test_csv_file_storage() {
		// Create the CSV file
		let filepath = current_dir().unwrap().join("test-storage.csv");
		let mut csv_storage = CSVFileStorage::<Record>::new(filepath.clone());

		let content = vec![Record { participant: "agent-7".to_string(), score: 1000 }];

		assert!(csv_storage.save(content.clone()).is_ok());

		// Read the CSV file
		let result = csv_storage.load();

		// Assert
		assert!(result.is_ok());
		let records: Vec<Record> = result.unwrap();
		assert_eq!(records.len(), 1);
		assert_eq!(records[0], content[0]);

		// Clean up
		fs::remove_file(filepath).unwrap();
	}

	#[test]
	fn test_json_file_storage() {
		// Create the JSON file
		let filepath = current_dir().unwrap().join("test-storage.json");
		let mut json_storage = JSONFileStorage::<Config>::new(filepath.clone());

		let content = Config::default();

		// Save the content to the JSON file
		assert!(json_storage.save(content.clone()).is_ok());

		// Load the JSON file
		let result = json_storage.load();

		// Assert
		assert!(result.is_ok());
		assert_eq!(result.unwrap(), content);

		// Clean up
		fs::remove_file(filepath).unwrap();
	}

	#[test]
	fn test_missing_file() {
		let storage = CSVFileStorage::<ReviewRecord>::new("does-not-exist.csv".into());
		assert!(storage.load().is_err());
	}

	#[test]
	fn test_review_records_by_round() {
		let records = vec![
			ReviewRecord::from_review(2, &Review::new(1u32, 0, 0.5)),
			ReviewRecord::from_review(1, &Review::new(2u32, 0, 0.8)),
			ReviewRecord::from_review(2, &Review::new(0u32, 1, -0.5)),
		];

		let rounds = group_by_round(records);
		assert_eq!(rounds.len(), 2);
		assert_eq!(rounds[&1], vec![Review::new("2".to_string(), "0".to_string(), 0.8)]);
		assert_eq!(rounds[&2].len(), 2);
		assert_eq!(rounds[&2][1].reviewer, "0");
	}
}
