//! # CLI Module.
//!
//! This module contains all CLI related data handling and conversions.

use crate::fs::{get_file_path, save_config, FileType, REVIEWS_FILENAME};
use adapt_mas::{
	agent::{AttackType, Quality},
	error::AdaptError,
	simulation::{RoundSummary, Simulation},
	storage::{group_by_round, CSVFileStorage, ReviewRecord, Storage},
	Config, Contribution, Review, TrustOrchestrator, TrustStore,
};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::{
	collections::{BTreeMap, BTreeSet},
	path::PathBuf,
	str::FromStr,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub mode: Mode,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Mode {
	/// Replay recorded review rounds through the trust model.
	Analyze(AnalyzeData),
	/// Simulate rounds and record their reviews. Accepts 'SimulateData'.
	Reviews(SimulateData),
	/// Display the current configuration.
	Show,
	/// Run a full experiment. Accepts 'SimulateData'.
	Simulate(SimulateData),
	/// Update the configuration. Requires 'UpdateData'.
	Update(UpdateData),
}

/// Analysis subcommand input.
#[derive(Args, Debug)]
pub struct AnalyzeData {
	/// Reviews CSV file (defaults to the recorded reviews in assets).
	#[clap(long = "file")]
	file: Option<String>,
}

/// Simulation overrides, applied on top of the configuration.
#[derive(Args, Debug, Default)]
pub struct SimulateData {
	/// Number of agents.
	#[clap(long = "agents")]
	agents: Option<String>,
	/// Number of rounds.
	#[clap(long = "rounds")]
	rounds: Option<String>,
	/// Attack type (sleeper, colluding, camouflage).
	#[clap(long = "attack")]
	attack: Option<String>,
	/// Share of malicious agents (0.0-1.0).
	#[clap(long = "ratio")]
	ratio: Option<String>,
	/// Random seed.
	#[clap(long = "seed")]
	seed: Option<String>,
}

/// Configuration update subcommand input.
#[derive(Args, Debug, Default)]
pub struct UpdateData {
	/// Trust context.
	#[clap(long = "context")]
	context: Option<String>,
	/// Trust learning rate (0.0-1.0].
	#[clap(long = "learning-rate")]
	learning_rate: Option<String>,
	/// Community suspicion threshold (0.0-1.0).
	#[clap(long = "threshold")]
	threshold: Option<String>,
	/// Collective penalty factor (0.0-1.0].
	#[clap(long = "penalty")]
	penalty: Option<String>,
	/// Sleeper latent period in rounds.
	#[clap(long = "latent-period")]
	latent_period: Option<String>,
	/// Simulation defaults.
	#[command(flatten)]
	simulation: SimulateData,
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, AdaptError> {
	value.parse::<T>().map_err(|_| AdaptError::ParsingError(format!("Invalid {}: '{}'", name, value)))
}

impl SimulateData {
	/// Applies the overrides to a configuration.
	pub fn apply(&self, config: &mut Config) -> Result<(), AdaptError> {
		let simulation = &mut config.simulation;

		if let Some(agents) = &self.agents {
			simulation.num_agents = parse("agents", agents)?;
		}

		if let Some(rounds) = &self.rounds {
			simulation.num_rounds = parse("rounds", rounds)?;
		}

		if let Some(attack) = &self.attack {
			simulation.attack = attack.parse::<AttackType>()?;
		}

		if let Some(ratio) = &self.ratio {
			simulation.malicious_ratio = parse("ratio", ratio)?;
		}

		if let Some(seed) = &self.seed {
			simulation.seed = Some(parse("seed", seed)?);
		}

		config.validate()
	}
}

/// Handle `simulate` command.
pub fn handle_simulate(mut config: Config, data: SimulateData) -> Result<(), AdaptError> {
	data.apply(&mut config)?;
	info!(
		"Simulating {} rounds, {} agents, attack '{}' at ratio {}",
		config.simulation.num_rounds,
		config.simulation.num_agents,
		config.simulation.attack,
		config.simulation.malicious_ratio
	);

	let mut simulation = Simulation::new(&config.protocol, config.simulation.clone())?;
	let summaries = simulation.run();

	report(&summaries);

	Ok(())
}

/// Logs the experiment's aggregate results.
fn report(summaries: &[RoundSummary]) {
	let Some(last) = summaries.last() else {
		info!("No rounds were run.");
		return;
	};

	let mut flagged: BTreeMap<u32, usize> = BTreeMap::new();
	let mut sound_decisions = 0;
	for summary in summaries {
		for log in summary.agents.iter().filter(|log| log.detected_colluding) {
			*flagged.entry(log.agent_id).or_insert(0) += 1;
		}
		if summary.decision.as_ref().map_or(false, |decision| decision.quality == Quality::Sound) {
			sound_decisions += 1;
		}
	}

	info!("Final trust after round {}:", last.round);
	for log in &last.agents {
		info!(
			"  agent {:>3} {:<10} malicious={:<5} trust={:>7.3} flagged_rounds={}",
			log.agent_id,
			log.behaviour,
			log.malicious,
			log.trust_score,
			flagged.get(&log.agent_id).copied().unwrap_or(0)
		);
	}
	info!("Sound decisions: {}/{}", sound_decisions, summaries.len());
}

/// Handle `reviews` command.
pub fn handle_reviews(mut config: Config, data: SimulateData) -> Result<(), AdaptError> {
	data.apply(&mut config)?;

	let mut simulation = Simulation::new(&config.protocol, config.simulation.clone())?;
	let mut records = Vec::new();
	while !simulation.is_finished() {
		let (_, reviews) = simulation.next_inputs();
		let round = simulation.round();
		records.extend(reviews.iter().map(|review| ReviewRecord::from_review(round, review)));
	}

	let filepath = get_file_path(REVIEWS_FILENAME, FileType::Csv)?;
	let mut storage = CSVFileStorage::<ReviewRecord>::new(filepath);
	storage.save(records)?;

	info!("Reviews saved at \"{}\".", storage.filepath().display());

	Ok(())
}

/// Contribution owners of a recorded round: every reviewee, in order of
/// first appearance.
pub fn contributions_of(round: u32, reviews: &[Review<String>]) -> Vec<Contribution<String>> {
	let mut seen = BTreeSet::new();
	reviews
		.iter()
		.filter(|review| seen.insert(review.reviewee.clone()))
		.map(|review| Contribution::new(review.reviewee.clone(), round))
		.collect()
}

/// Handle `analyze` command.
pub fn handle_analyze(config: Config, data: AnalyzeData) -> Result<(), AdaptError> {
	let filepath = match data.file {
		Some(file) => PathBuf::from(file),
		None => get_file_path(REVIEWS_FILENAME, FileType::Csv)?,
	};
	let records = CSVFileStorage::<ReviewRecord>::new(filepath).load()?;

	if records.is_empty() {
		return Err(AdaptError::ValidationError("No reviews found.".to_string()));
	}

	let protocol = &config.protocol;
	let orchestrator = TrustOrchestrator::from_config(protocol)?;
	let mut trust = TrustStore::with_default(protocol.learning_rate, protocol.default_trust)?;
	for record in &records {
		trust.register(record.reviewer(), orchestrator.context());
		trust.register(record.reviewee(), orchestrator.context());
	}

	for (round, reviews) in group_by_round(records) {
		let contributions = contributions_of(round, &reviews);
		let outcome = orchestrator.run_round(&mut trust, &contributions, &reviews);
		for group in &outcome.groups {
			info!(
				"Round {}: group {:?} penalised (suspicion {:.3})",
				round, group.members, group.suspicion
			);
		}
	}

	info!("Final trust scores:");
	for ((participant, context), score) in trust.all_scores() {
		info!("  {} [{}]: {:.3}", participant, context, score);
	}

	Ok(())
}

/// Handles the CLI project configuration update.
pub fn handle_update(config: &mut Config, data: UpdateData) -> Result<(), AdaptError> {
	if let Some(context) = data.context {
		config.protocol.context = context;
	}

	if let Some(learning_rate) = data.learning_rate {
		config.protocol.learning_rate = parse("learning rate", &learning_rate)?;
	}

	if let Some(threshold) = data.threshold {
		config.protocol.suspicion_threshold = parse("threshold", &threshold)?;
	}

	if let Some(penalty) = data.penalty {
		config.protocol.penalty_factor = parse("penalty", &penalty)?;
	}

	if let Some(latent_period) = data.latent_period {
		config.simulation.sleeper_latent_period = parse("latent period", &latent_period)?;
	}

	data.simulation.apply(config)?;

	save_config(config)
}

#[cfg(test)]
mod tests {
	use crate::cli::{contributions_of, Cli, SimulateData, UpdateData};
	use adapt_mas::{agent::AttackType, Config, Review};
	use clap::CommandFactory;

	#[test]
	fn test_cli() {
		Cli::command().debug_assert()
	}

	#[test]
	fn test_simulate_data_overrides() {
		let data = SimulateData {
			agents: Some("12".to_string()),
			rounds: Some("20".to_string()),
			attack: Some("sleeper".to_string()),
			ratio: Some("0.25".to_string()),
			seed: Some("9".to_string()),
		};

		let mut config = Config::default();
		data.apply(&mut config).unwrap();

		assert_eq!(config.simulation.num_agents, 12);
		assert_eq!(config.simulation.num_rounds, 20);
		assert_eq!(config.simulation.attack, AttackType::Sleeper);
		assert_eq!(config.simulation.malicious_ratio, 0.25);
		assert_eq!(config.simulation.seed, Some(9));
	}

	#[test]
	fn test_simulate_data_rejects_invalid() {
		let data = SimulateData { ratio: Some("1.5".to_string()), ..Default::default() };
		assert!(data.apply(&mut Config::default()).is_err());

		let data = SimulateData { attack: Some("sybil".to_string()), ..Default::default() };
		assert!(data.apply(&mut Config::default()).is_err());

		let data = SimulateData { agents: Some("many".to_string()), ..Default::default() };
		assert!(data.apply(&mut Config::default()).is_err());
	}

	#[test]
	fn test_update_data_parsing() {
		let data = UpdateData { learning_rate: Some("fast".to_string()), ..Default::default() };
		let mut config = Config::default();
		assert!(crate::cli::handle_update(&mut config, data).is_err());
	}

	#[test]
	fn test_contributions_of_round() {
		let reviews = vec![
			Review::new("b".to_string(), "a".to_string(), 0.8),
			Review::new("c".to_string(), "a".to_string(), 0.8),
			Review::new("a".to_string(), "c".to_string(), 0.1),
		];

		let contributions = contributions_of(3, &reviews);
		let owners: Vec<&str> = contributions.iter().map(|c| c.owner.as_str()).collect();
		assert_eq!(owners, vec!["a", "c"]);
		assert!(contributions.iter().all(|c| c.round == 3));
	}
}
