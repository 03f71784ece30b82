//! # Config Module.
//!
//! Protocol and experiment settings, persisted as JSON.

use crate::{
	agent::AttackType,
	collusion::{SuspicionWeights, DEFAULT_SUSPICION_THRESHOLD},
	error::AdaptError,
	influence::MIN_REVIEWER_WEIGHT,
	trust::{DEFAULT_TRUST, MAX_TRUST, MIN_TRUST},
};
use serde::{Deserialize, Serialize};

/// Default trust context.
pub const DEFAULT_CONTEXT: &str = "general_task";

/// Complete configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
	/// Trust model settings.
	pub protocol: ProtocolConfig,
	/// Experiment settings.
	pub simulation: SimulationConfig,
}

impl Config {
	/// Validates both sections.
	pub fn validate(&self) -> Result<(), AdaptError> {
		self.protocol.validate()?;
		self.simulation.validate()
	}
}

/// Trust model settings, fixed for the duration of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
	/// Task category the scores apply to.
	pub context: String,
	/// EMA learning rate, in (0, 1].
	pub learning_rate: f64,
	/// Trust of a newly seen participant, in [-1, 1].
	pub default_trust: f64,
	/// Suspicion a community must exceed to be flagged, in [0, 1].
	pub suspicion_threshold: f64,
	/// Multiplier applied to a flagged group's trust, in (0, 1].
	pub penalty_factor: f64,
	/// Weight floor of a reviewer.
	pub min_reviewer_weight: f64,
	/// Suspicion score weights.
	pub weights: SuspicionWeights,
}

impl Default for ProtocolConfig {
	fn default() -> Self {
		Self {
			context: DEFAULT_CONTEXT.to_string(),
			learning_rate: 0.3,
			default_trust: DEFAULT_TRUST,
			suspicion_threshold: DEFAULT_SUSPICION_THRESHOLD,
			penalty_factor: 0.8,
			min_reviewer_weight: MIN_REVIEWER_WEIGHT,
			weights: SuspicionWeights::default(),
		}
	}
}

impl ProtocolConfig {
	/// Rejects settings the trust model cannot work with.
	pub fn validate(&self) -> Result<(), AdaptError> {
		let invalid = |message: String| Err(AdaptError::ConfigurationError(message));

		if self.context.is_empty() {
			return invalid("Context must not be empty".to_string());
		}
		if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
			return invalid(format!("Learning rate must be in (0, 1], got {}", self.learning_rate));
		}
		if !(MIN_TRUST..=MAX_TRUST).contains(&self.default_trust) {
			return invalid(format!("Default trust must be in [-1, 1], got {}", self.default_trust));
		}
		if !(0.0..=1.0).contains(&self.suspicion_threshold) {
			return invalid(format!(
				"Suspicion threshold must be in [0, 1], got {}",
				self.suspicion_threshold
			));
		}
		if !(self.penalty_factor > 0.0 && self.penalty_factor <= 1.0) {
			return invalid(format!("Penalty factor must be in (0, 1], got {}", self.penalty_factor));
		}
		if !(self.min_reviewer_weight > 0.0 && self.min_reviewer_weight.is_finite()) {
			return invalid(format!(
				"Minimum reviewer weight must be positive, got {}",
				self.min_reviewer_weight
			));
		}

		self.weights.validate()
	}
}

/// Experiment settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
	/// Total number of agents.
	pub num_agents: u32,
	/// Number of rounds to run.
	pub num_rounds: u32,
	/// Attack carried out by the malicious agents.
	pub attack: AttackType,
	/// Share of malicious agents, in [0, 1].
	pub malicious_ratio: f64,
	/// Rounds a sleeper stays honest.
	pub sleeper_latent_period: u32,
	/// Seed for reproducible runs.
	#[serde(default)]
	pub seed: Option<u64>,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		Self {
			num_agents: 10,
			num_rounds: 50,
			attack: AttackType::Colluding,
			malicious_ratio: 0.3,
			sleeper_latent_period: 40,
			seed: None,
		}
	}
}

impl SimulationConfig {
	/// Rejects experiments that cannot run.
	pub fn validate(&self) -> Result<(), AdaptError> {
		if self.num_agents < 2 {
			return Err(AdaptError::ConfigurationError(
				"At least two agents are needed for peer review".to_string(),
			));
		}
		if !(0.0..=1.0).contains(&self.malicious_ratio) {
			return Err(AdaptError::ConfigurationError(format!(
				"Malicious ratio must be in [0, 1], got {}",
				self.malicious_ratio
			)));
		}
		Ok(())
	}

	/// Number of malicious agents, rounded down.
	pub fn num_malicious(&self) -> usize {
		(f64::from(self.num_agents) * self.malicious_ratio).floor() as usize
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_are_valid() {
		assert!(Config::default().validate().is_ok());
		assert_eq!(SimulationConfig::default().num_malicious(), 3);
	}

	#[test]
	fn test_invalid_protocol() {
		let config = ProtocolConfig { learning_rate: 0.0, ..Default::default() };
		assert!(config.validate().is_err());

		let config = ProtocolConfig { penalty_factor: 0.0, ..Default::default() };
		assert!(config.validate().is_err());

		let config = ProtocolConfig { suspicion_threshold: 1.2, ..Default::default() };
		assert!(config.validate().is_err());

		let config = ProtocolConfig { context: String::new(), ..Default::default() };
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_invalid_simulation() {
		let config = SimulationConfig { num_agents: 1, ..Default::default() };
		assert!(config.validate().is_err());

		let config = SimulationConfig { malicious_ratio: 1.5, ..Default::default() };
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_json_round_trip() {
		let json = serde_json::to_string(&Config::default()).unwrap();
		assert!(json.contains("\"attack\":\"colluding\""));

		let restored: Config = serde_json::from_str(&json).unwrap();
		assert_eq!(restored, Config::default());
	}
}
