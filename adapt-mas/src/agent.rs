//! # Agent Module.
//!
//! Scripted participant behaviours used to exercise the trust model. Each
//! behaviour produces a contribution per round and a review per contribution
//! it sees. Contribution content is reduced to a [`Quality`] tag.

use crate::{error::AdaptError, review::Contribution};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

/// Agent identifier used by the simulation.
pub type AgentId = u32;

/// Score honest agents give every contribution.
const HONEST_REVIEW: f64 = 0.8;
/// Score a sleeper gives once its latent period is over.
const SLEEPER_ATTACK_REVIEW: f64 = -0.5;
/// Score colluders give ring members.
const RING_REVIEW: f64 = 1.0;
/// Score colluders give everyone outside the ring.
const OUTSIDER_REVIEW: f64 = -1.0;
/// Plausible-looking score given by camouflage agents.
const CAMOUFLAGE_REVIEW: f64 = 0.6;

/// Quality of a contribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
	/// Correct and useful.
	Sound,
	/// Plausible, built on a flawed premise.
	Flawed,
	/// Deliberately misleading.
	Harmful,
}

/// Contribution together with its hidden quality.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
	/// What the trust model sees.
	pub contribution: Contribution<AgentId>,
	/// Ground truth, never shown to the trust model.
	pub quality: Quality,
}

/// Kind of adversarial behaviour injected into a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackType {
	/// Behaves honestly, then attacks after a latent period.
	Sleeper,
	/// A ring that praises itself and slanders everyone else.
	Colluding,
	/// Flawed work with plausible reviews.
	Camouflage,
}

impl FromStr for AttackType {
	type Err = AdaptError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"sleeper" => Ok(AttackType::Sleeper),
			"colluding" => Ok(AttackType::Colluding),
			"camouflage" => Ok(AttackType::Camouflage),
			_ => Err(AdaptError::ParsingError(format!("Unknown attack type '{}'", s))),
		}
	}
}

impl fmt::Display for AttackType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			AttackType::Sleeper => "sleeper",
			AttackType::Colluding => "colluding",
			AttackType::Camouflage => "camouflage",
		};
		write!(f, "{}", name)
	}
}

/// How an agent contributes and reviews.
#[derive(Clone, Debug, PartialEq)]
pub enum Behaviour {
	/// Always does its best and reviews fairly.
	Honest,
	/// Honest up to and including round `latent_period`.
	Sleeper {
		/// Last round of honest behaviour.
		latent_period: u32,
	},
	/// Member of a collusion ring.
	Colluding {
		/// Every member of the ring, including this agent.
		ring: BTreeSet<AgentId>,
	},
	/// Produces convincing but flawed analyses.
	Camouflage,
}

impl Behaviour {
	/// Behaviour for a malicious agent under the given attack.
	pub fn for_attack(attack: AttackType, latent_period: u32, ring: &BTreeSet<AgentId>) -> Self {
		match attack {
			AttackType::Sleeper => Behaviour::Sleeper { latent_period },
			AttackType::Colluding => Behaviour::Colluding { ring: ring.clone() },
			AttackType::Camouflage => Behaviour::Camouflage,
		}
	}

	/// Short tag for reporting.
	pub fn tag(&self) -> &'static str {
		match self {
			Behaviour::Honest => "honest",
			Behaviour::Sleeper { .. } => "sleeper",
			Behaviour::Colluding { .. } => "colluding",
			Behaviour::Camouflage => "camouflage",
		}
	}
}

/// A simulated participant.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
	id: AgentId,
	behaviour: Behaviour,
}

impl Agent {
	/// Creates a new agent.
	pub fn new(id: AgentId, behaviour: Behaviour) -> Self {
		Self { id, behaviour }
	}

	/// Creates an honest agent.
	pub fn honest(id: AgentId) -> Self {
		Self::new(id, Behaviour::Honest)
	}

	/// Returns the agent's identifier.
	pub fn id(&self) -> AgentId {
		self.id
	}

	/// Returns the agent's behaviour.
	pub fn behaviour(&self) -> &Behaviour {
		&self.behaviour
	}

	/// Whether the agent is adversarial.
	pub fn is_malicious(&self) -> bool {
		self.behaviour != Behaviour::Honest
	}

	/// Produces this round's contribution.
	pub fn contribute(&self, round: u32) -> Submission {
		let quality = match &self.behaviour {
			Behaviour::Honest => Quality::Sound,
			Behaviour::Sleeper { latent_period } if round <= *latent_period => Quality::Sound,
			Behaviour::Sleeper { .. } => Quality::Harmful,
			Behaviour::Colluding { .. } | Behaviour::Camouflage => Quality::Flawed,
		};

		Submission { contribution: Contribution::new(self.id, round), quality }
	}

	/// Scores another agent's contribution.
	pub fn review(&self, contribution: &Contribution<AgentId>) -> f64 {
		match &self.behaviour {
			Behaviour::Honest => HONEST_REVIEW,
			Behaviour::Sleeper { latent_period } if contribution.round <= *latent_period => {
				HONEST_REVIEW
			},
			Behaviour::Sleeper { .. } => SLEEPER_ATTACK_REVIEW,
			Behaviour::Colluding { ring } if ring.contains(&contribution.owner) => RING_REVIEW,
			Behaviour::Colluding { .. } => OUTSIDER_REVIEW,
			Behaviour::Camouflage => CAMOUFLAGE_REVIEW,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_honest_agent() {
		let agent = Agent::honest(0);
		assert!(!agent.is_malicious());
		assert_eq!(agent.contribute(3).quality, Quality::Sound);
		assert_eq!(agent.review(&Contribution::new(1, 3)), 0.8);
	}

	#[test]
	fn test_sleeper_wakes_after_latent_period() {
		let agent = Agent::new(1, Behaviour::Sleeper { latent_period: 5 });
		assert!(agent.is_malicious());

		assert_eq!(agent.contribute(5).quality, Quality::Sound);
		assert_eq!(agent.review(&Contribution::new(0, 5)), 0.8);

		assert_eq!(agent.contribute(6).quality, Quality::Harmful);
		assert_eq!(agent.review(&Contribution::new(0, 6)), -0.5);
	}

	#[test]
	fn test_colluder_favours_ring() {
		let ring: BTreeSet<AgentId> = [2, 4, 7].into_iter().collect();
		let agent = Agent::new(4, Behaviour::for_attack(AttackType::Colluding, 0, &ring));

		assert_eq!(agent.contribute(1).quality, Quality::Flawed);
		assert_eq!(agent.review(&Contribution::new(7, 1)), 1.0);
		assert_eq!(agent.review(&Contribution::new(3, 1)), -1.0);
	}

	#[test]
	fn test_camouflage_agent() {
		let agent = Agent::new(9, Behaviour::Camouflage);
		assert_eq!(agent.contribute(1).quality, Quality::Flawed);
		assert_eq!(agent.review(&Contribution::new(0, 1)), 0.6);
		assert_eq!(agent.behaviour().tag(), "camouflage");
	}

	#[test]
	fn test_attack_type_parsing() {
		for attack in [AttackType::Sleeper, AttackType::Colluding, AttackType::Camouflage] {
			assert_eq!(attack.to_string().parse::<AttackType>().unwrap(), attack);
		}
		assert!("sybil".parse::<AttackType>().is_err());
	}
}
