//! # Simulation Module.
//!
//! Drives scripted agents through the four workflow steps of a round:
//! contribution, peer review, trust analysis and aggregation.

use crate::{
	agent::{Agent, AgentId, Behaviour, Quality, Submission},
	config::{ProtocolConfig, SimulationConfig},
	error::AdaptError,
	review::{Contribution, Review},
	round::{RoundOutcome, TrustOrchestrator},
	trust::TrustStore,
};
use log::info;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::BTreeSet;

/// One agent's state at the end of a round.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentLog {
	/// Round number.
	pub round: u32,
	/// Agent identifier.
	pub agent_id: AgentId,
	/// Whether the agent is adversarial.
	pub malicious: bool,
	/// Behaviour tag.
	pub behaviour: &'static str,
	/// Trust after the round.
	pub trust_score: f64,
	/// Whether the agent was in a detected group this round.
	pub detected_colluding: bool,
}

/// The contribution chosen as the round's output.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
	/// Owner of the chosen contribution.
	pub owner: AgentId,
	/// Owner's trust when chosen.
	pub trust: f64,
	/// Hidden quality of the chosen contribution.
	pub quality: Quality,
}

/// Everything that happened in one round.
#[derive(Clone, Debug)]
pub struct RoundSummary {
	/// Round number.
	pub round: u32,
	/// Outcome of the trust analysis.
	pub outcome: RoundOutcome<AgentId>,
	/// Aggregated output, if any contribution was trusted.
	pub decision: Option<Decision>,
	/// Per-agent state.
	pub agents: Vec<AgentLog>,
}

/// Creates the agents of an experiment.
///
/// `floor(num_agents * malicious_ratio)` agents are sampled as malicious; under
/// a colluding attack they all join one ring.
pub fn setup_agents(config: &SimulationConfig, rng: &mut StdRng) -> Vec<Agent> {
	let ids: Vec<AgentId> = (0..config.num_agents).collect();
	let malicious: BTreeSet<AgentId> =
		ids.choose_multiple(rng, config.num_malicious()).copied().collect();
	info!("Agents setup complete. Malicious IDs: {:?}", malicious);

	ids.into_iter()
		.map(|id| {
			if malicious.contains(&id) {
				let behaviour = Behaviour::for_attack(
					config.attack,
					config.sleeper_latent_period,
					&malicious,
				);
				Agent::new(id, behaviour)
			} else {
				Agent::honest(id)
			}
		})
		.collect()
}

/// Every agent reviews every contribution except its own.
pub fn peer_review(agents: &[Agent], submissions: &[Submission]) -> Vec<Review<AgentId>> {
	let mut reviews = Vec::with_capacity(agents.len() * submissions.len());
	for reviewer in agents {
		for submission in submissions {
			let contribution = &submission.contribution;
			if reviewer.id() != contribution.owner {
				let score = reviewer.review(contribution);
				reviews.push(Review::new(reviewer.id(), contribution.owner, score));
			}
		}
	}
	reviews
}

/// Picks the submission whose owner has the highest positive trust.
pub fn aggregate(
	submissions: &[Submission], trust: &TrustStore<AgentId>, context: &str,
) -> Option<Decision> {
	submissions
		.iter()
		.map(|submission| {
			let owner = submission.contribution.owner;
			Decision { owner, trust: trust.peek(&owner, context), quality: submission.quality }
		})
		.filter(|decision| decision.trust > 0.0)
		.fold(None, |best: Option<Decision>, candidate| match best {
			Some(best) if best.trust >= candidate.trust => Some(best),
			_ => Some(candidate),
		})
}

/// A running experiment.
pub struct Simulation {
	config: SimulationConfig,
	agents: Vec<Agent>,
	trust: TrustStore<AgentId>,
	orchestrator: TrustOrchestrator,
	round: u32,
}

impl Simulation {
	/// Sets up the agents and registers them with a fresh trust store.
	pub fn new(protocol: &ProtocolConfig, config: SimulationConfig) -> Result<Self, AdaptError> {
		config.validate()?;
		let mut rng = match config.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};
		let agents = setup_agents(&config, &mut rng);
		Self::with_agents(protocol, config, agents)
	}

	/// Runs an experiment over a fixed set of agents.
	pub fn with_agents(
		protocol: &ProtocolConfig, config: SimulationConfig, agents: Vec<Agent>,
	) -> Result<Self, AdaptError> {
		let orchestrator = TrustOrchestrator::from_config(protocol)?;
		let mut trust = TrustStore::with_default(protocol.learning_rate, protocol.default_trust)?;
		for agent in &agents {
			trust.register(&agent.id(), orchestrator.context());
		}

		Ok(Self { config, agents, trust, orchestrator, round: 0 })
	}

	/// Returns the agents.
	pub fn agents(&self) -> &[Agent] {
		&self.agents
	}

	/// Returns the trust store.
	pub fn trust(&self) -> &TrustStore<AgentId> {
		&self.trust
	}

	/// Returns the last completed round.
	pub fn round(&self) -> u32 {
		self.round
	}

	/// Whether every configured round has run.
	pub fn is_finished(&self) -> bool {
		self.round >= self.config.num_rounds
	}

	/// Produces the next round's submissions and reviews without analysing them.
	pub fn next_inputs(&mut self) -> (Vec<Submission>, Vec<Review<AgentId>>) {
		self.round += 1;
		let submissions: Vec<Submission> =
			self.agents.iter().map(|agent| agent.contribute(self.round)).collect();
		let reviews = peer_review(&self.agents, &submissions);
		(submissions, reviews)
	}

	/// Runs the next round through all four steps.
	pub fn step(&mut self) -> RoundSummary {
		let (submissions, reviews) = self.next_inputs();
		let contributions: Vec<Contribution<AgentId>> =
			submissions.iter().map(|submission| submission.contribution.clone()).collect();

		let outcome = self.orchestrator.run_round(&mut self.trust, &contributions, &reviews);
		let context = self.orchestrator.context();
		let decision = aggregate(&submissions, &self.trust, context);

		let agents = self
			.agents
			.iter()
			.map(|agent| AgentLog {
				round: self.round,
				agent_id: agent.id(),
				malicious: agent.is_malicious(),
				behaviour: agent.behaviour().tag(),
				trust_score: self.trust.peek(&agent.id(), context),
				detected_colluding: outcome.is_flagged(&agent.id()),
			})
			.collect();

		RoundSummary { round: self.round, outcome, decision, agents }
	}

	/// Runs every remaining round.
	pub fn run(&mut self) -> Vec<RoundSummary> {
		let mut summaries = Vec::new();
		while !self.is_finished() {
			let summary = self.step();
			match &summary.decision {
				Some(decision) => info!(
					"Round {}: decision by agent {} (trust {:.3}, {:?})",
					summary.round, decision.owner, decision.trust, decision.quality
				),
				None => info!("Round {}: no consensus reached due to low trust", summary.round),
			}
			summaries.push(summary);
		}
		summaries
	}
}
