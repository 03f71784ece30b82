//! # Round Module.
//!
//! Per-round reconciliation of collusion penalties and review evidence.
//!
//! Penalties are applied first so a round's likely-biased CIS evidence cannot
//! dilute its own collusion finding. Contributions are then scored and folded
//! in one at a time, in input order: a later contribution's reviewers already
//! carry the trust earned earlier in the same round.

use crate::{
	collusion::{CollusionDetector, CollusionGroup},
	error::AdaptError,
	graph::ReviewGraph,
	influence::InfluenceScorer,
	review::{Contribution, Review},
	trust::TrustStore,
	Participant, ProtocolConfig,
};
use log::debug;
use std::collections::BTreeMap;

/// Result of one reconciled round.
#[derive(Clone, Debug)]
pub struct RoundOutcome<P> {
	/// Groups detected and penalised.
	pub groups: Vec<CollusionGroup<P>>,
	/// CIS fed into the trust model, per contribution in input order.
	pub influence: Vec<(P, f64)>,
	/// Trust snapshot after the round.
	pub scores: BTreeMap<(P, String), f64>,
}

impl<P: Participant> RoundOutcome<P> {
	/// Checks whether the participant belongs to a detected group.
	pub fn is_flagged(&self, participant: &P) -> bool {
		self.groups.iter().any(|group| group.members.contains(participant))
	}
}

/// Runs the analysis step of every round.
#[derive(Clone, Debug)]
pub struct TrustOrchestrator {
	context: String,
	penalty_factor: f64,
	detector: CollusionDetector,
	scorer: InfluenceScorer,
}

impl TrustOrchestrator {
	/// Creates an orchestrator from its parts.
	///
	/// The penalty factor must be in `(0, 1]`.
	pub fn new(
		context: impl Into<String>, penalty_factor: f64, detector: CollusionDetector,
		scorer: InfluenceScorer,
	) -> Result<Self, AdaptError> {
		if !(penalty_factor > 0.0 && penalty_factor <= 1.0) {
			return Err(AdaptError::ConfigurationError(format!(
				"Penalty factor must be in (0, 1], got {}",
				penalty_factor
			)));
		}

		Ok(Self { context: context.into(), penalty_factor, detector, scorer })
	}

	/// Creates an orchestrator from the protocol configuration.
	pub fn from_config(config: &ProtocolConfig) -> Result<Self, AdaptError> {
		config.validate()?;
		let detector =
			CollusionDetector::with_weights(config.suspicion_threshold, config.weights.clone())?;
		let scorer = InfluenceScorer::new(config.min_reviewer_weight)?;
		Self::new(config.context.clone(), config.penalty_factor, detector, scorer)
	}

	/// Returns the trust context this orchestrator works in.
	pub fn context(&self) -> &str {
		&self.context
	}

	/// Returns the collusion detector.
	pub fn detector(&self) -> &CollusionDetector {
		&self.detector
	}

	/// Reconciles one round: penalise detected groups, then feed every
	/// contribution's CIS into the trust model.
	pub fn run_round<P: Participant>(
		&self, trust: &mut TrustStore<P>, contributions: &[Contribution<P>], reviews: &[Review<P>],
	) -> RoundOutcome<P> {
		let graph = ReviewGraph::build(reviews);
		let groups = self.detector.detect(&graph);
		for group in &groups {
			trust.penalize(&group.members, &self.context, self.penalty_factor);
		}

		let mut influence = Vec::with_capacity(contributions.len());
		for contribution in contributions {
			let owner = &contribution.owner;
			let cis = self.scorer.score(owner, reviews, trust, &self.context);
			debug!("CIS for {:?}: {:.3}", owner, cis);
			trust.update(owner, &self.context, cis);
			influence.push((owner.clone(), cis));
		}

		RoundOutcome { groups, influence, scores: trust.all_scores() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::trust::DEFAULT_TRUST;

	const CTX: &str = "general_task";

	fn orchestrator(threshold: f64, penalty: f64) -> TrustOrchestrator {
		let detector = CollusionDetector::new(threshold).unwrap();
		TrustOrchestrator::new(CTX, penalty, detector, InfluenceScorer::default()).unwrap()
	}

	fn first_round() -> (Vec<Contribution<u32>>, Vec<Review<u32>>) {
		let contributions = (0..3).map(|id| Contribution::new(id, 1)).collect();
		let reviews = vec![Review::new(1, 0, 0.8), Review::new(2, 0, 0.8)];
		(contributions, reviews)
	}

	#[test]
	fn test_first_round_update() {
		let engine = TrustOrchestrator::from_config(&ProtocolConfig::default()).unwrap();
		let mut trust = TrustStore::<u32>::new(0.3).unwrap();
		let (contributions, reviews) = first_round();

		let outcome = engine.run_round(&mut trust, &contributions, &reviews);

		// The star {0, 1, 2} is flagged, but nobody has a record yet to penalise.
		assert_eq!(outcome.groups.len(), 1);
		assert_eq!(outcome.groups[0].members, vec![0, 1, 2]);
		assert!((outcome.influence[0].1 - 0.8).abs() < 1e-12);
		assert!((trust.get(&0, CTX) - 0.59).abs() < 1e-12);
		// Unreviewed contributions carry zero evidence.
		assert_eq!(outcome.influence[1].1, 0.0);
		assert!((trust.get(&1, CTX) - 0.35).abs() < 1e-12);
		assert_eq!(outcome.scores.len(), 3);
	}

	#[test]
	fn test_first_round_update_registered() {
		let engine = TrustOrchestrator::from_config(&ProtocolConfig::default()).unwrap();
		let mut trust = TrustStore::<u32>::new(0.3).unwrap();
		for id in 0..3 {
			trust.register(&id, CTX);
		}
		let (contributions, reviews) = first_round();

		let outcome = engine.run_round(&mut trust, &contributions, &reviews);

		assert_eq!(outcome.groups.len(), 1);
		// 0.7 * (0.5 * 0.8) + 0.3 * 0.8
		assert!((trust.get(&0, CTX) - 0.52).abs() < 1e-12);
	}

	#[test]
	fn test_contributions_update_in_order() {
		let engine = orchestrator(1.0, 0.8);
		let mut trust = TrustStore::<u32>::new(0.3).unwrap();
		for id in 0..3 {
			trust.register(&id, CTX);
		}
		let contributions = vec![Contribution::new(0, 1), Contribution::new(1, 1)];
		let reviews =
			vec![Review::new(1, 0, 1.0), Review::new(0, 1, 1.0), Review::new(2, 1, -1.0)];

		let outcome = engine.run_round(&mut trust, &contributions, &reviews);

		assert!((outcome.influence[0].1 - 1.0).abs() < 1e-12);
		// Reviewer 0 already weighs 0.65 when contribution 1 is scored.
		let expected = (0.65 - 0.5) / (0.65 + 0.5);
		assert!((outcome.influence[1].1 - expected).abs() < 1e-12);
		assert!((trust.get(&1, CTX) - (0.7 * 0.5 + 0.3 * expected)).abs() < 1e-12);
	}

	#[test]
	fn test_penalty_precedes_evidence() {
		let engine = orchestrator(0.7, 0.8);
		let mut trust = TrustStore::<u32>::new(0.3).unwrap();
		for id in 0..3 {
			trust.register(&id, CTX);
		}
		let contributions: Vec<_> = (0..3).map(|id| Contribution::new(id, 1)).collect();
		let mut reviews = Vec::new();
		for a in 0..3 {
			for b in 0..3 {
				if a != b {
					reviews.push(Review::new(a, b, 1.0));
				}
			}
		}

		let outcome = engine.run_round(&mut trust, &contributions, &reviews);

		assert_eq!(outcome.groups.len(), 1);
		assert!(outcome.is_flagged(&2));
		let expected = 0.7 * (DEFAULT_TRUST * 0.8) + 0.3 * 1.0;
		for id in 0..3 {
			assert!((trust.get(&id, CTX) - expected).abs() < 1e-12);
		}
	}

	#[test]
	fn test_unregistered_groups_escape_penalty() {
		let engine = orchestrator(0.7, 0.5);
		let mut trust = TrustStore::<u32>::new(0.3).unwrap();
		let reviews = vec![Review::new(0, 1, 1.0), Review::new(1, 0, 1.0)];

		let outcome = engine.run_round(&mut trust, &[], &reviews);

		assert_eq!(outcome.groups.len(), 1);
		assert!(trust.is_empty());
	}

	#[test]
	fn test_empty_round() {
		let engine = orchestrator(0.7, 0.8);
		let mut trust = TrustStore::<u32>::new(0.3).unwrap();
		let contributions = vec![Contribution::new(4, 2)];

		let outcome = engine.run_round(&mut trust, &contributions, &[]);

		assert!(outcome.groups.is_empty());
		assert_eq!(outcome.influence, vec![(4, 0.0)]);
		assert!((trust.get(&4, CTX) - 0.7 * DEFAULT_TRUST).abs() < 1e-12);
	}

	#[test]
	fn test_invalid_penalty_factor() {
		let detector = CollusionDetector::new(0.7).unwrap();
		assert!(TrustOrchestrator::new(CTX, 0.0, detector.clone(), InfluenceScorer::default())
			.is_err());
		assert!(TrustOrchestrator::new(CTX, 1.2, detector, InfluenceScorer::default()).is_err());
	}
}
