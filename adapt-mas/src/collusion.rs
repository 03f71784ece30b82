//! # Collusion Module.
//!
//! Flags groups of participants whose reviews look coordinated. The round's
//! review graph is partitioned into communities; every community with at least
//! two members is scored on three signals:
//!
//! - **isolation**: share of the edges touching the community that stay inside it,
//! - **cohesion**: mean score members give each other,
//! - **bias**: cohesion minus the mean score on edges crossing the boundary.
//!
//! None of them is conclusive alone, so the suspicion score is a weighted sum
//! and a group is reported only if it exceeds the threshold.

use crate::{community, error::AdaptError, graph::ReviewGraph, Participant};
use log::{debug, info};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Default suspicion threshold.
pub const DEFAULT_SUSPICION_THRESHOLD: f64 = 0.7;
/// Smallest group that can collude.
pub const MIN_GROUP_SIZE: usize = 2;

/// Weights and normalisers of the suspicion score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuspicionWeights {
	/// Weight of the isolation ratio.
	pub isolation: f64,
	/// Weight of the internal cohesion.
	pub cohesion: f64,
	/// Weight of the evaluation bias.
	pub bias: f64,
	/// Largest expected internal cohesion.
	pub cohesion_norm: f64,
	/// Largest expected evaluation bias.
	pub bias_norm: f64,
}

impl Default for SuspicionWeights {
	fn default() -> Self {
		Self { isolation: 0.5, cohesion: 0.3, bias: 0.2, cohesion_norm: 1.0, bias_norm: 2.0 }
	}
}

impl SuspicionWeights {
	/// Validates the weights.
	pub fn validate(&self) -> Result<(), AdaptError> {
		let weights = [self.isolation, self.cohesion, self.bias];
		if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
			return Err(AdaptError::ConfigurationError(
				"Suspicion weights must be finite and non-negative".to_string(),
			));
		}
		let norms = [self.cohesion_norm, self.bias_norm];
		if norms.iter().any(|n| !n.is_finite() || *n <= 0.0) {
			return Err(AdaptError::ConfigurationError(
				"Suspicion normalisers must be finite and positive".to_string(),
			));
		}
		Ok(())
	}

	/// Combines the signals into a suspicion score in `[0, 1]`.
	pub fn suspicion(&self, signals: &SuspicionSignals) -> f64 {
		let cohesion = (signals.cohesion / self.cohesion_norm).clamp(-1.0, 1.0);
		let bias = (signals.bias / self.bias_norm).clamp(-1.0, 1.0);
		let score = self.isolation * signals.isolation + self.cohesion * cohesion + self.bias * bias;
		score.clamp(0.0, 1.0)
	}
}

/// Raw measurements of a candidate group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SuspicionSignals {
	/// Mean weight of internal edges, 0 if none.
	pub cohesion: f64,
	/// Internal edges over all edges touching the group, 1 if no external edges.
	pub isolation: f64,
	/// Mean weight of edges crossing the boundary, 0 if none.
	pub external_eval: f64,
	/// `cohesion - external_eval`.
	pub bias: f64,
}

/// A group reported as colluding.
#[derive(Clone, Debug, PartialEq)]
pub struct CollusionGroup<P> {
	/// Sorted members.
	pub members: Vec<P>,
	/// Suspicion score that exceeded the threshold.
	pub suspicion: f64,
	/// Measurements behind the score.
	pub signals: SuspicionSignals,
}

/// Running sums of the edges touching one community.
#[derive(Clone, Debug, Default)]
struct EdgeTally {
	internal_count: usize,
	internal_weight: f64,
	external_count: usize,
	external_weight: f64,
}

impl EdgeTally {
	fn signals(&self) -> SuspicionSignals {
		let mean = |sum: f64, count: usize| if count > 0 { sum / count as f64 } else { 0.0 };
		let cohesion = mean(self.internal_weight, self.internal_count);
		let external_eval = mean(self.external_weight, self.external_count);
		let total = self.internal_count + self.external_count;
		let isolation = if self.external_count == 0 {
			1.0
		} else {
			self.internal_count as f64 / total as f64
		};

		SuspicionSignals { cohesion, isolation, external_eval, bias: cohesion - external_eval }
	}
}

/// Community-based collusion detector.
#[derive(Clone, Debug)]
pub struct CollusionDetector {
	threshold: f64,
	weights: SuspicionWeights,
}

impl CollusionDetector {
	/// Creates a detector with the default weights.
	pub fn new(threshold: f64) -> Result<Self, AdaptError> {
		Self::with_weights(threshold, SuspicionWeights::default())
	}

	/// Creates a detector with custom weights.
	pub fn with_weights(threshold: f64, weights: SuspicionWeights) -> Result<Self, AdaptError> {
		if !(0.0..=1.0).contains(&threshold) {
			return Err(AdaptError::ConfigurationError(format!(
				"Suspicion threshold must be in [0, 1], got {}",
				threshold
			)));
		}
		weights.validate()?;

		Ok(Self { threshold, weights })
	}

	/// Returns the threshold.
	pub fn threshold(&self) -> f64 {
		self.threshold
	}

	/// Returns the weights.
	pub fn weights(&self) -> &SuspicionWeights {
		&self.weights
	}

	/// Partitions the graph and returns the disjoint groups whose suspicion
	/// strictly exceeds the threshold.
	pub fn detect<P: Participant>(&self, graph: &ReviewGraph<P>) -> Vec<CollusionGroup<P>> {
		if graph.is_empty() {
			return Vec::new();
		}

		let undirected = graph.to_undirected();
		let labels = community::louvain(&undirected);
		let community_count = labels.iter().max().map_or(0, |max| max + 1);
		debug!(
			"Partitioned {} participants into {} communities (modularity {:.3})",
			graph.node_count(),
			community_count,
			community::modularity(&undirected, &labels)
		);

		let mut members: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
		for (index, &label) in labels.iter().enumerate() {
			members.entry(label).or_default().push(NodeIndex::new(index));
		}

		let mut tallies = vec![EdgeTally::default(); community_count];
		for (from, to, weight) in graph.edges() {
			let (a, b) = (labels[from.index()], labels[to.index()]);
			if a == b {
				tallies[a].internal_count += 1;
				tallies[a].internal_weight += weight;
			} else {
				for label in [a, b] {
					tallies[label].external_count += 1;
					tallies[label].external_weight += weight;
				}
			}
		}

		let mut groups = Vec::new();
		for (label, nodes) in members {
			if nodes.len() < MIN_GROUP_SIZE {
				continue;
			}

			let signals = tallies[label].signals();
			let suspicion = self.weights.suspicion(&signals);
			let mut group: Vec<P> =
				nodes.iter().filter_map(|&index| graph.participant(index).cloned()).collect();
			group.sort();

			debug!("Community {:?} suspicion {:.3} ({:?})", group, suspicion, signals);
			if suspicion > self.threshold {
				info!("Detected colluding group {:?} with suspicion {:.3}", group, suspicion);
				groups.push(CollusionGroup { members: group, suspicion, signals });
			}
		}

		groups
	}

	/// Measures an arbitrary set of members, independent of partitioning.
	/// Members absent from the graph are ignored.
	pub fn signals_for<P: Participant>(graph: &ReviewGraph<P>, members: &[P]) -> SuspicionSignals {
		let inside: HashSet<NodeIndex> =
			members.iter().filter_map(|member| graph.index_of(member)).collect();

		let mut tally = EdgeTally::default();
		for (from, to, weight) in graph.edges() {
			match (inside.contains(&from), inside.contains(&to)) {
				(true, true) => {
					tally.internal_count += 1;
					tally.internal_weight += weight;
				},
				(true, false) | (false, true) => {
					tally.external_count += 1;
					tally.external_weight += weight;
				},
				(false, false) => {},
			}
		}

		tally.signals()
	}

	/// Suspicion of an arbitrary set of members under this detector's weights.
	pub fn suspicion_of<P: Participant>(&self, graph: &ReviewGraph<P>, members: &[P]) -> f64 {
		self.weights.suspicion(&Self::signals_for(graph, members))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::review::Review;

	fn ring_reviews(ring: &[u32], score: f64) -> Vec<Review<u32>> {
		let mut reviews = Vec::new();
		for &a in ring {
			for &b in ring {
				if a != b {
					reviews.push(Review::new(a, b, score));
				}
			}
		}
		reviews
	}

	#[test]
	fn test_empty_graph_has_no_groups() {
		let detector = CollusionDetector::new(DEFAULT_SUSPICION_THRESHOLD).unwrap();
		let graph = ReviewGraph::<u32>::build(&[]);
		assert!(detector.detect(&graph).is_empty());
	}

	#[test]
	fn test_isolated_unanimous_ring_is_detected() {
		let detector = CollusionDetector::new(DEFAULT_SUSPICION_THRESHOLD).unwrap();
		let graph = ReviewGraph::build(&ring_reviews(&[0, 1, 2], 1.0));

		let groups = detector.detect(&graph);
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].members, vec![0, 1, 2]);
		// 0.5 * 1.0 + 0.3 * 1.0 + 0.2 * (1.0 / 2.0)
		assert!((groups[0].suspicion - 0.9).abs() < 1e-12);
	}

	#[test]
	fn test_ring_next_to_honest_cluster() {
		let mut reviews = ring_reviews(&[0, 1, 2], 1.0);
		reviews.extend(ring_reviews(&[3, 4, 5, 6], 0.5));
		reviews.push(Review::new(3, 0, -0.2));
		reviews.push(Review::new(6, 1, -0.3));

		let detector = CollusionDetector::new(DEFAULT_SUSPICION_THRESHOLD).unwrap();
		let groups = detector.detect(&ReviewGraph::build(&reviews));

		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].members, vec![0, 1, 2]);
	}

	#[test]
	fn test_singletons_are_never_reported() {
		let detector = CollusionDetector::new(0.0).unwrap();
		let reviews = vec![Review::new(0, 1, -1.0), Review::new(1, 0, -1.0)];
		assert!(detector.detect(&ReviewGraph::build(&reviews)).is_empty());
	}

	#[test]
	fn test_threshold_is_strict() {
		let detector = CollusionDetector::new(0.9).unwrap();
		let graph = ReviewGraph::build(&ring_reviews(&[0, 1, 2], 1.0));
		let suspicion = detector.suspicion_of(&graph, &[0, 1, 2]);
		assert!((suspicion - 0.9).abs() < 1e-12);

		let detector = CollusionDetector::new(suspicion).unwrap();
		assert!(detector.detect(&graph).is_empty());
	}

	#[test]
	fn test_signals_for_members() {
		let reviews = vec![
			Review::new(0, 1, 1.0),
			Review::new(1, 0, 0.6),
			Review::new(0, 2, -1.0),
			Review::new(2, 1, 0.4),
			Review::new(2, 3, 0.9),
		];
		let graph = ReviewGraph::build(&reviews);

		let signals = CollusionDetector::signals_for(&graph, &[0, 1]);
		assert!((signals.cohesion - 0.8).abs() < 1e-12);
		assert!((signals.isolation - 0.5).abs() < 1e-12);
		assert!((signals.external_eval - -0.3).abs() < 1e-12);
		assert!((signals.bias - 1.1).abs() < 1e-12);

		let expected = 0.5 * 0.5 + 0.3 * 0.8 + 0.2 * (1.1 / 2.0);
		let suspicion = SuspicionWeights::default().suspicion(&signals);
		assert!((suspicion - expected).abs() < 1e-12);
	}

	#[test]
	fn test_suspicion_is_clamped() {
		let weights = SuspicionWeights::default();
		let hostile = SuspicionSignals { cohesion: -1.0, isolation: 0.0, external_eval: 1.0, bias: -2.0 };
		assert_eq!(weights.suspicion(&hostile), 0.0);

		let extreme = SuspicionSignals { cohesion: 5.0, isolation: 1.0, external_eval: -5.0, bias: 10.0 };
		assert_eq!(weights.suspicion(&extreme), 1.0);
	}

	#[test]
	fn test_invalid_configuration() {
		assert!(CollusionDetector::new(1.5).is_err());
		assert!(CollusionDetector::new(-0.1).is_err());

		let weights = SuspicionWeights { bias_norm: 0.0, ..Default::default() };
		assert!(CollusionDetector::with_weights(0.7, weights).is_err());
	}
}
