//! # Graph Module.
//!
//! The per-round review graph. Every review becomes a directed edge from
//! reviewer to reviewee weighted by the review score. When the same ordered
//! pair appears more than once in a round, the last review wins.

use crate::{review::Review, Participant};
use log::warn;
use petgraph::{
	graph::{DiGraph, NodeIndex, UnGraph},
	visit::EdgeRef,
};
use std::collections::{BTreeMap, HashMap};

/// Directed weighted graph of one round's reviews.
///
/// Immutable once built; a new graph is built for every round.
#[derive(Clone, Debug)]
pub struct ReviewGraph<P: Participant> {
	graph: DiGraph<P, f64>,
	nodes: HashMap<P, NodeIndex>,
}

impl<P: Participant> ReviewGraph<P> {
	/// Builds the graph from the round's reviews, in order.
	pub fn build(reviews: &[Review<P>]) -> Self {
		let mut graph = DiGraph::new();
		let mut nodes = HashMap::new();

		for review in reviews {
			if !review.is_well_formed() {
				warn!(
					"Dropping review {:?} -> {:?} with score {}",
					review.reviewer, review.reviewee, review.score
				);
				continue;
			}

			let from = *nodes
				.entry(review.reviewer.clone())
				.or_insert_with(|| graph.add_node(review.reviewer.clone()));
			let to = *nodes
				.entry(review.reviewee.clone())
				.or_insert_with(|| graph.add_node(review.reviewee.clone()));
			// Overwrites the weight of an existing edge.
			graph.update_edge(from, to, review.score);
		}

		Self { graph, nodes }
	}

	/// Number of participants in the graph.
	pub fn node_count(&self) -> usize {
		self.graph.node_count()
	}

	/// Number of distinct ordered review pairs.
	pub fn edge_count(&self) -> usize {
		self.graph.edge_count()
	}

	/// Whether the round had no usable reviews.
	pub fn is_empty(&self) -> bool {
		self.graph.node_count() == 0
	}

	/// Checks whether the participant reviewed or was reviewed this round.
	pub fn contains(&self, participant: &P) -> bool {
		self.nodes.contains_key(participant)
	}

	/// Returns the score `from` gave `to`, if any.
	pub fn weight(&self, from: &P, to: &P) -> Option<f64> {
		let from = self.nodes.get(from)?;
		let to = self.nodes.get(to)?;
		let edge = self.graph.find_edge(*from, *to)?;
		self.graph.edge_weight(edge).copied()
	}

	/// Returns the participant behind a node index.
	pub fn participant(&self, index: NodeIndex) -> Option<&P> {
		self.graph.node_weight(index)
	}

	/// Returns the node index of a participant.
	pub fn index_of(&self, participant: &P) -> Option<NodeIndex> {
		self.nodes.get(participant).copied()
	}

	/// Iterates over every directed edge as `(reviewer, reviewee, score)`
	/// node indices.
	pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, f64)> + '_ {
		self.graph.edge_references().map(|edge| (edge.source(), edge.target(), *edge.weight()))
	}

	/// Undirected view used for community detection.
	///
	/// Node indices match the directed graph. The weights of both directions
	/// of a pair are summed; pairs whose combined weight is not positive carry
	/// no affinity and are left out, as are self-reviews.
	pub fn to_undirected(&self) -> UnGraph<P, f64> {
		let mut combined: BTreeMap<(NodeIndex, NodeIndex), f64> = BTreeMap::new();
		for (from, to, weight) in self.edges() {
			if from == to {
				continue;
			}
			let key = if from < to { (from, to) } else { (to, from) };
			*combined.entry(key).or_insert(0.0) += weight;
		}

		let mut undirected = UnGraph::with_capacity(self.graph.node_count(), combined.len());
		for index in self.graph.node_indices() {
			undirected.add_node(self.graph[index].clone());
		}
		for ((a, b), weight) in combined {
			if weight > 0.0 {
				undirected.add_edge(a, b, weight);
			}
		}

		undirected
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_build_graph() {
		let reviews = vec![Review::new(1, 0, 0.8), Review::new(2, 0, 0.6), Review::new(0, 2, -0.2)];
		let graph = ReviewGraph::build(&reviews);

		assert_eq!(graph.node_count(), 3);
		assert_eq!(graph.edge_count(), 3);
		assert_eq!(graph.weight(&1, &0), Some(0.8));
		assert_eq!(graph.weight(&0, &2), Some(-0.2));
		assert_eq!(graph.weight(&0, &1), None);
	}

	#[test]
	fn test_last_review_wins() {
		let reviews = vec![Review::new(1, 0, 0.8), Review::new(1, 0, -0.5)];
		let graph = ReviewGraph::build(&reviews);

		assert_eq!(graph.edge_count(), 1);
		assert_eq!(graph.weight(&1, &0), Some(-0.5));
	}

	#[test]
	fn test_empty_round() {
		let graph = ReviewGraph::<u32>::build(&[]);
		assert!(graph.is_empty());
		assert_eq!(graph.to_undirected().node_count(), 0);
	}

	#[test]
	fn test_self_review_is_tolerated() {
		let reviews = vec![Review::new(3, 3, 1.0), Review::new(3, 4, 0.5)];
		let graph = ReviewGraph::build(&reviews);

		assert_eq!(graph.node_count(), 2);
		assert_eq!(graph.weight(&3, &3), Some(1.0));
		assert_eq!(graph.to_undirected().edge_count(), 1);
	}

	#[test]
	fn test_malformed_reviews_are_dropped() {
		let reviews = vec![Review::new(1, 0, f64::NAN), Review::new(2, 0, 0.3)];
		let graph = ReviewGraph::build(&reviews);

		assert!(!graph.contains(&1));
		assert_eq!(graph.edge_count(), 1);
	}

	#[test]
	fn test_undirected_combines_directions() {
		let reviews = vec![
			Review::new("a", "b", 0.5),
			Review::new("b", "a", 0.25),
			Review::new("a", "c", 0.8),
			Review::new("c", "a", -1.0),
		];
		let graph = ReviewGraph::build(&reviews);
		let undirected = graph.to_undirected();

		assert_eq!(undirected.node_count(), 3);
		assert_eq!(undirected.edge_count(), 1);

		let a = graph.index_of(&"a").unwrap();
		let b = graph.index_of(&"b").unwrap();
		let edge = undirected.find_edge(a, b).unwrap();
		assert_eq!(undirected[edge], 0.75);
	}
}
