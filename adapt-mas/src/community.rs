//! # Community Module.
//!
//! Louvain-style modularity maximisation over an undirected weighted graph.
//!
//! Each level greedily moves single nodes into the neighbouring community with
//! the largest modularity gain until no move improves it, then collapses every
//! community into one node and repeats on the collapsed graph. Nodes are
//! visited in index order; on ambiguous inputs other visit orders may find a
//! different partition of equal quality.
//!
//! Edge weights are expected to be positive.

use petgraph::{graph::UnGraph, visit::EdgeRef};
use std::collections::BTreeMap;

/// Smallest modularity improvement worth a move.
const MIN_GAIN: f64 = 1e-10;

/// Partitions the graph, returning a community label per node index.
///
/// Labels are dense and numbered in order of first appearance. Nodes without
/// edges stay alone in their own community.
pub fn louvain<N>(graph: &UnGraph<N, f64>) -> Vec<usize> {
	let mut level = Level::from_graph(graph);
	let mut assignment: Vec<usize> = (0..graph.node_count()).collect();
	if level.total_degree <= 0.0 {
		return assignment;
	}

	loop {
		let (labels, count) = renumber(&level.local_moves());
		if count == level.len() {
			break;
		}
		for label in assignment.iter_mut() {
			*label = labels[*label];
		}
		level = level.aggregate(&labels, count);
	}

	assignment
}

/// Newman modularity of a partition given as one label per node index.
pub fn modularity<N>(graph: &UnGraph<N, f64>, labels: &[usize]) -> f64 {
	let level = Level::from_graph(graph);
	if level.total_degree <= 0.0 {
		return 0.0;
	}

	let mut internal: BTreeMap<usize, f64> = BTreeMap::new();
	let mut degree: BTreeMap<usize, f64> = BTreeMap::new();
	for node in 0..level.len() {
		*degree.entry(labels[node]).or_insert(0.0) += level.degree[node];
		*internal.entry(labels[node]).or_insert(0.0) += level.loops[node];
		for &(neighbour, weight) in &level.adjacency[node] {
			// Each undirected edge is seen from both ends.
			if node < neighbour && labels[node] == labels[neighbour] {
				*internal.entry(labels[node]).or_insert(0.0) += weight;
			}
		}
	}

	let m2 = level.total_degree;
	degree
		.iter()
		.map(|(label, &tot)| {
			let inside = internal.get(label).copied().unwrap_or(0.0);
			2.0 * inside / m2 - (tot / m2).powi(2)
		})
		.sum()
}

/// Maps arbitrary labels onto `0..count` in order of first appearance.
fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
	let mut mapping = BTreeMap::new();
	let renumbered = labels
		.iter()
		.map(|label| {
			let next = mapping.len();
			*mapping.entry(*label).or_insert(next)
		})
		.collect();
	(renumbered, mapping.len())
}

/// One level of the Louvain hierarchy.
struct Level {
	/// Symmetric adjacency without self-loops.
	adjacency: Vec<Vec<(usize, f64)>>,
	/// Self-loop weight per node.
	loops: Vec<f64>,
	/// Weighted degree per node, self-loops counted twice.
	degree: Vec<f64>,
	/// Sum of all degrees (twice the total edge weight).
	total_degree: f64,
}

impl Level {
	fn from_graph<N>(graph: &UnGraph<N, f64>) -> Self {
		let n = graph.node_count();
		let mut adjacency = vec![Vec::new(); n];
		let mut loops = vec![0.0; n];

		for edge in graph.edge_references() {
			let (a, b, weight) = (edge.source().index(), edge.target().index(), *edge.weight());
			if a == b {
				loops[a] += weight;
			} else {
				adjacency[a].push((b, weight));
				adjacency[b].push((a, weight));
			}
		}

		Self::new(adjacency, loops)
	}

	fn new(adjacency: Vec<Vec<(usize, f64)>>, loops: Vec<f64>) -> Self {
		let degree: Vec<f64> = adjacency
			.iter()
			.zip(&loops)
			.map(|(edges, self_loop)| edges.iter().map(|(_, w)| w).sum::<f64>() + 2.0 * self_loop)
			.collect();
		let total_degree = degree.iter().sum();

		Self { adjacency, loops, degree, total_degree }
	}

	fn len(&self) -> usize {
		self.degree.len()
	}

	/// Repeated single-node moves until a full sweep changes nothing.
	fn local_moves(&self) -> Vec<usize> {
		let mut community: Vec<usize> = (0..self.len()).collect();
		let mut community_degree = self.degree.clone();

		let mut moved = true;
		while moved {
			moved = false;
			for node in 0..self.len() {
				let current = community[node];
				let k = self.degree[node];
				let links = self.links_to_communities(node, &community);

				community_degree[current] -= k;
				let gain = |target: usize| {
					links.get(&target).copied().unwrap_or(0.0)
						- community_degree[target] * k / self.total_degree
				};

				let mut best = current;
				let mut best_gain = gain(current);
				for &candidate in links.keys() {
					let candidate_gain = gain(candidate);
					if candidate_gain > best_gain + MIN_GAIN {
						best = candidate;
						best_gain = candidate_gain;
					}
				}

				community_degree[best] += k;
				community[node] = best;
				if best != current {
					moved = true;
				}
			}
		}

		community
	}

	/// Weight from `node` into each neighbouring community.
	fn links_to_communities(&self, node: usize, community: &[usize]) -> BTreeMap<usize, f64> {
		let mut links = BTreeMap::new();
		for &(neighbour, weight) in &self.adjacency[node] {
			*links.entry(community[neighbour]).or_insert(0.0) += weight;
		}
		links
	}

	/// Collapses every community into a single node.
	fn aggregate(&self, labels: &[usize], count: usize) -> Self {
		let mut loops = vec![0.0; count];
		let mut between: BTreeMap<(usize, usize), f64> = BTreeMap::new();

		for node in 0..self.len() {
			loops[labels[node]] += self.loops[node];
			for &(neighbour, weight) in &self.adjacency[node] {
				if node >= neighbour {
					continue;
				}
				let (a, b) = (labels[node], labels[neighbour]);
				if a == b {
					loops[a] += weight;
				} else {
					*between.entry((a.min(b), a.max(b))).or_insert(0.0) += weight;
				}
			}
		}

		let mut adjacency = vec![Vec::new(); count];
		for ((a, b), weight) in between {
			adjacency[a].push((b, weight));
			adjacency[b].push((a, weight));
		}

		Self::new(adjacency, loops)
	}
}
