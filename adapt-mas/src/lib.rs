//! # ADAPT-MAS
//!
//! A library for managing trust among participants of a multi-agent
//! collaboration, some of which behave adversarially.
//!
//! ## Main characteristics:
//!
//! **Dynamic** - every participant holds a trust score per task context,
//! updated each round from peer evaluations with an exponential moving
//! average, so old behaviour fades and recent behaviour dominates.
//!
//! **Decentralized** - a contribution's influence is the average of the
//! reviews it received, each weighted by the reviewer's own trust.
//!
//! **Collusion aware** - the round's review network is partitioned into
//! communities, and communities whose internal reviews look coordinated are
//! penalised collectively.
//!
//! ## Round flow
//!
//! 1. Build the [`ReviewGraph`] from the round's reviews.
//! 2. Run the [`CollusionDetector`] and penalise every detected group.
//! 3. Compute each contribution's influence with the [`InfluenceScorer`].
//! 4. Feed the influence into the [`TrustStore`] as new evidence.
//!
//! [`TrustOrchestrator`] performs these steps.

// Rustc
#![warn(trivial_casts)]
#![deny(
	absolute_paths_not_starting_with_crate, deprecated, future_incompatible, missing_docs,
	nonstandard_style, unreachable_code, unreachable_patterns
)]
#![forbid(unsafe_code)]
// Clippy
#![allow(clippy::tabs_in_doc_comments, clippy::needless_range_loop, clippy::new_without_default)]
#![deny(
	// Complexity
 	clippy::unnecessary_cast,
	clippy::needless_question_mark,
	clippy::clone_on_copy,
	// Pedantic
 	clippy::cast_lossless,
 	clippy::cast_possible_wrap,
	// Perf
	clippy::redundant_clone,
	// Restriction
 	clippy::panic,
	// Style
 	clippy::let_and_return,
 	clippy::needless_borrow
)]

pub mod agent;
pub mod collusion;
pub mod community;
pub mod config;
pub mod error;
pub mod graph;
pub mod influence;
pub mod review;
pub mod round;
pub mod simulation;
pub mod storage;
pub mod trust;

pub use collusion::{CollusionDetector, CollusionGroup, SuspicionSignals, SuspicionWeights};
pub use config::{Config, ProtocolConfig, SimulationConfig};
pub use error::AdaptError;
pub use graph::ReviewGraph;
pub use influence::InfluenceScorer;
pub use review::{Contribution, Review};
pub use round::{RoundOutcome, TrustOrchestrator};
pub use trust::TrustStore;

use std::{fmt::Debug, hash::Hash};

/// Identifier of a participant.
///
/// Any cloneable, ordered, hashable token works; the trust model never owns
/// participants, it only refers to them.
pub trait Participant: Clone + Debug + Ord + Hash {}

impl<T: Clone + Debug + Ord + Hash> Participant for T {}
