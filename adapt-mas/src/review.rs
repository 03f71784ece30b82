//! # Review Module.
//!
//! Round inputs supplied by the workflow: contributions and the peer reviews
//! written about them.

use serde::{Deserialize, Serialize};

/// A single peer review, `reviewer -> reviewee` with a score.
///
/// Scores conventionally lie in `[-1, 1]`; the range is not enforced here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review<P> {
	/// Participant giving the review.
	pub reviewer: P,
	/// Participant whose contribution is being reviewed.
	pub reviewee: P,
	/// Given score.
	pub score: f64,
}

impl<P> Review<P> {
	/// Constructs a new review.
	pub fn new(reviewer: P, reviewee: P, score: f64) -> Self {
		Self { reviewer, reviewee, score }
	}

	/// Whether the score can take part in any arithmetic.
	pub fn is_well_formed(&self) -> bool {
		self.score.is_finite()
	}
}

impl<P: PartialEq> Review<P> {
	/// Whether the reviewer reviewed itself.
	pub fn is_self_review(&self) -> bool {
		self.reviewer == self.reviewee
	}
}

/// A contribution made during one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution<P> {
	/// Participant that made the contribution.
	pub owner: P,
	/// Round number.
	pub round: u32,
}

impl<P> Contribution<P> {
	/// Constructs a new contribution.
	pub fn new(owner: P, round: u32) -> Self {
		Self { owner, round }
	}
}
