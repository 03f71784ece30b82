//! # Influence Module.
//!
//! Computes the Contribution Influence Score (CIS): the average of the reviews
//! a contribution received in one round, each review weighted by the current
//! trust of its reviewer. A ring of low-trust reviewers moves the result less
//! than a single highly trusted one.

use crate::{error::AdaptError, review::Review, trust::TrustStore, Participant};
use log::warn;

/// Smallest weight a reviewer can carry.
pub const MIN_REVIEWER_WEIGHT: f64 = 0.01;

/// Trust-weighted scorer for contributions.
#[derive(Clone, Debug)]
pub struct InfluenceScorer {
	min_weight: f64,
}

impl Default for InfluenceScorer {
	fn default() -> Self {
		Self { min_weight: MIN_REVIEWER_WEIGHT }
	}
}

impl InfluenceScorer {
	/// Creates a scorer with a custom weight floor.
	///
	/// The floor must be finite and positive, keeping every weight positive.
	pub fn new(min_weight: f64) -> Result<Self, AdaptError> {
		if !(min_weight.is_finite() && min_weight > 0.0) {
			return Err(AdaptError::ConfigurationError(format!(
				"Minimum reviewer weight must be positive, got {}",
				min_weight
			)));
		}

		Ok(Self { min_weight })
	}

	/// Returns the weight floor.
	pub fn min_weight(&self) -> f64 {
		self.min_weight
	}

	/// Scores the contribution of `owner` from this round's reviews.
	///
	/// Returns `0.0` when nobody reviewed the owner, so an unreviewed
	/// contribution is never mistaken for one carrying the default trust.
	pub fn score<P: Participant>(
		&self, owner: &P, reviews: &[Review<P>], trust: &TrustStore<P>, context: &str,
	) -> f64 {
		let mut weighted_sum = 0.0;
		let mut weight_sum = 0.0;

		for review in reviews.iter().filter(|review| &review.reviewee == owner) {
			if !review.is_well_formed() {
				warn!("Ignoring review of {:?} with score {}", review.reviewee, review.score);
				continue;
			}

			let weight = trust.peek(&review.reviewer, context).max(self.min_weight);
			weighted_sum += weight * review.score;
			weight_sum += weight;
		}

		if weight_sum <= 0.0 {
			return 0.0;
		}

		weighted_sum / weight_sum
	}
}
