//! # Trust Module.
//!
//! This module contains the `TrustStore`, the per-participant, per-context
//! dynamic trust model. Scores move by a single-hop exponential moving average
//! of the evidence fed into them:
//!
//! `TS(t) = (1 - α) * TS(t-1) + α * clamp(evidence, -1, 1)`
//!
//! Every score stays within `[-1.0, 1.0]` for the lifetime of the store.

use crate::{error::AdaptError, Participant};
use log::warn;
use std::collections::BTreeMap;

/// Lower bound of every trust score.
pub const MIN_TRUST: f64 = -1.0;
/// Upper bound of every trust score.
pub const MAX_TRUST: f64 = 1.0;
/// Trust assigned to a (participant, context) pair on first access.
pub const DEFAULT_TRUST: f64 = 0.5;

/// Dynamic trust scores keyed by participant and context.
#[derive(Clone, Debug)]
pub struct TrustStore<P: Participant> {
	/// EMA learning rate, in (0, 1].
	learning_rate: f64,
	/// Score materialised for unseen pairs.
	default_trust: f64,
	/// Scores per participant, then per context.
	scores: BTreeMap<P, BTreeMap<String, f64>>,
}

impl<P: Participant> TrustStore<P> {
	/// Creates a new store with the given learning rate and the standard
	/// default trust of `0.5`.
	pub fn new(learning_rate: f64) -> Result<Self, AdaptError> {
		Self::with_default(learning_rate, DEFAULT_TRUST)
	}

	/// Creates a new store with a custom default trust.
	///
	/// Fails if the learning rate is outside `(0, 1]` or the default trust is
	/// outside `[-1, 1]`.
	pub fn with_default(learning_rate: f64, default_trust: f64) -> Result<Self, AdaptError> {
		if !(learning_rate > 0.0 && learning_rate <= 1.0) {
			return Err(AdaptError::ConfigurationError(format!(
				"Learning rate must be in (0, 1], got {}",
				learning_rate
			)));
		}
		if !(MIN_TRUST..=MAX_TRUST).contains(&default_trust) {
			return Err(AdaptError::ConfigurationError(format!(
				"Default trust must be in [-1, 1], got {}",
				default_trust
			)));
		}

		Ok(Self { learning_rate, default_trust, scores: BTreeMap::new() })
	}

	/// Returns the learning rate.
	pub fn learning_rate(&self) -> f64 {
		self.learning_rate
	}

	/// Returns the default trust.
	pub fn default_trust(&self) -> f64 {
		self.default_trust
	}

	/// Returns the current trust, inserting the default for an unseen pair
	/// so that repeated reads are stable.
	pub fn get(&mut self, participant: &P, context: &str) -> f64 {
		*self.get_or_insert_default(participant, context)
	}

	/// Returns the current trust without materialising unseen pairs.
	pub fn peek(&self, participant: &P, context: &str) -> f64 {
		self.scores
			.get(participant)
			.and_then(|contexts| contexts.get(context))
			.copied()
			.unwrap_or(self.default_trust)
	}

	/// Checks whether a record exists for the pair.
	pub fn contains(&self, participant: &P, context: &str) -> bool {
		self.scores.get(participant).map_or(false, |contexts| contexts.contains_key(context))
	}

	/// Materialises the default record for the pair, making the participant
	/// eligible for collective penalties.
	pub fn register(&mut self, participant: &P, context: &str) {
		self.get_or_insert_default(participant, context);
	}

	/// Folds new evidence into the score. Evidence outside `[-1, 1]` is
	/// clamped first; NaN evidence is ignored.
	pub fn update(&mut self, participant: &P, context: &str, evidence: f64) {
		if evidence.is_nan() {
			warn!("Ignoring NaN evidence for {:?} in '{}'", participant, context);
			return;
		}
		let alpha = self.learning_rate;
		let evidence = evidence.clamp(MIN_TRUST, MAX_TRUST);
		let score = self.get_or_insert_default(participant, context);
		let updated = (1.0 - alpha) * *score + alpha * evidence;
		*score = updated.clamp(MIN_TRUST, MAX_TRUST);
	}

	/// Multiplies the score of every listed participant by `factor`.
	///
	/// The expected range for `factor` is `[0, 1]`, which shrinks trust towards
	/// zero. Other values are applied as-is and the result is clamped back into
	/// `[-1, 1]`. Non-finite factors are ignored. Participants without a
	/// record in `context` are skipped.
	pub fn penalize(&mut self, participants: &[P], context: &str, factor: f64) {
		if !factor.is_finite() {
			warn!("Ignoring non-finite penalty factor {} in '{}'", factor, context);
			return;
		}
		for participant in participants {
			let score =
				self.scores.get_mut(participant).and_then(|contexts| contexts.get_mut(context));
			if let Some(score) = score {
				*score = (*score * factor).clamp(MIN_TRUST, MAX_TRUST);
			}
		}
	}

	/// Returns a snapshot of every tracked `(participant, context) -> score`.
	pub fn all_scores(&self) -> BTreeMap<(P, String), f64> {
		self.scores
			.iter()
			.flat_map(|(participant, contexts)| {
				contexts
					.iter()
					.map(move |(context, &score)| ((participant.clone(), context.clone()), score))
			})
			.collect()
	}

	/// Number of tracked `(participant, context)` pairs.
	pub fn len(&self) -> usize {
		self.scores.values().map(BTreeMap::len).sum()
	}

	/// Whether the store tracks no pairs at all.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn get_or_insert_default(&mut self, participant: &P, context: &str) -> &mut f64 {
		let default_trust = self.default_trust;
		self.scores
			.entry(participant.clone())
			.or_default()
			.entry(context.to_string())
			.or_insert(default_trust)
	}
}
