use std::error::Error as StdError;
use std::fmt::Debug;

use thiserror::Error;

/// Everything that can go wrong building or querying a [`crate::FilterTree`].
#[derive(Debug, Error)]
pub enum Error {
	#[error("pipeline must contain at least one step")]
	EmptyPipeline,
	#[error("candidate set must contain at least one candidate")]
	EmptyCandidateSet,
	#[error("pipeline step {0} is a duplicate of an earlier step")]
	DuplicateStep(usize),
	#[error("pipeline step {0} has a cache but an earlier step has none; once a step omits its cache, every later step must too")]
	CacheAfterUncached(usize),
	#[error("predicate at depth {0} returned no fingerprint for this input")]
	MissingFingerprint(usize),
	#[error("predicate failed: {0}")]
	Predicate(#[source] Box<dyn StdError + Send + Sync>),
}

impl Error {
	/// Wraps an arbitrary predicate failure so it can cross the `matches` boundary.
	pub fn predicate(err: impl StdError + Send + Sync + 'static) -> Self {
		Self::Predicate(Box::new(err))
	}
}

pub type Result<T> = std::result::Result<T, Error>;
