use std::hash::Hash;
use std::sync::Arc;

use crate::cache::NodeCache;
use crate::error::{Error, Result};
use crate::node::TreeNode;
use crate::predicate::Predicate;

/// An immutable pairing of a predicate with an optional cache prototype.
///
/// The predicate and the cache prototype (if any) are held behind `Arc` so
/// that duplicate-step detection (§4.1, rule 3) can use pointer identity: a
/// step built from the same predicate `Arc` and the same cache-prototype
/// `Arc` (or both omitting a cache) is a duplicate of an earlier step,
/// regardless of whether the predicate type itself implements equality.
pub struct PipelineStep<I, O, K>
where
	O: Eq + Hash + Clone + Send + Sync + 'static,
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	pub(crate) predicate: Arc<dyn Predicate<I, O, K>>,
	pub(crate) cache_prototype: Option<Arc<dyn NodeCache<K, TreeNode<I, O, K>>>>,
}

impl<I, O, K> PipelineStep<I, O, K>
where
	O: Eq + Hash + Clone + Send + Sync + 'static,
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	/// Builds a step. Pass [`crate::no_cache`] for `cache_prototype` to leave
	/// this step uncached.
	pub fn new(
		predicate: Arc<dyn Predicate<I, O, K>>,
		cache_prototype: Option<Arc<dyn NodeCache<K, TreeNode<I, O, K>>>>,
	) -> Self {
		Self {
			predicate,
			cache_prototype,
		}
	}

	pub(crate) fn has_cache(&self) -> bool {
		self.cache_prototype.is_some()
	}

	fn is_duplicate_of(&self, other: &Self) -> bool {
		let same_predicate = Arc::ptr_eq(&self.predicate, &other.predicate);
		let same_cache = match (&self.cache_prototype, &other.cache_prototype) {
			(None, None) => true,
			(Some(a), Some(b)) => Arc::ptr_eq(a, b),
			_ => false,
		};
		same_predicate && same_cache
	}
}

/// The ordered, finite, non-empty sequence of [`PipelineStep`]s a
/// [`crate::FilterTree`] was built from.
pub(crate) struct Pipeline<I, O, K>
where
	O: Eq + Hash + Clone + Send + Sync + 'static,
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	steps: Vec<PipelineStep<I, O, K>>,
}

impl<I, O, K> Pipeline<I, O, K>
where
	O: Eq + Hash + Clone + Send + Sync + 'static,
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	/// Validates `steps` per §4.1 rules 1, 3 and 4, and wraps them.
	///
	/// Rule 2 (non-empty candidate set) is the caller's (`FilterTree`'s)
	/// responsibility since it concerns the candidate set, not the pipeline.
	pub(crate) fn new(steps: Vec<PipelineStep<I, O, K>>) -> Result<Self> {
		if steps.is_empty() {
			return Err(Error::EmptyPipeline);
		}
		for (i, step) in steps.iter().enumerate() {
			if steps[..i].iter().any(|earlier| step.is_duplicate_of(earlier)) {
				return Err(Error::DuplicateStep(i));
			}
		}
		// Monotonic caching rule: once a step has no cache, no later step may have one.
		let mut saw_uncached = false;
		for (i, step) in steps.iter().enumerate() {
			if step.has_cache() {
				if saw_uncached {
					return Err(Error::CacheAfterUncached(i));
				}
			} else {
				saw_uncached = true;
			}
		}
		Ok(Self {
			steps,
		})
	}

	pub(crate) fn len(&self) -> usize {
		self.steps.len()
	}

	pub(crate) fn cached_len(&self) -> usize {
		self.steps.iter().filter(|s| s.has_cache()).count()
	}

	pub(crate) fn step(&self, depth: usize) -> &PipelineStep<I, O, K> {
		&self.steps[depth]
	}

	pub(crate) fn steps_from(&self, depth: usize) -> &[PipelineStep<I, O, K>] {
		&self.steps[depth..]
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cache::reference_cache;
	use std::collections::HashSet;

	struct AlwaysKeep;

	impl Predicate<(), u32, u32> for AlwaysKeep {
		fn apply(&self, _input: &(), _candidates: &mut HashSet<u32>) -> Result<()> {
			Ok(())
		}

		fn fingerprint(&self, _input: &()) -> Option<u32> {
			Some(0)
		}
	}

	fn step(cached: bool) -> PipelineStep<(), u32, u32> {
		let predicate: Arc<dyn Predicate<(), u32, u32>> = Arc::new(AlwaysKeep);
		let cache = if cached {
			Some(reference_cache())
		} else {
			None
		};
		PipelineStep::new(predicate, cache)
	}

	#[test]
	fn rejects_empty_pipeline() {
		assert!(matches!(Pipeline::<(), u32, u32>::new(vec![]), Err(Error::EmptyPipeline)));
	}

	#[test]
	fn rejects_duplicate_step() {
		let s = step(true);
		let predicate = s.predicate.clone();
		let cache = s.cache_prototype.clone();
		let duplicate = PipelineStep::new(predicate, cache);
		let err = Pipeline::new(vec![s, duplicate]).unwrap_err();
		assert!(matches!(err, Error::DuplicateStep(1)));
	}

	#[test]
	fn distinct_steps_built_from_separately_constructed_predicates_are_not_duplicates() {
		let steps = vec![step(true), step(true)];
		assert!(Pipeline::new(steps).is_ok());
	}

	#[test]
	fn rejects_cache_after_uncached() {
		let err = Pipeline::new(vec![step(false), step(true)]).unwrap_err();
		assert!(matches!(err, Error::CacheAfterUncached(1)));
	}

	#[test]
	fn accepts_cached_then_uncached() {
		assert!(Pipeline::new(vec![step(true), step(false)]).is_ok());
	}

	#[test]
	fn accepts_fully_uncached_pipeline() {
		assert!(Pipeline::new(vec![step(false), step(false)]).is_ok());
	}

	#[test]
	fn accepts_fully_cached_pipeline() {
		assert!(Pipeline::new(vec![step(true), step(true)]).is_ok());
	}
}
