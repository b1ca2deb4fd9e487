use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use crate::cache::NodeCache;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::predicate::Predicate;

enum Branch<I, O, K>
where
	O: Eq + Hash + Clone + Send + Sync + 'static,
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	/// Remaining pipeline was empty at construction; `frame` is the answer.
	Leaf,
	/// This node's step has a cache prototype. Misses materialize and race
	/// a child node into `cache`; hits delegate to the winner.
	Cached {
		predicate: Arc<dyn Predicate<I, O, K>>,
		cache: Box<dyn NodeCache<K, TreeNode<I, O, K>>>,
	},
	/// This node's step (and, by the monotonic caching rule, every step
	/// after it) has no cache. Nothing is materialized; `matches` collapses
	/// the rest of the pipeline into one straight-line narrowing pass.
	Uncached,
}

/// One node of the caching decision tree.
///
/// A node owns the candidate frame it inherited at construction, is never
/// mutated afterwards, and lives as long as the cache entry (or the
/// [`crate::FilterTree`] root) that references it. See the crate-level docs
/// for the full recursive contract.
pub struct TreeNode<I, O, K>
where
	O: Eq + Hash + Clone + Send + Sync + 'static,
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	frame: Arc<HashSet<O>>,
	pipeline: Arc<Pipeline<I, O, K>>,
	depth: usize,
	branch: Branch<I, O, K>,
}

impl<I, O, K> TreeNode<I, O, K>
where
	O: Eq + Hash + Clone + Send + Sync + 'static,
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	/// Builds the node for `depth` in `pipeline`, inheriting `frame` from the
	/// parent (or, at the root, the caller-supplied candidate set).
	pub(crate) fn new(pipeline: Arc<Pipeline<I, O, K>>, depth: usize, frame: Arc<HashSet<O>>) -> Self {
		let branch = if depth >= pipeline.len() {
			Branch::Leaf
		} else {
			let step = pipeline.step(depth);
			match &step.cache_prototype {
				Some(prototype) => Branch::Cached {
					predicate: step.predicate.clone(),
					cache: prototype.spawn(),
				},
				None => Branch::Uncached,
			}
		};
		Self {
			frame,
			pipeline,
			depth,
			branch,
		}
	}

	/// Evaluates `input` against this subtree, returning the surviving
	/// candidates. See §4.2 of the design notes for the decision rules this
	/// implements.
	pub(crate) fn matches(self: &Arc<Self>, input: &I) -> Result<Arc<HashSet<O>>> {
		if self.frame.is_empty() {
			return Ok(self.frame.clone());
		}
		match &self.branch {
			Branch::Leaf => Ok(self.frame.clone()),
			Branch::Cached {
				predicate,
				cache,
			} => self.matches_cached(input, predicate.as_ref(), cache.as_ref()),
			Branch::Uncached => self.matches_uncached(input),
		}
	}

	fn matches_cached(
		self: &Arc<Self>,
		input: &I,
		predicate: &dyn Predicate<I, O, K>,
		cache: &dyn NodeCache<K, TreeNode<I, O, K>>,
	) -> Result<Arc<HashSet<O>>> {
		let key = predicate.fingerprint(input).ok_or_else(|| {
			error!(depth = self.depth, "predicate produced no fingerprint for this input");
			Error::MissingFingerprint(self.depth)
		})?;
		if let Some(child) = cache.get(&key) {
			trace!(depth = self.depth, "cache hit");
			return child.matches(input);
		}
		trace!(depth = self.depth, "cache miss, building child node");
		let mut working: HashSet<O> = (*self.frame).clone();
		predicate.apply(input, &mut working)?;
		let built = Arc::new(TreeNode::new(self.pipeline.clone(), self.depth + 1, Arc::new(working)));
		let winner = cache.put(key, built.clone());
		if Arc::ptr_eq(&winner, &built) {
			debug!(depth = self.depth, "materialized new child node");
		} else {
			debug!(depth = self.depth, "lost the build race, using the incumbent child");
		}
		winner.matches(input)
	}

	fn matches_uncached(&self, input: &I) -> Result<Arc<HashSet<O>>> {
		let mut working: HashSet<O> = (*self.frame).clone();
		for step in self.pipeline.steps_from(self.depth) {
			if working.is_empty() {
				break;
			}
			step.predicate.apply(input, &mut working)?;
		}
		Ok(Arc::new(working))
	}
}
