use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::node::TreeNode;
use crate::pipeline::{Pipeline, PipelineStep};

/// A fixed candidate set filtered through an ordered, partially-memoizing
/// predicate pipeline.
///
/// Construct one with [`FilterTree::new`], then call [`FilterTree::matches`]
/// from as many threads as you like. See the crate-level docs for the full
/// contract.
pub struct FilterTree<I, O, K>
where
	O: Eq + Hash + Clone + Send + Sync + 'static,
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	root: Arc<TreeNode<I, O, K>>,
}

impl<I, O, K> FilterTree<I, O, K>
where
	O: Eq + Hash + Clone + Send + Sync + 'static,
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	/// Validates `steps` and `candidates`, then builds the root node.
	///
	/// # Errors
	///
	/// Returns a configuration error (see [`Error`]) if the pipeline is
	/// empty, the candidate set is empty, the pipeline contains a duplicate
	/// step, or the pipeline violates the monotonic caching rule (a
	/// cache-bearing step following one with no cache).
	pub fn new(steps: Vec<PipelineStep<I, O, K>>, candidates: HashSet<O>) -> Result<Self> {
		if steps.is_empty() {
			return Err(Error::EmptyPipeline);
		}
		if candidates.is_empty() {
			return Err(Error::EmptyCandidateSet);
		}
		let pipeline = Arc::new(Pipeline::new(steps)?);
		debug!(
			steps = pipeline.len(),
			cached_steps = pipeline.cached_len(),
			candidates = candidates.len(),
			"building filter tree"
		);
		let root = Arc::new(TreeNode::new(pipeline, 0, Arc::new(candidates)));
		Ok(Self {
			root,
		})
	}

	/// Evaluates `input` against the candidate set, returning the surviving
	/// candidates. The returned set is shared and should be treated as
	/// read-only; its element order is unspecified.
	pub fn matches(&self, input: &I) -> Result<Arc<HashSet<O>>> {
		self.root.matches(input)
	}
}
