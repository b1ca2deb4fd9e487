use std::collections::HashSet;
use std::hash::Hash;

use crate::error::Result;

/// One filtering dimension in a [`crate::Pipeline`].
///
/// A predicate narrows a candidate set for a given input, and produces a
/// fingerprint that lets the tree memoize the subtree reachable for any input
/// sharing that fingerprint. Implementations are supplied by the caller; the
/// crate only ever calls through this trait.
pub trait Predicate<I, O, K>: Send + Sync
where
	O: Eq + Hash,
	K: Eq + Hash + Clone,
{
	/// Removes candidates from `candidates` that do not satisfy this
	/// predicate for `input`. Never adds candidates.
	fn apply(&self, input: &I, candidates: &mut HashSet<O>) -> Result<()>;

	/// Returns the cache key this predicate would use to memoize `input`'s
	/// subtree. `None` means the predicate could not produce one for this
	/// input; matching such an input at a cached node is a fatal error
	/// (see [`crate::Error::MissingFingerprint`]).
	fn fingerprint(&self, input: &I) -> Option<K>;
}
