use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// A thread-safe mapping from a predicate's fingerprint to the materialized
/// subtree rooted at that fingerprint's child node.
///
/// Implementations are supplied by the caller and used two ways: a single
/// *prototype* instance is handed to [`crate::PipelineStep::new`], and each
/// node that reaches that step calls [`NodeCache::spawn`] on the prototype to
/// obtain its own, independent instance. The prototype itself is never read
/// from or written to.
pub trait NodeCache<K, V>: Send + Sync
where
	K: Eq + Hash + Clone,
	V: Send + Sync,
{
	/// Returns a fresh, empty instance distinct from `self`. `self` is used
	/// only as a prototype and must not be mutated by this call.
	fn spawn(&self) -> Box<dyn NodeCache<K, V>>;

	/// Looks up `key`, if a subtree has already been materialized for it.
	fn get(&self, key: &K) -> Option<Arc<V>>;

	/// Inserts `value` under `key` if absent. If another thread already won
	/// the race for this key, the incumbent is returned and `value` is
	/// discarded; callers must use the returned value going forward.
	fn put(&self, key: K, value: Arc<V>) -> Arc<V>;
}

/// The reference [`NodeCache`]: an unbounded, in-memory concurrent map.
///
/// `put` is insert-if-absent: on a race between two threads materializing the
/// same key, the first insert wins and the loser's value is dropped. There is
/// no eviction; long-lived trees with high fingerprint cardinality grow this
/// cache without bound, which is a documented trade-off rather than an
/// oversight (see the crate-level docs).
pub struct DashMapCache<K, V>
where
	K: Eq + Hash + Clone,
{
	map: DashMap<K, Arc<V>>,
}

impl<K, V> DashMapCache<K, V>
where
	K: Eq + Hash + Clone,
{
	pub fn new() -> Self {
		Self {
			map: DashMap::new(),
		}
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.map.len()
	}

	/// Whether this instance currently holds no materialized children.
	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}
}

impl<K, V> Default for DashMapCache<K, V>
where
	K: Eq + Hash + Clone,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V> NodeCache<K, V> for DashMapCache<K, V>
where
	K: Eq + Hash + Clone + Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	fn spawn(&self) -> Box<dyn NodeCache<K, V>> {
		Box::new(Self::new())
	}

	fn get(&self, key: &K) -> Option<Arc<V>> {
		self.map.get(key).map(|e| e.value().clone())
	}

	fn put(&self, key: K, value: Arc<V>) -> Arc<V> {
		match self.map.entry(key) {
			Entry::Occupied(e) => e.get().clone(),
			Entry::Vacant(e) => {
				e.insert(value.clone());
				value
			}
		}
	}
}

/// The "no cache" sentinel for a [`crate::PipelineStep`]: the step is
/// evaluated, never memoized. Equivalent to passing `None` directly, but
/// reads better at call sites next to [`reference_cache`].
pub fn no_cache<K, V>() -> Option<Arc<dyn NodeCache<K, V>>>
where
	K: Eq + Hash + Clone,
	V: Send + Sync,
{
	None
}

/// Builds a prototype of the reference in-memory cache, ready to hand to
/// [`crate::PipelineStep::new`].
pub fn reference_cache<K, V>() -> Arc<dyn NodeCache<K, V>>
where
	K: Eq + Hash + Clone + Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	Arc::new(DashMapCache::new())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Barrier;
	use std::thread;

	#[test]
	fn get_put_roundtrip() {
		let cache: DashMapCache<&str, u32> = DashMapCache::new();
		assert!(cache.get(&"a").is_none());
		assert!(cache.is_empty());
		let winner = cache.put("a", Arc::new(1));
		assert_eq!(*winner, 1);
		assert_eq!(*cache.get(&"a").unwrap(), 1);
		assert_eq!(cache.len(), 1);
		assert!(!cache.is_empty());
	}

	#[test]
	fn put_is_insert_if_absent() {
		let cache: DashMapCache<&str, u32> = DashMapCache::new();
		let first = cache.put("a", Arc::new(1));
		let second = cache.put("a", Arc::new(2));
		// The incumbent wins; the caller of the losing `put` must use it.
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(*second, 1);
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn spawn_yields_independent_empty_instance() {
		let prototype: DashMapCache<&str, u32> = DashMapCache::new();
		prototype.put("a", Arc::new(1));
		let spawned = prototype.spawn();
		assert!(spawned.get(&"a").is_none());
		spawned.put("a", Arc::new(2));
		// The prototype is untouched by writes through the spawned instance.
		assert_eq!(*prototype.get(&"a").unwrap(), 1);
	}

	/// S7: many threads racing to materialize the same fingerprint must
	/// leave exactly one durable entry behind, and every thread must end up
	/// using that same survivor.
	#[test]
	fn concurrent_put_races_to_one_durable_entry() {
		const THREADS: usize = 64;
		let cache: Arc<DashMapCache<&str, u32>> = Arc::new(DashMapCache::new());
		let barrier = Arc::new(Barrier::new(THREADS));
		let winners: Vec<_> = thread::scope(|scope| {
			(0..THREADS)
				.map(|i| {
					let cache = cache.clone();
					let barrier = barrier.clone();
					scope.spawn(move || {
						barrier.wait();
						cache.put("k", Arc::new(i as u32))
					})
				})
				.collect::<Vec<_>>()
				.into_iter()
				.map(|handle| handle.join().unwrap())
				.collect()
		});
		assert_eq!(cache.len(), 1);
		let first = &winners[0];
		assert!(winners.iter().all(|w| Arc::ptr_eq(w, first)));
	}
}
