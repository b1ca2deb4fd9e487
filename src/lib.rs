//! A thread-safe, memoizing decision tree for filtering a fixed candidate
//! set through a user-supplied predicate pipeline.
//!
//! Callers supply:
//! - a fixed set of candidates (the things that might get returned),
//! - an ordered sequence of [`PipelineStep`]s, each wrapping a [`Predicate`]
//!   and optionally paired with a [`NodeCache`] prototype,
//!
//! and get back a [`FilterTree`] that, for any input, narrows the candidate
//! set down to whatever satisfies every predicate. Repeated inputs that share
//! a fingerprint at every cached step converge to a sequence of map lookups
//! rather than a full predicate re-evaluation.
//!
//! Caching is partial by design: a pipeline step may omit its cache, in which
//! case every step after it must too (the *monotonic caching rule*, enforced
//! at [`FilterTree::new`]). Once a step is uncached, the tree stops
//! materializing child nodes for it and its descendants and instead
//! collapses them into one straight-line narrowing pass per `matches` call.
//!
//! Concurrent callers racing to materialize the same cache entry are
//! resolved by the [`NodeCache`] implementation: exactly one built node
//! becomes durable per fingerprint, and every racing thread proceeds with
//! that survivor. The reference [`DashMapCache`] implements this with
//! insert-if-absent semantics and no eviction.

#[macro_use]
extern crate tracing;

mod cache;
mod error;
mod node;
mod pipeline;
mod predicate;
mod tree;

pub use cache::{no_cache, reference_cache, DashMapCache, NodeCache};
pub use error::{Error, Result};
pub use node::TreeNode;
pub use pipeline::PipelineStep;
pub use predicate::Predicate;
pub use tree::FilterTree;
