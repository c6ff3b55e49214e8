//! # recmerge-engine
//!
//! Three-way structural merge and two-way diff for record-oriented documents:
//! trees of named elements with attributes, text and identity-bearing child
//! records, as found in data files shared under distributed version control.
//!
//! ## Approach
//!
//! 1. **Node merge**: [`NodeMerger`] rewrites `ours` in place, merging
//!    attributes, text and children against `theirs` and the common
//!    ancestor. Children are aligned by identity, not position. Ours wins
//!    ties; every irreconcilable edit becomes a [`Conflict`], decided by a
//!    [`MergePolicy`] and reported, never raised.
//!
//! 2. **Record diff**: [`TwoWayDiffer`] compares a child snapshot's records
//!    with its parent's and reports additions, deletions (explicit tombstones
//!    or outright removal) and changed records as [`ChangeReport`]s.
//!
//! 3. **Event listeners**: both algorithms stream results to a
//!    [`MergeEventListener`]: accumulate them, fan them out, or drop them.
//!
//! Parsing documents, locating handlers per file type and fetching
//! revisions from a repository are left to collaborators.
//!
//! ## Example
//!
//! ```rust
//! use recmerge_engine::{ConflictKind, Node, NodeMerger};
//!
//! let ancestor = Node::new("entry").with_attr("guid", "e1").with_attr("pos", "x");
//! let mut ours = Node::new("entry").with_attr("guid", "e1").with_attr("pos", "a");
//! let theirs = Node::new("entry").with_attr("guid", "e1").with_attr("pos", "b");
//!
//! let result = NodeMerger::default().merge_collect(&mut ours, &theirs, Some(&ancestor));
//!
//! assert_eq!(ours.attr("pos"), Some("a"));
//! assert_eq!(result.conflicts[0].kind, ConflictKind::BothEditedAttribute);
//! ```

pub mod change;
pub mod conflict;
pub mod differ;
pub mod error;
pub mod identity;
pub mod listener;
pub mod merger;
pub mod node;
pub mod policy;
pub mod revision;

// Re-export primary public API
pub use change::{ChangeKind, ChangeReport};
pub use conflict::{Conflict, ConflictKind, Winner};
pub use differ::TwoWayDiffer;
pub use error::{EngineError, EngineResult};
pub use identity::{AttributeIdentity, Identity};
pub use listener::{
    ChangeAndConflictAccumulator, ContextDescriptor, DispatchingListener, MergeEventListener,
    NullListener,
};
pub use merger::{NodeMergeResult, NodeMerger};
pub use node::{Attribute, Node};
pub use policy::{DefaultPolicy, MergePolicy, PreferSide};
pub use revision::{FileAction, FileInRevision, InMemoryRepository, Repository, Revision};
