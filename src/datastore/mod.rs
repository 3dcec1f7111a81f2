//! Revision model and document-store interface
//!
//! A document in a replicable store is a collection of revision trees.
//! Replication copies the parts of a tree the peer lacks, so the forest
//! structure is the ground truth for conflict detection and winner
//! selection.
//!
//! This module provides:
//! - `DocumentRevision` - immutable revision record
//! - `RevisionForest` - per-document forest of revision trees
//! - `DocumentStore` - interface to the persistent body store
//! - `EventBus` - purge notifications from the store
//!
//! # Invariants
//!
//! - Every non-root revision's parent is in the forest before it is added
//! - A sequence number appears in a forest at most once
//! - A node is a leaf iff it has no children
//! - A document is conflicted iff it has two or more non-deleted leaves

mod events;
mod forest;
mod revision;
mod store;

pub mod errors;

pub use errors::{ForestError, ForestResult, StoreError, StoreResult};
pub use events::{EventBus, StoreEvent, Subscription};
pub use forest::{RevisionForest, RevisionNode};
pub use revision::DocumentRevision;
pub use store::{ChangeBatch, DocumentStore};
