//! In-memory feature data store for geofeature.
//!
//! This crate provides [`RuntimeFeatureDataStore`], the default
//! implementation of the [`FeatureDataStore`](geofeature_core::FeatureDataStore)
//! trait. Features live in shared immutable records indexed by id, name,
//! geometry class, feature set and a [`Quadtree`] over their envelopes.
//! Queries pick the index with the smallest estimated cardinality and
//! re-test every other constraint, so the chosen plan never changes the
//! result; [`RuntimeFeatureDataStore::explain`] reports the plan.
//!
//! Writers serialise on a re-entrant modify lock. Bulk modifications fold
//! the per-operation notifications they suppress into a single
//! [`ChangeEvent::ContentChanged`](geofeature_core::ChangeEvent::ContentChanged).

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod gate;
mod index;
mod listeners;
pub mod quadtree;
mod query;
mod store;
mod visibility;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use config::{DEFAULT_URI, RuntimeStoreConfig};
pub use quadtree::{DEFAULT_MAX_DEPTH, DEFAULT_NODE_CAPACITY, Quadtree};
pub use query::{CardinalityEstimate, PrimaryIndex, QueryPlan};
pub use store::{ModifyLock, RuntimeFeatureDataStore};
