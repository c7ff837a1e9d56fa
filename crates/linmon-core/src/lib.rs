//! # linmon-core
//!
//! Linearizability monitors for complete concurrent histories over four
//! abstract datatypes: set, stack, queue and priority queue.
//!
//! Under the distinct-value restriction (each value added at most once,
//! removed at most once), each datatype admits a polynomial-time decision
//! procedure. This crate provides:
//!
//! - the data model ([`History`], [`Operation`], [`Method`], [`DataKind`]),
//! - the shared [`frontend`] pipeline (history extension, event tuning,
//!   empty-observation validation),
//! - the augmented search structures in [`collections`] (bounded slab,
//!   lazy segment tree, interval trees),
//! - the four monitors in [`monitors`], dispatched by
//!   [`is_linearizable`].
//!
//! The verdict is boolean: `false` means the history is not linearizable
//! for that datatype, or violates the distinct-value restriction. No
//! linearization witness is produced.

pub mod collections;
pub mod events;
pub mod frontend;
pub mod history;
pub mod monitors;

pub use history::{
    DataKind, History, Method, OpId, Operation, Time, UnknownDataKind, UnknownMethod, Value,
    DEFAULT_EMPTY_VALUE,
};
pub use monitors::is_linearizable;
