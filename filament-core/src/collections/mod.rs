//! Reactive Collections
//!
//! Adapters that wrap a plain collection in an
//! [`Observable`](crate::reactive::Observable) and re-expose its interface
//! with broadcasting mutations.
//!
//! # Broadcast Discipline
//!
//! Mutating methods change the collection in place and broadcast the whole
//! collection, bypassing the equality gate; the adapter already knows
//! whether the call changed anything:
//!
//! - every effective mutation broadcasts exactly once;
//! - a call that verifiably changed nothing (removing an absent key or
//!   element, clearing an empty collection, inserting a present set
//!   element) broadcasts zero times;
//! - map `insert` always broadcasts; the overwritten value is not compared.
//!
//! Reads (`len`, `get`, `contains`, snapshots) are tracked, so a watcher
//! that reads through an adapter re-runs on its broadcasts.

mod list;
mod map;
mod set;

pub use list::RxList;
pub use map::RxMap;
pub use set::RxSet;
