// src/watch/mod.rs

//! File watching for the `watch` task.
//!
//! A [`WatchRule`] pairs a source glob with an action. The watcher settles
//! bursts of `notify` events, then fires a rule only when the content hash
//! of its files moved. Task triggers go through the runtime like any other
//! trigger; reloads go straight to the dev server hub.

pub mod event_handler;
pub mod hash;
pub mod rules;
pub mod watcher;

pub use event_handler::{Change, ChangeDetector};
pub use rules::{WatchAction, WatchRule, builtin_rules};
pub use watcher::{WatcherHandle, spawn_watcher};
