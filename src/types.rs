// src/types.rs

use serde::Deserialize;

/// What to do with a trigger that arrives for a task which is already part
/// of the active run (typically a stylesheet saved while `css` is compiling).
///
/// - `Queue`: remember it and start a follow-up run once the current run is
///   idle (default).
/// - `Cancel`: forget anything queued so far and keep only the latest
///   trigger for the follow-up run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}
