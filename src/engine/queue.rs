// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use super::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers held back because their task is already part of the active run.
///
/// Each slot is one follow-up run; `queue_length` bounds the number of
/// slots. In `Queue` mode new triggers join the newest slot, so any number
/// of stylesheet saves during a `css` compile collapse into one more `css`
/// run. In `Cancel` mode only the latest trigger survives.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    capacity: usize,
    slots: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `queue_length` of 0 is treated as 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> Self {
        Self {
            behaviour,
            capacity: queue_length.max(1),
            slots: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Hold `task` for a later run.
    pub fn record_trigger(&mut self, task: &str) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                match self.slots.back_mut() {
                    Some(slot) => {
                        if !slot.insert(task.to_string()) {
                            debug!(task, "already queued; coalesced");
                        }
                    }
                    None => self.slots.push_back(BTreeSet::from([task.to_string()])),
                }
                while self.slots.len() > self.capacity {
                    warn!(capacity = self.capacity, "trigger queue full; dropping oldest");
                    self.slots.pop_front();
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                if !self.slots.is_empty() {
                    debug!(task, "replacing queued triggers");
                }
                self.slots.clear();
                self.slots.push_back(BTreeSet::from([task.to_string()]));
            }
        }
    }

    /// Empty the queue into the trigger list of the next run, sorted by
    /// name.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let merged: BTreeSet<TaskName> = self.slots.drain(..).flatten().collect();
        if !merged.is_empty() {
            debug!(tasks = ?merged, "starting queued run");
        }
        merged.into_iter().collect()
    }
}
