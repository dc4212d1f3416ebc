//! Two-level FIFO queue.
//!
//! A descriptor stays at the head of its queue while it executes and is only
//! popped once it reaches a terminal outcome.

use std::collections::VecDeque;

use crate::request::{Priority, RequestDescriptor};

#[derive(Debug, Default)]
pub(super) struct PriorityQueues {
    high: VecDeque<RequestDescriptor>,
    low: VecDeque<RequestDescriptor>,
}

impl PriorityQueues {
    fn level(&self, priority: Priority) -> &VecDeque<RequestDescriptor> {
        match priority {
            Priority::High => &self.high,
            Priority::Low => &self.low,
        }
    }

    fn level_mut(&mut self, priority: Priority) -> &mut VecDeque<RequestDescriptor> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Low => &mut self.low,
        }
    }

    pub(super) fn push(&mut self, desc: RequestDescriptor) {
        let priority = desc.priority;
        self.level_mut(priority).push_back(desc);
    }

    pub(super) fn head(&self, priority: Priority) -> Option<&RequestDescriptor> {
        self.level(priority).front()
    }

    pub(super) fn pop(&mut self, priority: Priority) -> Option<RequestDescriptor> {
        self.level_mut(priority).pop_front()
    }

    pub(super) fn has_high(&self) -> bool {
        !self.high.is_empty()
    }

    /// Level whose head should run next: high first, then low.
    pub(super) fn next_priority(&self) -> Option<Priority> {
        if !self.high.is_empty() {
            Some(Priority::High)
        } else if !self.low.is_empty() {
            Some(Priority::Low)
        } else {
            None
        }
    }

    pub(super) fn len(&self, priority: Priority) -> usize {
        self.level(priority).len()
    }

    pub(super) fn clear(&mut self) {
        self.high.clear();
        self.low.clear();
    }
}
