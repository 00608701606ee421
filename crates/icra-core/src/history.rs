//! Recent visit history used to replay the stream to new subscribers

use crate::Visit;
use std::collections::VecDeque;
use std::sync::Arc;

/// Bounded FIFO buffer of the most recent visits
#[derive(Debug)]
pub struct RecentHistory {
    /// Cached visits, oldest first
    visits: VecDeque<Arc<Visit>>,

    /// Maximum number of visits retained
    capacity: usize,
}

impl RecentHistory {
    /// Create an empty history holding at most `capacity` visits
    pub fn new(capacity: usize) -> Self {
        Self {
            visits: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a visit, evicting the oldest entry when full
    pub fn add(&mut self, visit: Arc<Visit>) {
        self.visits.push_back(visit);
        if self.visits.len() > self.capacity {
            self.visits.pop_front();
        }
    }

    /// Iterate over the cached visits, oldest to newest
    pub fn snapshot(&self) -> impl Iterator<Item = &Arc<Visit>> + Clone + '_ {
        self.visits.iter()
    }

    /// Number of cached visits
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    /// Check if the history is empty
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}
