//! Per-(group, user) violation counters.

use modchat_types::{GroupId, UserId};
use std::collections::HashMap;

/// Counter values around one increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    /// Counter before the message.
    pub before: u32,
    /// Counter after the message.
    pub after: u32,
    /// `true` exactly once per pair: on the below → at-or-above step.
    pub crossed: bool,
}

/// Violation counters, created lazily at zero and never reset.
///
/// # Example
///
/// ```
/// use modchat_runtime::moderation::ViolationLedger;
/// use modchat_types::{GroupId, UserId};
///
/// let mut ledger = ViolationLedger::new(2);
/// let (g, u) = (GroupId::new(0), UserId::new(1));
///
/// assert!(!ledger.record(g, u, 1).crossed);
/// assert!(ledger.record(g, u, 1).crossed);
/// assert!(!ledger.record(g, u, 1).crossed);
/// assert_eq!(ledger.count(g, u), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ViolationLedger {
    counts: HashMap<(GroupId, UserId), u32>,
    threshold: u32,
}

impl ViolationLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            counts: HashMap::new(),
            threshold,
        }
    }

    /// Returns the removal threshold.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Adds `hits` to the pair's counter and reports whether it crossed.
    pub fn record(&mut self, group: GroupId, user: UserId, hits: u32) -> Assessment {
        let counter = self.counts.entry((group, user)).or_insert(0);
        let before = *counter;
        let after = before.saturating_add(hits);
        *counter = after;

        Assessment {
            before,
            after,
            crossed: hits > 0 && before < self.threshold && after >= self.threshold,
        }
    }

    /// Current counter for a pair, zero if never seen.
    #[must_use]
    pub fn count(&self, group: GroupId, user: UserId) -> u32 {
        self.counts.get(&(group, user)).copied().unwrap_or(0)
    }

    /// Snapshot of every counter.
    #[must_use]
    pub fn counters(&self) -> &HashMap<(GroupId, UserId), u32> {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (GroupId, UserId) {
        (GroupId::new(2), UserId::new(4))
    }

    #[test]
    fn counts_accumulate_and_cross_once() {
        let (g, u) = pair();
        let mut ledger = ViolationLedger::new(3);

        let steps: Vec<_> = (0..5).map(|_| ledger.record(g, u, 1)).collect();
        let afters: Vec<_> = steps.iter().map(|a| a.after).collect();
        assert_eq!(afters, vec![1, 2, 3, 4, 5]);

        let crossings: Vec<_> = steps.iter().map(|a| a.crossed).collect();
        assert_eq!(crossings, vec![false, false, true, false, false]);
    }

    #[test]
    fn single_message_can_jump_past_threshold() {
        let (g, u) = pair();
        let mut ledger = ViolationLedger::new(2);
        let a = ledger.record(g, u, 5);
        assert_eq!((a.before, a.after), (0, 5));
        assert!(a.crossed);
    }

    #[test]
    fn zero_hits_never_cross() {
        let (g, u) = pair();
        let mut ledger = ViolationLedger::new(0);
        assert!(!ledger.record(g, u, 0).crossed);
        assert!(!ledger.record(g, u, 1).crossed);
        assert_eq!(ledger.count(g, u), 1);
    }

    #[test]
    fn pairs_are_independent() {
        let mut ledger = ViolationLedger::new(1);
        assert!(ledger.record(GroupId::new(0), UserId::new(0), 1).crossed);
        assert!(ledger.record(GroupId::new(1), UserId::new(0), 1).crossed);
        assert_eq!(ledger.count(GroupId::new(0), UserId::new(1)), 0);
        assert_eq!(ledger.counters().len(), 2);
    }
}
