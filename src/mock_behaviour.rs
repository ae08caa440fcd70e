//! Scripted failures for the mocked schedule sources
//!
//! A [`MockBehaviour`] counts the calls made to each of the six store operations, and fails
//! the calls that fall in one of its outage windows with a [`ScheduleError::Network`], as if
//! the server could not be reached.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::ops::Range;

use crate::error::{Result, ScheduleError};

/// One of the operations of a [`crate::traits::ScheduleSource`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    ListMonth,
    ListByDate,
    Search,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::ListMonth,
        Operation::ListByDate,
        Operation::Search,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::ListMonth => "list_month",
            Operation::ListByDate => "list_by_date",
            Operation::Search => "search",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Whether this operation changes stored events
    pub fn is_write(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update | Operation::Delete)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which calls of which operations fail.
///
/// Calls are numbered from 0, per operation, from the moment the behaviour is installed.
/// ```
/// # use planner_calendar::mock_behaviour::{MockBehaviour, Operation};
/// // The second and third deletions fail, everything else succeeds
/// let behaviour = MockBehaviour::new().fail_after(Operation::Delete, 1, 2);
/// # drop(behaviour);
/// ```
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    outages: Vec<(Operation, Range<u32>)>,
    calls: HashMap<Operation, u32>,
    suspended: bool,
}

impl MockBehaviour {
    /// A behaviour that lets every call through
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n_calls` calls of every operation fail
    pub fn offline(n_calls: u32) -> Self {
        Operation::ALL.iter()
            .fold(Self::new(), |behaviour, op| behaviour.fail(*op, n_calls))
    }

    /// The next `n_calls` calls of `op` fail
    pub fn fail(self, op: Operation, n_calls: u32) -> Self {
        self.fail_after(op, 0, n_calls)
    }

    /// Let `successes` calls of `op` through, then fail the `n_calls` next ones
    pub fn fail_after(mut self, op: Operation, successes: u32, n_calls: u32) -> Self {
        if n_calls > 0 {
            self.outages.push((op, successes..successes.saturating_add(n_calls)));
        }
        self
    }

    /// Let every call through (without counting it) until [`Self::resume`] is called
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Number of calls of `op` counted so far
    pub fn calls(&self, op: Operation) -> u32 {
        self.calls.get(&op).copied().unwrap_or(0)
    }

    /// Count a call of `op`, and tell whether it should fail
    pub fn check(&mut self, op: Operation) -> Result<()> {
        if self.suspended {
            return Ok(());
        }
        let counter = self.calls.entry(op).or_insert(0);
        let call = *counter;
        *counter += 1;

        let in_outage = self.outages.iter()
            .any(|(o, window)| *o == op && window.contains(&call));
        if in_outage {
            log::debug!("Mock behaviour: failing call #{} of {}", call, op);
            Err(ScheduleError::Network(format!("{} is unavailable (mocked outage, call #{})", op, call)))
        } else {
            log::trace!("Mock behaviour: allowing call #{} of {}", call, op);
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_outage_lets_everything_through() {
        let mut ok = MockBehaviour::new();
        for _ in 0..5 {
            for op in &Operation::ALL {
                assert!(ok.check(*op).is_ok());
            }
        }
        assert_eq!(ok.calls(Operation::Search), 5);
    }

    #[test]
    fn offline_fails_every_operation() {
        let mut offline = MockBehaviour::offline(2);
        assert!(offline.check(Operation::ListMonth).unwrap_err().is_network());
        assert!(offline.check(Operation::Create).is_err());
        assert!(offline.check(Operation::Create).is_err());
        assert!(offline.check(Operation::ListMonth).is_err());
        assert!(offline.check(Operation::ListMonth).is_ok());
        assert!(offline.check(Operation::Create).is_ok());
        // Never called so far
        assert!(offline.check(Operation::Delete).is_err());
    }

    #[test]
    fn outage_windows() {
        let mut behaviour = MockBehaviour::new()
            .fail(Operation::ListMonth, 1)
            .fail_after(Operation::Update, 1, 2)
            .fail_after(Operation::Update, 4, 1)
            .fail(Operation::Delete, 0);

        assert!(behaviour.check(Operation::ListMonth).is_err());
        assert!(behaviour.check(Operation::ListMonth).is_ok());

        let updates: Vec<bool> = (0..6).map(|_| behaviour.check(Operation::Update).is_ok()).collect();
        assert_eq!(updates, vec![true, false, false, true, false, true]);

        assert!(behaviour.check(Operation::Delete).is_ok());
        assert!(behaviour.check(Operation::Search).is_ok());
    }

    #[test]
    fn suspended_calls_are_not_counted() {
        let mut suspended = MockBehaviour::new().fail(Operation::Search, 1);
        suspended.suspend();
        assert!(suspended.check(Operation::Search).is_ok());
        assert_eq!(suspended.calls(Operation::Search), 0);
        suspended.resume();
        assert!(suspended.check(Operation::Search).is_err());
        assert!(suspended.check(Operation::Search).is_ok());
    }

    #[test]
    fn operation_names() {
        assert_eq!(Operation::ListByDate.to_string(), "list_by_date");
        let writes: Vec<Operation> = Operation::ALL.iter().copied().filter(|op| op.is_write()).collect();
        assert_eq!(writes, vec![Operation::Create, Operation::Update, Operation::Delete]);
    }
}
