// src/engine/board.rs

//! Per-run step status bookkeeping.

use crate::errors::{InstallerError, Result};
use crate::types::StepStatus;

/// Status of every step in the current run, indexed by position.
///
/// Only the coordinator's run loop owns a board. All transitions go through
/// [`StepBoard::advance`], which rejects anything that would break the
/// forward-only status order or start a step before its predecessors are done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepBoard {
    statuses: Vec<StepStatus>,
}

impl StepBoard {
    pub fn new(len: usize) -> Self {
        Self {
            statuses: vec![StepStatus::Pending; len],
        }
    }

    pub fn statuses(&self) -> &[StepStatus] {
        &self.statuses
    }

    pub fn status(&self, index: usize) -> Option<StepStatus> {
        self.statuses.get(index).copied()
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }

    pub fn advance(&mut self, index: usize, next: StepStatus) -> Result<()> {
        let current = self.status(index).ok_or(InstallerError::UnknownStep(index))?;

        if !current.can_transition_to(next) {
            return Err(InstallerError::InvalidTransition {
                index,
                from: current,
                to: next,
            });
        }

        if next == StepStatus::InProgress
            && self.statuses[..index]
                .iter()
                .any(|s| *s != StepStatus::Done)
        {
            return Err(InstallerError::StepOutOfOrder(index));
        }

        self.statuses[index] = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_advance_in_list_order() {
        let mut board = StepBoard::new(3);

        board.advance(0, StepStatus::InProgress).unwrap();
        board.advance(0, StepStatus::Done).unwrap();
        board.advance(1, StepStatus::InProgress).unwrap();
        board.advance(1, StepStatus::Failed).unwrap();

        assert_eq!(
            board.statuses(),
            &[StepStatus::Done, StepStatus::Failed, StepStatus::Pending]
        );
        assert_eq!(board.count(StepStatus::Pending), 1);
    }

    #[test]
    fn cannot_start_before_predecessor_is_done() {
        let mut board = StepBoard::new(2);
        board.advance(0, StepStatus::InProgress).unwrap();

        let err = board.advance(1, StepStatus::InProgress).unwrap_err();
        assert!(matches!(err, InstallerError::StepOutOfOrder(1)));
        assert_eq!(board.status(1), Some(StepStatus::Pending));
    }

    #[test]
    fn terminal_status_is_never_left() {
        let mut board = StepBoard::new(1);
        board.advance(0, StepStatus::InProgress).unwrap();
        board.advance(0, StepStatus::Cancelled).unwrap();

        let err = board.advance(0, StepStatus::Done).unwrap_err();
        assert!(matches!(
            err,
            InstallerError::InvalidTransition {
                index: 0,
                from: StepStatus::Cancelled,
                to: StepStatus::Done
            }
        ));
    }

    #[test]
    fn unknown_index_is_rejected() {
        let mut board = StepBoard::new(0);
        assert!(matches!(
            board.advance(0, StepStatus::InProgress),
            Err(InstallerError::UnknownStep(0))
        ));
    }
}
