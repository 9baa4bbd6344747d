#![forbid(unsafe_code)]

//! Error taxonomy and traversal results.

use crate::mark::MarkHandle;

/// Errors returned by [`ActionManager`](crate::ActionManager) operations.
///
/// These are host programming errors or reentrancy; they are never retried
/// automatically. Outcomes of running actions are reported through
/// [`UndoResult`] instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An undo, redo or rollback is already running.
    #[error("action manager is busy with an undo or redo")]
    Busy,
    /// No task is open to receive actions or to end.
    #[error("no task is open")]
    NoOpenTask,
    /// Undo history is empty.
    #[error("nothing to undo")]
    NothingToUndo,
    /// Redo history is empty.
    #[error("nothing to redo")]
    NothingToRedo,
    /// A traversal was requested while tasks are still open.
    #[error("cannot traverse history with {depth} open task(s)")]
    TaskInProgress { depth: usize },
    /// `end_non_undoable_section` without a matching begin.
    #[error("no non-undoable section is open")]
    NotInNonUndoableSection,
    /// The mark was consumed or history shrank below it.
    #[error("mark {0} is stale")]
    StaleMark(MarkHandle),
    /// Rollback target is deeper than the current nesting.
    #[error("cannot roll back to depth {target} from depth {current}")]
    InvalidDepth { target: usize, current: usize },
    /// A previous action fault left history untrustworthy.
    #[error("history is suspect after an action fault; commit before traversing")]
    Suspect,
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Host programming error.
    Usage,
    /// Reentrant call; must not be retried on the same call stack.
    Busy,
    /// History must be committed before further traversal.
    Suspect,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Busy => ErrorClass::Busy,
            Self::Suspect => ErrorClass::Suspect,
            _ => ErrorClass::Usage,
        }
    }
}

/// Outcome of an undo, redo or rollback that ran actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoResult {
    /// All actions ran; incremental notifications are reliable.
    Success,
    /// All actions ran with notifications suppressed; the host must redraw
    /// from scratch.
    Refresh,
    /// An action declined. The task was dropped; the manager is usable.
    Failed,
    /// An action faulted. The task was dropped and the manager is suspect.
    Error,
}

impl UndoResult {
    /// `Success` or `Refresh`.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Refresh)
    }

    /// Whether the host must redraw from scratch.
    #[must_use]
    pub fn needs_refresh(self) -> bool {
        self == Self::Refresh
    }
}
