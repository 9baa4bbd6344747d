#![forbid(unsafe_code)]

//! Reversible edit steps supplied by the host.
//!
//! This module provides the [`Action`] trait the manager drives during
//! undo, redo and commit, plus [`FnAction`], a closure-backed action for
//! hosts that do not want a dedicated type per edit.
//!
//! # Contract
//!
//! - An action is recorded *after* its effect has been applied; the manager
//!   never "executes" it, only reverses and re-applies it.
//! - `undo()` followed by `redo()` restores the post-edit state exactly.
//! - `commit()` is called once the action can never be undone again
//!   (history committed, closed, evicted, or recorded in a non-undoable
//!   section).
//! - Implementations must not call back into the owning manager's
//!   traversal operations; such calls are rejected with
//!   [`Error::Busy`](crate::Error::Busy).
//!
//! # Failure Modes
//!
//! - **Declined**: preconditions no longer hold (target record deleted,
//!   field drifted). Return [`ActionError::Failed`]; the manager drops the
//!   containing task and stays usable.
//! - **Fault**: something broke mid-reversal. Return [`ActionError::Fault`];
//!   the manager marks itself suspect until the history is committed.

use std::fmt;

/// Result of undoing or redoing a single action.
pub type ActionResult = Result<(), ActionError>;

/// Errors an action reports from `undo` or `redo`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The action declined; its preconditions no longer hold.
    #[error("action declined: {0}")]
    Failed(String),
    /// The action failed unexpectedly part way through.
    #[error("action fault: {0}")]
    Fault(String),
}

impl ActionError {
    /// Create a handled failure.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Create an unexpected fault.
    #[must_use]
    pub fn fault(reason: impl Into<String>) -> Self {
        Self::Fault(reason.into())
    }

    /// Whether this error leaves the manager state suspect.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}

/// A reversible edit step.
///
/// Ownership moves to the manager when the action is added to an open task.
pub trait Action {
    /// Revert the action's effect.
    fn undo(&mut self) -> ActionResult;

    /// Re-apply the action's effect after an undo.
    fn redo(&mut self) -> ActionResult;

    /// Finalize the action; it will never be undone again.
    fn commit(&mut self) {}

    /// Whether the action changes persisted data (as opposed to view state
    /// such as a selection).
    fn is_data_change(&self) -> bool {
        true
    }

    /// Whether the action can be redone after it has been undone.
    fn is_redoable(&self) -> bool {
        true
    }

    /// Ask the action to skip its own change notifications.
    ///
    /// Set for the duration of a traversal that returns
    /// [`UndoResult::Refresh`](crate::UndoResult::Refresh); the host redraws
    /// everything afterwards.
    fn set_suppress_notification(&mut self, _suppress: bool) {}

    /// Short name for logs and `Debug` output.
    fn debug_name(&self) -> &str {
        "Action"
    }
}

impl fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.debug_name())
            .field("data_change", &self.is_data_change())
            .field("redoable", &self.is_redoable())
            .finish()
    }
}

// ============================================================================
// Closure-backed action
// ============================================================================

/// Callback type for undo/redo steps.
pub type StepFn = Box<dyn FnMut() -> ActionResult>;
/// Callback type for commit.
pub type CommitFn = Box<dyn FnMut()>;

/// An action assembled from closures.
///
/// ```
/// use fieldnote_undo::{Action, FnAction};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let gloss = Rc::new(RefCell::new(String::from("dog")));
/// let (u, r) = (gloss.clone(), gloss.clone());
/// let mut action = FnAction::new("set gloss")
///     .with_undo(move || {
///         *u.borrow_mut() = "cat".into();
///         Ok(())
///     })
///     .with_redo(move || {
///         *r.borrow_mut() = "dog".into();
///         Ok(())
///     });
///
/// action.undo().unwrap();
/// assert_eq!(*gloss.borrow(), "cat");
/// ```
pub struct FnAction {
    name: String,
    undo: Option<StepFn>,
    redo: Option<StepFn>,
    commit: Option<CommitFn>,
    data_change: bool,
    redoable: bool,
    suppressed: bool,
}

impl fmt::Debug for FnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("name", &self.name)
            .field("has_undo", &self.undo.is_some())
            .field("has_redo", &self.redo.is_some())
            .field("has_commit", &self.commit.is_some())
            .field("data_change", &self.data_change)
            .field("redoable", &self.redoable)
            .field("suppressed", &self.suppressed)
            .finish()
    }
}

impl FnAction {
    /// Create an action with no callbacks set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            undo: None,
            redo: None,
            commit: None,
            data_change: true,
            redoable: true,
            suppressed: false,
        }
    }

    /// Set the undo callback.
    #[must_use]
    pub fn with_undo<F>(mut self, f: F) -> Self
    where
        F: FnMut() -> ActionResult + 'static,
    {
        self.undo = Some(Box::new(f));
        self
    }

    /// Set the redo callback.
    #[must_use]
    pub fn with_redo<F>(mut self, f: F) -> Self
    where
        F: FnMut() -> ActionResult + 'static,
    {
        self.redo = Some(Box::new(f));
        self
    }

    /// Set the commit callback.
    #[must_use]
    pub fn with_commit<F>(mut self, f: F) -> Self
    where
        F: FnMut() + 'static,
    {
        self.commit = Some(Box::new(f));
        self
    }

    /// Mark whether the action changes persisted data.
    #[must_use]
    pub fn data_change(mut self, data_change: bool) -> Self {
        self.data_change = data_change;
        self
    }

    /// Mark whether the action can be redone.
    #[must_use]
    pub fn redoable(mut self, redoable: bool) -> Self {
        self.redoable = redoable;
        self
    }

    /// Name given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether notifications are currently suppressed.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }
}

impl Action for FnAction {
    fn undo(&mut self) -> ActionResult {
        match self.undo.as_mut() {
            Some(f) => f(),
            None => Err(ActionError::fault("no undo callback set")),
        }
    }

    fn redo(&mut self) -> ActionResult {
        match self.redo.as_mut() {
            Some(f) => f(),
            None => Err(ActionError::fault("no redo callback set")),
        }
    }

    fn commit(&mut self) {
        if let Some(f) = self.commit.as_mut() {
            f();
        }
    }

    fn is_data_change(&self) -> bool {
        self.data_change
    }

    fn is_redoable(&self) -> bool {
        self.redoable
    }

    fn set_suppress_notification(&mut self, suppress: bool) {
        self.suppressed = suppress;
    }

    fn debug_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Tests
// ============================================================================
