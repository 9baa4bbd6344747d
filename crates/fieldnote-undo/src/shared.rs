#![forbid(unsafe_code)]

//! Shared handle for actions that need to reach their manager.
//!
//! An action that wants to inspect history (or, by mistake, traverse it)
//! from inside its own `undo` can hold a [`WeakActionManager`]. While a
//! traversal runs, the manager is mutably borrowed, so every entry point
//! here reports [`Error::Busy`] instead of panicking on the `RefCell`.
//!
//! Recording, traversal and mark operations are forwarded directly; queries
//! beyond `can_undo`/`can_redo` go through [`SharedActionManager::with`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::action::Action;
use crate::error::{Error, UndoResult};
use crate::manager::ActionManager;
use crate::mark::Mark;

/// Reference-counted, single-threaded handle to an [`ActionManager`].
#[derive(Debug, Clone, Default)]
pub struct SharedActionManager {
    inner: Rc<RefCell<ActionManager>>,
}

/// Non-owning counterpart of [`SharedActionManager`].
#[derive(Debug, Clone, Default)]
pub struct WeakActionManager {
    inner: Weak<RefCell<ActionManager>>,
}

impl WeakActionManager {
    /// Upgrade to a shared handle if the manager is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<SharedActionManager> {
        self.inner
            .upgrade()
            .map(|inner| SharedActionManager { inner })
    }
}

impl SharedActionManager {
    /// Wrap a manager.
    #[must_use]
    pub fn new(manager: ActionManager) -> Self {
        Self {
            inner: Rc::new(RefCell::new(manager)),
        }
    }

    /// Non-owning handle, suitable for storing inside actions.
    #[must_use]
    pub fn downgrade(&self) -> WeakActionManager {
        WeakActionManager {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Run `f` with exclusive access.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut ActionManager) -> R) -> Result<R, Error> {
        let mut manager = self.inner.try_borrow_mut().map_err(|_| Error::Busy)?;
        Ok(f(&mut manager))
    }

    /// Run `f` with shared access.
    pub fn with<R>(&self, f: impl FnOnce(&ActionManager) -> R) -> Result<R, Error> {
        let manager = self.inner.try_borrow().map_err(|_| Error::Busy)?;
        Ok(f(&manager))
    }

    /// See [`ActionManager::begin_task`].
    pub fn begin_task(
        &self,
        undo_label: impl Into<String>,
        redo_label: impl Into<String>,
    ) -> Result<(), Error> {
        self.with_mut(|m| m.begin_task(undo_label, redo_label))?
    }

    /// See [`ActionManager::end_task`].
    pub fn end_task(&self) -> Result<(), Error> {
        self.with_mut(ActionManager::end_task)?
    }

    /// See [`ActionManager::end_outer_task`].
    pub fn end_outer_task(&self) -> Result<(), Error> {
        self.with_mut(ActionManager::end_outer_task)?
    }

    /// See [`ActionManager::continue_task`].
    pub fn continue_task(&self) -> Result<bool, Error> {
        self.with_mut(ActionManager::continue_task)
    }

    /// See [`ActionManager::break_task`].
    pub fn break_task(
        &self,
        undo_label: impl Into<String>,
        redo_label: impl Into<String>,
    ) -> Result<(), Error> {
        self.with_mut(|m| m.break_task(undo_label, redo_label))?
    }

    /// See [`ActionManager::begin_non_undoable_section`].
    pub fn begin_non_undoable_section(&self) -> Result<(), Error> {
        self.with_mut(ActionManager::begin_non_undoable_section)?
    }

    /// See [`ActionManager::end_non_undoable_section`].
    pub fn end_non_undoable_section(&self) -> Result<(), Error> {
        self.with_mut(ActionManager::end_non_undoable_section)?
    }

    /// See [`ActionManager::add_action`].
    pub fn add_action(&self, action: Box<dyn Action>) -> Result<(), Error> {
        self.with_mut(|m| m.add_action(action))?
    }

    /// See [`ActionManager::start_sequence`].
    pub fn start_sequence(
        &self,
        undo_label: impl Into<String>,
        redo_label: impl Into<String>,
        action: Box<dyn Action>,
    ) -> Result<(), Error> {
        self.with_mut(|m| m.start_sequence(undo_label, redo_label, action))?
    }

    /// See [`ActionManager::undo`].
    pub fn undo(&self) -> Result<UndoResult, Error> {
        self.with_mut(ActionManager::undo)?
    }

    /// See [`ActionManager::redo`].
    pub fn redo(&self) -> Result<UndoResult, Error> {
        self.with_mut(ActionManager::redo)?
    }

    /// See [`ActionManager::rollback`].
    pub fn rollback(&self, target_depth: usize) -> Result<UndoResult, Error> {
        self.with_mut(|m| m.rollback(target_depth))?
    }

    /// See [`ActionManager::commit`].
    pub fn commit(&self) -> Result<(), Error> {
        self.with_mut(ActionManager::commit)?
    }

    /// See [`ActionManager::mark`].
    pub fn mark(&self) -> Result<Mark, Error> {
        self.with_mut(ActionManager::mark)
    }

    /// See [`ActionManager::check_mark`].
    pub fn check_mark(&self, mark: &Mark) -> Result<(), Error> {
        self.with(|m| m.check_mark(mark))?
    }

    /// See [`ActionManager::collapse_to_mark`].
    pub fn collapse_to_mark(
        &self,
        mark: &Mark,
        undo_label: impl Into<String>,
        redo_label: impl Into<String>,
    ) -> Result<bool, Error> {
        self.with_mut(|m| m.collapse_to_mark(mark, undo_label, redo_label))
    }

    /// See [`ActionManager::discard_to_mark`].
    pub fn discard_to_mark(&self, mark: &Mark) -> Result<bool, Error> {
        self.with_mut(|m| m.discard_to_mark(mark))
    }

    /// See [`ActionManager::tasks_since_mark`].
    pub fn tasks_since_mark(&self, mark: &Mark, on_redo_side: bool) -> Result<bool, Error> {
        self.with(|m| m.tasks_since_mark(mark, on_redo_side))
    }

    /// See [`ActionManager::can_undo`].
    pub fn can_undo(&self) -> Result<bool, Error> {
        self.with(ActionManager::can_undo)
    }

    /// See [`ActionManager::can_redo`].
    pub fn can_redo(&self) -> Result<bool, Error> {
        self.with(ActionManager::can_redo)
    }

    /// Commit and release the manager if this is the last strong handle.
    ///
    /// Returns the handle back when other strong handles are still alive.
    pub fn close(self) -> Result<(), Self> {
        match Rc::try_unwrap(self.inner) {
            Ok(cell) => {
                cell.into_inner().close();
                Ok(())
            }
            Err(inner) => Err(Self { inner }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionResult, FnAction};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Action whose undo tries to reenter the manager.
    struct Reentrant {
        manager: WeakActionManager,
        seen: Rc<RefCell<Vec<Result<UndoResult, Error>>>>,
    }

    impl Action for Reentrant {
        fn undo(&mut self) -> ActionResult {
            if let Some(shared) = self.manager.upgrade() {
                self.seen.borrow_mut().push(shared.undo());
                self.seen.borrow_mut().push(shared.can_undo().map(|_| UndoResult::Success));
            }
            Ok(())
        }

        fn redo(&mut self) -> ActionResult {
            Ok(())
        }
    }

    #[test]
    fn test_reentrant_undo_is_busy() {
        let shared = SharedActionManager::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        shared.begin_task("A", "A").unwrap();
        shared
            .add_action(Box::new(Reentrant {
                manager: shared.downgrade(),
                seen: seen.clone(),
            }))
            .unwrap();
        shared.end_task().unwrap();

        let result = shared.undo().unwrap();
        assert!(result.is_success());
        assert_eq!(*seen.borrow(), vec![Err(Error::Busy), Err(Error::Busy)]);
        assert!(shared.can_redo().unwrap());
    }

    #[test]
    fn test_shared_roundtrip() {
        let shared = SharedActionManager::new(ActionManager::default());
        shared.begin_task("A", "A").unwrap();
        shared
            .add_action(Box::new(
                FnAction::new("x").with_undo(|| Ok(())).with_redo(|| Ok(())),
            ))
            .unwrap();
        shared.end_task().unwrap();

        assert!(shared.can_undo().unwrap());
        assert!(shared.undo().unwrap().is_success());
        assert!(shared.redo().unwrap().is_success());
        assert_eq!(shared.with(ActionManager::undoable_task_count), Ok(1));
    }

    #[test]
    fn test_forwarded_recording_and_marks() {
        let shared = SharedActionManager::default();
        let noop = || Box::new(FnAction::new("x").with_undo(|| Ok(())).with_redo(|| Ok(())));

        let m = shared.mark().unwrap();
        shared.start_sequence("A", "A", noop()).unwrap();
        shared.begin_task("B", "B").unwrap();
        shared.add_action(noop()).unwrap();
        shared.end_outer_task().unwrap();
        assert!(shared.continue_task().unwrap());
        shared.break_task("C", "C").unwrap();
        shared.add_action(noop()).unwrap();
        shared.end_task().unwrap();

        shared.begin_non_undoable_section().unwrap();
        shared.add_action(noop()).unwrap();
        shared.end_non_undoable_section().unwrap();

        assert_eq!(shared.with(ActionManager::undoable_task_count), Ok(2));
        assert!(shared.check_mark(&m).is_ok());
        assert_eq!(shared.tasks_since_mark(&m, false), Ok(true));
        assert_eq!(shared.collapse_to_mark(&m, "AC", "AC"), Ok(true));
        assert_eq!(shared.with(ActionManager::undoable_task_count), Ok(1));

        let m = shared.mark().unwrap();
        shared.start_sequence("D", "D", noop()).unwrap();
        shared.end_task().unwrap();
        assert_eq!(shared.discard_to_mark(&m), Ok(true));
        assert_eq!(shared.with(ActionManager::undoable_action_count), Ok(3));
    }

    #[test]
    fn test_close_requires_last_handle() {
        let shared = SharedActionManager::default();
        let other = shared.clone();
        let shared = shared.close().unwrap_err();
        drop(other);
        assert!(shared.close().is_ok());
    }

    #[test]
    fn test_weak_handle_dies_with_manager() {
        let shared = SharedActionManager::default();
        let weak = shared.downgrade();
        assert!(weak.upgrade().is_some());
        drop(shared);
        assert!(weak.upgrade().is_none());
    }
}
