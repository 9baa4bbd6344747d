#![forbid(unsafe_code)]

//! Completed tasks and in-progress frames.
//!
//! A [`Frame`] exists while a `begin_task … end_task` pair is open. Ending
//! a nested frame folds its actions into its parent; ending the outermost
//! frame turns it into a [`Task`], the unit that lands on the history.
//!
//! ```text
//! begin("A")  add(a1)  begin("B")  add(a2)  end()          end()
//! ┌─────────┐          ┌─────────┐          ┌──────────┐   ┌───────────────┐
//! │ A: [a1] │          │ B: [a2] │          │ A: [a1,  │   │ Task A        │
//! └─────────┘          ├─────────┤          │     a2]  │   │ [a1, a2]      │
//!                      │ A: [a1] │          └──────────┘   └───────────────┘
//!                      └─────────┘                          → undo history
//! ```

use std::fmt;

use crate::action::Action;

/// Identifier of a completed task, unique within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

/// A named, ordered group of actions undone and redone as one step.
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) undo_label: String,
    pub(crate) redo_label: String,
    /// Actions in recording order.
    pub(crate) actions: Vec<Box<dyn Action>>,
    /// Computed when the task is undone.
    pub(crate) redoable: bool,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("undo_label", &self.undo_label)
            .field("redo_label", &self.redo_label)
            .field("actions", &self.actions.len())
            .field("redoable", &self.redoable)
            .finish()
    }
}

impl Task {
    pub(crate) fn new(
        id: TaskId,
        undo_label: String,
        redo_label: String,
        actions: Vec<Box<dyn Action>>,
    ) -> Self {
        Self {
            id,
            undo_label,
            redo_label,
            actions,
            redoable: true,
        }
    }

    /// Task identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Label shown for undoing this task.
    #[must_use]
    pub fn undo_label(&self) -> &str {
        &self.undo_label
    }

    /// Label shown for redoing this task.
    #[must_use]
    pub fn redo_label(&self) -> &str {
        &self.redo_label
    }

    /// Number of actions in the task.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the task holds no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Whether every action can be redone.
    #[must_use]
    pub fn is_redoable(&self) -> bool {
        self.redoable
    }

    pub(crate) fn all_redoable(&self) -> bool {
        self.actions.iter().all(|a| a.is_redoable())
    }

    pub(crate) fn data_change_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_data_change()).count()
    }

    /// Invoke `commit` on every action, oldest first.
    pub(crate) fn commit(&mut self) {
        for action in &mut self.actions {
            action.commit();
        }
    }
}

/// An open `begin_task` level.
pub(crate) struct Frame {
    /// 1-based nesting depth.
    pub(crate) depth: usize,
    pub(crate) undo_label: String,
    pub(crate) redo_label: String,
    pub(crate) actions: Vec<Box<dyn Action>>,
    /// Actions inherited from the continued task; rollback leaves them alone.
    pub(crate) inherited: usize,
    /// Id of the continued task.
    pub(crate) continued: Option<TaskId>,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("depth", &self.depth)
            .field("undo_label", &self.undo_label)
            .field("redo_label", &self.redo_label)
            .field("actions", &self.actions.len())
            .field("started_fresh", &self.started_fresh())
            .field("inherited", &self.inherited)
            .finish()
    }
}

impl Frame {
    pub(crate) fn fresh(depth: usize, undo_label: String, redo_label: String) -> Self {
        Self {
            depth,
            undo_label,
            redo_label,
            actions: Vec::new(),
            inherited: 0,
            continued: None,
        }
    }

    pub(crate) fn continuing(task: Task) -> Self {
        Self {
            depth: 1,
            inherited: task.actions.len(),
            undo_label: task.undo_label,
            redo_label: task.redo_label,
            actions: task.actions,
            continued: Some(task.id),
        }
    }

    /// False when reopened by `continue_task`.
    pub(crate) fn started_fresh(&self) -> bool {
        self.continued.is_none()
    }

    /// Split a continued frame back into its original task and the actions
    /// added since it was reopened.
    pub(crate) fn split_continued(mut self) -> (Option<Task>, Vec<Box<dyn Action>>) {
        let added = self.actions.split_off(self.inherited);
        let original = self
            .continued
            .map(|id| Task::new(id, self.undo_label, self.redo_label, self.actions));
        (original, added)
    }
}
