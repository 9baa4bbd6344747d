#![forbid(unsafe_code)]

//! The action manager: nested tasks, undo/redo history, and marks.
//!
//! [`ActionManager`] owns a stack of open frames, the completed-task undo
//! history, the redo history, and a registry of marks:
//!
//! - **Nesting**: `begin_task`/`end_task` pairs nest; only the outermost
//!   pair produces a history entry
//! - **Traversal**: `undo` and `redo` move whole tasks between the stacks
//! - **Rollback**: open frames can be reverted without touching redo
//! - **Regrouping**: tasks recorded after a mark can be collapsed into one
//!   entry or discarded
//!
//! # Invariants
//!
//! 1. Completing a task through recording clears the redo stack
//! 2. Every registered mark sits at or below the undo stack length, counting
//!    a task reopened by `continue_task`
//! 3. `undo_stack.len() <= config.max_tasks` after every operation
//! 4. Mode is `UndoInProgress`/`RedoInProgress` only while actions run, and
//!    the previous mode is restored on every exit path
//!
//! # Lifecycle
//!
//! ```text
//! begin_task("Undo Gloss", "Redo Gloss")
//! add_action(a1); add_action(a2)
//! end_task()
//! ┌─────────────────────────────────────────────────┐
//! │ Undo Stack: [.., Gloss{a1,a2}]                  │
//! │ Redo Stack: []                                   │
//! └─────────────────────────────────────────────────┘
//!
//! undo()           a2.undo(), a1.undo()
//! ┌─────────────────────────────────────────────────┐
//! │ Undo Stack: [..]                                │
//! │ Redo Stack: [Gloss{a1,a2}]                       │
//! └─────────────────────────────────────────────────┘
//!
//! redo()           a1.redo(), a2.redo()
//! ┌─────────────────────────────────────────────────┐
//! │ Undo Stack: [.., Gloss{a1,a2}]                  │
//! │ Redo Stack: []                                   │
//! └─────────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, debug_span, error, trace, warn};

use crate::action::{Action, ActionError};
use crate::config::ManagerConfig;
use crate::error::{Error, UndoResult};
use crate::mark::{Mark, MarkHandle, MarkRegistry};
use crate::task::{Frame, Task, TaskId};

/// Recording mode of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Actions land in the open task.
    #[default]
    Recording,
    /// Actions are committed immediately and never retained.
    NonUndoableRecording,
    /// An undo or rollback is running.
    UndoInProgress,
    /// A redo is running.
    RedoInProgress,
}

impl Mode {
    /// Whether actions are currently being undone or redone.
    #[must_use]
    pub fn is_traversing(self) -> bool {
        matches!(self, Self::UndoInProgress | Self::RedoInProgress)
    }
}

/// Switches the mode for a scope and restores the previous one on drop,
/// including during unwinding.
struct ModeScope<'a> {
    slot: &'a mut Mode,
    previous: Mode,
}

impl<'a> ModeScope<'a> {
    fn enter(slot: &'a mut Mode, mode: Mode) -> Self {
        let previous = std::mem::replace(slot, mode);
        Self { slot, previous }
    }
}

impl Drop for ModeScope<'_> {
    fn drop(&mut self) {
        *self.slot = self.previous;
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

/// Undo (newest first) or redo (oldest first) `actions`, stopping at the
/// first error.
fn run_actions(
    actions: &mut [Box<dyn Action>],
    direction: Direction,
    suppress: bool,
) -> Result<(), ActionError> {
    if suppress {
        for action in actions.iter_mut() {
            action.set_suppress_notification(true);
        }
    }

    let result = match direction {
        Direction::Undo => actions.iter_mut().rev().try_for_each(|a| a.undo()),
        Direction::Redo => actions.iter_mut().try_for_each(|a| a.redo()),
    };

    if suppress {
        for action in actions.iter_mut() {
            action.set_suppress_notification(false);
        }
    }
    result
}

fn success(refresh: bool) -> UndoResult {
    if refresh {
        UndoResult::Refresh
    } else {
        UndoResult::Success
    }
}

/// Manager for nested undo tasks.
///
/// Not thread-safe and not reentrant; see
/// [`SharedActionManager`](crate::SharedActionManager) for actions that need
/// a handle back to their manager.
pub struct ActionManager {
    config: ManagerConfig,
    /// Open frames, innermost at the back.
    frames: Vec<Frame>,
    /// Completed tasks (newest at back).
    undo_stack: VecDeque<Task>,
    /// Undone tasks (most recently undone at back).
    redo_stack: Vec<Task>,
    marks: MarkRegistry,
    mode: Mode,
    non_undoable_depth: usize,
    /// Set when an action faulted; cleared by `commit`.
    suspect: bool,
    next_task_id: u64,
    /// Task eligible for `continue_task`.
    last_recorded: Option<TaskId>,
}

impl fmt::Debug for ActionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionManager")
            .field("mode", &self.mode)
            .field("depth", &self.frames.len())
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("marks", &self.marks.len())
            .field("suspect", &self.suspect)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for ActionManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl ActionManager {
    /// Create a manager with the given configuration.
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            frames: Vec::new(),
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            marks: MarkRegistry::new(),
            mode: Mode::Recording,
            non_undoable_depth: 0,
            suspect: false,
            next_task_id: 0,
            last_recorded: None,
        }
    }

    // ========================================================================
    // Task Lifecycle
    // ========================================================================

    /// Open a (possibly nested) task.
    ///
    /// Labels of nested tasks are ignored once the outermost task completes.
    pub fn begin_task(
        &mut self,
        undo_label: impl Into<String>,
        redo_label: impl Into<String>,
    ) -> Result<(), Error> {
        self.check_recording()?;

        if self.frames.is_empty() && self.config.create_mark_if_needed && self.marks.is_empty() {
            let mark = self.marks.register(self.undo_stack.len());
            debug!(handle = %mark.handle(), "created mark for new task");
        }

        let depth = self.frames.len() + 1;
        let frame = Frame::fresh(depth, undo_label.into(), redo_label.into());
        debug!(depth, label = %frame.undo_label, "begin task");
        self.frames.push(frame);
        Ok(())
    }

    /// Close the innermost task.
    ///
    /// Closing the outermost task pushes it onto the undo stack and clears
    /// the redo stack.
    pub fn end_task(&mut self) -> Result<(), Error> {
        self.check_recording()?;
        let frame = self.frames.pop().ok_or(Error::NoOpenTask)?;

        match self.frames.last_mut() {
            Some(parent) => {
                debug!(depth = frame.depth, actions = frame.actions.len(), "end nested task");
                parent.actions.extend(frame.actions);
            }
            None => self.complete(frame),
        }
        Ok(())
    }

    /// Close every open task at once.
    pub fn end_outer_task(&mut self) -> Result<(), Error> {
        self.check_recording()?;
        if self.frames.is_empty() {
            return Err(Error::NoOpenTask);
        }

        let mut frames = std::mem::take(&mut self.frames).into_iter();
        if let Some(mut outer) = frames.next() {
            for inner in frames {
                outer.actions.extend(inner.actions);
            }
            self.complete(outer);
        }
        Ok(())
    }

    /// Reopen the task recorded last so further actions extend it.
    ///
    /// Returns `false` without effect when a task is open, a non-undoable
    /// section is active, or anything happened to history since that task
    /// completed (undo, redo, collapse, discard, commit, another task).
    pub fn continue_task(&mut self) -> bool {
        if self.mode != Mode::Recording || !self.frames.is_empty() {
            return false;
        }
        let Some(id) = self.last_recorded else {
            return false;
        };
        if self.undo_stack.back().map(Task::id) != Some(id) {
            return false;
        }
        let Some(task) = self.undo_stack.pop_back() else {
            return false;
        };

        debug!(label = %task.undo_label, actions = task.len(), "continue task");
        self.frames.push(Frame::continuing(task));
        true
    }

    /// Complete whatever is open and start a new task at the same nesting
    /// depth, so outstanding `end_task` calls still balance.
    pub fn break_task(
        &mut self,
        undo_label: impl Into<String>,
        redo_label: impl Into<String>,
    ) -> Result<(), Error> {
        self.check_recording()?;
        let undo_label = undo_label.into();
        let redo_label = redo_label.into();
        let depth = self.frames.len();

        if depth > 0 {
            self.end_outer_task()?;
        }
        self.begin_task(undo_label.clone(), redo_label.clone())?;
        for level in 2..=depth {
            self.frames
                .push(Frame::fresh(level, undo_label.clone(), redo_label.clone()));
        }
        debug!(depth = self.frames.len(), label = %undo_label, "break task");
        Ok(())
    }

    /// Enter a section whose actions are applied but never undoable.
    ///
    /// Sections nest.
    pub fn begin_non_undoable_section(&mut self) -> Result<(), Error> {
        self.check_recording()?;
        self.non_undoable_depth += 1;
        self.mode = Mode::NonUndoableRecording;
        debug!(nesting = self.non_undoable_depth, "begin non-undoable section");
        Ok(())
    }

    /// Leave the innermost non-undoable section.
    pub fn end_non_undoable_section(&mut self) -> Result<(), Error> {
        self.check_recording()?;
        if self.non_undoable_depth == 0 {
            return Err(Error::NotInNonUndoableSection);
        }
        self.non_undoable_depth -= 1;
        if self.non_undoable_depth == 0 {
            self.mode = Mode::Recording;
        }
        debug!(nesting = self.non_undoable_depth, "end non-undoable section");
        Ok(())
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Record an already-applied action in the innermost open task.
    ///
    /// Inside a non-undoable section the action is committed and dropped.
    pub fn add_action(&mut self, action: Box<dyn Action>) -> Result<(), Error> {
        self.check_recording()?;

        if self.mode == Mode::NonUndoableRecording {
            let mut action = action;
            action.commit();
            trace!(action = action.debug_name(), "committed non-undoable action");
            return Ok(());
        }

        let frame = self.frames.last_mut().ok_or(Error::NoOpenTask)?;
        trace!(action = action.debug_name(), depth = frame.depth, "add action");
        frame.actions.push(action);
        Ok(())
    }

    /// `begin_task` followed by `add_action`.
    pub fn start_sequence(
        &mut self,
        undo_label: impl Into<String>,
        redo_label: impl Into<String>,
        action: Box<dyn Action>,
    ) -> Result<(), Error> {
        self.begin_task(undo_label, redo_label)?;
        self.add_action(action)
    }

    /// Run `f` inside a task.
    ///
    /// On `Ok` every task `f` opened is closed along with this one; on `Err`
    /// everything recorded since the call is rolled back and the closure's
    /// error is returned.
    pub fn run_task<T, E, F>(
        &mut self,
        undo_label: impl Into<String>,
        redo_label: impl Into<String>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<Error>,
    {
        let base = self.frames.len();
        self.begin_task(undo_label, redo_label)?;

        match f(self) {
            Ok(value) => {
                while self.frames.len() > base {
                    self.end_task()?;
                }
                Ok(value)
            }
            Err(err) => {
                match self.rollback(base) {
                    Ok(result) if result.is_success() => {}
                    outcome => {
                        warn!(?outcome, "rollback of failed task did not complete cleanly");
                        self.abandon_frames(base);
                    }
                }
                Err(err)
            }
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Undo the newest task.
    ///
    /// # Errors
    ///
    /// [`Error::NothingToUndo`], [`Error::Busy`], [`Error::Suspect`], or
    /// [`Error::TaskInProgress`] when a task is still open.
    pub fn undo(&mut self) -> Result<UndoResult, Error> {
        self.check_traversal()?;
        let mut task = self.undo_stack.pop_back().ok_or(Error::NothingToUndo)?;
        self.last_recorded = None;

        let _span = debug_span!("undo", label = %task.undo_label, actions = task.len()).entered();
        let refresh = task.data_change_count() > self.config.refresh_threshold;
        let outcome = {
            let _mode = ModeScope::enter(&mut self.mode, Mode::UndoInProgress);
            run_actions(&mut task.actions, Direction::Undo, refresh)
        };

        let result = match outcome {
            Ok(()) => {
                task.redoable = task.all_redoable();
                self.redo_stack.push(task);
                success(refresh)
            }
            Err(err) => self.drop_failed(task, &err),
        };
        self.marks.prune_above(self.undo_stack.len());

        debug!(
            ?result,
            undo_len = self.undo_stack.len(),
            redo_len = self.redo_stack.len(),
            "undo finished"
        );
        Ok(result)
    }

    /// Redo the most recently undone task.
    ///
    /// A non-redoable task yields `Ok(UndoResult::Failed)` and stays put.
    pub fn redo(&mut self) -> Result<UndoResult, Error> {
        self.check_traversal()?;
        let top = self.redo_stack.last().ok_or(Error::NothingToRedo)?;
        if !top.redoable {
            warn!(label = %top.redo_label, "refusing to redo non-redoable task");
            return Ok(UndoResult::Failed);
        }
        let Some(mut task) = self.redo_stack.pop() else {
            return Err(Error::NothingToRedo);
        };
        self.last_recorded = None;

        let _span = debug_span!("redo", label = %task.redo_label, actions = task.len()).entered();
        let refresh = task.data_change_count() > self.config.refresh_threshold;
        let outcome = {
            let _mode = ModeScope::enter(&mut self.mode, Mode::RedoInProgress);
            run_actions(&mut task.actions, Direction::Redo, refresh)
        };

        let result = match outcome {
            Ok(()) => {
                self.push_undo(task);
                success(refresh)
            }
            Err(err) => self.drop_failed(task, &err),
        };

        debug!(
            ?result,
            undo_len = self.undo_stack.len(),
            redo_len = self.redo_stack.len(),
            "redo finished"
        );
        Ok(result)
    }

    /// Revert open tasks until `current_depth() == target_depth`.
    ///
    /// Each popped frame's own actions are undone newest first and
    /// discarded; nothing reaches the redo stack. A frame reopened by
    /// [`continue_task`](Self::continue_task) only reverts what was added
    /// after reopening and its original task goes back on the undo stack.
    /// If a step fails the remaining frames above `target_depth` are
    /// abandoned without further undo; a reopened task among them still
    /// returns to the undo stack.
    pub fn rollback(&mut self, target_depth: usize) -> Result<UndoResult, Error> {
        self.check_not_busy()?;
        if self.suspect {
            return Err(Error::Suspect);
        }
        let current = self.frames.len();
        if target_depth > current {
            return Err(Error::InvalidDepth {
                target: target_depth,
                current,
            });
        }

        let _span = debug_span!("rollback", from = current, to = target_depth).entered();
        let threshold = self.config.refresh_threshold;
        let mut refresh = false;
        let mut failure = None;
        {
            let _mode = ModeScope::enter(&mut self.mode, Mode::UndoInProgress);
            while self.frames.len() > target_depth {
                let Some(frame) = self.frames.pop() else {
                    break;
                };
                let (original, mut added) = frame.split_continued();
                let frame_refresh =
                    added.iter().filter(|a| a.is_data_change()).count() > threshold;
                refresh |= frame_refresh;

                let outcome = run_actions(&mut added, Direction::Undo, frame_refresh);
                if let Some(task) = original {
                    self.undo_stack.push_back(task);
                }
                if let Err(err) = outcome {
                    failure = Some(err);
                    break;
                }
            }
        }

        let result = match failure {
            None => success(refresh),
            Some(err) => {
                let abandoned = self.abandon_frames(target_depth);
                warn!(abandoned, "rollback stopped early");
                self.note_failure(&err)
            }
        };
        debug!(?result, depth = self.frames.len(), "rollback finished");
        Ok(result)
    }

    /// Finalize all history: close open tasks, commit every action oldest
    /// first, and clear both stacks and all marks.
    pub fn commit(&mut self) -> Result<(), Error> {
        self.check_not_busy()?;
        if !self.frames.is_empty() {
            self.end_outer_task()?;
        }

        let mut committed = 0usize;
        for task in self.undo_stack.iter_mut() {
            task.commit();
            committed += task.len();
        }
        // Most recently undone is the oldest of the undone tasks.
        for task in self.redo_stack.iter_mut().rev() {
            task.commit();
            committed += task.len();
        }

        self.undo_stack.clear();
        self.redo_stack.clear();
        self.marks.clear();
        self.suspect = false;
        self.last_recorded = None;
        debug!(committed, "committed history");
        Ok(())
    }

    /// Commit everything and release the manager.
    pub fn close(mut self) {
        if let Err(err) = self.commit() {
            warn!(%err, "close could not commit history");
        }
        debug!("action manager closed");
    }

    // ========================================================================
    // Marks
    // ========================================================================

    /// Register a mark at the current top of the undo stack.
    ///
    /// A task reopened by [`continue_task`](Self::continue_task) counts as
    /// below the mark.
    pub fn mark(&mut self) -> Mark {
        let mark = self.marks.register(self.history_len());
        debug!(handle = %mark.handle(), position = mark.undo_depth(), "mark");
        mark
    }

    /// Enable or disable automatic marks for fresh outer tasks.
    pub fn set_create_mark_if_needed(&mut self, create: bool) {
        self.config.create_mark_if_needed = create;
    }

    /// Check whether `mark` is still usable.
    pub fn check_mark(&self, mark: &Mark) -> Result<(), Error> {
        self.marks
            .resolve(mark, self.history_len())
            .map(|_| ())
            .ok_or(Error::StaleMark(mark.handle()))
    }

    /// Merge every task after `mark` into one task with new labels.
    ///
    /// Consumes the mark. Returns `false` without effect if the mark is
    /// stale, nothing was recorded after it, or a task is open.
    pub fn collapse_to_mark(
        &mut self,
        mark: &Mark,
        undo_label: impl Into<String>,
        redo_label: impl Into<String>,
    ) -> bool {
        if self.mode.is_traversing() || !self.frames.is_empty() {
            return false;
        }
        let Some(position) = self.marks.resolve(mark, self.undo_stack.len()) else {
            return false;
        };
        if position == self.undo_stack.len() {
            return false;
        }

        let merged_tasks = self.undo_stack.len() - position;
        let actions: Vec<Box<dyn Action>> = self
            .undo_stack
            .drain(position..)
            .flat_map(|task| task.actions)
            .collect();
        let id = self.alloc_task_id();
        let task = Task::new(id, undo_label.into(), redo_label.into(), actions);
        debug!(
            handle = %mark.handle(),
            merged_tasks,
            actions = task.len(),
            label = %task.undo_label,
            "collapse to mark"
        );
        self.undo_stack.push_back(task);
        self.marks.release(mark);
        self.last_recorded = None;
        true
    }

    /// Drop every task after `mark` without undoing it.
    ///
    /// The redo stack is untouched. Consumes the mark; returns `false` if it
    /// is stale or a task is open.
    pub fn discard_to_mark(&mut self, mark: &Mark) -> bool {
        if self.mode.is_traversing() || !self.frames.is_empty() {
            return false;
        }
        let Some(position) = self.marks.resolve(mark, self.undo_stack.len()) else {
            return false;
        };

        let discarded = self.undo_stack.len() - position;
        self.undo_stack.truncate(position);
        self.marks.release(mark);
        if discarded > 0 {
            self.last_recorded = None;
        }
        debug!(handle = %mark.handle(), discarded, "discard to mark");
        true
    }

    /// Whether any task lies after `mark` on the requested stack.
    #[must_use]
    pub fn tasks_since_mark(&self, mark: &Mark, on_redo_side: bool) -> bool {
        let history_len = self.history_len();
        let Some(position) = self.marks.resolve(mark, history_len) else {
            return false;
        };
        if on_redo_side {
            !self.redo_stack.is_empty()
        } else {
            history_len > position
        }
    }

    /// Handle of the most recently registered mark.
    #[must_use]
    pub fn top_mark_handle(&self) -> Option<MarkHandle> {
        self.marks.top().map(Mark::handle)
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Whether [`undo`](Self::undo) would run.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.ready_to_traverse() && !self.undo_stack.is_empty()
    }

    /// Whether [`redo`](Self::redo) would run.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.ready_to_traverse() && self.redo_stack.last().is_some_and(|t| t.redoable)
    }

    /// Undo label of the `n`-th task from the top.
    #[must_use]
    pub fn undo_label(&self, n: usize) -> Option<&str> {
        self.undo_stack.iter().rev().nth(n).map(Task::undo_label)
    }

    /// Redo label of the `n`-th task from the top.
    #[must_use]
    pub fn redo_label(&self, n: usize) -> Option<&str> {
        self.redo_stack.iter().rev().nth(n).map(Task::redo_label)
    }

    /// Undo labels, most recent first.
    pub fn undo_labels(&self, limit: usize) -> Vec<&str> {
        self.undo_stack
            .iter()
            .rev()
            .take(limit)
            .map(Task::undo_label)
            .collect()
    }

    /// Redo labels, most recent first.
    pub fn redo_labels(&self, limit: usize) -> Vec<&str> {
        self.redo_stack
            .iter()
            .rev()
            .take(limit)
            .map(Task::redo_label)
            .collect()
    }

    /// Number of open tasks.
    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.frames.len()
    }

    /// Actions across all undoable tasks.
    #[must_use]
    pub fn undoable_action_count(&self) -> usize {
        self.undo_stack.iter().map(Task::len).sum()
    }

    /// Tasks on the undo stack.
    #[must_use]
    pub fn undoable_task_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Tasks on the redo stack.
    #[must_use]
    pub fn redoable_task_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Whether an undo or redo is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.mode.is_traversing()
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether an action fault left history untrustworthy.
    #[must_use]
    pub fn is_suspect(&self) -> bool {
        self.suspect
    }

    /// Get the current configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Newest undoable task.
    #[must_use]
    pub fn top_task(&self) -> Option<&Task> {
        self.undo_stack.back()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn check_not_busy(&self) -> Result<(), Error> {
        if self.mode.is_traversing() {
            return Err(Error::Busy);
        }
        Ok(())
    }

    fn check_recording(&self) -> Result<(), Error> {
        self.check_not_busy()
    }

    fn check_traversal(&self) -> Result<(), Error> {
        self.check_not_busy()?;
        if self.suspect {
            return Err(Error::Suspect);
        }
        if !self.frames.is_empty() {
            return Err(Error::TaskInProgress {
                depth: self.frames.len(),
            });
        }
        Ok(())
    }

    fn ready_to_traverse(&self) -> bool {
        !self.mode.is_traversing() && !self.suspect && self.frames.is_empty()
    }

    /// Undo stack length counting a task reopened by `continue_task`.
    fn history_len(&self) -> usize {
        let reopened = self.frames.first().is_some_and(|f| !f.started_fresh());
        self.undo_stack.len() + usize::from(reopened)
    }

    /// Pop frames above `target_depth` without undoing anything.
    ///
    /// A reopened task goes back on the undo stack as it was before it was
    /// continued; actions added since are dropped.
    fn abandon_frames(&mut self, target_depth: usize) -> usize {
        let mut abandoned = 0;
        while self.frames.len() > target_depth {
            let Some(frame) = self.frames.pop() else {
                break;
            };
            let (original, added) = frame.split_continued();
            if let Some(task) = original {
                self.undo_stack.push_back(task);
            }
            trace!(dropped = added.len(), "abandoned frame");
            abandoned += 1;
        }
        abandoned
    }

    fn alloc_task_id(&mut self) -> TaskId {
        self.next_task_id += 1;
        TaskId(self.next_task_id)
    }

    /// Turn a closed outermost frame into a history entry.
    fn complete(&mut self, frame: Frame) {
        if frame.actions.is_empty() && !self.config.keep_empty_tasks {
            debug!(label = %frame.undo_label, "dropping empty task");
            return;
        }

        let id = match frame.continued {
            Some(id) => id,
            None => self.alloc_task_id(),
        };
        let task = Task::new(id, frame.undo_label, frame.redo_label, frame.actions);
        debug!(
            label = %task.undo_label,
            actions = task.len(),
            continued = frame.continued.is_some(),
            "task completed"
        );
        self.clear_redo();
        self.push_undo(task);
        self.last_recorded = Some(id);
    }

    fn push_undo(&mut self, task: Task) {
        self.undo_stack.push_back(task);
        self.enforce_limits();
    }

    fn clear_redo(&mut self) {
        if !self.redo_stack.is_empty() {
            debug!(dropped = self.redo_stack.len(), "clearing redo stack");
            self.redo_stack.clear();
        }
    }

    /// Evict the oldest tasks beyond `max_tasks`, committing their actions.
    fn enforce_limits(&mut self) {
        let mut evicted = 0;
        while self.undo_stack.len() > self.config.max_tasks.max(1) {
            if let Some(mut task) = self.undo_stack.pop_front() {
                task.commit();
                evicted += 1;
            }
        }
        if evicted > 0 {
            self.marks.shift_down(evicted);
            debug!(evicted, undo_len = self.undo_stack.len(), "evicted oldest tasks");
        }
    }

    fn drop_failed(&mut self, task: Task, err: &ActionError) -> UndoResult {
        debug!(label = %task.undo_label, "dropping partially traversed task");
        drop(task);
        self.note_failure(err)
    }

    fn note_failure(&mut self, err: &ActionError) -> UndoResult {
        match err {
            ActionError::Failed(reason) => {
                warn!(%reason, "action declined");
                UndoResult::Failed
            }
            ActionError::Fault(reason) => {
                error!(%reason, "action fault; history is now suspect");
                self.suspect = true;
                UndoResult::Error
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
