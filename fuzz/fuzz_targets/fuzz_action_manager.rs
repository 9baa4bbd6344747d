#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use fieldnote_undo::{
    Action, ActionError, ActionManager, ActionResult, Error, ManagerConfig, Mark, UndoResult,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug, Clone, Copy)]
enum Outcome {
    Ok,
    Decline,
    Fault,
}

#[derive(Arbitrary, Debug)]
enum Op {
    Begin,
    End,
    EndOuter,
    Add { undo: Outcome, redo: Outcome, redoable: bool },
    Undo,
    Redo,
    Rollback(u8),
    Continue,
    Break,
    BeginNonUndoable,
    EndNonUndoable,
    Mark,
    Collapse(u8),
    Discard(u8),
    Commit,
}

#[derive(Arbitrary, Debug)]
struct Input {
    max_tasks: u8,
    refresh_threshold: u8,
    keep_empty_tasks: bool,
    ops: Vec<Op>,
}

struct Scripted {
    undo: Outcome,
    redo: Outcome,
    redoable: bool,
    live: Rc<Cell<usize>>,
}

impl Drop for Scripted {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

fn run(outcome: Outcome) -> ActionResult {
    match outcome {
        Outcome::Ok => Ok(()),
        Outcome::Decline => Err(ActionError::failed("declined")),
        Outcome::Fault => Err(ActionError::fault("fault")),
    }
}

impl Action for Scripted {
    fn undo(&mut self) -> ActionResult {
        run(self.undo)
    }

    fn redo(&mut self) -> ActionResult {
        run(self.redo)
    }

    fn is_redoable(&self) -> bool {
        self.redoable
    }
}

fuzz_target!(|input: Input| {
    if input.ops.len() > 512 {
        return;
    }
    let config = ManagerConfig::new(usize::from(input.max_tasks).max(1))
        .with_refresh_threshold(usize::from(input.refresh_threshold))
        .with_keep_empty_tasks(input.keep_empty_tasks);
    let max_tasks = config.max_tasks;
    let mut mgr = ActionManager::new(config);
    let live = Rc::new(Cell::new(0usize));
    let mut marks: Vec<Mark> = Vec::new();

    for op in input.ops {
        let depth = mgr.current_depth();
        match op {
            Op::Begin => {
                let _ = mgr.begin_task("Undo", "Redo");
            }
            Op::End => {
                let _ = mgr.end_task();
            }
            Op::EndOuter => {
                let _ = mgr.end_outer_task();
            }
            Op::Add { undo, redo, redoable } => {
                live.set(live.get() + 1);
                let _ = mgr.add_action(Box::new(Scripted {
                    undo,
                    redo,
                    redoable,
                    live: live.clone(),
                }));
            }
            Op::Undo => {
                if let Ok(result) = mgr.undo() {
                    assert_eq!(result == UndoResult::Error, mgr.is_suspect());
                }
            }
            Op::Redo => {
                let _ = mgr.redo();
            }
            Op::Rollback(target) => {
                let target = usize::from(target) % (depth + 2);
                match mgr.rollback(target) {
                    Ok(_) => assert_eq!(mgr.current_depth(), target),
                    Err(Error::InvalidDepth { .. }) => assert!(target > depth),
                    Err(_) => assert_eq!(mgr.current_depth(), depth),
                }
            }
            Op::Continue => {
                if mgr.continue_task() {
                    assert_eq!(depth, 0);
                    assert_eq!(mgr.current_depth(), 1);
                }
            }
            Op::Break => {
                if mgr.break_task("Undo", "Redo").is_ok() {
                    assert_eq!(mgr.current_depth(), depth.max(1));
                }
            }
            Op::BeginNonUndoable => {
                let _ = mgr.begin_non_undoable_section();
            }
            Op::EndNonUndoable => {
                let _ = mgr.end_non_undoable_section();
            }
            Op::Mark => marks.push(mgr.mark()),
            Op::Collapse(i) => {
                if !marks.is_empty() {
                    let mark = marks.remove(usize::from(i) % marks.len());
                    if mgr.collapse_to_mark(&mark, "Merged", "Merged") {
                        assert!(mgr.check_mark(&mark).is_err());
                    }
                }
            }
            Op::Discard(i) => {
                if !marks.is_empty() {
                    let mark = marks.remove(usize::from(i) % marks.len());
                    let redo = mgr.redoable_task_count();
                    if mgr.discard_to_mark(&mark) {
                        assert_eq!(mgr.redoable_task_count(), redo);
                    }
                }
            }
            Op::Commit => {
                mgr.commit().expect("commit outside traversal");
                assert_eq!(mgr.current_depth(), 0);
                assert_eq!(mgr.undoable_task_count(), 0);
                assert_eq!(mgr.redoable_task_count(), 0);
                assert!(!mgr.is_suspect());
            }
        }

        // Post-conditions that must always hold:
        assert!(!mgr.is_busy(), "mode left in traversal");
        assert!(mgr.undoable_task_count() <= max_tasks, "history over limit");
        if mgr.can_undo() {
            assert_eq!(mgr.current_depth(), 0);
        }
    }

    mgr.close();
    assert_eq!(live.get(), 0, "actions leaked after close");
});
