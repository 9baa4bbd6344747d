#![forbid(unsafe_code)]

//! Fieldnote undo/redo action manager.
//!
//! Every editing surface in Fieldnote records its low-level field changes
//! as [`Action`]s. The [`ActionManager`] groups them into named tasks so
//! that many small changes present as one undo step:
//!
//! - **Nesting**: `begin_task`/`end_task` pairs nest; the outermost pair
//!   becomes one history entry
//! - **Rollback**: a half-finished nested operation reverts atomically
//! - **Regrouping**: tasks recorded after a [`Mark`] collapse into one entry,
//!   or are discarded outright
//! - **Non-undoable sections**: bulk initialization that never reaches
//!   history
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          ActionManager                            │
//! │  ┌──────────────┐   end_task   ┌──────────────┐  undo()  ┌──────┐ │
//! │  │ Frame stack  │ ───────────► │ Undo Stack   │ ───────► │ Redo │ │
//! │  │ (open tasks) │              │ Task N .. 1  │ ◄─────── │ Stack│ │
//! │  └──────────────┘              └──────────────┘  redo()  └──────┘ │
//! │          ▲                          ▲                             │
//! │     add_action                 Mark registry                      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use fieldnote_undo::{ActionManager, FnAction, UndoResult};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let gloss = Rc::new(RefCell::new(String::from("dog")));
//! let mut manager = ActionManager::default();
//!
//! // The edit has already been applied; record how to reverse it.
//! let (u, r) = (gloss.clone(), gloss.clone());
//! manager.begin_task("Undo Edit Gloss", "Redo Edit Gloss")?;
//! manager.add_action(Box::new(
//!     FnAction::new("gloss")
//!         .with_undo(move || {
//!             *u.borrow_mut() = "cat".into();
//!             Ok(())
//!         })
//!         .with_redo(move || {
//!             *r.borrow_mut() = "dog".into();
//!             Ok(())
//!         }),
//! ))?;
//! manager.end_task()?;
//!
//! assert_eq!(manager.undo_label(0), Some("Undo Edit Gloss"));
//! assert!(manager.undo()?.is_success());
//! assert_eq!(*gloss.borrow(), "cat");
//! assert_eq!(manager.redo()?, UndoResult::Refresh);
//! assert_eq!(*gloss.borrow(), "dog");
//! # Ok::<(), fieldnote_undo::Error>(())
//! ```
//!
//! # Module Structure
//!
//! - [`action`]: the `Action` contract and closure-backed actions
//! - [`manager`]: the `ActionManager` state machine
//! - [`task`]: completed tasks and open frames
//! - [`mark`]: marks and their registry
//! - [`shared`]: `Rc<RefCell<_>>` handle that reports reentrancy as `Busy`
//! - [`config`]: tunables, loadable from TOML/JSON with the `config` feature
//! - [`error`]: error taxonomy and `UndoResult`

pub mod action;
pub mod config;
pub mod error;
pub mod manager;
pub mod mark;
pub mod shared;
pub mod task;

pub use action::{Action, ActionError, ActionResult, FnAction};
#[cfg(feature = "config")]
pub use config::ConfigError;
pub use config::ManagerConfig;
pub use error::{Error, ErrorClass, UndoResult};
pub use manager::{ActionManager, Mode};
pub use mark::{Mark, MarkHandle};
pub use shared::{SharedActionManager, WeakActionManager};
pub use task::{Task, TaskId};
