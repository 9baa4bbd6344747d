#![forbid(unsafe_code)]

//! Saved positions in the undo history.
//!
//! A [`Mark`] records the undo history length at the moment it was taken.
//! The [`MarkRegistry`] owned by the manager decides whether a mark is still
//! meaningful.
//!
//! # Invariants
//!
//! 1. Registered marks are ordered by creation and their positions never
//!    decrease along the registry.
//! 2. Every registered mark satisfies `undo_depth <= undo history length`;
//!    operations that shrink history call [`MarkRegistry::prune_above`].

use std::fmt;

/// Opaque identifier of a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkHandle(u32);

impl MarkHandle {
    /// Create a handle from a raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MarkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Token for "top of undo history right now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    handle: MarkHandle,
    undo_depth: usize,
}

impl Mark {
    /// Handle identifying this mark.
    #[must_use]
    pub const fn handle(&self) -> MarkHandle {
        self.handle
    }

    /// Undo history length when the mark was taken.
    #[must_use]
    pub const fn undo_depth(&self) -> usize {
        self.undo_depth
    }
}

/// Marks currently considered valid by a manager.
#[derive(Debug, Default)]
pub struct MarkRegistry {
    marks: Vec<Mark>,
    next_handle: u32,
}

impl MarkRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mark at `undo_depth`.
    pub fn register(&mut self, undo_depth: usize) -> Mark {
        self.next_handle = self.next_handle.wrapping_add(1);
        let mark = Mark {
            handle: MarkHandle(self.next_handle),
            undo_depth,
        };
        self.marks.push(mark);
        mark
    }

    /// Current position of `mark`, if it is registered and within `undo_len`.
    ///
    /// The registry's position wins over the token's: eviction rebases
    /// registered marks but cannot reach copies held by the host.
    #[must_use]
    pub fn resolve(&self, mark: &Mark, undo_len: usize) -> Option<usize> {
        self.marks
            .iter()
            .find(|m| m.handle == mark.handle)
            .map(|m| m.undo_depth)
            .filter(|&depth| depth <= undo_len)
    }

    /// Whether `mark` is registered and still within `undo_len`.
    #[must_use]
    pub fn is_valid(&self, mark: &Mark, undo_len: usize) -> bool {
        self.resolve(mark, undo_len).is_some()
    }

    /// Unregister `mark` together with every mark positioned above it.
    pub fn release(&mut self, mark: &Mark) {
        let Some(depth) = self
            .marks
            .iter()
            .find(|m| m.handle == mark.handle)
            .map(|m| m.undo_depth)
        else {
            return;
        };
        self.marks
            .retain(|m| m.handle != mark.handle && m.undo_depth <= depth);
    }

    /// Drop marks positioned above `undo_len`.
    pub fn prune_above(&mut self, undo_len: usize) {
        self.marks.retain(|m| m.undo_depth <= undo_len);
    }

    /// Account for `evicted` tasks removed from the bottom of history.
    ///
    /// Marks whose base was evicted are dropped; the rest move down.
    pub fn shift_down(&mut self, evicted: usize) {
        self.marks.retain(|m| m.undo_depth >= evicted);
        for mark in &mut self.marks {
            mark.undo_depth -= evicted;
        }
    }

    /// Most recently registered mark.
    #[must_use]
    pub fn top(&self) -> Option<&Mark> {
        self.marks.last()
    }

    /// Number of registered marks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Whether no mark is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Unregister all marks.
    pub fn clear(&mut self) {
        self.marks.clear();
    }
}
