//! Undo/Redo post stack.
//!
//! A *post* groups every command of one user operation. The stack keeps an
//! ordered list of posts and a current position; posts after the position
//! form the redo branch, which the next `new_post` discards. Empty posts are
//! never undo steps.
//!
//! Commands are recorded *after* the live edit happened, so the stack never
//! applies anything while recording. It touches the graph only in `undo`
//! and `redo`, through `replay::replay_post`.

use crate::config::HistoryConfig;
use crate::replay::{Replay, replay_post};
use sd_core::{Command, GraphError, ObjectGraph};
use std::fmt;
use thiserror::Error;

/// Replay against the graph failed; the stack was cleared.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    #[error("undo history corrupted while replaying post {post}; history was cleared")]
    CorruptHistory { post: usize, source: GraphError },
}

/// Label of a multi-command post, shown as one history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Paste,
    Cut,
    MovedMultiple,
    ChangedParameters,
    HideAllNames,
    ShowAllNames,
    AlignX,
    AlignY,
}

impl PostKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Paste => "Paste",
            Self::Cut => "Cut",
            Self::MovedMultiple => "Moved Objects",
            Self::ChangedParameters => "Changed Parameter(s)",
            Self::HideAllNames => "Hide All Name Text",
            Self::ShowAllNames => "Show All Name Text",
            Self::AlignX => "Align Vertical",
            Self::AlignY => "Align Horizontal",
        }
    }
}

/// Commands of one user operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Post {
    pub kind: Option<PostKind>,
    pub commands: Vec<Command>,
}

impl Post {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The kind's label, or the first command's.
    pub fn label(&self) -> &'static str {
        match (self.kind, self.commands.first()) {
            (Some(kind), _) => kind.label(),
            (None, Some(command)) => command.label(),
            (None, None) => "",
        }
    }
}

/// Emitted to subscribers after every mutation of the stack.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryChange {
    PostOpened { position: isize },
    Recorded { position: isize, tag: &'static str },
    Undone { position: isize },
    Redone { position: isize },
    Cleared,
}

type Observer = Box<dyn FnMut(&HistoryChange)>;

pub struct UndoStack {
    posts: Vec<Post>,
    /// Index of the current post; -1 when nothing is done.
    position: isize,
    enabled: bool,
    max_depth: usize,
    observers: Vec<Observer>,
}

impl fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoStack")
            .field("posts", &self.posts)
            .field("position", &self.position)
            .field("enabled", &self.enabled)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

impl UndoStack {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            posts: Vec::new(),
            position: -1,
            enabled: config.enabled,
            max_depth: config.max_depth,
            observers: Vec::new(),
        }
    }

    /// Register an observer for `HistoryChange` events.
    pub fn subscribe(&mut self, observer: impl FnMut(&HistoryChange) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self, change: HistoryChange) {
        for observer in &mut self.observers {
            observer(&change);
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn current_position(&self) -> isize {
        self.position
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn can_undo(&self) -> bool {
        self.undo_target().is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.redo_target().is_some()
    }

    /// Nearest non-empty post at or before the position.
    fn undo_target(&self) -> Option<usize> {
        let end = usize::try_from(self.position + 1).ok()?;
        self.posts[..end.min(self.posts.len())]
            .iter()
            .rposition(|post| !post.is_empty())
    }

    fn redo_target(&self) -> Option<usize> {
        let next = usize::try_from(self.position + 1).ok()?;
        self.posts.get(next).filter(|post| !post.is_empty()).map(|_| next)
    }

    fn current_index(&self) -> Option<usize> {
        usize::try_from(self.position).ok().filter(|i| *i < self.posts.len())
    }

    // ─── Recording ───────────────────────────────────────────────────────

    /// Discard all posts. The stack is immediately ready to record again.
    ///
    /// No empty post is opened here: the position stays -1 and the next
    /// `record` opens post 0 itself, so `posts()` is empty right after a
    /// clear.
    pub fn clear(&mut self) {
        self.posts.clear();
        self.position = -1;
        log::debug!("undo history cleared");
        self.notify(HistoryChange::Cleared);
    }

    /// Disabling clears the history once; re-enabling starts empty.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled {
            self.clear();
        }
        self.enabled = enabled;
    }

    /// Start a new post, discarding the redo branch. An empty current post
    /// is reused (taking the new kind) instead of stacking another one.
    pub fn new_post(&mut self, kind: Option<PostKind>) {
        if !self.enabled {
            return;
        }
        self.posts.truncate(usize::try_from(self.position + 1).unwrap_or(0));

        match self.current_index() {
            Some(i) if self.posts[i].is_empty() => self.posts[i].kind = kind,
            _ => {
                self.posts.push(Post {
                    kind,
                    commands: Vec::new(),
                });
                self.position += 1;
            }
        }
        self.enforce_depth();

        log::debug!("new post {} ({kind:?})", self.position);
        self.notify(HistoryChange::PostOpened {
            position: self.position,
        });
    }

    /// Append a command to the current post, opening one first if nothing
    /// has been posted yet.
    pub fn record(&mut self, command: Command) {
        if !self.enabled {
            return;
        }
        if self.current_index().is_none() {
            self.new_post(None);
        }
        let Some(i) = self.current_index() else {
            return;
        };

        let tag = command.tag();
        log::debug!("record {tag} into post {i}");
        self.posts[i].commands.push(command);
        self.notify(HistoryChange::Recorded {
            position: self.position,
            tag,
        });
    }

    /// Drop the oldest posts while more than `max_depth` are non-empty.
    fn enforce_depth(&mut self) {
        if self.max_depth == 0 {
            return;
        }
        let mut non_empty = self.posts.iter().filter(|p| !p.is_empty()).count();
        while non_empty > self.max_depth && !self.posts.is_empty() {
            if !self.posts.remove(0).is_empty() {
                non_empty -= 1;
            }
            self.position = (self.position - 1).max(-1);
        }
    }

    // ─── Replay ──────────────────────────────────────────────────────────

    /// Undo the nearest non-empty post. Returns its label, or `None` when
    /// there is nothing to undo.
    pub fn undo(&mut self, graph: &mut ObjectGraph) -> Result<Option<&'static str>, HistoryError> {
        let Some(post) = self.undo_target() else {
            return Ok(None);
        };
        if let Err(source) = replay_post(graph, &self.posts[post].commands, Replay::Undo) {
            return Err(self.corrupted(post, source));
        }

        self.position = post as isize - 1;
        let label = self.posts[post].label();
        log::debug!("undo post {post}: {label}");
        self.notify(HistoryChange::Undone {
            position: self.position,
        });
        Ok(Some(label))
    }

    /// Redo the post after the position, if it is non-empty.
    pub fn redo(&mut self, graph: &mut ObjectGraph) -> Result<Option<&'static str>, HistoryError> {
        let Some(post) = self.redo_target() else {
            return Ok(None);
        };
        if let Err(source) = replay_post(graph, &self.posts[post].commands, Replay::Redo) {
            return Err(self.corrupted(post, source));
        }

        self.position = post as isize;
        let label = self.posts[post].label();
        log::debug!("redo post {post}: {label}");
        self.notify(HistoryChange::Redone {
            position: self.position,
        });
        Ok(Some(label))
    }

    fn corrupted(&mut self, post: usize, source: GraphError) -> HistoryError {
        log::error!("undo history no longer matches the model ({source}); clearing history");
        self.clear();
        HistoryError::CorruptHistory { post, source }
    }
}
