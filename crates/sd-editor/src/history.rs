//! Read-only projection of the undo stack for a history panel.

use crate::undo::UndoStack;

/// Where a row sits relative to the stack position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Before the position: applied.
    Done,
    /// The post at the position.
    Current,
    /// After the position: redo branch.
    Undone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub label: &'static str,
    /// Index of the owning post, for striping rows per post.
    pub post: usize,
    pub state: EntryState,
}

/// Rows newest first: one per command, or one per post when the post has a
/// kind. Empty posts produce no rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryView {
    pub rows: Vec<HistoryEntry>,
}

impl HistoryView {
    pub fn from_stack(stack: &UndoStack) -> Self {
        let position = stack.current_position();
        let mut rows = Vec::new();

        for (post, entry) in stack.posts().iter().enumerate() {
            let state = match (post as isize).cmp(&position) {
                std::cmp::Ordering::Less => EntryState::Done,
                std::cmp::Ordering::Equal => EntryState::Current,
                std::cmp::Ordering::Greater => EntryState::Undone,
            };
            match entry.kind {
                Some(kind) if !entry.is_empty() => rows.push(HistoryEntry {
                    label: kind.label(),
                    post,
                    state,
                }),
                Some(_) => {}
                None => rows.extend(entry.commands.iter().map(|command| HistoryEntry {
                    label: command.label(),
                    post,
                    state,
                })),
            }
        }

        rows.reverse();
        Self { rows }
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.rows.iter().map(|row| row.label).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::undo::PostKind;
    use pretty_assertions::assert_eq;
    use sd_core::{Command, EntityName, ObjectGraph, Point, Rotation};

    #[test]
    fn rows_are_newest_first_with_states() {
        let mut graph = ObjectGraph::default();
        let name = graph
            .create_entity("Tank", "T1", Point::default(), Rotation::Deg0)
            .unwrap();
        let mut stack = UndoStack::default();

        stack.new_post(None);
        stack.record(Command::FlipVertical { name });
        stack.record(Command::FlipHorizontal { name });
        stack.new_post(Some(PostKind::MovedMultiple));
        stack.record(Command::MoveEntity {
            name,
            old: Point::default(),
            new: Point::new(1.0, 1.0),
        });
        stack.record(Command::MoveEntity {
            name: EntityName::intern("T1"),
            old: Point::new(1.0, 1.0),
            new: Point::new(2.0, 2.0),
        });
        stack.new_post(None);
        stack.record(Command::FlipVertical { name });
        stack.undo(&mut graph).unwrap();

        let view = HistoryView::from_stack(&stack);
        assert_eq!(
            view.labels(),
            vec!["Flipped Vertical", "Moved Objects", "Flipped Horizontal", "Flipped Vertical"]
        );
        let states: Vec<EntryState> = view.rows.iter().map(|r| r.state).collect();
        assert_eq!(
            states,
            vec![EntryState::Undone, EntryState::Current, EntryState::Done, EntryState::Done]
        );
    }

    #[test]
    fn empty_posts_have_no_rows() {
        let mut stack = UndoStack::default();
        stack.new_post(Some(PostKind::Paste));
        assert!(HistoryView::from_stack(&stack).is_empty());
    }
}
