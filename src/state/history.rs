use crate::state::blocks::Block;

/// Snapshot stack of block lists with a cursor. Only structural edits are
/// recorded.
#[derive(Clone, Debug)]
pub struct BlockHistory {
    snapshots: Vec<Vec<Block>>,
    cursor: usize,
}

impl BlockHistory {
    pub fn new(initial: Vec<Block>) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
        }
    }

    pub fn current(&self) -> &[Block] {
        &self.snapshots[self.cursor]
    }

    /// Pushes a snapshot, dropping anything that could have been redone.
    pub fn record(&mut self, blocks: Vec<Block>) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(blocks);
        self.cursor = self.snapshots.len() - 1;
    }

    /// Replaces the snapshot under the cursor without growing the stack.
    pub fn amend(&mut self, blocks: Vec<Block>) {
        self.snapshots[self.cursor] = blocks;
    }

    pub fn undo(&mut self) -> Option<&[Block]> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    pub fn redo(&mut self) -> Option<&[Block]> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
