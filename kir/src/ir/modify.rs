use super::{Kernel, Stmt};

/// Buffers structural edits discovered during a traversal so the traversal
/// never mutates a statement list it is currently iterating.
///
/// Edits are committed in one batch by [DelayedModifier::modify_ir];
/// insertions are applied before erasures.
#[derive(Debug, Default)]
pub struct DelayedModifier {
    to_insert_before: Vec<(Stmt, Stmt)>,
    to_insert_after: Vec<(Stmt, Stmt)>,
    to_erase: Vec<Stmt>,
}

impl DelayedModifier {
    /// Schedules `stmt` for erasure.
    pub fn erase(&mut self, stmt: Stmt) {
        self.to_erase.push(stmt);
    }

    /// Schedules a detached statement for insertion immediately before
    /// `anchor`.
    pub fn insert_before(&mut self, anchor: Stmt, stmt: Stmt) {
        self.to_insert_before.push((anchor, stmt));
    }

    /// Schedules a detached statement for insertion immediately after
    /// `anchor`.
    pub fn insert_after(&mut self, anchor: Stmt, stmt: Stmt) {
        self.to_insert_after.push((anchor, stmt));
    }

    /// Commits all buffered edits. Returns `true` if any edit was applied.
    pub fn modify_ir(&mut self, kernel: &mut Kernel) -> bool {
        let modified = !self.to_insert_before.is_empty()
            || !self.to_insert_after.is_empty()
            || !self.to_erase.is_empty();
        for (anchor, stmt) in self.to_insert_before.drain(..) {
            kernel.insert_before(anchor, stmt);
        }
        for (anchor, stmt) in self.to_insert_after.drain(..) {
            kernel.insert_after(anchor, stmt);
        }
        for stmt in self.to_erase.drain(..) {
            kernel.erase(stmt);
        }
        modified
    }
}
