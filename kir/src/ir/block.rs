use cranelift_entity::entity_impl;

use super::Stmt;

/// A handle to a block stored in a [Kernel](super::Kernel).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// An ordered sequence of statements.
///
/// Blocks nest inside container statements and inside the kernel root,
/// forming a tree. A block's contents are visible only within its own
/// lexical extent and the extents nested inside it.
#[derive(Debug, Clone)]
pub struct BlockNode {
    pub(super) stmts: Vec<Stmt>,
    /// The container statement this block belongs to, or `None` for the
    /// kernel root.
    pub(super) parent: Option<Stmt>,
}

impl BlockNode {
    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    pub fn parent(&self) -> Option<Stmt> {
        self.parent
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}
