//! Kernel Intermediate Representation for the Loom compiler.
//!
//! A [Kernel] is a tree of lexically nested [Block]s of [Stmt]s, produced by
//! the front-end lowering and consumed by the transformation passes in
//! `loomc-kir-transform`. Statements and blocks are stored in append-only
//! arenas and referenced by compact entity ids, so an id handed out once is
//! stable for the lifetime of the kernel, even across structural edits.

mod ir;
pub mod pass;

pub use loomc_session::diagnostics::Report;

pub use self::ir::{
    BinaryOp, Block, BlockNode, DelayedModifier, Field, FieldData, Ieee64, Immediate, Kernel,
    KernelBuilder, Stmt, StmtData, StmtKind, StmtNode, UnaryOp, VerifierError, collect_stmts,
    verify, walk_block, walk_kernel,
};
