mod block;
mod builder;
mod kernel;
mod modify;
mod print;
mod stmt;
mod verify;
mod visit;

pub use self::{
    block::{Block, BlockNode},
    builder::KernelBuilder,
    kernel::{Field, FieldData, Kernel},
    modify::DelayedModifier,
    stmt::{BinaryOp, Ieee64, Immediate, Stmt, StmtData, StmtKind, StmtNode, UnaryOp},
    verify::{VerifierError, verify},
    visit::{collect_stmts, walk_block, walk_kernel},
};
