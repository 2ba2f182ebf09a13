use std::collections::BTreeSet;

use super::{
    BinaryOp, Block, Field, Immediate, Kernel, Stmt, StmtData, UnaryOp,
};

/// Convenience layer for assembling kernels statement by statement.
///
/// The builder keeps a current insertion block; every `*_stmt`-style method
/// appends to it. Use [KernelBuilder::switch_to_block] to fill the arms of a
/// conditional or the body of a loop.
pub struct KernelBuilder {
    kernel: Kernel,
    block: Block,
}

impl KernelBuilder {
    pub fn new(name: impl AsRef<str>) -> Self {
        let kernel = Kernel::new(name);
        let block = kernel.root();
        Self { kernel, block }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn finish(self) -> Kernel {
        self.kernel
    }

    pub fn declare_field(&mut self, name: impl AsRef<str>, sparse: bool) -> Field {
        self.kernel.declare_field(name, sparse)
    }

    pub fn current_block(&self) -> Block {
        self.block
    }

    pub fn switch_to_block(&mut self, block: Block) {
        self.block = block;
    }

    fn append_stmt(&mut self, data: StmtData, operands: &[Stmt]) -> Stmt {
        let stmt = self.kernel.make_stmt(data, operands.iter().copied());
        self.kernel.append(self.block, stmt);
        stmt
    }

    pub fn const_int(&mut self, value: i64) -> Stmt {
        self.append_stmt(StmtData::Const(Immediate::Int(value)), &[])
    }

    pub fn const_float(&mut self, value: f64) -> Stmt {
        self.append_stmt(StmtData::Const(Immediate::Float(value.into())), &[])
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Stmt) -> Stmt {
        self.append_stmt(StmtData::Unary(op), &[operand])
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Stmt, rhs: Stmt) -> Stmt {
        self.append_stmt(StmtData::Binary(op), &[lhs, rhs])
    }

    pub fn field_ptr(&mut self, field: Field, indices: &[Stmt], activate: bool) -> Stmt {
        self.append_stmt(StmtData::FieldPtr { field, activate }, indices)
    }

    pub fn loop_unique(
        &mut self,
        value: Stmt,
        covers: impl IntoIterator<Item = Field>,
    ) -> Stmt {
        let covers: BTreeSet<Field> = covers.into_iter().collect();
        self.append_stmt(StmtData::LoopUnique { covers }, &[value])
    }

    pub fn load(&mut self, ptr: Stmt) -> Stmt {
        self.append_stmt(StmtData::Load, &[ptr])
    }

    pub fn store(&mut self, ptr: Stmt, value: Stmt) -> Stmt {
        self.append_stmt(StmtData::Store, &[ptr, value])
    }

    pub fn print(&mut self, value: Stmt) -> Stmt {
        self.append_stmt(StmtData::Print, &[value])
    }

    /// Appends a conditional with two (empty) arms; returns the statement
    /// and its arm blocks.
    pub fn if_stmt(&mut self, cond: Stmt) -> (Stmt, Block, Block) {
        let stmt = self.append_stmt(
            StmtData::If {
                then_blk: None,
                else_blk: None,
            },
            &[cond],
        );
        let then_blk = self.kernel.create_block(None);
        let else_blk = self.kernel.create_block(None);
        self.kernel.set_then_block(stmt, Some(then_blk));
        self.kernel.set_else_block(stmt, Some(else_blk));
        (stmt, then_blk, else_blk)
    }

    /// Appends a serial loop over `begin..end`; returns the statement and
    /// its body block.
    pub fn range_for(&mut self, begin: Stmt, end: Stmt) -> (Stmt, Block) {
        let body = self.kernel.create_block(None);
        let stmt = self.append_stmt(StmtData::RangeFor { body }, &[begin, end]);
        self.kernel.set_block_parent(body, Some(stmt));
        (stmt, body)
    }

    /// The current index of `loop_stmt` along `axis`.
    pub fn loop_index(&mut self, loop_stmt: Stmt, axis: u8) -> Stmt {
        self.append_stmt(StmtData::LoopIndex { axis }, &[loop_stmt])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::StmtKind;

    #[test]
    fn builds_structured_kernels() {
        let mut b = KernelBuilder::new("structured");
        let zero = b.const_int(0);
        let eight = b.const_int(8);
        let (loop_stmt, body) = b.range_for(zero, eight);
        let after = b.current_block();
        b.switch_to_block(body);
        let idx = b.loop_index(loop_stmt, 0);
        b.print(idx);
        b.switch_to_block(after);
        let kernel = b.finish();

        assert_eq!(kernel.kind(loop_stmt), StmtKind::RangeFor);
        assert_eq!(kernel.block(body).parent(), Some(loop_stmt));
        assert_eq!(kernel.block(kernel.root()).len(), 3);
        assert_eq!(kernel.operands(idx), &[loop_stmt]);
    }
}
