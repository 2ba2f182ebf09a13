use super::{Block, Kernel, Stmt};

/// Pre-order walk over every statement in `block` and the blocks nested
/// within it. Container statements are visited before their contents.
pub fn walk_block(kernel: &Kernel, block: Block, f: &mut impl FnMut(Stmt)) {
    for &stmt in kernel.block(block).stmts() {
        f(stmt);
        for nested in kernel.data(stmt).blocks() {
            walk_block(kernel, nested, f);
        }
    }
}

/// Pre-order walk over every statement of the kernel.
pub fn walk_kernel(kernel: &Kernel, f: &mut impl FnMut(Stmt)) {
    walk_block(kernel, kernel.root(), f);
}

/// The statements of the subtree rooted at `block`, in pre-order.
pub fn collect_stmts(kernel: &Kernel, block: Block) -> Vec<Stmt> {
    let mut stmts = Vec::new();
    walk_block(kernel, block, &mut |stmt| stmts.push(stmt));
    stmts
}
