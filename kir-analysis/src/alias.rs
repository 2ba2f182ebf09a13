use loomc_kir::{Kernel, Stmt, StmtData};

use crate::same_value;

/// Whether two address statements provably name the same field cell.
///
/// Requires both statements to address the same field with index expressions
/// that are pairwise [same_value]. Activation flags are deliberately ignored
/// here; whether two addresses may be fused despite differing flags is a
/// question for the transformation that asks.
pub fn definitely_same_address(kernel: &Kernel, a: Stmt, b: Stmt) -> bool {
    match (kernel.data(a), kernel.data(b)) {
        (StmtData::FieldPtr { field: fa, .. }, StmtData::FieldPtr { field: fb, .. }) => {
            fa == fb
                && kernel.operands(a).len() == kernel.operands(b).len()
                && kernel
                    .operands(a)
                    .iter()
                    .zip(kernel.operands(b).iter())
                    .all(|(&ia, &ib)| same_value(kernel, ia, ib))
        }
        _ => false,
    }
}
