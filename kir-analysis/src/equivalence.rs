use loomc_kir::{Block, Kernel, Stmt, StmtData};
use rustc_hash::FxHashMap;

/// Whether `a` and `b` are the same statement, structurally.
///
/// Two statements are structurally the same when they have the same shape
/// and payload and their operands correspond pairwise: either the operand
/// ids are identical, or the operands were already paired up while comparing
/// the surrounding trees (which is how statements defined locally inside two
/// container statements get matched against each other). Container
/// statements compare their nested blocks recursively, pairing statements
/// positionally.
pub fn same_statements(kernel: &Kernel, a: Stmt, b: Stmt) -> bool {
    let mut correspondence = FxHashMap::default();
    same_statements_mapped(kernel, a, b, &mut correspondence)
}

fn same_statements_mapped(
    kernel: &Kernel,
    a: Stmt,
    b: Stmt,
    correspondence: &mut FxHashMap<Stmt, Stmt>,
) -> bool {
    if a == b {
        return true;
    }
    if let Some(&paired) = correspondence.get(&a) {
        return paired == b;
    }

    let operands_a = kernel.operands(a);
    let operands_b = kernel.operands(b);
    if operands_a.len() != operands_b.len() {
        return false;
    }
    for (&oa, &ob) in operands_a.iter().zip(operands_b.iter()) {
        let paired = oa == ob || correspondence.get(&oa) == Some(&ob);
        if !paired {
            return false;
        }
    }

    // Pair the two statements up before descending, so nested references to
    // the containers themselves (e.g. loop indices) resolve.
    correspondence.insert(a, b);

    match (kernel.data(a), kernel.data(b)) {
        (StmtData::Const(x), StmtData::Const(y)) => x == y,
        (StmtData::Unary(x), StmtData::Unary(y)) => x == y,
        (StmtData::Binary(x), StmtData::Binary(y)) => x == y,
        (StmtData::LoopIndex { axis: x }, StmtData::LoopIndex { axis: y }) => x == y,
        (
            StmtData::FieldPtr {
                field: fa,
                activate: aa,
            },
            StmtData::FieldPtr {
                field: fb,
                activate: ab,
            },
        ) => fa == fb && aa == ab,
        (StmtData::LoopUnique { covers: ca }, StmtData::LoopUnique { covers: cb }) => ca == cb,
        (StmtData::Load, StmtData::Load)
        | (StmtData::Store, StmtData::Store)
        | (StmtData::Print, StmtData::Print) => true,
        (
            StmtData::If {
                then_blk: ta,
                else_blk: ea,
            },
            StmtData::If {
                then_blk: tb,
                else_blk: eb,
            },
        ) => {
            same_arm_mapped(kernel, *ta, *tb, correspondence)
                && same_arm_mapped(kernel, *ea, *eb, correspondence)
        }
        (StmtData::RangeFor { body: ba }, StmtData::RangeFor { body: bb }) => {
            same_block_mapped(kernel, *ba, *bb, correspondence)
        }
        _ => false,
    }
}

fn same_arm_mapped(
    kernel: &Kernel,
    a: Option<Block>,
    b: Option<Block>,
    correspondence: &mut FxHashMap<Stmt, Stmt>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => same_block_mapped(kernel, a, b, correspondence),
        // An absent arm and an empty one are interchangeable.
        (Some(a), None) => kernel.block(a).is_empty(),
        (None, Some(b)) => kernel.block(b).is_empty(),
    }
}

fn same_block_mapped(
    kernel: &Kernel,
    a: Block,
    b: Block,
    correspondence: &mut FxHashMap<Stmt, Stmt>,
) -> bool {
    let stmts_a = kernel.block(a).stmts();
    let stmts_b = kernel.block(b).stmts();
    stmts_a.len() == stmts_b.len()
        && stmts_a
            .iter()
            .zip(stmts_b.iter())
            .all(|(&sa, &sb)| same_statements_mapped(kernel, sa, sb, correspondence))
}

/// Whether `a` and `b` provably evaluate to the same value.
///
/// Distinct statements count as the same value when they are pure
/// computations of the same shape whose operands are themselves pairwise
/// same-valued. Anything that reads or mutates state only equals itself.
pub fn same_value(kernel: &Kernel, a: Stmt, b: Stmt) -> bool {
    if a == b {
        return true;
    }
    let payload_equal = match (kernel.data(a), kernel.data(b)) {
        (StmtData::Const(x), StmtData::Const(y)) => x == y,
        (StmtData::Unary(x), StmtData::Unary(y)) => x == y,
        (StmtData::Binary(x), StmtData::Binary(y)) => x == y,
        (StmtData::LoopIndex { axis: x }, StmtData::LoopIndex { axis: y }) => x == y,
        (
            StmtData::FieldPtr {
                field: fa,
                activate: aa,
            },
            StmtData::FieldPtr {
                field: fb,
                activate: ab,
            },
        ) => fa == fb && aa == ab,
        (StmtData::LoopUnique { covers: ca }, StmtData::LoopUnique { covers: cb }) => ca == cb,
        // Loads, effects, and containers are only ever equal to themselves.
        _ => false,
    };
    payload_equal
        && kernel.operands(a).len() == kernel.operands(b).len()
        && kernel
            .operands(a)
            .iter()
            .zip(kernel.operands(b).iter())
            .all(|(&oa, &ob)| same_value(kernel, oa, ob))
}
