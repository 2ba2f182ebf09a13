//! End-to-end checks that elimination never changes what a kernel computes.
//!
//! A small reference interpreter runs a kernel and records everything the
//! host could observe: final field contents, sparse-storage activations, and
//! printed values. Optimizing a kernel must leave all three untouched.

use std::collections::{BTreeMap, BTreeSet};

use loomc_kir::{
    BinaryOp, Block, Field, Immediate, Kernel, KernelBuilder, Stmt, StmtData, UnaryOp, verify,
};
use loomc_kir_transform::whole_kernel_cse;
use proptest::prelude::*;
use rustc_hash::FxHashMap;

/// Everything a kernel execution can observe.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Observed {
    cells: BTreeMap<(Field, Vec<i64>), i64>,
    activated: BTreeSet<(Field, Vec<i64>)>,
    printed: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Int(i64),
    Ptr(Field, Vec<i64>),
}

struct Evaluator<'a> {
    kernel: &'a Kernel,
    values: FxHashMap<Stmt, Value>,
    observed: Observed,
}

fn eval(kernel: &Kernel) -> Observed {
    let mut evaluator = Evaluator {
        kernel,
        values: FxHashMap::default(),
        observed: Observed::default(),
    };
    evaluator.eval_block(kernel.root());
    evaluator.observed
}

impl Evaluator<'_> {
    fn int(&self, stmt: Stmt) -> i64 {
        match &self.values[&stmt] {
            Value::Int(value) => *value,
            Value::Ptr(..) => panic!("{stmt} is a pointer, not a scalar"),
        }
    }

    fn eval_block(&mut self, block: Block) {
        for &stmt in self.kernel.block(block).stmts() {
            self.eval_stmt(stmt);
        }
    }

    fn eval_stmt(&mut self, stmt: Stmt) {
        let operands = self.kernel.operands(stmt).to_vec();
        let value = match self.kernel.data(stmt) {
            StmtData::Const(Immediate::Int(value)) => Some(Value::Int(*value)),
            StmtData::Const(Immediate::Float(_)) => {
                panic!("the reference interpreter only handles integer kernels")
            }
            StmtData::Unary(op) => {
                let x = self.int(operands[0]);
                Some(Value::Int(match op {
                    UnaryOp::Neg => x.wrapping_neg(),
                    UnaryOp::Not => (x == 0) as i64,
                    UnaryOp::Abs => x.wrapping_abs(),
                    UnaryOp::Sqrt => (x.max(0) as f64).sqrt() as i64,
                    UnaryOp::Floor => x,
                }))
            }
            StmtData::Binary(op) => {
                let a = self.int(operands[0]);
                let b = self.int(operands[1]);
                Some(Value::Int(match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Div => a.wrapping_div(b.max(1)),
                    BinaryOp::Mod => a.wrapping_rem(b.max(1)),
                    BinaryOp::Min => a.min(b),
                    BinaryOp::Max => a.max(b),
                    BinaryOp::CmpLt => (a < b) as i64,
                    BinaryOp::CmpLe => (a <= b) as i64,
                    BinaryOp::CmpEq => (a == b) as i64,
                    BinaryOp::CmpNe => (a != b) as i64,
                }))
            }
            // The enclosing loop's slot holds its current index.
            StmtData::LoopIndex { .. } => Some(self.values[&operands[0]].clone()),
            StmtData::FieldPtr { field, activate } => {
                let indices: Vec<i64> = operands.iter().map(|&index| self.int(index)).collect();
                if *activate {
                    self.observed.activated.insert((*field, indices.clone()));
                }
                Some(Value::Ptr(*field, indices))
            }
            StmtData::LoopUnique { .. } => Some(self.values[&operands[0]].clone()),
            StmtData::Load => {
                let Value::Ptr(field, indices) = self.values[&operands[0]].clone() else {
                    panic!("load through a non-pointer");
                };
                Some(Value::Int(
                    self.observed.cells.get(&(field, indices)).copied().unwrap_or(0),
                ))
            }
            StmtData::Store => {
                let stored = self.int(operands[1]);
                let Value::Ptr(field, indices) = self.values[&operands[0]].clone() else {
                    panic!("store through a non-pointer");
                };
                self.observed.cells.insert((field, indices), stored);
                None
            }
            StmtData::Print => {
                let printed = self.int(operands[0]);
                self.observed.printed.push(printed);
                None
            }
            StmtData::If { then_blk, else_blk } => {
                let (then_blk, else_blk) = (*then_blk, *else_blk);
                if self.int(operands[0]) != 0 {
                    if let Some(block) = then_blk {
                        self.eval_block(block);
                    }
                } else if let Some(block) = else_blk {
                    self.eval_block(block);
                }
                None
            }
            StmtData::RangeFor { body } => {
                let body = *body;
                let begin = self.int(operands[0]);
                let end = self.int(operands[1]);
                for index in begin..end {
                    self.values.insert(stmt, Value::Int(index));
                    self.eval_block(body);
                }
                self.values.remove(&stmt);
                None
            }
        };
        if let Some(value) = value {
            self.values.insert(stmt, value);
        }
    }
}

/// A kernel exercising every statement shape the pass rewrites: duplicated
/// loop indices and loop-unique wrappers, activating and non-activating
/// addresses of the same cell, and a conditional whose arms share their
/// leading statement.
fn build_reference_kernel() -> Kernel {
    let mut b = KernelBuilder::new("reference");
    let x = b.declare_field("x", true);
    let y = b.declare_field("y", true);
    let zero = b.const_int(0);
    let n = b.const_int(6);
    let two = b.const_int(2);
    let three = b.const_int(3);
    let (loop_stmt, body) = b.range_for(zero, n);
    let after_loop = b.current_block();
    b.switch_to_block(body);
    let i = b.loop_index(loop_stmt, 0);
    let i2 = b.loop_index(loop_stmt, 0);
    let u1 = b.loop_unique(i, [x]);
    let u2 = b.loop_unique(i2, [y]);
    let px = b.field_ptr(x, &[u1], true);
    let px2 = b.field_ptr(x, &[u2], false);
    let sq = b.binary(BinaryOp::Mul, i, i2);
    b.store(px, sq);
    let reloaded = b.load(px2);
    b.print(reloaded);
    let cond = b.binary(BinaryOp::CmpLt, i, three);
    let (_, then_blk, else_blk) = b.if_stmt(cond);
    let after_if = b.current_block();
    b.switch_to_block(then_blk);
    let m1 = b.binary(BinaryOp::Mul, i, two);
    let py1 = b.field_ptr(y, &[u2], true);
    b.store(py1, m1);
    b.switch_to_block(else_blk);
    let m2 = b.binary(BinaryOp::Mul, i, two);
    let shifted = b.binary(BinaryOp::Sub, m2, two);
    let py2 = b.field_ptr(y, &[u2], true);
    b.store(py2, shifted);
    b.switch_to_block(after_if);
    b.switch_to_block(after_loop);
    let first = b.field_ptr(x, &[zero], false);
    let final_value = b.load(first);
    b.print(final_value);
    b.finish()
}

#[test]
fn optimizing_preserves_observable_behavior() {
    let kernel = build_reference_kernel();
    let before = eval(&kernel);

    let mut optimized = kernel.clone();
    assert!(whole_kernel_cse(&mut optimized));
    assert!(!whole_kernel_cse(&mut optimized));
    verify(&optimized).unwrap();

    assert_eq!(before, eval(&optimized));
}

proptest! {
    #[test]
    fn random_straightline_kernels_optimize_soundly(
        ops in prop::collection::vec((0..4u8, 0..32usize, 0..32usize), 1..24),
    ) {
        let mut b = KernelBuilder::new("random");
        let mut defined = vec![b.const_int(1), b.const_int(2), b.const_int(3)];
        for (op, lhs, rhs) in ops {
            let lhs = defined[lhs % defined.len()];
            let rhs = defined[rhs % defined.len()];
            let op = match op {
                0 => BinaryOp::Add,
                1 => BinaryOp::Sub,
                2 => BinaryOp::Mul,
                _ => BinaryOp::Min,
            };
            defined.push(b.binary(op, lhs, rhs));
        }
        for &stmt in &defined {
            b.print(stmt);
        }
        let kernel = b.finish();

        let mut optimized = kernel.clone();
        whole_kernel_cse(&mut optimized);
        prop_assert!(!whole_kernel_cse(&mut optimized), "pass is not idempotent");
        verify(&optimized).unwrap();
        prop_assert_eq!(eval(&kernel), eval(&optimized));
    }
}
