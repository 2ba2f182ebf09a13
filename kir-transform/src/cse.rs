use loomc_kir::{
    Block, DelayedModifier, Kernel, Report, Stmt, StmtData, StmtKind,
    pass::{Pass, PostPassStatus},
};
use loomc_kir_analysis::{definitely_same_address, same_statements, same_value};
use loomc_session::Session;
use rustc_hash::{FxHashMap, FxHashSet};

/// Whole-kernel common subexpression elimination.
///
/// Walks the entire kernel tree, tracking which computations are available
/// for reuse at each point of the traversal, and rewrites later duplicates
/// of an earlier side-effect-free computation to reuse its result. A
/// computation defined inside a nested block is only available within that
/// block's lexical extent. Conditionals additionally have a shared leading
/// or trailing statement of their two arms hoisted out, which exposes the
/// hoisted statement to elimination against the surrounding scope on the
/// next traversal. The pass repeats until a traversal commits no edits.
pub struct WholeKernelCse;

impl Pass for WholeKernelCse {
    fn name(&self) -> &'static str {
        "whole-kernel-cse"
    }

    fn run_on_kernel(
        &mut self,
        kernel: &mut Kernel,
        _session: &Session,
    ) -> Result<PostPassStatus, Report> {
        Ok(PostPassStatus::from(whole_kernel_cse(kernel)))
    }
}

/// Runs whole-kernel CSE on `kernel` until it reaches a fixpoint.
///
/// Returns `true` if the kernel was modified.
pub fn whole_kernel_cse(kernel: &mut Kernel) -> bool {
    let mut driver = CseDriver {
        kernel,
        visited: FxHashSet::default(),
        visible_stmts: Vec::new(),
        modifier: DelayedModifier::default(),
    };
    let mut modified = false;
    let mut traversals = 0usize;
    loop {
        traversals += 1;
        let root = driver.kernel.root();
        driver.visit_block(root);
        debug_assert!(driver.visible_stmts.is_empty(), "scope stack out of balance");
        if driver.commit() {
            modified = true;
        } else {
            break;
        }
    }
    log::debug!(
        target: "whole-kernel-cse",
        "kernel '{}' reached fixpoint after {traversals} traversal(s), changed={modified}",
        driver.kernel.name(),
    );
    modified
}

struct CseDriver<'a> {
    kernel: &'a mut Kernel,
    /// Statements already compared against every enclosing scope. Survives
    /// across traversals; shrinks only when a rewrite invalidates the
    /// conclusions a dependent statement was based on.
    visited: FxHashSet<Stmt>,
    /// One table of reuse candidates per lexical scope, innermost last,
    /// bucketed by statement kind. Rebuilt from scratch every traversal.
    visible_stmts: Vec<FxHashMap<StmtKind, FxHashSet<Stmt>>>,
    modifier: DelayedModifier,
}

impl CseDriver<'_> {
    fn is_done(&self, stmt: Stmt) -> bool {
        self.visited.contains(&stmt)
    }

    fn set_done(&mut self, stmt: Stmt) {
        self.visited.insert(stmt);
    }

    /// Drops the done status of every statement that consumes `stale`, so it
    /// is re-compared on its next visit.
    fn mark_undone(&mut self, stale: Stmt) {
        for user in self.kernel.users(stale) {
            self.visited.remove(user);
        }
    }

    fn register(&mut self, stmt: Stmt, kind: StmtKind) {
        self.visible_stmts
            .last_mut()
            .expect("no active scope")
            .entry(kind)
            .or_default()
            .insert(stmt);
    }

    fn commit(&mut self) -> bool {
        self.modifier.modify_ir(self.kernel)
    }

    /// Is `this` eliminable given that `prev` appears before it and has the
    /// same kind?
    fn common_statement_eliminable(&self, this: Stmt, prev: Stmt) -> bool {
        let kernel = &*self.kernel;
        match (kernel.data(this), kernel.data(prev)) {
            // An earlier activating address subsumes any later address of
            // the same cell; an earlier non-activating one only subsumes a
            // later non-activating one.
            (
                StmtData::FieldPtr {
                    activate: this_activate,
                    ..
                },
                StmtData::FieldPtr {
                    activate: prev_activate,
                    ..
                },
            ) => {
                definitely_same_address(kernel, this, prev)
                    && (this_activate == prev_activate || *prev_activate)
            }
            (StmtData::LoopUnique { .. }, StmtData::LoopUnique { .. }) => {
                same_value(kernel, kernel.operands(this)[0], kernel.operands(prev)[0])
            }
            (StmtData::Const(a), StmtData::Const(b)) => a == b,
            (StmtData::Unary(a), StmtData::Unary(b)) => {
                a == b && kernel.operands(this) == kernel.operands(prev)
            }
            (StmtData::Binary(a), StmtData::Binary(b)) => {
                a == b && kernel.operands(this) == kernel.operands(prev)
            }
            (StmtData::LoopIndex { axis: a }, StmtData::LoopIndex { axis: b }) => {
                a == b && kernel.operands(this) == kernel.operands(prev)
            }
            _ => unreachable!(
                "candidate table mixed statement kinds: {} vs {}",
                kernel.kind(this),
                kernel.kind(prev)
            ),
        }
    }

    fn visit_block(&mut self, block: Block) {
        self.visible_stmts.push(FxHashMap::default());
        let mut index = 0;
        while index < self.kernel.block(block).len() {
            let stmt = self.kernel.block(block).stmts()[index];
            match self.kernel.kind(stmt) {
                StmtKind::If => self.visit_if(stmt),
                StmtKind::RangeFor => {
                    let StmtData::RangeFor { body } = self.kernel.data(stmt) else {
                        unreachable!()
                    };
                    let body = *body;
                    self.visit_block(body);
                }
                _ => self.visit_stmt(stmt),
            }
            index += 1;
        }
        self.visible_stmts.pop();
    }

    fn visit_stmt(&mut self, stmt: Stmt) {
        if !self.kernel.is_cse_eligible(stmt) {
            return;
        }
        let kind = self.kernel.kind(stmt);
        if self.is_done(stmt) {
            // Tables are rebuilt every traversal, so a statement whose fate
            // was settled earlier still has to be re-registered.
            self.register(stmt, kind);
            return;
        }
        // Scan enclosing scopes, outermost in, for a reusable computation.
        // At most one candidate is taken; which one wins among several
        // equivalent candidates is arbitrary.
        let mut found = None;
        'scopes: for scope in &self.visible_stmts {
            if let Some(candidates) = scope.get(&kind) {
                for &prev in candidates {
                    if self.common_statement_eliminable(stmt, prev) {
                        found = Some(prev);
                        break 'scopes;
                    }
                }
            }
        }
        let Some(prev) = found else {
            self.register(stmt, kind);
            self.set_done(stmt);
            return;
        };
        log::trace!(target: "whole-kernel-cse", "replacing {stmt} with equivalent {prev}");
        // Everything that consumed `stmt` must be re-examined once it is
        // rewired (and, for loop-unique statements, once the retained
        // statement's coverage has grown).
        self.mark_undone(stmt);
        if let StmtData::LoopUnique { covers } = self.kernel.data(stmt) {
            let covers = covers.clone();
            self.kernel.union_coverage(prev, &covers);
        }
        self.kernel.replace_all_uses(stmt, prev);
        self.modifier.erase(stmt);
    }

    fn visit_if(&mut self, if_stmt: Stmt) {
        let StmtData::If { then_blk, else_blk } = self.kernel.data(if_stmt) else {
            unreachable!("{if_stmt} is not a conditional")
        };
        let (mut then_blk, mut else_blk) = (*then_blk, *else_blk);

        // An empty arm is the same as an absent one.
        if let Some(block) = then_blk
            && self.kernel.block(block).is_empty()
        {
            self.kernel.set_then_block(if_stmt, None);
            then_blk = None;
        }
        if let Some(block) = else_blk
            && self.kernel.block(block).is_empty()
        {
            self.kernel.set_else_block(if_stmt, None);
            else_blk = None;
        }

        // Move a statement shared by the beginning or the end of both arms
        // outside. Only the arm blocks are touched here, so the traversal of
        // the surrounding block is unaffected; the insertions next to the
        // conditional itself are deferred.
        if let (Some(then_blk), Some(else_blk)) = (then_blk, else_blk) {
            let then_first = self.kernel.block(then_blk).stmts()[0];
            let else_first = self.kernel.block(else_blk).stmts()[0];
            if same_statements(self.kernel, then_first, else_first) {
                log::trace!(
                    target: "whole-kernel-cse",
                    "hoisting {then_first} above {if_stmt}, replacing {else_first}"
                );
                let common = self.kernel.extract(then_blk, 0);
                self.kernel.replace_uses_in(else_blk, else_first, common);
                self.modifier.insert_before(if_stmt, common);
                self.kernel.erase(else_first);
            }
            if !self.kernel.block(then_blk).is_empty() && !self.kernel.block(else_blk).is_empty()
            {
                let then_last = *self.kernel.block(then_blk).stmts().last().unwrap();
                let else_last = *self.kernel.block(else_blk).stmts().last().unwrap();
                if same_statements(self.kernel, then_last, else_last) {
                    log::trace!(
                        target: "whole-kernel-cse",
                        "hoisting {then_last} below {if_stmt}, replacing {else_last}"
                    );
                    let index = self.kernel.block(then_blk).len() - 1;
                    let common = self.kernel.extract(then_blk, index);
                    self.kernel.replace_uses_in(else_blk, else_last, common);
                    self.modifier.insert_after(if_stmt, common);
                    self.kernel.erase(else_last);
                }
            }
        }

        if let Some(then_blk) = then_blk {
            self.visit_block(then_blk);
        }
        if let Some(else_blk) = else_blk {
            self.visit_block(else_blk);
        }
    }
}
