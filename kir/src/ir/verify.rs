use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;

use super::{Block, Kernel, Stmt};
use crate::Report;

/// A structural defect found by [verify].
#[derive(Debug, Error, Diagnostic)]
pub enum VerifierError {
    #[error("{stmt} resides in {block} but has been erased")]
    #[diagnostic(code(kir::verify::dead_resident))]
    DeadResident { stmt: Stmt, block: Block },

    #[error("{stmt} appears in more than one block")]
    #[diagnostic(code(kir::verify::duplicate_resident))]
    DuplicateResident { stmt: Stmt },

    #[error("{stmt} resides in {block} but its placement does not agree")]
    #[diagnostic(code(kir::verify::placement_mismatch))]
    PlacementMismatch { stmt: Stmt, block: Block },

    #[error("{block} is nested under {stmt} but does not name it as parent")]
    #[diagnostic(code(kir::verify::block_parent_mismatch))]
    BlockParentMismatch { block: Block, stmt: Stmt },

    #[error("operand {operand} of {stmt} has been erased")]
    #[diagnostic(code(kir::verify::dangling_operand))]
    DanglingOperand { stmt: Stmt, operand: Stmt },

    #[error("operand {operand} of {stmt} is not visible at its point of use")]
    #[diagnostic(code(kir::verify::operand_not_visible))]
    OperandNotVisible { stmt: Stmt, operand: Stmt },

    #[error("use-def index does not record {stmt} as a user of its operand {operand}")]
    #[diagnostic(code(kir::verify::missing_user_link))]
    MissingUserLink { stmt: Stmt, operand: Stmt },

    #[error("use-def index records {user} as a user of {stmt}, but it has no such operand")]
    #[diagnostic(code(kir::verify::stale_user_link))]
    StaleUserLink { stmt: Stmt, user: Stmt },

    #[error("{stmt} is alive but unreachable from the kernel root")]
    #[diagnostic(code(kir::verify::orphan))]
    Orphan { stmt: Stmt },
}

struct Verifier<'a> {
    kernel: &'a Kernel,
    /// Statements visible at the current point of the walk, one set per
    /// enclosing lexical scope.
    scopes: Vec<FxHashSet<Stmt>>,
    seen: FxHashSet<Stmt>,
}

impl Verifier<'_> {
    fn check_block(&mut self, block: Block) -> Result<(), VerifierError> {
        self.scopes.push(FxHashSet::default());
        for &stmt in self.kernel.block(block).stmts() {
            self.check_stmt(stmt, block)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn check_stmt(&mut self, stmt: Stmt, block: Block) -> Result<(), VerifierError> {
        if !self.kernel.is_alive(stmt) {
            return Err(VerifierError::DeadResident { stmt, block });
        }
        if !self.seen.insert(stmt) {
            return Err(VerifierError::DuplicateResident { stmt });
        }
        if self.kernel.parent_block(stmt) != Some(block) {
            return Err(VerifierError::PlacementMismatch { stmt, block });
        }
        for &operand in self.kernel.operands(stmt) {
            if !self.kernel.is_alive(operand) {
                return Err(VerifierError::DanglingOperand { stmt, operand });
            }
            if !self.scopes.iter().any(|scope| scope.contains(&operand)) {
                return Err(VerifierError::OperandNotVisible { stmt, operand });
            }
            if !self.kernel.users(operand).contains(&stmt) {
                return Err(VerifierError::MissingUserLink { stmt, operand });
            }
        }
        for &user in self.kernel.users(stmt) {
            if !self.kernel.is_alive(user) || !self.kernel.has_operand(user, stmt) {
                return Err(VerifierError::StaleUserLink { stmt, user });
            }
        }
        // The statement itself becomes visible to everything that follows in
        // this scope, including its own nested blocks (loop indices refer to
        // their enclosing loop).
        self.scopes
            .last_mut()
            .expect("scope stack is empty")
            .insert(stmt);
        for nested in self.kernel.data(stmt).blocks() {
            if self.kernel.block(nested).parent() != Some(stmt) {
                return Err(VerifierError::BlockParentMismatch {
                    block: nested,
                    stmt,
                });
            }
            self.check_block(nested)?;
        }
        Ok(())
    }
}

/// Checks the kernel tree for structural integrity: placement and parent
/// links agree, every operand is alive and lexically visible at its point of
/// use, and the use-def index matches the operand lists exactly.
pub fn verify(kernel: &Kernel) -> Result<(), Report> {
    let mut verifier = Verifier {
        kernel,
        scopes: Vec::new(),
        seen: FxHashSet::default(),
    };
    verifier.check_block(kernel.root())?;
    for stmt in kernel.stmt_ids() {
        if kernel.is_alive(stmt)
            && kernel.parent_block(stmt).is_none()
            && !verifier.seen.contains(&stmt)
        {
            return Err(VerifierError::Orphan { stmt }.into());
        }
    }
    Ok(())
}
