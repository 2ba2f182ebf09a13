use std::{collections::BTreeSet, fmt};

use cranelift_entity::entity_impl;
use smallvec::SmallVec;

use super::{Block, Field};

/// A handle to a statement stored in a [Kernel](super::Kernel).
///
/// Statement ids are arena slot indices: they are allocated monotonically and
/// never reused, so an id uniquely identifies one statement for the lifetime
/// of the kernel.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stmt(u32);
entity_impl!(Stmt, "s");

/// Binary operators over kernel scalars.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    CmpLt,
    CmpLe,
    CmpEq,
    CmpNe,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Min => "min",
            Self::Max => "max",
            Self::CmpLt => "cmp_lt",
            Self::CmpLe => "cmp_le",
            Self::CmpEq => "cmp_eq",
            Self::CmpNe => "cmp_ne",
        };
        f.write_str(name)
    }
}

/// Unary operators over kernel scalars.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    Abs,
    Sqrt,
    Floor,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Neg => "neg",
            Self::Not => "not",
            Self::Abs => "abs",
            Self::Sqrt => "sqrt",
            Self::Floor => "floor",
        };
        f.write_str(name)
    }
}

/// A 64-bit float stored by bit pattern, so constants hash and compare
/// exactly.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Ieee64(u64);

impl Ieee64 {
    pub fn with_float(value: f64) -> Self {
        Self(value.to_bits())
    }

    pub fn as_float(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl From<f64> for Ieee64 {
    fn from(value: f64) -> Self {
        Self::with_float(value)
    }
}

impl fmt::Debug for Ieee64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_float())
    }
}

impl fmt::Display for Ieee64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_float())
    }
}

/// An immediate constant operand.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Immediate {
    Int(i64),
    Float(Ieee64),
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

/// The payload of a statement: its shape, plus any kind-specific metadata.
///
/// Operands are not stored here; they live in the uniform operand list of the
/// containing [StmtNode], in the order documented per variant.
#[derive(Debug, Clone)]
pub enum StmtData {
    /// A compile-time constant. No operands.
    Const(Immediate),
    /// A unary arithmetic/logic operation. Operand 0 is the input.
    Unary(UnaryOp),
    /// A binary arithmetic/logic operation. Operands 0 and 1 are lhs and rhs.
    Binary(BinaryOp),
    /// The current index along `axis` of an enclosing loop. Operand 0 is the
    /// loop statement itself.
    LoopIndex { axis: u8 },
    /// The address of one cell of `field`. Operands are the index
    /// expressions, one per axis.
    ///
    /// When `activate` is set, computing the address materializes the sparse
    /// backing storage for the addressed cell, which is an observable side
    /// effect.
    FieldPtr { field: Field, activate: bool },
    /// Marks operand 0 as loop-unique: within each iteration of the
    /// enclosing loop it evaluates to a distinct value. `covers` is the set
    /// of fields whose cells this value is known to uniquely address; it only
    /// ever grows.
    LoopUnique { covers: BTreeSet<Field> },
    /// Reads the cell addressed by operand 0.
    Load,
    /// Writes operand 1 to the cell addressed by operand 0.
    Store,
    /// Emits operand 0 to the host. Used as the catch-all observable effect.
    Print,
    /// A two-armed conditional on operand 0. An absent arm is equivalent to
    /// an empty one.
    If {
        then_blk: Option<Block>,
        else_blk: Option<Block>,
    },
    /// A serial range loop over `operand 0 .. operand 1`.
    RangeFor { body: Block },
}

/// The closed set of statement shapes, without payloads.
///
/// This is the discriminant used to bucket statements wherever they are
/// grouped by shape, e.g. the candidate tables of the CSE pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StmtKind {
    Const,
    Unary,
    Binary,
    LoopIndex,
    FieldPtr,
    LoopUnique,
    Load,
    Store,
    Print,
    If,
    RangeFor,
}

impl fmt::Display for StmtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Const => "const",
            Self::Unary => "unary",
            Self::Binary => "binary",
            Self::LoopIndex => "loop_index",
            Self::FieldPtr => "field_ptr",
            Self::LoopUnique => "loop_unique",
            Self::Load => "load",
            Self::Store => "store",
            Self::Print => "print",
            Self::If => "if",
            Self::RangeFor => "range_for",
        };
        f.write_str(name)
    }
}

impl StmtData {
    pub fn kind(&self) -> StmtKind {
        match self {
            Self::Const(_) => StmtKind::Const,
            Self::Unary(_) => StmtKind::Unary,
            Self::Binary(_) => StmtKind::Binary,
            Self::LoopIndex { .. } => StmtKind::LoopIndex,
            Self::FieldPtr { .. } => StmtKind::FieldPtr,
            Self::LoopUnique { .. } => StmtKind::LoopUnique,
            Self::Load => StmtKind::Load,
            Self::Store => StmtKind::Store,
            Self::Print => StmtKind::Print,
            Self::If { .. } => StmtKind::If,
            Self::RangeFor { .. } => StmtKind::RangeFor,
        }
    }

    /// Whether this statement contains nested blocks.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::If { .. } | Self::RangeFor { .. })
    }

    /// Whether statements of this shape may be deduplicated by common
    /// subexpression elimination.
    ///
    /// A statement qualifies when recomputing it cannot be observed: loads
    /// depend on mutable memory, stores and prints have effects, and
    /// containers structure control flow. Field address computations qualify
    /// even when they activate, since activation of the same cell is
    /// idempotent; the pass itself enforces the ordering constraint between
    /// activating and non-activating addresses.
    pub fn is_cse_eligible(&self) -> bool {
        match self {
            Self::Const(_)
            | Self::Unary(_)
            | Self::Binary(_)
            | Self::LoopIndex { .. }
            | Self::FieldPtr { .. }
            | Self::LoopUnique { .. } => true,
            Self::Load | Self::Store | Self::Print | Self::If { .. } | Self::RangeFor { .. } => {
                false
            }
        }
    }

    /// The nested blocks of this statement, in source order.
    pub fn blocks(&self) -> SmallVec<[Block; 2]> {
        match self {
            Self::If { then_blk, else_blk } => {
                then_blk.iter().chain(else_blk.iter()).copied().collect()
            }
            Self::RangeFor { body } => SmallVec::from_slice(&[*body]),
            _ => SmallVec::new(),
        }
    }
}

/// A statement as stored in the kernel's statement arena.
#[derive(Debug, Clone)]
pub struct StmtNode {
    pub(super) data: StmtData,
    pub(super) operands: SmallVec<[Stmt; 2]>,
    /// Set once the statement has been erased. Dead slots are never reused.
    pub(super) dead: bool,
}

impl StmtNode {
    pub fn data(&self) -> &StmtData {
        &self.data
    }

    pub fn kind(&self) -> StmtKind {
        self.data.kind()
    }

    pub fn operands(&self) -> &[Stmt] {
        &self.operands
    }
}
