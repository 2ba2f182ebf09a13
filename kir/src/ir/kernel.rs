use std::collections::BTreeSet;

use compact_str::CompactString;
use cranelift_entity::{PrimaryMap, SecondaryMap, entity_impl};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::{Block, BlockNode, Stmt, StmtData, StmtKind, StmtNode, visit};

/// A handle to a field declared by a kernel.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Field(u32);
entity_impl!(Field, "field");

/// A field of the simulation state a kernel reads and writes.
#[derive(Debug, Clone)]
pub struct FieldData {
    pub name: CompactString,
    /// Sparse fields allocate backing storage lazily; addressing a cell of a
    /// sparse field may need to activate that storage first.
    pub sparse: bool,
}

/// A single kernel: the root of one IR tree, plus the arenas backing it.
///
/// All structural mutation goes through the methods here, which keep the
/// use-def index in sync with the operand lists. Ill-formed requests (erasing
/// a statement that is still used, touching an erased statement, ...) are
/// programmer errors and panic rather than corrupting the tree.
#[derive(Clone)]
pub struct Kernel {
    name: CompactString,
    stmts: PrimaryMap<Stmt, StmtNode>,
    blocks: PrimaryMap<Block, BlockNode>,
    fields: PrimaryMap<Field, FieldData>,
    /// For each statement, the set of statements that have it as an operand.
    users: SecondaryMap<Stmt, FxHashSet<Stmt>>,
    /// The block each statement currently resides in, if any.
    placement: SecondaryMap<Stmt, Option<Block>>,
    root: Block,
}

impl Kernel {
    pub fn new(name: impl AsRef<str>) -> Self {
        let mut blocks = PrimaryMap::new();
        let root = blocks.push(BlockNode {
            stmts: Vec::new(),
            parent: None,
        });
        Self {
            name: CompactString::new(name.as_ref()),
            stmts: PrimaryMap::new(),
            blocks,
            fields: PrimaryMap::new(),
            users: SecondaryMap::new(),
            placement: SecondaryMap::new(),
            root,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> Block {
        self.root
    }

    pub fn declare_field(&mut self, name: impl AsRef<str>, sparse: bool) -> Field {
        self.fields.push(FieldData {
            name: CompactString::new(name.as_ref()),
            sparse,
        })
    }

    pub fn field(&self, field: Field) -> &FieldData {
        &self.fields[field]
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &FieldData)> {
        self.fields.iter()
    }

    /// Every statement id ever allocated, dead slots included.
    pub fn stmt_ids(&self) -> impl Iterator<Item = Stmt> + '_ {
        self.stmts.keys()
    }

    pub fn stmt(&self, stmt: Stmt) -> &StmtNode {
        let node = &self.stmts[stmt];
        assert!(!node.dead, "{stmt} has been erased");
        node
    }

    pub fn data(&self, stmt: Stmt) -> &StmtData {
        &self.stmt(stmt).data
    }

    pub fn kind(&self, stmt: Stmt) -> StmtKind {
        self.stmt(stmt).kind()
    }

    pub fn operands(&self, stmt: Stmt) -> &[Stmt] {
        self.stmt(stmt).operands()
    }

    pub fn has_operand(&self, stmt: Stmt, operand: Stmt) -> bool {
        self.operands(stmt).contains(&operand)
    }

    pub fn is_cse_eligible(&self, stmt: Stmt) -> bool {
        self.data(stmt).is_cse_eligible()
    }

    pub fn is_alive(&self, stmt: Stmt) -> bool {
        !self.stmts[stmt].dead
    }

    /// The statements that currently have `stmt` as an operand.
    pub fn users(&self, stmt: Stmt) -> &FxHashSet<Stmt> {
        &self.users[stmt]
    }

    pub fn block(&self, block: Block) -> &BlockNode {
        &self.blocks[block]
    }

    /// The block `stmt` currently resides in, or `None` while it is detached.
    pub fn parent_block(&self, stmt: Stmt) -> Option<Block> {
        self.placement[stmt]
    }

    /// Creates a new statement, initially detached from any block.
    pub fn make_stmt(
        &mut self,
        data: StmtData,
        operands: impl IntoIterator<Item = Stmt>,
    ) -> Stmt {
        let operands: SmallVec<[Stmt; 2]> = operands.into_iter().collect();
        for &operand in &operands {
            assert!(self.is_alive(operand), "operand {operand} has been erased");
        }
        let stmt = self.stmts.push(StmtNode {
            data,
            operands,
            dead: false,
        });
        for operand in self.stmts[stmt].operands.clone() {
            self.users[operand].insert(stmt);
        }
        stmt
    }

    pub fn create_block(&mut self, parent: Option<Stmt>) -> Block {
        self.blocks.push(BlockNode {
            stmts: Vec::new(),
            parent,
        })
    }

    pub(super) fn set_block_parent(&mut self, block: Block, parent: Option<Stmt>) {
        self.blocks[block].parent = parent;
    }

    /// Appends a detached statement to the end of `block`.
    pub fn append(&mut self, block: Block, stmt: Stmt) {
        self.insert(block, self.blocks[block].stmts.len(), stmt);
    }

    /// Inserts a detached statement into `block` at `index`.
    pub fn insert(&mut self, block: Block, index: usize, stmt: Stmt) {
        assert!(self.is_alive(stmt), "{stmt} has been erased");
        assert!(
            self.placement[stmt].is_none(),
            "{stmt} already resides in a block"
        );
        self.blocks[block].stmts.insert(index, stmt);
        self.placement[stmt] = Some(block);
    }

    /// Detaches and returns the statement at `index` of `block`. The
    /// statement stays alive; references to it remain valid.
    pub fn extract(&mut self, block: Block, index: usize) -> Stmt {
        let stmt = self.blocks[block].stmts.remove(index);
        self.placement[stmt] = None;
        stmt
    }

    /// Inserts a detached statement immediately before `anchor` in the
    /// anchor's block.
    pub fn insert_before(&mut self, anchor: Stmt, stmt: Stmt) {
        let (block, index) = self.position(anchor);
        self.insert(block, index, stmt);
    }

    /// Inserts a detached statement immediately after `anchor` in the
    /// anchor's block.
    pub fn insert_after(&mut self, anchor: Stmt, stmt: Stmt) {
        let (block, index) = self.position(anchor);
        self.insert(block, index + 1, stmt);
    }

    fn position(&self, anchor: Stmt) -> (Block, usize) {
        let block = self.placement[anchor]
            .unwrap_or_else(|| panic!("{anchor} does not reside in a block"));
        let index = self.blocks[block]
            .stmts
            .iter()
            .position(|&s| s == anchor)
            .expect("placement points at a block that does not contain the statement");
        (block, index)
    }

    /// Erases `stmt`, detaching it from its block and releasing its operand
    /// links. Nested blocks are erased with it.
    ///
    /// Panics if anything still uses `stmt` once its own contents are gone.
    pub fn erase(&mut self, stmt: Stmt) {
        assert!(self.is_alive(stmt), "{stmt} has been erased twice");
        for block in self.stmts[stmt].data.blocks() {
            while let Some(&last) = self.blocks[block].stmts.last() {
                self.erase(last);
            }
        }
        assert!(
            self.users[stmt].is_empty(),
            "cannot erase {stmt}: it still has uses"
        );
        if self.placement[stmt].is_some() {
            let (block, index) = self.position(stmt);
            self.blocks[block].stmts.remove(index);
            self.placement[stmt] = None;
        }
        for operand in self.stmts[stmt].operands.clone() {
            self.users[operand].remove(&stmt);
        }
        let node = &mut self.stmts[stmt];
        node.operands.clear();
        node.dead = true;
    }

    /// Rewrites every reference to `old` anywhere in the kernel to `new`.
    pub fn replace_all_uses(&mut self, old: Stmt, new: Stmt) {
        if old == new {
            return;
        }
        assert!(self.is_alive(new), "{new} has been erased");
        let users: Vec<Stmt> = self.users[old].iter().copied().collect();
        for user in users {
            for slot in self.stmts[user].operands.iter_mut() {
                if *slot == old {
                    *slot = new;
                }
            }
            self.users[new].insert(user);
        }
        self.users[old].clear();
    }

    /// Rewrites references to `old` to `new`, but only within the subtree
    /// rooted at `block`.
    pub fn replace_uses_in(&mut self, block: Block, old: Stmt, new: Stmt) {
        if old == new {
            return;
        }
        for user in visit::collect_stmts(self, block) {
            if !self.has_operand(user, old) {
                continue;
            }
            for slot in self.stmts[user].operands.iter_mut() {
                if *slot == old {
                    *slot = new;
                }
            }
            self.users[old].remove(&user);
            self.users[new].insert(user);
        }
    }

    /// Grows the coverage set of a loop-unique statement by union.
    pub fn union_coverage(&mut self, stmt: Stmt, extra: &BTreeSet<Field>) {
        match &mut self.stmts[stmt].data {
            StmtData::LoopUnique { covers } => covers.extend(extra.iter().copied()),
            other => panic!("{stmt} is a {} statement, not loop_unique", other.kind()),
        }
    }

    /// Replaces the then-arm of a conditional. Detaching an arm requires it
    /// to be empty.
    pub fn set_then_block(&mut self, stmt: Stmt, block: Option<Block>) {
        let prev = match &mut self.stmts[stmt].data {
            StmtData::If { then_blk, .. } => std::mem::replace(then_blk, block),
            other => panic!("{stmt} is a {} statement, not if", other.kind()),
        };
        if let Some(prev) = prev
            && block.is_none()
        {
            debug_assert!(self.blocks[prev].is_empty(), "detached a non-empty arm");
        }
        if let Some(block) = block {
            self.set_block_parent(block, Some(stmt));
        }
    }

    /// Replaces the else-arm of a conditional. Detaching an arm requires it
    /// to be empty.
    pub fn set_else_block(&mut self, stmt: Stmt, block: Option<Block>) {
        let prev = match &mut self.stmts[stmt].data {
            StmtData::If { else_blk, .. } => std::mem::replace(else_blk, block),
            other => panic!("{stmt} is a {} statement, not if", other.kind()),
        };
        if let Some(prev) = prev
            && block.is_none()
        {
            debug_assert!(self.blocks[prev].is_empty(), "detached a non-empty arm");
        }
        if let Some(block) = block {
            self.set_block_parent(block, Some(stmt));
        }
    }
}
