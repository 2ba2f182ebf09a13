use std::fmt;

use super::{Block, Kernel, Stmt, StmtData};

// Textual form of a kernel, for logs and test output. One statement per
// line, nested blocks indented by two spaces.
impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "kernel {} {{", self.name())?;
        for (field, data) in self.fields() {
            let storage = if data.sparse { "sparse" } else { "dense" };
            writeln!(f, "  {field} = {storage} {}", data.name)?;
        }
        self.write_block(f, self.root(), 1)?;
        writeln!(f, "}}")
    }
}

impl Kernel {
    fn write_block(&self, f: &mut fmt::Formatter<'_>, block: Block, depth: usize) -> fmt::Result {
        for &stmt in self.block(block).stmts() {
            self.write_stmt(f, stmt, depth)?;
        }
        Ok(())
    }

    fn write_stmt(&self, f: &mut fmt::Formatter<'_>, stmt: Stmt, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{stmt} = ", "", indent = depth * 2)?;
        let operands = self.operands(stmt);
        match self.data(stmt) {
            StmtData::Const(value) => writeln!(f, "const {value}"),
            StmtData::Unary(op) => writeln!(f, "{op} {}", operands[0]),
            StmtData::Binary(op) => writeln!(f, "{op} {}, {}", operands[0], operands[1]),
            StmtData::LoopIndex { axis } => writeln!(f, "loop {} index {axis}", operands[0]),
            StmtData::FieldPtr { field, activate } => {
                write!(f, "ptr {}[", self.field(*field).name)?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{operand}")?;
                }
                write!(f, "]")?;
                if *activate {
                    write!(f, " activate")?;
                }
                writeln!(f)
            }
            StmtData::LoopUnique { covers } => {
                write!(f, "loop_unique {} covers [", operands[0])?;
                for (i, field) in covers.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.field(*field).name)?;
                }
                writeln!(f, "]")
            }
            StmtData::Load => writeln!(f, "load {}", operands[0]),
            StmtData::Store => writeln!(f, "store {}, {}", operands[0], operands[1]),
            StmtData::Print => writeln!(f, "print {}", operands[0]),
            StmtData::If { then_blk, else_blk } => {
                writeln!(f, "if {} {{", operands[0])?;
                if let Some(then_blk) = then_blk {
                    self.write_block(f, *then_blk, depth + 1)?;
                }
                if let Some(else_blk) = else_blk {
                    writeln!(f, "{:indent$}}} else {{", "", indent = depth * 2)?;
                    self.write_block(f, *else_blk, depth + 1)?;
                }
                writeln!(f, "{:indent$}}}", "", indent = depth * 2)
            }
            StmtData::RangeFor { body } => {
                writeln!(f, "for {}..{} {{", operands[0], operands[1])?;
                self.write_block(f, *body, depth + 1)?;
                writeln!(f, "{:indent$}}}", "", indent = depth * 2)
            }
        }
    }
}
