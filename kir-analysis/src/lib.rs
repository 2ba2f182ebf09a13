//! Analyses over the Loom kernel IR.
//!
//! These are the read-only queries the transformation passes build on:
//! structural statement equivalence, semantic value equality, and the
//! address alias oracle.

mod alias;
mod equivalence;

pub use self::{
    alias::definitely_same_address,
    equivalence::{same_statements, same_value},
};
