//! Compilation session and options for the Loom kernel compiler.
//!
//! A [Session] carries the configuration under which a single kernel (or a
//! batch of kernels) is compiled. The middle-end consults it for things like
//! whether to verify the IR around transformation passes, and how much IR to
//! dump while doing so.

use compact_str::CompactString;

pub mod diagnostics {
    //! Diagnostics infrastructure shared by the compiler crates.
    //!
    //! Currently this just re-exports the error reporting type used at pass
    //! boundaries.
    pub use miette::Report;
}

/// How aggressively the middle-end should optimize.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptLevel {
    /// Run no optimization passes.
    None,
    /// Run the standard pass pipeline.
    #[default]
    Basic,
    /// Run the standard pipeline plus the more expensive passes.
    Aggressive,
}

/// Middle-end configuration.
#[derive(Debug, Clone)]
pub struct Options {
    pub opt_level: OptLevel,
    /// Verify IR well-formedness before the pass pipeline and after each pass.
    pub verify_ir: bool,
    /// Dump the IR (via the `pass-manager` log target) after each pass.
    pub print_ir_after_all: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            opt_level: OptLevel::default(),
            verify_ir: cfg!(debug_assertions),
            print_ir_after_all: false,
        }
    }
}

impl Options {
    pub fn with_verify_ir(mut self, verify_ir: bool) -> Self {
        self.verify_ir = verify_ir;
        self
    }

    pub fn with_print_ir_after_all(mut self, print_ir_after_all: bool) -> Self {
        self.print_ir_after_all = print_ir_after_all;
        self
    }

    pub fn with_opt_level(mut self, opt_level: OptLevel) -> Self {
        self.opt_level = opt_level;
        self
    }
}

/// The context for a single compiler invocation.
#[derive(Debug, Clone)]
pub struct Session {
    /// The name of the translation unit being compiled, for logs and
    /// diagnostics.
    pub name: CompactString,
    pub options: Options,
}

impl Session {
    pub fn new(name: impl AsRef<str>, options: Options) -> Self {
        Self {
            name: CompactString::new(name.as_ref()),
            options,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new("main", Options::default())
    }
}
