//! The pass framework for kernel transformations.
//!
//! Passes operate on one [Kernel] at a time and report whether they changed
//! it. A [PassManager] strings passes together under the policy carried by
//! the [Session]: optional IR verification around passes, optional IR dumps
//! after each pass.

use std::ops::{BitOr, BitOrAssign};

use loomc_session::Session;

use crate::{Kernel, Report, verify};

/// Whether a pass changed the IR it ran on.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum PostPassStatus {
    #[default]
    Unchanged,
    Changed,
}

impl PostPassStatus {
    pub fn ir_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

impl From<bool> for PostPassStatus {
    fn from(changed: bool) -> Self {
        if changed { Self::Changed } else { Self::Unchanged }
    }
}

impl BitOr for PostPassStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::from(self.ir_changed() | rhs.ir_changed())
    }
}

impl BitOrAssign for PostPassStatus {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// A transformation applied to a whole kernel.
pub trait Pass {
    /// The short name used in logs.
    fn name(&self) -> &'static str;

    /// The identifier used to select this pass from pipeline descriptions.
    fn argument(&self) -> &'static str {
        self.name()
    }

    fn run_on_kernel(
        &mut self,
        kernel: &mut Kernel,
        session: &Session,
    ) -> Result<PostPassStatus, Report>;
}

/// Runs a sequence of passes over a kernel.
pub struct PassManager<'a> {
    session: &'a Session,
    passes: Vec<Box<dyn Pass>>,
}

impl<'a> PassManager<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            passes: Vec::new(),
        }
    }

    pub fn add_pass(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Runs every registered pass in order. Returns whether any pass changed
    /// the kernel.
    pub fn run(&mut self, kernel: &mut Kernel) -> Result<PostPassStatus, Report> {
        let options = &self.session.options;
        log::debug!(
            target: "pass-manager",
            "running {} pass(es) on kernel '{}' at opt level {:?}",
            self.passes.len(),
            kernel.name(),
            options.opt_level,
        );
        if options.verify_ir {
            verify(kernel)?;
        }
        let mut status = PostPassStatus::Unchanged;
        for pass in self.passes.iter_mut() {
            let pass_status = pass.run_on_kernel(kernel, self.session)?;
            log::debug!(
                target: "pass-manager",
                "{} finished on kernel '{}', changed={}",
                pass.name(),
                kernel.name(),
                pass_status.ir_changed(),
            );
            if options.print_ir_after_all {
                log::trace!(target: "pass-manager", "IR after {}:\n{kernel}", pass.name());
            }
            if options.verify_ir {
                verify(kernel)?;
            }
            status |= pass_status;
        }
        Ok(status)
    }
}
