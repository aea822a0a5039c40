//! Interpolating theorem provers.
//!
//! The engine talks to provers only through [`Prover`]. Two implementations
//! ship with the crate: the in-process [`LinearProver`] for linear integer
//! arithmetic, and [`SmtLibProver`], which drives an external SMT-LIB2
//! process. [`SessionProver`] restarts an inner prover every few queries.

use std::fmt;

use crate::error::Result;
use crate::expr::Formula;

pub mod linear;
mod omega;
pub mod session;
pub mod smtlib;

pub use linear::LinearProver;
pub use session::SessionProver;
pub use smtlib::SmtLibProver;

/// Handle of an interpolation group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItpGroup(pub usize);

impl fmt::Display for ItpGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AllSatResult {
    /// Number of models reported to the callback.
    Models(usize),
    /// No atoms were given and the assertions are satisfiable.
    Trivial,
}

pub trait Prover {
    /// Drop every assertion, scope and interpolation group.
    fn reset(&mut self) -> Result<()>;

    /// Enable or disable uninterpreted functions for the following queries.
    fn set_uf(&mut self, enabled: bool);

    fn push(&mut self) -> Result<()>;
    fn pop(&mut self) -> Result<()>;

    /// Assert a formula in the current scope and interpolation group.
    fn assert_formula(&mut self, formula: &Formula) -> Result<()>;

    /// Returns `true` for sat and `false` for unsat; unknown is an error.
    fn check_sat(&mut self) -> Result<bool>;

    /// Enumerate every truth assignment of `important` consistent with the
    /// current assertions, reporting each one to `callback`.
    fn all_sat(
        &mut self,
        important: &[Formula],
        callback: &mut dyn FnMut(&[bool]),
    ) -> Result<AllSatResult>;

    fn new_itp_group(&mut self) -> Result<ItpGroup>;

    /// Make `group` the group of the following assertions.
    fn set_itp_group(&mut self, group: ItpGroup) -> Result<()>;

    /// Interpolant of the assertions in `groups` against all the others.
    /// The last [`check_sat`][Prover::check_sat] must have returned unsat.
    fn interpolant(&mut self, groups: &[ItpGroup]) -> Result<Formula>;

    /// Number of satisfiability queries answered so far.
    fn queries(&self) -> usize;
}

impl<P: Prover + ?Sized> Prover for Box<P> {
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }
    fn set_uf(&mut self, enabled: bool) {
        (**self).set_uf(enabled)
    }
    fn push(&mut self) -> Result<()> {
        (**self).push()
    }
    fn pop(&mut self) -> Result<()> {
        (**self).pop()
    }
    fn assert_formula(&mut self, formula: &Formula) -> Result<()> {
        (**self).assert_formula(formula)
    }
    fn check_sat(&mut self) -> Result<bool> {
        (**self).check_sat()
    }
    fn all_sat(
        &mut self,
        important: &[Formula],
        callback: &mut dyn FnMut(&[bool]),
    ) -> Result<AllSatResult> {
        (**self).all_sat(important, callback)
    }
    fn new_itp_group(&mut self) -> Result<ItpGroup> {
        (**self).new_itp_group()
    }
    fn set_itp_group(&mut self, group: ItpGroup) -> Result<()> {
        (**self).set_itp_group(group)
    }
    fn interpolant(&mut self, groups: &[ItpGroup]) -> Result<Formula> {
        (**self).interpolant(groups)
    }
    fn queries(&self) -> usize {
        (**self).queries()
    }
}
