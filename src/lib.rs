//! # cegar-rs: predicate abstraction with counterexample-guided refinement
//!
//! **`cegar-rs`** is a software model checker core. It explores the abstract
//! reachability tree (ART) of a program given as a control-flow automaton
//! ([`Cfa`][crate::cfa::Cfa]), abstracts every reached state to a boolean
//! combination of tracked predicates, and refines the predicate precision
//! with Craig interpolants whenever an error path turns out to be spurious.
//!
//! ## How it works
//!
//! - **Regions** are BDDs over predicate variables, managed by the hash-consed
//!   [`Bdd`][crate::bdd::Bdd] manager with complement edges.
//! - **Abstraction** is either *Boolean* (All-SMT over the predicate atoms,
//!   precise) or *Cartesian* (one implication query per predicate, cheaper).
//!   See [`AbstractionStrategy`][crate::config::AbstractionStrategy].
//! - **Refinement** splits an infeasible path formula into one interpolation
//!   group per edge and attaches the interpolants, re-indexed to SSA index 1,
//!   as new predicates along the trace.
//! - **Provers** implement the [`Prover`][crate::smt::Prover] trait: the
//!   in-process [`LinearProver`][crate::smt::LinearProver] for linear integer
//!   arithmetic, or an external SMT-LIB2 process.
//!
//! ## Basic Usage
//!
//! ```rust
//! use cegar_rs::cegar::{Cegar, Verdict};
//! use cegar_rs::cfa::CfaBuilder;
//! use cegar_rs::config::Config;
//! use cegar_rs::expr::{Formula, Term};
//!
//! // x = 0; if (x > 0) error();
//! let mut b = CfaBuilder::new();
//! let main = b.function("main");
//! let l1 = b.node("main");
//! let err = b.error_node("main");
//! b.assign(main.entry, l1, "main::x", Term::int(0));
//! b.assume(l1, err, Formula::gt(Term::var("main::x"), Term::int(0)));
//! b.assume(l1, main.exit, Formula::le(Term::var("main::x"), Term::int(0)));
//! let cfa = b.build("main");
//!
//! let mut cegar = Cegar::new(&cfa, Config::default()).unwrap();
//! assert_eq!(cegar.run().unwrap(), Verdict::Safe);
//! assert_eq!(cegar.context().stats.refinements, 1);
//! ```
//!
//! ## Core Components
//!
//! - **[`cegar`]**: the worklist driver and the verdict.
//! - **[`transfer`]**: abstract successors, error detection and refinement.
//! - **[`abstraction`]**: abstract post computation and counterexample analysis.
//! - **[`predicate`]**: predicates, their BDD variables and the per-location precision.
//! - **[`smt`]**: the prover interface and its backends.
//! - **[`dot`]**: ART visualization with Graphviz.

pub mod abstraction;
pub mod art;
pub mod bdd;
pub mod cache;
pub mod cegar;
pub mod cfa;
pub mod config;
pub mod context;
pub mod domain;
pub mod dot;
pub mod error;
pub mod expr;
pub mod pathformula;
pub mod predicate;
pub mod reference;
pub mod smt;
pub mod table;
pub mod transfer;
pub mod utils;

pub use cegar::{Cegar, Verdict};
pub use config::Config;
pub use error::{Error, Result};
