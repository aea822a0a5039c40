use log::info;

use crate::error::Result;
use crate::expr::Formula;
use crate::smt::{AllSatResult, ItpGroup, Prover};

pub type ProverFactory = Box<dyn FnMut() -> Result<Box<dyn Prover>>>;

/// Prover that replaces its inner session after a number of queries.
///
/// A restart only happens between queries with no scope open. Formulas
/// asserted outside any scope are replayed into the new session. Sessions
/// that created interpolation groups are never restarted.
pub struct SessionProver {
    factory: ProverFactory,
    inner: Box<dyn Prover>,
    threshold: usize,
    depth: usize,
    base: Vec<Formula>,
    num_groups: usize,
    uf: bool,
    retired_queries: usize,
    restarts: usize,
}

impl SessionProver {
    /// A `threshold` of zero disables restarts.
    pub fn new(mut factory: ProverFactory, threshold: usize) -> Result<Self> {
        let inner = factory()?;
        Ok(Self {
            factory,
            inner,
            threshold,
            depth: 0,
            base: Vec::new(),
            num_groups: 0,
            uf: false,
            retired_queries: 0,
            restarts: 0,
        })
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }

    fn maybe_restart(&mut self) -> Result<()> {
        if self.threshold == 0
            || self.depth > 0
            || self.num_groups > 0
            || self.inner.queries() < self.threshold
        {
            return Ok(());
        }
        self.retired_queries += self.inner.queries();
        self.inner = (self.factory)()?;
        self.inner.set_uf(self.uf);
        for f in &self.base {
            self.inner.assert_formula(f)?;
        }
        self.restarts += 1;
        info!(
            "Restarted prover session #{} after {} queries",
            self.restarts, self.retired_queries
        );
        Ok(())
    }
}

impl Prover for SessionProver {
    fn reset(&mut self) -> Result<()> {
        self.depth = 0;
        self.base.clear();
        self.num_groups = 0;
        self.inner.reset()
    }

    fn set_uf(&mut self, enabled: bool) {
        self.uf = enabled;
        self.inner.set_uf(enabled);
    }

    fn push(&mut self) -> Result<()> {
        self.maybe_restart()?;
        self.depth += 1;
        self.inner.push()
    }

    fn pop(&mut self) -> Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.inner.pop()
    }

    fn assert_formula(&mut self, formula: &Formula) -> Result<()> {
        if self.depth == 0 {
            self.base.push(formula.clone());
        }
        self.inner.assert_formula(formula)
    }

    fn check_sat(&mut self) -> Result<bool> {
        self.maybe_restart()?;
        self.inner.check_sat()
    }

    fn all_sat(
        &mut self,
        important: &[Formula],
        callback: &mut dyn FnMut(&[bool]),
    ) -> Result<AllSatResult> {
        self.maybe_restart()?;
        self.inner.all_sat(important, callback)
    }

    fn new_itp_group(&mut self) -> Result<ItpGroup> {
        self.num_groups += 1;
        self.inner.new_itp_group()
    }

    fn set_itp_group(&mut self, group: ItpGroup) -> Result<()> {
        self.inner.set_itp_group(group)
    }

    fn interpolant(&mut self, groups: &[ItpGroup]) -> Result<Formula> {
        self.inner.interpolant(groups)
    }

    fn queries(&self) -> usize {
        self.retired_queries + self.inner.queries()
    }
}
