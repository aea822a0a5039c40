//! Integer feasibility of conjunctions of linear constraints `e ≤ 0`.
//!
//! Equalities are solved exactly, as in the Omega test. A variable with a
//! unit coefficient is substituted away. Otherwise the smallest coefficient
//! is reduced with the symmetric residue `a mod^ m` and a fresh variable,
//! until some coefficient becomes a unit. The remaining inequalities go
//! through Fourier–Motzkin elimination with every derived constraint rounded
//! to the integers. A model is rebuilt from the elimination stages, and a
//! fractional value is split by branch and bound, which gives up after a
//! fixed number of branches.

use std::collections::BTreeMap;

use log::trace;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::expr::Term;
use crate::smt::linear::LinearExpr;

/// Outcome of an integer feasibility check.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Feasibility {
    Sat,
    Unsat,
    /// Branch and bound or elimination ran out of budget.
    Unknown,
}

const BRANCH_LIMIT: usize = 64;
const EQUALITY_LIMIT: usize = 256;
const ROW_LIMIT: usize = 4096;

/// Whether the constraints `row ≤ 0` have a common integer solution.
pub fn decide(rows: &[LinearExpr]) -> Feasibility {
    let mut omega = Omega {
        fresh: 0,
        branches: BRANCH_LIMIT,
    };
    let res = omega.solve(rows.to_vec());
    trace!("integer feasibility of {} rows: {:?}", rows.len(), res);
    res
}

type Coeffs = BTreeMap<Term, BigInt>;

/// Bounds `lower ≤ Σ ≤ upper` of one linear form `Σ`.
#[derive(Debug, Default)]
struct Bounds {
    lower: Option<BigInt>,
    upper: Option<BigInt>,
}

/// Variable eliminated at one Fourier–Motzkin step, with the rows it was
/// eliminated from.
#[derive(Debug)]
struct Stage {
    var: Term,
    rows: Vec<LinearExpr>,
}

struct Omega {
    fresh: usize,
    branches: usize,
}

impl Omega {
    fn solve(&mut self, rows: Vec<LinearExpr>) -> Feasibility {
        let rows = match self.eliminate_equalities(rows) {
            Ok(rows) => rows,
            Err(res) => return res,
        };
        let stages = match project(rows.clone()) {
            Ok(stages) => stages,
            Err(res) => return res,
        };
        let Some((var, value)) = fractional(&stages) else {
            return Feasibility::Sat;
        };
        if self.branches == 0 {
            return Feasibility::Unknown;
        }
        self.branches -= 1;
        trace!("branching on {} = {}", var, value);

        let floor = value.floor().to_integer();
        let mut below = LinearExpr::atom(var.clone());
        below.constant = -&floor;
        let mut above = LinearExpr::atom(var).scaled(&-BigInt::one());
        above.constant = floor + BigInt::one();

        let mut unknown = false;
        for bound in [below, above] {
            let mut branch = rows.clone();
            branch.push(bound);
            match self.solve(branch) {
                Feasibility::Sat => return Feasibility::Sat,
                Feasibility::Unknown => unknown = true,
                Feasibility::Unsat => {}
            }
        }
        if unknown {
            Feasibility::Unknown
        } else {
            Feasibility::Unsat
        }
    }

    /// Substitute every equality away. Returns the remaining inequalities.
    fn eliminate_equalities(
        &mut self,
        mut rows: Vec<LinearExpr>,
    ) -> Result<Vec<LinearExpr>, Feasibility> {
        // Each round removes a variable or shrinks the coefficients of an equality.
        for _ in 0..EQUALITY_LIMIT + 4 * rows.len() {
            let forms = bounds(rows).ok_or(Feasibility::Unsat)?;
            let remaining = rows_of(&forms);
            let equality = forms
                .iter()
                .filter_map(|(coeffs, b)| match (&b.lower, &b.upper) {
                    (Some(l), Some(u)) if l == u => {
                        let (var, a) = coeffs.iter().min_by_key(|(_, c)| c.abs())?;
                        Some((coeffs, u, var, a))
                    }
                    _ => None,
                })
                .min_by_key(|(_, _, _, a)| a.abs());
            let Some((coeffs, u, var, a)) = equality else {
                return Ok(remaining);
            };
            let eq = LinearExpr {
                coeffs: coeffs.clone(),
                constant: -u,
            };
            let value = self.solve_for(&eq, var, a);
            trace!("eliminating {} through an equality", var);
            rows = remaining.iter().map(|r| r.substitute(var, &value)).collect();
        }
        Err(Feasibility::Unknown)
    }

    /// Value of `var` in terms of the other variables of `eq = 0`, where `a`
    /// is its coefficient and the coefficients of `eq` are coprime.
    fn solve_for(&mut self, eq: &LinearExpr, var: &Term, a: &BigInt) -> LinearExpr {
        let mut rest = eq.clone();
        rest.coeffs.remove(var);
        if a.abs().is_one() {
            // a·x + rest = 0 with a = ±1
            return rest.scaled(&-a);
        }
        // Σ (aᵢ mod^ m)·xᵢ + (c mod^ m) = m·σ, where a mod^ m = -sign(a).
        let m = a.abs() + BigInt::one();
        let sigma = Term::indexed("%sigma", self.fresh as u32);
        self.fresh += 1;
        let mut value = LinearExpr {
            coeffs: rest
                .coeffs
                .iter()
                .map(|(t, c)| (t.clone(), mod_hat(c, &m)))
                .filter(|(_, c)| !c.is_zero())
                .collect(),
            constant: mod_hat(&rest.constant, &m),
        };
        value.add_scaled(&LinearExpr::atom(sigma), &-&m);
        let sign = if a.is_positive() {
            BigInt::one()
        } else {
            -BigInt::one()
        };
        value.scaled(&sign)
    }
}

/// Symmetric residue: `a - m·⌊a/m + 1/2⌋`.
fn mod_hat(a: &BigInt, m: &BigInt) -> BigInt {
    let two = BigInt::from(2);
    a - m * floor_div(&(a * &two + m), &(m * &two))
}

/// `⌊a/b⌋` for `b > 0`.
fn floor_div(a: &BigInt, b: &BigInt) -> BigInt {
    let q = a / b;
    if (a % b).is_negative() {
        q - BigInt::one()
    } else {
        q
    }
}

fn negated(coeffs: &Coeffs) -> Coeffs {
    coeffs.iter().map(|(t, c)| (t.clone(), -c)).collect()
}

/// Tightest bounds per linear form, keyed by the form whose first
/// coefficient is positive. `None` if some bounds cross.
fn bounds(rows: Vec<LinearExpr>) -> Option<BTreeMap<Coeffs, Bounds>> {
    let mut forms: BTreeMap<Coeffs, Bounds> = BTreeMap::new();
    for row in rows {
        let row = row.tightened();
        if row.is_constant() {
            if row.constant.is_positive() {
                return None;
            }
            continue;
        }
        let leading_positive = row.coeffs.values().next().map_or(false, |c| c.is_positive());
        if leading_positive {
            // Σ + k ≤ 0
            let upper = -&row.constant;
            let b = forms.entry(row.coeffs).or_default();
            b.upper = Some(match b.upper.take() {
                Some(u) if u <= upper => u,
                _ => upper,
            });
        } else {
            // -Σ + k ≤ 0
            let lower = row.constant;
            let b = forms.entry(negated(&row.coeffs)).or_default();
            b.lower = Some(match b.lower.take() {
                Some(l) if l >= lower => l,
                _ => lower,
            });
        }
    }
    for b in forms.values() {
        if let (Some(l), Some(u)) = (&b.lower, &b.upper) {
            if l > u {
                return None;
            }
        }
    }
    Some(forms)
}

fn rows_of(forms: &BTreeMap<Coeffs, Bounds>) -> Vec<LinearExpr> {
    let mut rows = Vec::new();
    for (coeffs, b) in forms {
        if let Some(u) = &b.upper {
            rows.push(LinearExpr {
                coeffs: coeffs.clone(),
                constant: -u,
            });
        }
        if let Some(l) = &b.lower {
            rows.push(LinearExpr {
                coeffs: negated(coeffs),
                constant: l.clone(),
            });
        }
    }
    rows
}

/// Fourier–Motzkin elimination of every variable, rounding each derived row.
fn project(mut rows: Vec<LinearExpr>) -> Result<Vec<Stage>, Feasibility> {
    let mut stages = Vec::new();
    loop {
        let mut live: BTreeMap<Coeffs, LinearExpr> = BTreeMap::new();
        for row in rows {
            let row = row.tightened();
            if row.is_constant() {
                if row.constant.is_positive() {
                    return Err(Feasibility::Unsat);
                }
                continue;
            }
            match live.get(&row.coeffs) {
                Some(old) if old.constant >= row.constant => {}
                _ => {
                    live.insert(row.coeffs.clone(), row);
                }
            }
        }
        if live.is_empty() {
            return Ok(stages);
        }
        if live.len() > ROW_LIMIT {
            return Err(Feasibility::Unknown);
        }
        let live: Vec<LinearExpr> = live.into_values().collect();

        let mut occurrences: BTreeMap<&Term, (usize, usize)> = BTreeMap::new();
        for row in &live {
            for (t, c) in &row.coeffs {
                let entry = occurrences.entry(t).or_insert((0, 0));
                if c.is_positive() {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
            }
        }
        let var = match occurrences.iter().min_by_key(|(_, (p, n))| p * n) {
            Some((t, _)) => (*t).clone(),
            None => return Ok(stages),
        };

        let mut pos = Vec::new();
        let mut neg = Vec::new();
        let mut next = Vec::new();
        for row in &live {
            let c = row.coeff(&var);
            if c.is_positive() {
                pos.push(row);
            } else if c.is_negative() {
                neg.push(row);
            } else {
                next.push(row.clone());
            }
        }
        for p in &pos {
            for n in &neg {
                let cp = p.coeff(&var);
                let cn = -n.coeff(&var);
                let mut combined = p.scaled(&cn);
                combined.add_scaled(n, &cp);
                next.push(combined);
            }
        }
        stages.push(Stage { var, rows: live });
        rows = next;
    }
}

/// Rebuild a solution of the projected rows, last eliminated variable first.
/// Returns the first variable that could only get a fractional value.
fn fractional(stages: &[Stage]) -> Option<(Term, BigRational)> {
    let mut model: BTreeMap<Term, BigRational> = BTreeMap::new();
    let mut res = None;
    for stage in stages.iter().rev() {
        let mut lower: Option<BigRational> = None;
        let mut upper: Option<BigRational> = None;
        for row in &stage.rows {
            let c = row.coeff(&stage.var);
            if c.is_zero() {
                continue;
            }
            let mut rest = BigRational::from_integer(row.constant.clone());
            for (t, a) in &row.coeffs {
                if *t == stage.var {
                    continue;
                }
                // Variables that vanished without being eliminated are free.
                let v = model.entry(t.clone()).or_insert_with(BigRational::zero);
                rest += BigRational::from_integer(a.clone()) * &*v;
            }
            // c·x + rest ≤ 0
            let bound = -rest / BigRational::from_integer(c.clone());
            if c.is_positive() {
                upper = Some(match upper {
                    Some(u) if u <= bound => u,
                    _ => bound,
                });
            } else {
                lower = Some(match lower {
                    Some(l) if l >= bound => l,
                    _ => bound,
                });
            }
        }
        let value = pick(lower, upper);
        if res.is_none() && !value.is_integer() {
            res = Some((stage.var.clone(), value.clone()));
        }
        model.insert(stage.var.clone(), value);
    }
    res
}

/// Integer closest to zero in `[lower, upper]`, or `lower` if there is none.
fn pick(lower: Option<BigRational>, upper: Option<BigRational>) -> BigRational {
    let zero = BigRational::zero();
    match (lower, upper) {
        (None, None) => zero,
        (Some(l), None) => l.ceil().max(zero),
        (None, Some(u)) => u.floor().min(zero),
        (Some(l), Some(u)) => {
            let (lo, hi) = (l.ceil(), u.floor());
            if lo <= hi {
                zero.max(lo).min(hi)
            } else {
                l
            }
        }
    }
}
