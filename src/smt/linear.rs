//! In-process interpolating prover for linear integer arithmetic.
//!
//! Assertions are normalized into negation normal form whose literals are
//! linear constraints `Σ cᵢ·xᵢ + k ≤ 0` with exact integer coefficients.
//! Strict and negated comparisons are tightened over the integers (`a < b`
//! becomes `a - b + 1 ≤ 0`) and every input constraint is divided by the gcd
//! of its coefficients with the constant rounded up.
//!
//! Disjunctions are split case by case, pruning branches whose constraints
//! are already infeasible over the rationals. Each remaining cube is decided
//! over the integers by the Omega-style procedure in `smt::omega`.
//!
//! Interpolants come from Fourier–Motzkin refutations. Every derived
//! constraint remembers which non-negative combination of the A-side input
//! constraints it contains, and constraints derived from one side only are
//! rounded to the integers. When elimination reaches `k ≤ 0` with `k > 0`,
//! the A-part of that row is an interpolant of the cube pair (Farkas' lemma).
//! A cube pair that is infeasible only through divisibility has no linear
//! interpolant; the A-cube itself stands in for it. For disjunctive A and B
//! the interpolant is the disjunction over A-cubes of the conjunction over
//! B-cubes.
//!
//! Non-linear products and function applications are kept as opaque
//! arithmetic atoms.

use std::collections::{BTreeMap, HashMap};

use log::{debug, trace};
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::{Error, Result};
use crate::expr::{CmpOp, Formula, Term};
use crate::smt::omega::{self, Feasibility};
use crate::smt::{AllSatResult, ItpGroup, Prover};

/// Linear combination `Σ coeffs[t]·t + constant`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LinearExpr {
    pub(super) coeffs: BTreeMap<Term, BigInt>,
    pub(super) constant: BigInt,
}

impl LinearExpr {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: impl Into<BigInt>) -> Self {
        Self {
            coeffs: BTreeMap::new(),
            constant: value.into(),
        }
    }

    pub fn atom(term: Term) -> Self {
        let mut coeffs = BTreeMap::new();
        coeffs.insert(term, BigInt::one());
        Self {
            coeffs,
            constant: BigInt::zero(),
        }
    }

    pub fn from_term(term: &Term) -> Self {
        match term {
            Term::Int(n) => Self::constant(*n),
            Term::Var(_) | Term::App(_, _) => Self::atom(term.clone()),
            Term::Neg(t) => Self::from_term(t).scaled(&-BigInt::one()),
            Term::Add(a, b) => {
                let mut res = Self::from_term(a);
                res.add_scaled(&Self::from_term(b), &BigInt::one());
                res
            }
            Term::Sub(a, b) => {
                let mut res = Self::from_term(a);
                res.add_scaled(&Self::from_term(b), &-BigInt::one());
                res
            }
            Term::Mul(a, b) => {
                let la = Self::from_term(a);
                let lb = Self::from_term(b);
                if la.is_constant() {
                    lb.scaled(&la.constant)
                } else if lb.is_constant() {
                    la.scaled(&lb.constant)
                } else {
                    Self::atom(term.clone())
                }
            }
        }
    }

    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    fn is_zero(&self) -> bool {
        self.is_constant() && self.constant.is_zero()
    }

    pub fn coeff(&self, term: &Term) -> BigInt {
        self.coeffs.get(term).cloned().unwrap_or_else(BigInt::zero)
    }

    pub fn scaled(&self, factor: &BigInt) -> Self {
        let mut res = Self::zero();
        res.add_scaled(self, factor);
        res
    }

    /// `self += factor · other`
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: &BigInt) {
        for (t, c) in &other.coeffs {
            let vanished = {
                let entry = self.coeffs.entry(t.clone()).or_insert_with(BigInt::zero);
                *entry += c * factor;
                entry.is_zero()
            };
            if vanished {
                self.coeffs.remove(t);
            }
        }
        self.constant += &other.constant * factor;
    }

    fn content(&self) -> BigInt {
        self.coeffs
            .values()
            .fold(BigInt::zero(), |acc, c| gcd(&acc, c))
    }

    /// Strongest integer consequence of `self ≤ 0` with coprime coefficients.
    pub(super) fn tightened(&self) -> Self {
        if self.is_constant() {
            return self.clone();
        }
        let g = self.content();
        if g.is_one() {
            return self.clone();
        }
        Self {
            coeffs: self.coeffs.iter().map(|(t, c)| (t.clone(), c / &g)).collect(),
            constant: ceil_div(&self.constant, &g),
        }
    }

    /// Replace `term` by `value`.
    pub(super) fn substitute(&self, term: &Term, value: &LinearExpr) -> Self {
        let c = self.coeff(term);
        if c.is_zero() {
            return self.clone();
        }
        let mut res = self.clone();
        res.coeffs.remove(term);
        res.add_scaled(value, &c);
        res
    }

    fn divided(&self, g: &BigInt) -> Self {
        Self {
            coeffs: self.coeffs.iter().map(|(t, c)| (t.clone(), c / g)).collect(),
            constant: &self.constant / g,
        }
    }

    /// Formula `self ≤ 0`, with positive terms on the left.
    pub fn to_le_formula(&self) -> Result<Formula> {
        if self.is_constant() {
            return Ok(if self.constant.is_positive() {
                Formula::False
            } else {
                Formula::True
            });
        }
        let mut lhs = Vec::new();
        let mut rhs = Vec::new();
        for (t, c) in &self.coeffs {
            let value = to_i64(c)?;
            if value > 0 {
                lhs.push(scaled_term(value, t));
            } else {
                rhs.push(scaled_term(-value, t));
            }
        }
        let k = to_i64(&self.constant)?;
        if k != 0 || rhs.is_empty() {
            rhs.push(Term::int(-k));
        }
        if lhs.is_empty() {
            lhs.push(Term::int(0));
        }
        Ok(Formula::le(sum(lhs), sum(rhs)))
    }
}

fn to_i64(value: &BigInt) -> Result<i64> {
    value
        .to_i64()
        .ok_or_else(|| Error::Solver(format!("coefficient {} does not fit in 64 bits", value)))
}

fn scaled_term(c: i64, t: &Term) -> Term {
    if c == 1 {
        t.clone()
    } else {
        Term::int(c).mul(t.clone())
    }
}

fn sum(mut terms: Vec<Term>) -> Term {
    let first = terms.remove(0);
    terms.into_iter().fold(first, |acc, t| acc.add(t))
}

fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
    let (mut a, mut b) = (a.abs(), b.abs());
    while !b.is_zero() {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a
}

fn ceil_div(k: &BigInt, g: &BigInt) -> BigInt {
    if k.is_positive() {
        (k + g - BigInt::one()) / g
    } else {
        k / g
    }
}

/// Negation normal form over linear constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Nnf {
    True,
    False,
    Leq(LinearExpr),
    And(Vec<Nnf>),
    Or(Vec<Nnf>),
}

/// Constraint `expr ≤ 0`, normalized for integer variables.
fn leq(expr: LinearExpr) -> Nnf {
    if expr.is_constant() {
        return if expr.constant.is_positive() {
            Nnf::False
        } else {
            Nnf::True
        };
    }
    Nnf::Leq(expr.tightened())
}

fn normalize(formula: &Formula, positive: bool) -> Nnf {
    match formula {
        Formula::True => {
            if positive {
                Nnf::True
            } else {
                Nnf::False
            }
        }
        Formula::False => {
            if positive {
                Nnf::False
            } else {
                Nnf::True
            }
        }
        Formula::Not(inner) => normalize(inner, !positive),
        Formula::And(parts) => {
            let parts = parts.iter().map(|p| normalize(p, positive)).collect();
            if positive {
                Nnf::And(parts)
            } else {
                Nnf::Or(parts)
            }
        }
        Formula::Or(parts) => {
            let parts = parts.iter().map(|p| normalize(p, positive)).collect();
            if positive {
                Nnf::Or(parts)
            } else {
                Nnf::And(parts)
            }
        }
        Formula::Cmp(op, a, b) => {
            let op = if positive { *op } else { op.negate() };
            let mut d = LinearExpr::from_term(a);
            d.add_scaled(&LinearExpr::from_term(b), &-BigInt::one());
            let neg = d.scaled(&-BigInt::one());
            let one = LinearExpr::constant(1);
            let plus_one = |mut e: LinearExpr| {
                e.add_scaled(&one, &BigInt::one());
                e
            };
            match op {
                CmpOp::Le => leq(d),
                CmpOp::Lt => leq(plus_one(d)),
                CmpOp::Ge => leq(neg),
                CmpOp::Gt => leq(plus_one(neg)),
                CmpOp::Eq => Nnf::And(vec![leq(d), leq(neg)]),
                CmpOp::Ne => Nnf::Or(vec![leq(plus_one(d)), leq(plus_one(neg))]),
            }
        }
    }
}

/// Constraint tracked through elimination together with its A-part.
#[derive(Debug, Clone)]
struct Row {
    expr: LinearExpr,
    a_part: LinearExpr,
}

impl Row {
    fn a_side(expr: LinearExpr) -> Self {
        Self {
            a_part: expr.clone(),
            expr,
        }
    }

    fn b_side(expr: LinearExpr) -> Self {
        Self {
            expr,
            a_part: LinearExpr::zero(),
        }
    }

    fn combine(p: &Row, lp: &BigInt, n: &Row, ln: &BigInt) -> Row {
        let mut expr = p.expr.scaled(lp);
        expr.add_scaled(&n.expr, ln);
        let mut a_part = p.a_part.scaled(lp);
        a_part.add_scaled(&n.a_part, ln);
        if a_part.is_zero() {
            return Row {
                expr: expr.tightened(),
                a_part,
            };
        }
        if a_part == expr {
            let expr = expr.tightened();
            return Row {
                a_part: expr.clone(),
                expr,
            };
        }
        let g = [&expr.constant, &a_part.constant]
            .into_iter()
            .chain(a_part.coeffs.values())
            .fold(expr.content(), |acc, c| gcd(&acc, c));
        if g > BigInt::one() {
            Row {
                expr: expr.divided(&g),
                a_part: a_part.divided(&g),
            }
        } else {
            Row { expr, a_part }
        }
    }
}

/// Fourier–Motzkin elimination. Returns the contradicting row `k ≤ 0`,
/// `k > 0`, if the constraints are infeasible over the rationals.
fn refute(mut rows: Vec<Row>) -> Option<Row> {
    loop {
        // Keep only the tightest row per left-hand side.
        let mut live: HashMap<BTreeMap<Term, BigInt>, Row> = HashMap::new();
        for row in rows {
            if row.expr.is_constant() {
                if row.expr.constant.is_positive() {
                    return Some(row);
                }
                continue;
            }
            match live.get(&row.expr.coeffs) {
                Some(old) if old.expr.constant >= row.expr.constant => {}
                _ => {
                    live.insert(row.expr.coeffs.clone(), row);
                }
            }
        }
        if live.is_empty() {
            return None;
        }
        let live: Vec<Row> = live.into_values().collect();

        let mut occurrences: BTreeMap<&Term, (usize, usize)> = BTreeMap::new();
        for row in &live {
            for (t, c) in &row.expr.coeffs {
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
            None => return None,
        };
        trace!("eliminating {} from {} rows", var, live.len());

        let mut pos = Vec::new();
        let mut neg = Vec::new();
        let mut next = Vec::new();
        for row in live {
            let c = row.expr.coeff(&var);
            if c.is_positive() {
                pos.push(row);
            } else if c.is_negative() {
                neg.push(row);
            } else {
                next.push(row);
            }
        }
        for p in &pos {
            for n in &neg {
                let cp = p.expr.coeff(&var);
                let cn = -n.expr.coeff(&var);
                next.push(Row::combine(p, &cn, n, &cp));
            }
        }
        rows = next;
    }
}

fn feasible(rows: &[LinearExpr]) -> bool {
    refute(rows.iter().cloned().map(Row::b_side).collect()).is_none()
}

/// Split the disjunctions of `pending` into cubes that are not known to be
/// infeasible, visiting each one. The visitor returns `false` to stop the
/// search; so does this function.
fn search<'a>(
    mut pending: Vec<&'a Nnf>,
    mut rows: Vec<LinearExpr>,
    visit: &mut dyn FnMut(&[LinearExpr], Feasibility) -> bool,
) -> bool {
    while let Some(item) = pending.pop() {
        match item {
            Nnf::True => {}
            Nnf::False => return true,
            Nnf::Leq(e) => rows.push(e.clone()),
            Nnf::And(parts) => pending.extend(parts.iter()),
            Nnf::Or(parts) => {
                if !feasible(&rows) {
                    return true;
                }
                for part in parts {
                    let mut branch = pending.clone();
                    branch.push(part);
                    if !search(branch, rows.clone(), visit) {
                        return false;
                    }
                }
                return true;
            }
        }
    }
    match omega::decide(&rows) {
        Feasibility::Unsat => true,
        res => visit(&rows, res),
    }
}

fn satisfiable(pending: Vec<&Nnf>) -> Result<bool> {
    let mut found = false;
    let mut unknown = false;
    search(pending, Vec::new(), &mut |_, res| {
        if res == Feasibility::Sat {
            found = true;
            return false;
        }
        unknown = true;
        true
    });
    if found {
        Ok(true)
    } else if unknown {
        Err(Error::Unknown)
    } else {
        Ok(false)
    }
}

/// Cubes of `pending` that may have integer solutions.
fn cubes(pending: Vec<&Nnf>) -> Vec<Vec<LinearExpr>> {
    let mut out = Vec::new();
    search(pending, Vec::new(), &mut |rows, _| {
        out.push(rows.to_vec());
        true
    });
    out
}

fn cube_formula(cube: &[LinearExpr]) -> Result<Formula> {
    let parts = cube
        .iter()
        .map(LinearExpr::to_le_formula)
        .collect::<Result<Vec<_>>>()?;
    Ok(Formula::and(parts))
}

fn enumerate<'a>(
    pending: Vec<&'a Nnf>,
    atoms: &'a [(Nnf, Nnf)],
    values: &mut Vec<bool>,
    callback: &mut dyn FnMut(&[bool]),
    count: &mut usize,
) -> Result<()> {
    if !satisfiable(pending.clone())? {
        return Ok(());
    }
    if values.len() == atoms.len() {
        callback(values);
        *count += 1;
        return Ok(());
    }
    let (pos, neg) = &atoms[values.len()];
    for (value, literal) in [(true, pos), (false, neg)] {
        let mut next = pending.clone();
        next.push(literal);
        values.push(value);
        enumerate(next, atoms, values, callback, count)?;
        values.pop();
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct LinearProver {
    assertions: Vec<(Nnf, Option<ItpGroup>)>,
    scopes: Vec<usize>,
    num_groups: usize,
    group: Option<ItpGroup>,
    uf: bool,
    queries: usize,
}

impl LinearProver {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> Vec<&Nnf> {
        self.assertions.iter().map(|(f, _)| f).collect()
    }
}

impl Prover for LinearProver {
    fn reset(&mut self) -> Result<()> {
        self.assertions.clear();
        self.scopes.clear();
        self.num_groups = 0;
        self.group = None;
        Ok(())
    }

    fn set_uf(&mut self, enabled: bool) {
        debug!("set_uf(enabled = {})", enabled);
        self.uf = enabled;
    }

    fn push(&mut self) -> Result<()> {
        self.scopes.push(self.assertions.len());
        Ok(())
    }

    fn pop(&mut self) -> Result<()> {
        match self.scopes.pop() {
            Some(len) => {
                self.assertions.truncate(len);
                Ok(())
            }
            None => Err(Error::Solver("pop without matching push".to_string())),
        }
    }

    fn assert_formula(&mut self, formula: &Formula) -> Result<()> {
        if formula.needs_uf() && !self.uf {
            debug!("treating non-linear terms of {} as opaque", formula);
        }
        self.assertions.push((normalize(formula, true), self.group));
        Ok(())
    }

    fn check_sat(&mut self) -> Result<bool> {
        self.queries += 1;
        let res = satisfiable(self.pending())?;
        debug!("check_sat() -> {}", if res { "sat" } else { "unsat" });
        Ok(res)
    }

    fn all_sat(
        &mut self,
        important: &[Formula],
        callback: &mut dyn FnMut(&[bool]),
    ) -> Result<AllSatResult> {
        self.queries += 1;
        if important.is_empty() {
            return Ok(if satisfiable(self.pending())? {
                AllSatResult::Trivial
            } else {
                AllSatResult::Models(0)
            });
        }
        let atoms: Vec<(Nnf, Nnf)> = important
            .iter()
            .map(|f| (normalize(f, true), normalize(f, false)))
            .collect();
        let mut values = Vec::with_capacity(atoms.len());
        let mut count = 0;
        enumerate(self.pending(), &atoms, &mut values, callback, &mut count)?;
        debug!("all_sat over {} atoms -> {} models", atoms.len(), count);
        Ok(AllSatResult::Models(count))
    }

    fn new_itp_group(&mut self) -> Result<ItpGroup> {
        let group = ItpGroup(self.num_groups);
        self.num_groups += 1;
        Ok(group)
    }

    fn set_itp_group(&mut self, group: ItpGroup) -> Result<()> {
        if group.0 >= self.num_groups {
            return Err(Error::Solver(format!("unknown interpolation group {}", group)));
        }
        self.group = Some(group);
        Ok(())
    }

    fn interpolant(&mut self, groups: &[ItpGroup]) -> Result<Formula> {
        self.queries += 1;
        let (a, b): (Vec<_>, Vec<_>) = self
            .assertions
            .iter()
            .partition(|(_, g)| g.map_or(false, |g| groups.contains(&g)));
        let a_cubes = cubes(a.into_iter().map(|(f, _)| f).collect());
        let b_cubes = cubes(b.into_iter().map(|(f, _)| f).collect());

        let mut disjuncts = Vec::with_capacity(a_cubes.len());
        for a_cube in &a_cubes {
            let mut conjuncts = Vec::with_capacity(b_cubes.len());
            for b_cube in &b_cubes {
                let rows = a_cube
                    .iter()
                    .cloned()
                    .map(Row::a_side)
                    .chain(b_cube.iter().cloned().map(Row::b_side))
                    .collect();
                if let Some(row) = refute(rows) {
                    conjuncts.push(row.a_part.to_le_formula()?);
                    continue;
                }
                let both: Vec<LinearExpr> = a_cube.iter().chain(b_cube).cloned().collect();
                match omega::decide(&both) {
                    Feasibility::Unsat => {
                        debug!("cube pair is infeasible only over the integers, using the A-cube");
                        conjuncts.push(cube_formula(a_cube)?);
                    }
                    Feasibility::Sat => return Err(Error::NotUnsat),
                    Feasibility::Unknown => return Err(Error::Unknown),
                }
            }
            disjuncts.push(Formula::and(conjuncts));
        }
        let res = Formula::or(disjuncts);
        debug!("interpolant(groups = {:?}) -> {}", groups, res);
        Ok(res)
    }

    fn queries(&self) -> usize {
        self.queries
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn x(i: u32) -> Term {
        Term::indexed("x", i)
    }

    fn y(i: u32) -> Term {
        Term::indexed("y", i)
    }

    fn is_sat(formulas: &[Formula]) -> bool {
        let mut prover = LinearProver::new();
        for f in formulas {
            prover.assert_formula(f).unwrap();
        }
        prover.check_sat().unwrap()
    }

    /// `a ⇒ itp`, `itp ∧ b` unsat, and `itp` speaks only about shared variables.
    fn assert_interpolant(a: &[Formula], b: &[Formula], itp: &Formula) {
        let mut not_implied = a.to_vec();
        not_implied.push(itp.clone().not());
        assert!(!is_sat(&not_implied), "A does not imply {}", itp);

        let mut with_b = b.to_vec();
        with_b.push(itp.clone());
        assert!(!is_sat(&with_b), "{} is consistent with B", itp);

        let a_vars = Formula::and(a.to_vec()).vars();
        let b_vars = Formula::and(b.to_vec()).vars();
        for v in itp.vars() {
            assert!(a_vars.contains(&v) && b_vars.contains(&v), "{} is not shared", v);
        }
    }

    #[test]
    fn test_linear_expr() {
        let t = Term::int(2).mul(x(1).sub(Term::int(3))).add(x(1));
        let e = LinearExpr::from_term(&t);
        assert_eq!(e.coeff(&x(1)), BigInt::from(3));
        assert_eq!(e.constant, BigInt::from(-6));
    }

    #[test]
    fn test_check_sat() {
        assert!(is_sat(&[Formula::le(x(1), Term::int(0))]));
        assert!(!is_sat(&[
            Formula::le(x(1), Term::int(0)),
            Formula::gt(x(1), Term::int(0)),
        ]));
        assert!(!is_sat(&[
            Formula::ne(x(1), Term::int(0)),
            Formula::ge(x(1), Term::int(0)),
            Formula::le(x(1), Term::int(0)),
        ]));
        assert!(is_sat(&[
            Formula::lt(x(1), y(1)),
            Formula::lt(y(1), x(1).add(Term::int(2))),
        ]));
        assert!(is_sat(&[Formula::False.not()]));
        assert!(!is_sat(&[Formula::False]));
    }

    #[test]
    fn test_integer_tightening() {
        // 2x = 1 has no integer solution.
        assert!(!is_sat(&[Formula::eq(
            Term::int(2).mul(x(1)),
            Term::int(1)
        )]));
        // x < y < x + 1 has none either.
        assert!(!is_sat(&[
            Formula::lt(x(1), y(1)),
            Formula::lt(y(1), x(1).add(Term::int(1))),
        ]));
    }

    #[test]
    fn test_push_pop() {
        let mut prover = LinearProver::new();
        prover.assert_formula(&Formula::ge(x(1), Term::int(5))).unwrap();
        prover.push().unwrap();
        prover.assert_formula(&Formula::lt(x(1), Term::int(3))).unwrap();
        assert!(!prover.check_sat().unwrap());
        prover.pop().unwrap();
        assert!(prover.check_sat().unwrap());
        assert!(prover.pop().is_err());
        assert_eq!(prover.queries(), 2);
    }

    #[test]
    fn test_all_sat() {
        let mut prover = LinearProver::new();
        prover.assert_formula(&Formula::eq(x(1), y(1))).unwrap();
        let atoms = [Formula::le(x(1), Term::int(0)), Formula::le(y(1), Term::int(0))];
        let mut models = Vec::new();
        let res = prover
            .all_sat(&atoms, &mut |m| models.push(m.to_vec()))
            .unwrap();
        assert_eq!(res, AllSatResult::Models(2));
        assert_eq!(models, vec![vec![true, true], vec![false, false]]);
    }

    #[test]
    fn test_all_sat_trivial() {
        let mut prover = LinearProver::new();
        prover.assert_formula(&Formula::eq(x(1), y(1))).unwrap();
        let res = prover.all_sat(&[], &mut |_| panic!("no models expected")).unwrap();
        assert_eq!(res, AllSatResult::Trivial);

        prover.assert_formula(&Formula::False).unwrap();
        let res = prover.all_sat(&[], &mut |_| {}).unwrap();
        assert_eq!(res, AllSatResult::Models(0));
    }

    #[test]
    fn test_interpolant_simple() {
        let a = vec![Formula::eq(x(2), Term::int(0))];
        let b = vec![Formula::gt(x(2), Term::int(0))];

        let mut prover = LinearProver::new();
        let ga = prover.new_itp_group().unwrap();
        let gb = prover.new_itp_group().unwrap();
        prover.set_itp_group(ga).unwrap();
        prover.assert_formula(&a[0]).unwrap();
        prover.set_itp_group(gb).unwrap();
        prover.assert_formula(&b[0]).unwrap();
        assert!(!prover.check_sat().unwrap());

        let itp = prover.interpolant(&[ga]).unwrap();
        assert_eq!(itp, Formula::le(x(2), Term::int(0)));
        assert_interpolant(&a, &b, &itp);
    }

    #[test]
    fn test_interpolant_relational() {
        let a = vec![
            Formula::eq(x(1), Term::int(0)),
            Formula::eq(y(1), Term::int(0)),
            Formula::eq(x(2), x(1).add(Term::int(1))),
            Formula::eq(y(2), y(1).add(Term::int(1))),
        ];
        let b = vec![Formula::ne(x(2), y(2))];

        let mut prover = LinearProver::new();
        let ga = prover.new_itp_group().unwrap();
        let gb = prover.new_itp_group().unwrap();
        prover.set_itp_group(ga).unwrap();
        for f in &a {
            prover.assert_formula(f).unwrap();
        }
        prover.set_itp_group(gb).unwrap();
        for f in &b {
            prover.assert_formula(f).unwrap();
        }
        assert!(!prover.check_sat().unwrap());

        let itp = prover.interpolant(&[ga]).unwrap();
        assert_interpolant(&a, &b, &itp);
    }

    #[test]
    fn test_interpolant_of_sat_query_fails() {
        let mut prover = LinearProver::new();
        let ga = prover.new_itp_group().unwrap();
        prover.set_itp_group(ga).unwrap();
        prover.assert_formula(&Formula::le(x(1), Term::int(0))).unwrap();
        assert!(matches!(prover.interpolant(&[ga]), Err(Error::NotUnsat)));
    }

    #[test]
    fn test_parity_needs_integer_reasoning() {
        // x = 2y and x = 2z + 1 only conflict over the integers.
        let z = Term::indexed("z", 1);
        let a = vec![Formula::eq(x(2), Term::int(2).mul(y(1)))];
        let b = vec![Formula::eq(x(2), Term::int(2).mul(z).add(Term::int(1)))];

        let mut prover = LinearProver::new();
        let ga = prover.new_itp_group().unwrap();
        let gb = prover.new_itp_group().unwrap();
        prover.set_itp_group(ga).unwrap();
        prover.assert_formula(&a[0]).unwrap();
        prover.set_itp_group(gb).unwrap();
        prover.assert_formula(&b[0]).unwrap();
        assert!(!prover.check_sat().unwrap());

        let itp = prover.interpolant(&[ga]).unwrap();
        let mut not_implied = a.clone();
        not_implied.push(itp.clone().not());
        assert!(!is_sat(&not_implied), "A does not imply {}", itp);
        let mut with_b = b.clone();
        with_b.push(itp.clone());
        assert!(!is_sat(&with_b), "{} is consistent with B", itp);
    }

    #[test]
    fn test_opaque_products() {
        let sq = x(1).mul(x(1));
        assert!(!is_sat(&[
            Formula::ge(sq.clone(), Term::int(4)),
            Formula::lt(sq, Term::int(4)),
        ]));
    }
}
