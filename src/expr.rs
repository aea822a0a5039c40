//! First-order terms and formulas over integer program variables.
//!
//! The same types describe CFA statements and conditions (variables without
//! SSA index), path formulas (every variable carries its SSA index), and
//! predicate definitions (every variable at index 1).

use std::collections::BTreeSet;
use std::fmt;

/// Integer variable, optionally tagged with an SSA index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var {
    pub name: String,
    pub index: Option<u32>,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn indexed(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }

    /// Function owning this variable, for names of the form `f::x`.
    pub fn function(&self) -> Option<&str> {
        self.name.split_once("::").map(|(f, _)| f)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}@{}", self.name, i),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Int(i64),
    Var(Var),
    Neg(Box<Term>),
    Add(Box<Term>, Box<Term>),
    Sub(Box<Term>, Box<Term>),
    Mul(Box<Term>, Box<Term>),
    /// Uninterpreted function application.
    App(String, Vec<Term>),
}

#[allow(clippy::should_implement_trait)]
impl Term {
    pub fn int(n: i64) -> Self {
        Term::Int(n)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(Var::new(name))
    }

    pub fn indexed(name: impl Into<String>, index: u32) -> Self {
        Term::Var(Var::indexed(name, index))
    }

    pub fn app(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::App(name.into(), args)
    }

    pub fn neg(self) -> Self {
        Term::Neg(Box::new(self))
    }

    pub fn add(self, other: Term) -> Self {
        Term::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Term) -> Self {
        Term::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Term) -> Self {
        Term::Mul(Box::new(self), Box::new(other))
    }

    /// Rewrite every variable through `f`.
    pub fn map_vars(&self, f: &dyn Fn(&Var) -> Var) -> Term {
        match self {
            Term::Int(n) => Term::Int(*n),
            Term::Var(v) => Term::Var(f(v)),
            Term::Neg(t) => Term::Neg(Box::new(t.map_vars(f))),
            Term::Add(a, b) => Term::Add(Box::new(a.map_vars(f)), Box::new(b.map_vars(f))),
            Term::Sub(a, b) => Term::Sub(Box::new(a.map_vars(f)), Box::new(b.map_vars(f))),
            Term::Mul(a, b) => Term::Mul(Box::new(a.map_vars(f)), Box::new(b.map_vars(f))),
            Term::App(name, args) => {
                Term::App(name.clone(), args.iter().map(|a| a.map_vars(f)).collect())
            }
        }
    }

    pub fn collect_vars(&self, out: &mut BTreeSet<Var>) {
        match self {
            Term::Int(_) => {}
            Term::Var(v) => {
                out.insert(v.clone());
            }
            Term::Neg(t) => t.collect_vars(out),
            Term::Add(a, b) | Term::Sub(a, b) | Term::Mul(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Term::App(_, args) => args.iter().for_each(|a| a.collect_vars(out)),
        }
    }

    /// True when the term leaves linear arithmetic: applications or a
    /// product of two non-constant factors.
    pub fn needs_uf(&self) -> bool {
        match self {
            Term::Int(_) | Term::Var(_) => false,
            Term::Neg(t) => t.needs_uf(),
            Term::Add(a, b) | Term::Sub(a, b) => a.needs_uf() || b.needs_uf(),
            Term::Mul(a, b) => {
                a.needs_uf() || b.needs_uf() || (a.constant().is_none() && b.constant().is_none())
            }
            Term::App(_, _) => true,
        }
    }

    /// Value of a variable-free arithmetic term.
    pub fn constant(&self) -> Option<i64> {
        match self {
            Term::Int(n) => Some(*n),
            Term::Var(_) | Term::App(_, _) => None,
            Term::Neg(t) => t.constant()?.checked_neg(),
            Term::Add(a, b) => a.constant()?.checked_add(b.constant()?),
            Term::Sub(a, b) => a.constant()?.checked_sub(b.constant()?),
            Term::Mul(a, b) => a.constant()?.checked_mul(b.constant()?),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Int(n) => write!(f, "{}", n),
            Term::Var(v) => write!(f, "{}", v),
            Term::Neg(t) => write!(f, "-({})", t),
            Term::Add(a, b) => write!(f, "({} + {})", a, b),
            Term::Sub(a, b) => write!(f, "({} - {})", a, b),
            Term::Mul(a, b) => write!(f, "({} * {})", a, b),
            Term::App(name, args) => {
                write!(f, "{}(", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CmpOp {
    Eq, // ==
    Ne, // !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

impl CmpOp {
    /// Returns the negation of this operator.
    pub fn negate(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Formula {
    True,
    False,
    Cmp(CmpOp, Term, Term),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

#[allow(clippy::should_implement_trait)]
impl Formula {
    pub fn cmp(op: CmpOp, lhs: Term, rhs: Term) -> Self {
        Formula::Cmp(op, lhs, rhs)
    }

    pub fn eq(lhs: Term, rhs: Term) -> Self {
        Formula::Cmp(CmpOp::Eq, lhs, rhs)
    }

    pub fn ne(lhs: Term, rhs: Term) -> Self {
        Formula::Cmp(CmpOp::Ne, lhs, rhs)
    }

    pub fn lt(lhs: Term, rhs: Term) -> Self {
        Formula::Cmp(CmpOp::Lt, lhs, rhs)
    }

    pub fn le(lhs: Term, rhs: Term) -> Self {
        Formula::Cmp(CmpOp::Le, lhs, rhs)
    }

    pub fn gt(lhs: Term, rhs: Term) -> Self {
        Formula::Cmp(CmpOp::Gt, lhs, rhs)
    }

    pub fn ge(lhs: Term, rhs: Term) -> Self {
        Formula::Cmp(CmpOp::Ge, lhs, rhs)
    }

    /// Negation, with constants and double negations folded.
    pub fn not(self) -> Self {
        match self {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }

    /// Flattening conjunction; `true` conjuncts vanish, any `false` wins.
    pub fn and(parts: impl IntoIterator<Item = Formula>) -> Self {
        let mut out = Vec::new();
        for part in parts {
            match part {
                Formula::True => {}
                Formula::False => return Formula::False,
                Formula::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Formula::True,
            1 => out.pop().unwrap_or(Formula::True),
            _ => Formula::And(out),
        }
    }

    /// Flattening disjunction; `false` disjuncts vanish, any `true` wins.
    pub fn or(parts: impl IntoIterator<Item = Formula>) -> Self {
        let mut out = Vec::new();
        for part in parts {
            match part {
                Formula::False => {}
                Formula::True => return Formula::True,
                Formula::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Formula::False,
            1 => out.pop().unwrap_or(Formula::False),
            _ => Formula::Or(out),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Formula::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Formula::False)
    }

    /// Rewrite every variable through `f`.
    pub fn map_vars(&self, f: &dyn Fn(&Var) -> Var) -> Formula {
        match self {
            Formula::True => Formula::True,
            Formula::False => Formula::False,
            Formula::Cmp(op, a, b) => Formula::Cmp(*op, a.map_vars(f), b.map_vars(f)),
            Formula::Not(inner) => Formula::Not(Box::new(inner.map_vars(f))),
            Formula::And(parts) => Formula::And(parts.iter().map(|p| p.map_vars(f)).collect()),
            Formula::Or(parts) => Formula::Or(parts.iter().map(|p| p.map_vars(f)).collect()),
        }
    }

    /// Put every variable at SSA index `index`.
    pub fn at_index(&self, index: u32) -> Formula {
        self.map_vars(&|v| Var::indexed(v.name.clone(), index))
    }

    pub fn vars(&self) -> BTreeSet<Var> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<Var>) {
        match self {
            Formula::True | Formula::False => {}
            Formula::Cmp(_, a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Formula::Not(inner) => inner.collect_vars(out),
            Formula::And(parts) | Formula::Or(parts) => {
                parts.iter().for_each(|p| p.collect_vars(out))
            }
        }
    }

    /// Distinct comparison atoms occurring in the formula, in order.
    pub fn atoms(&self) -> BTreeSet<Formula> {
        let mut out = BTreeSet::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms(&self, out: &mut BTreeSet<Formula>) {
        match self {
            Formula::True | Formula::False => {}
            Formula::Cmp(..) => {
                out.insert(self.clone());
            }
            Formula::Not(inner) => inner.collect_atoms(out),
            Formula::And(parts) | Formula::Or(parts) => {
                parts.iter().for_each(|p| p.collect_atoms(out))
            }
        }
    }

    pub fn needs_uf(&self) -> bool {
        match self {
            Formula::True | Formula::False => false,
            Formula::Cmp(_, a, b) => a.needs_uf() || b.needs_uf(),
            Formula::Not(inner) => inner.needs_uf(),
            Formula::And(parts) | Formula::Or(parts) => parts.iter().any(|p| p.needs_uf()),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Cmp(op, a, b) => write!(f, "{} {} {}", a, op.symbol(), b),
            Formula::Not(inner) => write!(f, "!({})", inner),
            Formula::And(parts) | Formula::Or(parts) => {
                let sep = if matches!(self, Formula::And(_)) { " && " } else { " || " };
                write!(f, "(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_or_simplification() {
        let a = Formula::le(Term::var("x"), Term::int(0));
        assert_eq!(Formula::and([Formula::True, a.clone()]), a);
        assert_eq!(Formula::and([a.clone(), Formula::False]), Formula::False);
        assert_eq!(Formula::or([Formula::False, a.clone()]), a);
        assert_eq!(Formula::or([a.clone(), Formula::True]), Formula::True);
        assert_eq!(Formula::and(Vec::new()), Formula::True);
        assert_eq!(a.clone().not().not(), a);
    }

    #[test]
    fn test_atoms_and_vars() {
        let a = Formula::le(Term::var("x"), Term::int(0));
        let b = Formula::eq(Term::var("y"), Term::var("x").add(Term::int(1)));
        let f = Formula::or([Formula::and([a.clone(), b.clone()]), a.clone().not()]);

        let atoms: Vec<_> = f.atoms().into_iter().collect();
        assert_eq!(atoms.len(), 2);
        assert!(atoms.contains(&a) && atoms.contains(&b));

        let vars: Vec<_> = f.vars().into_iter().map(|v| v.name).collect();
        assert_eq!(vars, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_at_index() {
        let f = Formula::gt(Term::indexed("x", 4), Term::var("y"));
        assert_eq!(
            f.at_index(1),
            Formula::gt(Term::indexed("x", 1), Term::indexed("y", 1))
        );
        assert_eq!(format!("{}", f), "x@4 > y");
    }

    #[test]
    fn test_needs_uf() {
        let linear = Formula::le(Term::int(3).mul(Term::var("x")), Term::var("y"));
        assert!(!linear.needs_uf());
        let product = Formula::le(Term::var("x").mul(Term::var("x")), Term::int(4));
        assert!(product.needs_uf());
        let app = Formula::eq(Term::app("f", vec![Term::var("x")]), Term::int(0));
        assert!(app.needs_uf());
    }

    #[test]
    fn test_var_function() {
        assert_eq!(Var::new("main::x").function(), Some("main"));
        assert_eq!(Var::new("g").function(), None);
    }
}
