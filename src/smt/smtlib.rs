//! SMT-LIB2 printing and parsing, and a prover running as a child process.
//!
//! [`SmtLibProver`] speaks to an incremental interpolating solver over its
//! standard streams, using MathSAT-style `:interpolation-group` annotations
//! and `get-interpolant`. SSA-indexed variables are printed as quoted symbols
//! like `|main::x@2|`.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::expr::{CmpOp, Formula, Term, Var};
use crate::smt::{AllSatResult, ItpGroup, Prover};

/// Uninterpreted function standing for non-linear products.
const MUL: &str = "*";

fn symbol(v: &Var) -> String {
    format!("|{}|", v)
}

fn is_nonlinear(a: &Term, b: &Term) -> bool {
    a.constant().is_none() && b.constant().is_none()
}

pub fn term_to_smtlib(term: &Term) -> String {
    match term {
        Term::Int(n) if *n < 0 => format!("(- {})", n.unsigned_abs()),
        Term::Int(n) => n.to_string(),
        Term::Var(v) => symbol(v),
        Term::Neg(t) => format!("(- {})", term_to_smtlib(t)),
        Term::Add(a, b) => format!("(+ {} {})", term_to_smtlib(a), term_to_smtlib(b)),
        Term::Sub(a, b) => format!("(- {} {})", term_to_smtlib(a), term_to_smtlib(b)),
        Term::Mul(a, b) if is_nonlinear(a, b) => {
            format!("(|{}| {} {})", MUL, term_to_smtlib(a), term_to_smtlib(b))
        }
        Term::Mul(a, b) => format!("(* {} {})", term_to_smtlib(a), term_to_smtlib(b)),
        Term::App(name, args) if args.is_empty() => format!("|{}|", name),
        Term::App(name, args) => {
            let args: Vec<String> = args.iter().map(term_to_smtlib).collect();
            format!("(|{}| {})", name, args.join(" "))
        }
    }
}

pub fn to_smtlib(formula: &Formula) -> String {
    match formula {
        Formula::True => "true".to_string(),
        Formula::False => "false".to_string(),
        Formula::Cmp(op, a, b) => {
            let (a, b) = (term_to_smtlib(a), term_to_smtlib(b));
            match op {
                CmpOp::Eq => format!("(= {} {})", a, b),
                CmpOp::Ne => format!("(not (= {} {}))", a, b),
                CmpOp::Lt => format!("(< {} {})", a, b),
                CmpOp::Le => format!("(<= {} {})", a, b),
                CmpOp::Gt => format!("(> {} {})", a, b),
                CmpOp::Ge => format!("(>= {} {})", a, b),
            }
        }
        Formula::Not(inner) => format!("(not {})", to_smtlib(inner)),
        Formula::And(parts) | Formula::Or(parts) => {
            let op = if matches!(formula, Formula::And(_)) {
                "and"
            } else {
                "or"
            };
            let parts: Vec<String> = parts.iter().map(to_smtlib).collect();
            format!("({} {})", op, parts.join(" "))
        }
    }
}

fn collect_apps(term: &Term, out: &mut BTreeMap<String, usize>) {
    match term {
        Term::Int(_) | Term::Var(_) => {}
        Term::Neg(t) => collect_apps(t, out),
        Term::Add(a, b) | Term::Sub(a, b) => {
            collect_apps(a, out);
            collect_apps(b, out);
        }
        Term::Mul(a, b) => {
            if is_nonlinear(a, b) {
                out.insert(MUL.to_string(), 2);
            }
            collect_apps(a, out);
            collect_apps(b, out);
        }
        Term::App(name, args) => {
            out.insert(name.clone(), args.len());
            args.iter().for_each(|a| collect_apps(a, out));
        }
    }
}

fn formula_apps(formula: &Formula, out: &mut BTreeMap<String, usize>) {
    match formula {
        Formula::True | Formula::False => {}
        Formula::Cmp(_, a, b) => {
            collect_apps(a, out);
            collect_apps(b, out);
        }
        Formula::Not(inner) => formula_apps(inner, out),
        Formula::And(parts) | Formula::Or(parts) => {
            parts.iter().for_each(|p| formula_apps(p, out))
        }
    }
}

/// Declarations needed by `formula`: `(symbol, declare command)` pairs.
fn declarations(formula: &Formula) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = formula
        .vars()
        .iter()
        .map(|v| {
            let s = symbol(v);
            let decl = format!("(declare-fun {} () Int)", s);
            (s, decl)
        })
        .collect();
    let mut apps = BTreeMap::new();
    formula_apps(formula, &mut apps);
    for (name, arity) in apps {
        let s = format!("|{}|", name);
        let decl = format!(
            "(declare-fun {} ({}) Int)",
            s,
            vec!["Int"; arity].join(" ")
        );
        out.push((s, decl));
    }
    out
}

/// Self-contained SMT-LIB2 script asserting every formula.
pub fn script(formulas: &[Formula]) -> String {
    let all = Formula::And(formulas.to_vec());
    let logic = if all.needs_uf() { "QF_UFLIA" } else { "QF_LIA" };
    let mut out = format!("(set-logic {})\n", logic);
    for (_, decl) in declarations(&all) {
        out.push_str(&decl);
        out.push('\n');
    }
    for f in formulas {
        out.push_str(&format!("(assert {})\n", to_smtlib(f)));
    }
    out.push_str("(check-sat)\n");
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

pub fn parse_sexpr(input: &str) -> Result<SExpr> {
    let tokens = tokenize(input);
    let mut pos = 0;
    let res = parse_tokens(&tokens, &mut pos, input)?;
    if pos != tokens.len() {
        return Err(parse_error(input, "trailing input"));
    }
    Ok(res)
}

fn parse_error(response: &str, reason: &str) -> Error {
    Error::Parse {
        response: response.to_string(),
        reason: reason.to_string(),
    }
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '(' | ')' => {
                tokens.push(c.to_string());
                chars.next();
            }
            '|' => {
                let mut s = String::from("|");
                chars.next();
                for c in chars.by_ref() {
                    s.push(c);
                    if c == '|' {
                        break;
                    }
                }
                tokens.push(s);
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '(' || c == ')' || c.is_whitespace() {
                        break;
                    }
                    s.push(c);
                    chars.next();
                }
                tokens.push(s);
            }
        }
    }
    tokens
}

fn parse_tokens(tokens: &[String], pos: &mut usize, input: &str) -> Result<SExpr> {
    let token = tokens
        .get(*pos)
        .ok_or_else(|| parse_error(input, "unexpected end of input"))?;
    *pos += 1;
    match token.as_str() {
        "(" => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos).map(String::as_str) {
                    Some(")") => {
                        *pos += 1;
                        return Ok(SExpr::List(items));
                    }
                    Some(_) => items.push(parse_tokens(tokens, pos, input)?),
                    None => return Err(parse_error(input, "unbalanced parentheses")),
                }
            }
        }
        ")" => Err(parse_error(input, "unexpected `)`")),
        atom => Ok(SExpr::Atom(atom.to_string())),
    }
}

#[derive(Debug, Clone)]
enum Value {
    Bool(Formula),
    Int(Term),
}

/// Converts solver output back into formulas, expanding `let` bindings.
struct Reader<'a> {
    input: &'a str,
    scopes: Vec<HashMap<String, Value>>,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            scopes: Vec::new(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        parse_error(self.input, &reason.into())
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn formula(&mut self, e: &SExpr) -> Result<Formula> {
        match self.value(e)? {
            Value::Bool(f) => Ok(f),
            Value::Int(t) => Err(self.error(format!("expected a formula, found term {}", t))),
        }
    }

    fn term(&mut self, e: &SExpr) -> Result<Term> {
        match self.value(e)? {
            Value::Int(t) => Ok(t),
            Value::Bool(f) => Err(self.error(format!("expected a term, found formula {}", f))),
        }
    }

    fn value(&mut self, e: &SExpr) -> Result<Value> {
        match e {
            SExpr::Atom(a) => self.atom(a),
            SExpr::List(items) => {
                let (head, args) = match items.split_first() {
                    Some((SExpr::Atom(head), args)) => (head.as_str(), args),
                    _ => return Err(self.error("expected an operator")),
                };
                match head {
                    "let" => self.let_binding(args),
                    "and" | "or" => {
                        let parts = args
                            .iter()
                            .map(|a| self.formula(a))
                            .collect::<Result<Vec<_>>>()?;
                        Ok(Value::Bool(if head == "and" {
                            Formula::and(parts)
                        } else {
                            Formula::or(parts)
                        }))
                    }
                    "not" => {
                        let [arg] = args else {
                            return Err(self.error("`not` takes one argument"));
                        };
                        Ok(Value::Bool(self.formula(arg)?.not()))
                    }
                    "=>" => {
                        let [a, b] = args else {
                            return Err(self.error("`=>` takes two arguments"));
                        };
                        let a = self.formula(a)?;
                        let b = self.formula(b)?;
                        Ok(Value::Bool(Formula::or([a.not(), b])))
                    }
                    "=" | "<" | "<=" | ">" | ">=" => {
                        let [a, b] = args else {
                            return Err(self.error(format!("`{}` takes two arguments", head)));
                        };
                        let op = match head {
                            "=" => CmpOp::Eq,
                            "<" => CmpOp::Lt,
                            "<=" => CmpOp::Le,
                            ">" => CmpOp::Gt,
                            _ => CmpOp::Ge,
                        };
                        Ok(Value::Bool(Formula::cmp(op, self.term(a)?, self.term(b)?)))
                    }
                    "+" | "-" | "*" => {
                        let mut terms = args
                            .iter()
                            .map(|a| self.term(a))
                            .collect::<Result<Vec<_>>>()?;
                        if terms.is_empty() {
                            return Err(self.error(format!("`{}` without arguments", head)));
                        }
                        let first = terms.remove(0);
                        if head == "-" && terms.is_empty() {
                            return Ok(Value::Int(match first {
                                Term::Int(n) => Term::Int(-n),
                                t => t.neg(),
                            }));
                        }
                        Ok(Value::Int(terms.into_iter().fold(first, |acc, t| match head {
                            "+" => acc.add(t),
                            "-" => acc.sub(t),
                            _ => acc.mul(t),
                        })))
                    }
                    name => {
                        let args = args
                            .iter()
                            .map(|a| self.term(a))
                            .collect::<Result<Vec<_>>>()?;
                        let name = unquote(name);
                        if let (MUL, [a, b]) = (name, args.as_slice()) {
                            return Ok(Value::Int(a.clone().mul(b.clone())));
                        }
                        Ok(Value::Int(Term::app(name, args)))
                    }
                }
            }
        }
    }

    fn let_binding(&mut self, args: &[SExpr]) -> Result<Value> {
        let [SExpr::List(bindings), body] = args else {
            return Err(self.error("malformed `let`"));
        };
        let mut scope = HashMap::new();
        for binding in bindings {
            match binding {
                SExpr::List(pair) => match pair.as_slice() {
                    [SExpr::Atom(name), value] => {
                        let value = self.value(value)?;
                        scope.insert(name.clone(), value);
                    }
                    _ => return Err(self.error("malformed `let` binding")),
                },
                _ => return Err(self.error("malformed `let` binding")),
            }
        }
        self.scopes.push(scope);
        let res = self.value(body);
        self.scopes.pop();
        res
    }

    fn atom(&self, a: &str) -> Result<Value> {
        if let Some(v) = self.lookup(a) {
            return Ok(v.clone());
        }
        match a {
            "true" => return Ok(Value::Bool(Formula::True)),
            "false" => return Ok(Value::Bool(Formula::False)),
            _ => {}
        }
        if let Ok(n) = a.parse::<i64>() {
            return Ok(Value::Int(Term::int(n)));
        }
        let name = unquote(a);
        match name.rsplit_once('@') {
            Some((base, index)) => match index.parse::<u32>() {
                Ok(i) => Ok(Value::Int(Term::indexed(base, i))),
                Err(_) => Ok(Value::Int(Term::var(name))),
            },
            None => Ok(Value::Int(Term::var(name))),
        }
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('|')
        .and_then(|s| s.strip_suffix('|'))
        .unwrap_or(s)
}

/// Parse a formula printed by a solver, such as an interpolant.
pub fn parse_formula(input: &str) -> Result<Formula> {
    let e = parse_sexpr(input)?;
    Reader::new(input).formula(&e)
}

pub struct SmtLibProver {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    declared: HashSet<String>,
    translations: HashMap<Formula, String>,
    started: bool,
    /// The running context was opened without UF and must be reopened.
    reopen: bool,
    depth: usize,
    /// Assertions outside any scope and group, replayed on reopening.
    base: Vec<Formula>,
    num_groups: usize,
    uf: bool,
    queries: usize,
}

impl SmtLibProver {
    /// Spawn `command` with `args`; the process must read SMT-LIB2 on stdin.
    pub fn new(command: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Solver(format!("cannot start {}: {}", command, e)))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Solver("failed to capture solver stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Solver("failed to capture solver stdout".into()))?;
        debug!("started solver process {} {:?}", command, args);
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            declared: HashSet::new(),
            translations: HashMap::new(),
            started: false,
            reopen: false,
            depth: 0,
            base: Vec::new(),
            num_groups: 0,
            uf: false,
            queries: 0,
        })
    }

    fn send(&mut self, command: &str) -> Result<()> {
        trace!("> {}", command);
        writeln!(self.stdin, "{}", command)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Send a command and read one balanced response.
    fn query(&mut self, command: &str) -> Result<String> {
        self.send(command)?;
        let mut response = String::new();
        let mut depth = 0i64;
        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(Error::Solver(format!(
                    "solver closed its output while answering `{}`",
                    command
                )));
            }
            for c in line.chars() {
                match c {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
            }
            response.push_str(&line);
            if depth <= 0 && !response.trim().is_empty() {
                break;
            }
        }
        let response = response.trim().to_string();
        trace!("< {}", response);
        if response.starts_with("(error") {
            return Err(Error::Solver(response));
        }
        Ok(response)
    }

    fn start(&mut self) -> Result<()> {
        if self.started && self.reopen && self.depth == 0 {
            debug!("reopening solver context with uninterpreted functions");
            self.send("(reset)")?;
            self.started = false;
            self.declared.clear();
        }
        if self.started {
            return Ok(());
        }
        self.reopen = false;
        self.send("(set-option :produce-interpolants true)")?;
        self.send("(set-option :global-declarations true)")?;
        let logic = if self.uf { "QF_UFLIA" } else { "QF_LIA" };
        self.send(&format!("(set-logic {})", logic))?;
        self.started = true;
        let base = std::mem::take(&mut self.base);
        for f in &base {
            let text = self.translate(f)?;
            self.send(&format!("(assert {})", text))?;
        }
        self.base = base;
        Ok(())
    }

    fn translate(&mut self, formula: &Formula) -> Result<String> {
        self.start()?;
        for (s, decl) in declarations(formula) {
            if !self.declared.contains(&s) {
                self.send(&decl)?;
                self.declared.insert(s);
            }
        }
        if let Some(text) = self.translations.get(formula) {
            return Ok(text.clone());
        }
        let text = to_smtlib(formula);
        self.translations.insert(formula.clone(), text.clone());
        Ok(text)
    }

    fn read_values(&mut self, atoms: &[String]) -> Result<Vec<bool>> {
        let response = self.query(&format!("(get-value ({}))", atoms.join(" ")))?;
        let parsed = parse_sexpr(&response)?;
        let SExpr::List(pairs) = parsed else {
            return Err(parse_error(&response, "expected a list of values"));
        };
        if pairs.len() != atoms.len() {
            return Err(parse_error(&response, "wrong number of values"));
        }
        pairs
            .iter()
            .map(|pair| match pair {
                SExpr::List(items) => match items.last() {
                    Some(SExpr::Atom(v)) if v == "true" => Ok(true),
                    Some(SExpr::Atom(v)) if v == "false" => Ok(false),
                    _ => Err(parse_error(&response, "expected a boolean value")),
                },
                _ => Err(parse_error(&response, "expected a value pair")),
            })
            .collect()
    }
}

impl Drop for SmtLibProver {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl Prover for SmtLibProver {
    fn reset(&mut self) -> Result<()> {
        if self.started {
            self.send("(reset)")?;
        }
        // Declarations do not survive a reset, translated text does.
        self.started = false;
        self.reopen = false;
        self.depth = 0;
        self.base.clear();
        self.declared.clear();
        self.num_groups = 0;
        Ok(())
    }

    fn set_uf(&mut self, enabled: bool) {
        if !self.started {
            self.uf = enabled;
        } else if enabled && !self.uf {
            // A running QF_LIA context cannot declare functions.
            self.uf = true;
            self.reopen = true;
        }
    }

    fn push(&mut self) -> Result<()> {
        self.start()?;
        self.send("(push 1)")?;
        self.depth += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<()> {
        self.send("(pop 1)")?;
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    fn assert_formula(&mut self, formula: &Formula) -> Result<()> {
        self.start()?;
        if self.depth == 0 && self.num_groups == 0 {
            self.base.push(formula.clone());
        }
        let text = self.translate(formula)?;
        if self.num_groups > 0 {
            let group = self.num_groups - 1;
            self.send(&format!("(assert (! {} :interpolation-group g{}))", text, group))
        } else {
            self.send(&format!("(assert {})", text))
        }
    }

    fn check_sat(&mut self) -> Result<bool> {
        self.start()?;
        self.queries += 1;
        let response = self.query("(check-sat)")?;
        match response.as_str() {
            "sat" => Ok(true),
            "unsat" => Ok(false),
            "unknown" => Err(Error::Unknown),
            _ => Err(parse_error(&response, "expected sat, unsat or unknown")),
        }
    }

    fn all_sat(
        &mut self,
        important: &[Formula],
        callback: &mut dyn FnMut(&[bool]),
    ) -> Result<AllSatResult> {
        if important.is_empty() {
            return Ok(if self.check_sat()? {
                AllSatResult::Trivial
            } else {
                AllSatResult::Models(0)
            });
        }
        let atoms = important
            .iter()
            .map(|f| self.translate(f))
            .collect::<Result<Vec<_>>>()?;
        self.push()?;
        let mut count = 0;
        while self.check_sat()? {
            let values = self.read_values(&atoms)?;
            callback(&values);
            count += 1;
            let blocking: Vec<String> = atoms
                .iter()
                .zip(&values)
                .map(|(a, &v)| if v { format!("(not {})", a) } else { a.clone() })
                .collect();
            self.send(&format!("(assert (or {}))", blocking.join(" ")))?;
        }
        self.pop()?;
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
        // Groups are opened in order and assertions go to the newest one.
        if group.0 + 1 != self.num_groups {
            return Err(Error::Unsupported(format!(
                "asserting into the non-current interpolation group {}",
                group
            )));
        }
        Ok(())
    }

    fn interpolant(&mut self, groups: &[ItpGroup]) -> Result<Formula> {
        let names: BTreeSet<String> = groups.iter().map(|g| g.to_string()).collect();
        let names: Vec<String> = names.into_iter().collect();
        let response = self.query(&format!("(get-interpolant ({}))", names.join(" ")))?;
        parse_formula(&response)
    }

    fn queries(&self) -> usize {
        self.queries
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_print_formula() {
        let f = Formula::and([
            Formula::le(Term::indexed("main::x", 2), Term::int(-3)),
            Formula::ne(Term::var("y"), Term::indexed("z", 1).mul(Term::int(2))),
        ]);
        assert_eq!(
            to_smtlib(&f),
            "(and (<= |main::x@2| (- 3)) (not (= |y| (* |z@1| 2))))"
        );
    }

    #[test]
    fn test_parse_interpolant_with_let() {
        let text = "(let ((.def_1 (+ |x@2| (- |y@2|)))) (and (<= .def_1 0) (not (< .def_1 (- 1)))))";
        let f = parse_formula(text).unwrap();
        let d = Term::indexed("x", 2).add(Term::indexed("y", 2).neg());
        assert_eq!(
            f,
            Formula::and([
                Formula::le(d.clone(), Term::int(0)),
                Formula::lt(d, Term::int(-1)).not(),
            ])
        );
    }

    #[test]
    fn test_parse_round_trip_of_printed_formula() {
        let f = Formula::or([
            Formula::gt(Term::indexed("f::a", 3), Term::int(7)),
            Formula::eq(
                Term::app("g", vec![Term::indexed("b", 1)]),
                Term::indexed("c", 1).sub(Term::int(1)),
            ),
        ]);
        assert_eq!(parse_formula(&to_smtlib(&f)).unwrap(), f);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_formula("(and true"), Err(Error::Parse { .. })));
        assert!(matches!(parse_formula("(+ 1 2)"), Err(Error::Parse { .. })));
        assert!(matches!(parse_formula(")"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_nonlinear_product_is_uninterpreted() {
        let x = Term::indexed("x", 1);
        let f = Formula::eq(x.clone().mul(x.clone()), Term::int(4));
        let text = script(&[f.clone()]);
        assert!(text.starts_with("(set-logic QF_UFLIA)\n"));
        assert!(text.contains("(declare-fun |*| (Int Int) Int)\n"));
        assert!(text.contains("(assert (= (|*| |x@1| |x@1|) 4))\n"));
        assert_eq!(parse_formula(&to_smtlib(&f)).unwrap(), f);
    }

    /// Shell stand-in for a solver: logs every command and answers `sat`.
    const ECHO_SOLVER: &str = r#"while IFS= read -r line; do
  printf '%s\n' "$line" >> "$1"
  case "$line" in
    "(check-sat)") echo sat ;;
    "(exit)") exit 0 ;;
  esac
done"#;

    #[test]
    fn test_enabling_uf_reopens_context() {
        let log = std::env::temp_dir().join(format!("cegar-rs-smtlib-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&log);
        let args = vec![
            "-c".to_string(),
            ECHO_SOLVER.to_string(),
            "sh".to_string(),
            log.display().to_string(),
        ];
        let x = Term::indexed("x", 1);
        {
            let mut prover = SmtLibProver::new("sh", &args).unwrap();
            prover.assert_formula(&Formula::le(x.clone(), Term::int(0))).unwrap();
            prover.push().unwrap();
            assert!(prover.check_sat().unwrap());
            prover.pop().unwrap();

            prover.set_uf(true);
            prover.push().unwrap();
            prover
                .assert_formula(&Formula::lt(x.clone(), Term::app("h", vec![x.clone()])))
                .unwrap();
            assert!(prover.check_sat().unwrap());
            prover.pop().unwrap();
        }
        let transcript = std::fs::read_to_string(&log).unwrap();
        std::fs::remove_file(&log).unwrap();

        let lines: Vec<&str> = transcript.lines().collect();
        let logics: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|l| l.starts_with("(set-logic"))
            .collect();
        assert_eq!(logics, ["(set-logic QF_LIA)", "(set-logic QF_UFLIA)"]);
        let pos = |command: &str| lines.iter().position(|l| *l == command).unwrap();
        assert!(pos("(set-logic QF_LIA)") < pos("(reset)"));
        assert!(pos("(reset)") < pos("(set-logic QF_UFLIA)"));
        assert!(pos("(set-logic QF_UFLIA)") < pos("(declare-fun |h| (Int) Int)"));
        // The unscoped assertion and its declaration survive the reset.
        assert_eq!(transcript.matches("(declare-fun |x@1| () Int)").count(), 2);
        assert_eq!(transcript.matches("(assert (<= |x@1| 0))").count(), 2);
    }

    #[test]
    fn test_script() {
        let f = Formula::lt(Term::indexed("x", 1), Term::app("h", vec![Term::indexed("x", 1)]));
        let text = script(&[f]);
        assert!(text.starts_with("(set-logic QF_UFLIA)\n"));
        assert!(text.contains("(declare-fun |x@1| () Int)\n"));
        assert!(text.contains("(declare-fun |h| (Int) Int)\n"));
        assert!(text.contains("(assert (< |x@1| (|h| |x@1|)))\n"));
        assert!(text.ends_with("(check-sat)\n"));
    }
}
