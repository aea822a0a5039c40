#![allow(dead_code)]

use cegar_rs::cfa::{Cfa, CfaBuilder, EdgeId, NodeId};
use cegar_rs::expr::{Formula, Term};

pub fn var(name: &str) -> Term {
    Term::var(format!("main::{}", name))
}

/// x = 0; if (x > 0) error;
pub fn constant() -> Cfa {
    let mut b = CfaBuilder::new();
    let main = b.function("main");
    let l1 = b.node("main");
    let err = b.error_node("main");
    b.assign(main.entry, l1, "main::x", Term::int(0));
    b.assume(l1, err, Formula::gt(var("x"), Term::int(0)));
    b.assume(l1, main.exit, Formula::le(var("x"), Term::int(0)));
    b.build("main")
}

pub struct Counter {
    pub cfa: Cfa,
    pub edges: Vec<EdgeId>,
    pub error: NodeId,
}

/// x = 0; x = x + 1; if (x == 1) error;
pub fn counter() -> Counter {
    let mut b = CfaBuilder::new();
    let main = b.function("main");
    let l1 = b.node("main");
    let l2 = b.node("main");
    let err = b.error_node("main");
    let e0 = b.assign(main.entry, l1, "main::x", Term::int(0));
    let e1 = b.assign(l1, l2, "main::x", var("x").add(Term::int(1)));
    let e2 = b.assume(l2, err, Formula::eq(var("x"), Term::int(1)));
    b.assume(l2, main.exit, Formula::ne(var("x"), Term::int(1)));
    Counter {
        cfa: b.build("main"),
        edges: vec![e0, e1, e2],
        error: err,
    }
}

/// x = 5; r = inc(x); if (r != 6) error;   or, with `buggy`, if (r == 6) error;
pub fn increment(buggy: bool) -> Cfa {
    let mut b = CfaBuilder::new();
    let main = b.function("main");
    let inc = b.function("inc");
    let l1 = b.node("main");
    let l2 = b.node("main");
    let err = b.error_node("main");
    b.return_value(inc.entry, "inc", Term::var("inc::a").add(Term::int(1)));
    b.assign(main.entry, l1, "main::x", Term::int(5));
    b.call(
        l1,
        l2,
        "inc",
        vec![("inc::a".to_string(), var("x"))],
        Some("main::r"),
    );
    let (bad, good) = if buggy {
        (Formula::eq(var("r"), Term::int(6)), Formula::ne(var("r"), Term::int(6)))
    } else {
        (Formula::ne(var("r"), Term::int(6)), Formula::eq(var("r"), Term::int(6)))
    };
    b.assume(l2, err, bad);
    b.assume(l2, main.exit, good);
    b.build("main")
}

/// x = 0; y = 0; while (*) { x++; y++; } if (x != y) error;
pub fn lockstep() -> Cfa {
    let mut b = CfaBuilder::new();
    let main = b.function("main");
    let l1 = b.node("main");
    let head = b.node("main");
    let body = b.node("main");
    let mid = b.node("main");
    let check = b.node("main");
    let err = b.error_node("main");
    b.assign(main.entry, l1, "main::x", Term::int(0));
    b.assign(l1, head, "main::y", Term::int(0));
    b.blank(head, body);
    b.assign(body, mid, "main::x", var("x").add(Term::int(1)));
    b.assign(mid, head, "main::y", var("y").add(Term::int(1)));
    b.blank(head, check);
    b.assume(check, err, Formula::ne(var("x"), var("y")));
    b.assume(check, main.exit, Formula::eq(var("x"), var("y")));
    b.build("main")
}

/// f() { f(); }   main() { f(); }
pub fn recursive() -> Cfa {
    let mut b = CfaBuilder::new();
    let main = b.function("main");
    let f = b.function("f");
    let after_main = b.node("main");
    let after_f = b.node("f");
    b.call(main.entry, after_main, "f", Vec::new(), None);
    b.call(f.entry, after_f, "f", Vec::new(), None);
    b.blank(after_f, f.exit);
    b.blank(after_main, main.exit);
    b.build("main")
}

/// x = 2 * y; if (x == 2 * z + 1) error;
pub fn parity() -> Cfa {
    let mut b = CfaBuilder::new();
    let main = b.function("main");
    let l1 = b.node("main");
    let err = b.error_node("main");
    let odd = Term::int(2).mul(var("z")).add(Term::int(1));
    b.assign(main.entry, l1, "main::x", Term::int(2).mul(var("y")));
    b.assume(l1, err, Formula::eq(var("x"), odd.clone()));
    b.assume(l1, main.exit, Formula::ne(var("x"), odd));
    b.build("main")
}
