//! Control-flow automata.
//!
//! A [`Cfa`] is a set of per-function graphs whose edges carry the program
//! operations. Calls are modelled by a call edge from the call site to the
//! callee entry and a return edge from the callee exit to the return site.

use std::collections::BTreeMap;
use std::fmt;

use crate::expr::{Formula, Term};

/// Name of the local variable holding a function's return value.
pub const RETURN_VAR: &str = "__ret";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Assign(String, Term),
    Havoc(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    Blank,
    Declaration(String),
    Assume(Formula),
    Statement(Statement),
    FunctionCall {
        callee: String,
        /// Pairs of (formal parameter, actual argument).
        bindings: Vec<(String, Term)>,
        return_site: NodeId,
    },
    Return {
        callee: String,
        lhs: Option<String>,
    },
}

impl EdgeKind {
    /// Blank and declaration edges carry no computation.
    pub fn is_trivial(&self) -> bool {
        matches!(self, EdgeKind::Blank | EdgeKind::Declaration(_))
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Blank => write!(f, "skip"),
            EdgeKind::Declaration(v) => write!(f, "int {}", v),
            EdgeKind::Assume(c) => write!(f, "[{}]", c),
            EdgeKind::Statement(Statement::Assign(v, t)) => write!(f, "{} = {}", v, t),
            EdgeKind::Statement(Statement::Havoc(v)) => write!(f, "{} = *", v),
            EdgeKind::FunctionCall {
                callee, bindings, ..
            } => {
                write!(f, "call {}(", callee)?;
                for (i, (_, actual)) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", actual)?;
                }
                write!(f, ")")
            }
            EdgeKind::Return { callee, lhs } => match lhs {
                Some(v) => write!(f, "{} = return {}", v, callee),
                None => write!(f, "return {}", callee),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub function: String,
    pub is_error: bool,
    pub leaving: Vec<EdgeId>,
    pub entering: Vec<EdgeId>,
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionInfo {
    pub entry: NodeId,
    pub exit: NodeId,
}

#[derive(Debug, Clone)]
pub struct Cfa {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    functions: BTreeMap<String, FunctionInfo>,
    entry: NodeId,
}

impl Cfa {
    /// Entry node of the program's main function.
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn leaving_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.node(id).leaving.iter().map(move |&e| self.edge(e))
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }

    pub fn is_error(&self, id: NodeId) -> bool {
        self.node(id).is_error
    }
}

/// Incremental CFA construction.
///
/// ```
/// use cegar_rs::cfa::CfaBuilder;
/// use cegar_rs::expr::{Formula, Term};
///
/// let mut b = CfaBuilder::new();
/// let main = b.function("main");
/// let err = b.error_node("main");
/// let l1 = b.node("main");
/// b.assign(main.entry, l1, "main::x", Term::int(0));
/// b.assume(l1, err, Formula::gt(Term::var("main::x"), Term::int(0)));
/// b.assume(l1, main.exit, Formula::le(Term::var("main::x"), Term::int(0)));
/// let cfa = b.build("main");
/// assert_eq!(cfa.num_nodes(), 4);
/// ```
#[derive(Debug, Default)]
pub struct CfaBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    functions: BTreeMap<String, FunctionInfo>,
}

impl CfaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a function, creating its entry and exit nodes.
    pub fn function(&mut self, name: &str) -> FunctionInfo {
        assert!(
            !self.functions.contains_key(name),
            "Function {} is already declared",
            name
        );
        let entry = self.node(name);
        let exit = self.node(name);
        let info = FunctionInfo { entry, exit };
        self.functions.insert(name.to_string(), info);
        info
    }

    pub fn node(&mut self, function: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            function: function.to_string(),
            is_error: false,
            leaving: Vec::new(),
            entering: Vec::new(),
        });
        id
    }

    pub fn error_node(&mut self, function: &str) -> NodeId {
        let id = self.node(function);
        self.nodes[id.0].is_error = true;
        id
    }

    pub fn edge(&mut self, source: NodeId, target: NodeId, kind: EdgeKind) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge {
            id,
            source,
            target,
            kind,
        });
        self.nodes[source.0].leaving.push(id);
        self.nodes[target.0].entering.push(id);
        id
    }

    pub fn blank(&mut self, source: NodeId, target: NodeId) -> EdgeId {
        self.edge(source, target, EdgeKind::Blank)
    }

    pub fn declare(&mut self, source: NodeId, target: NodeId, var: &str) -> EdgeId {
        self.edge(source, target, EdgeKind::Declaration(var.to_string()))
    }

    pub fn assume(&mut self, source: NodeId, target: NodeId, cond: Formula) -> EdgeId {
        self.edge(source, target, EdgeKind::Assume(cond))
    }

    pub fn assign(&mut self, source: NodeId, target: NodeId, var: &str, value: Term) -> EdgeId {
        self.edge(
            source,
            target,
            EdgeKind::Statement(Statement::Assign(var.to_string(), value)),
        )
    }

    pub fn havoc(&mut self, source: NodeId, target: NodeId, var: &str) -> EdgeId {
        self.edge(
            source,
            target,
            EdgeKind::Statement(Statement::Havoc(var.to_string())),
        )
    }

    /// Assign `value` to the return variable of `function` and jump to its exit.
    pub fn return_value(&mut self, source: NodeId, function: &str, value: Term) -> EdgeId {
        let exit = self.function_info(function).exit;
        let var = format!("{}::{}", function, RETURN_VAR);
        self.assign(source, exit, &var, value)
    }

    /// Add the call edge `source -> callee.entry` and the return edge
    /// `callee.exit -> return_site`, returning both.
    pub fn call(
        &mut self,
        source: NodeId,
        return_site: NodeId,
        callee: &str,
        bindings: Vec<(String, Term)>,
        lhs: Option<&str>,
    ) -> (EdgeId, EdgeId) {
        let info = self.function_info(callee);
        let call = self.edge(
            source,
            info.entry,
            EdgeKind::FunctionCall {
                callee: callee.to_string(),
                bindings,
                return_site,
            },
        );
        let ret = self.edge(
            info.exit,
            return_site,
            EdgeKind::Return {
                callee: callee.to_string(),
                lhs: lhs.map(str::to_string),
            },
        );
        (call, ret)
    }

    fn function_info(&self, name: &str) -> FunctionInfo {
        match self.functions.get(name) {
            Some(info) => *info,
            None => panic!("Function {} is not declared", name),
        }
    }

    pub fn build(self, main: &str) -> Cfa {
        let entry = self.function_info(main).entry;
        Cfa {
            nodes: self.nodes,
            edges: self.edges,
            functions: self.functions,
            entry,
        }
    }
}
