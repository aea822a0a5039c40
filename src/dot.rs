//! ART to DOT (Graphviz) conversion.
//!
//! Every live state becomes a node labelled with its id, its CFA location and
//! its region rendered over the tracked predicates.
//!
//! - **Tree edges** are solid and labelled with the CFA edge.
//! - **Coverage edges** are dashed and point from a covered state to its coverer.
//! - **Error states** use the `error_shape`.
//!
//! # Examples
//!
//! ```
//! use cegar_rs::cegar::Cegar;
//! use cegar_rs::cfa::CfaBuilder;
//! use cegar_rs::config::Config;
//!
//! let mut b = CfaBuilder::new();
//! let main = b.function("main");
//! b.blank(main.entry, main.exit);
//! let cfa = b.build("main");
//!
//! let mut cegar = Cegar::new(&cfa, Config::default()).unwrap();
//! cegar.run().unwrap();
//! let dot = cegar.to_dot().unwrap();
//! assert!(dot.starts_with("digraph ART {"));
//! ```

use std::fmt::Write as _;

use crate::art::Art;
use crate::bdd::Bdd;
use crate::cegar::Cegar;
use crate::cfa::Cfa;
use crate::predicate::PredicateRegistry;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for ordinary states (default: "box")
    pub state_shape: &'static str,
    /// Shape for error states (default: "doubleoctagon")
    pub error_shape: &'static str,
    /// Style for coverage edges (default: "dashed")
    pub coverage_edge_style: &'static str,
    /// Whether to print the region of every state (default: true)
    pub show_regions: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            state_shape: "box",
            error_shape: "doubleoctagon",
            coverage_edge_style: "dashed",
            show_regions: true,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Art {
    pub fn to_dot(&self, cfa: &Cfa, bdd: &Bdd, registry: &PredicateRegistry) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(cfa, bdd, registry, &DotConfig::default())
    }

    pub fn to_dot_with_config(
        &self,
        cfa: &Cfa,
        bdd: &Bdd,
        registry: &PredicateRegistry,
        config: &DotConfig,
    ) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph ART {{")?;
        writeln!(dot, "node [shape={}];", config.state_shape)?;

        for (id, state) in self.states() {
            let mut label = format!("{} @ {}", id, state.location);
            if !state.stack.is_empty() {
                write!(label, " [depth {}]", state.stack.len())?;
            }
            if config.show_regions {
                let region = registry.region_to_formula(bdd, state.region);
                write!(label, "\\n{}", escape(&region.to_string()))?;
            }
            let mut attrs = format!("label=\"{}\"", label);
            if cfa.is_error(state.location) {
                write!(attrs, ", shape={}", config.error_shape)?;
            }
            if state.covered {
                attrs.push_str(", style=filled, fillcolor=lightgray");
            }
            writeln!(dot, "{} [{}];", id.0, attrs)?;
        }

        for (id, state) in self.states() {
            if let (Some(parent), Some(edge)) = (state.parent, state.edge) {
                let kind = escape(&cfa.edge(edge).kind.to_string());
                writeln!(dot, "{} -> {} [label=\"{}\"];", parent.0, id.0, kind)?;
            }
        }

        for (id, _) in self.states() {
            for covered in self.covered_by(id) {
                writeln!(
                    dot,
                    "{} -> {} [style={}, constraint=false];",
                    covered.0, id.0, config.coverage_edge_style
                )?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

impl Cegar<'_> {
    /// Render the current ART.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        let ctx = self.context();
        self.art().to_dot(self.cfa(), &ctx.bdd, &ctx.registry)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::cfa::CfaBuilder;
    use crate::config::Config;
    use crate::expr::{Formula, Term};

    /// x = 0; while (x < 2) x = x + 1;
    fn looping() -> Cfa {
        let mut b = CfaBuilder::new();
        let main = b.function("main");
        let head = b.node("main");
        let body = b.node("main");
        let x = || Term::var("main::x");
        b.assign(main.entry, head, "main::x", Term::int(0));
        b.assume(head, body, Formula::lt(x(), Term::int(2)));
        b.assign(body, head, "main::x", x().add(Term::int(1)));
        b.assume(head, main.exit, Formula::ge(x(), Term::int(2)));
        b.build("main")
    }

    #[test]
    fn test_to_dot_basic() {
        let cfa = looping();
        let mut cegar = Cegar::new(&cfa, Config::default()).unwrap();
        assert!(cegar.run().unwrap().is_safe());

        let dot = cegar.to_dot().unwrap();
        assert!(dot.starts_with("digraph ART {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("0 [label=\"S0 @ N0"));
        // Without predicates the loop head is revisited and covered.
        assert!(dot.contains("style=dashed"));
        assert!(dot.contains("fillcolor=lightgray"));
    }

    #[test]
    fn test_to_dot_with_config() {
        let cfa = looping();
        let mut cegar = Cegar::new(&cfa, Config::default()).unwrap();
        cegar.run().unwrap();
        let ctx = cegar.context();
        let config = DotConfig {
            show_regions: false,
            coverage_edge_style: "dotted",
            ..DotConfig::default()
        };
        let dot = cegar
            .art()
            .to_dot_with_config(&cfa, &ctx.bdd, &ctx.registry, &config)
            .unwrap();
        assert!(dot.contains("0 [label=\"S0 @ N0\"];"));
        assert!(dot.contains("style=dotted"));
        assert!(!dot.contains("style=dashed"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a \"b\" \\c"), "a \\\"b\\\" \\\\c");
    }
}
