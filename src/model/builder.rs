use std::collections::HashSet;

use anyhow::Result;
use log::debug;

use crate::ast::Node;
use crate::parser;

use super::error::{ValidationError, ValidationErrors};
use super::{Equation, Model, Symbol, SymbolKind};

#[derive(Debug)]
struct EquationDecl {
    lhs: Node,
    rhs: Node,
    sets: Vec<String>,
    label: Option<String>,
    attributes: Vec<String>,
    count: Option<usize>,
    time_ok: bool,
}

enum Last {
    Nothing,
    Symbol,
    Equation,
}

/// Assembles a [`Model`] from declarations. Problems are collected as they
/// are found and reported together by [`ModelBuilder::build`].
pub struct ModelBuilder {
    symbols: Vec<Symbol>,
    equations: Vec<EquationDecl>,
    errors: ValidationErrors,
    last: Last,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// unknown sets count as empty; they are reported separately
fn set_sizes(symbols: &[Symbol], domain: &[String]) -> usize {
    domain
        .iter()
        .map(|d| {
            symbols
                .iter()
                .find(|s| s.is_set() && &s.name == d)
                .map_or(0, |s| s.elements.len())
        })
        .product()
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            equations: Vec::new(),
            errors: ValidationErrors::new(),
            last: Last::Nothing,
        }
    }

    fn push_symbol(mut self, symbol: Symbol) -> Self {
        if self.symbols.iter().any(|s| s.name == symbol.name) {
            self.errors.push(ValidationError::new(
                "symbol declared more than once".to_string(),
                Some(symbol.name.clone()),
            ));
        }
        self.symbols.push(symbol);
        self.last = Last::Symbol;
        self
    }

    fn new_symbol(name: &str, kind: SymbolKind) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind,
            domain: Vec::new(),
            attributes: Vec::new(),
            description: String::new(),
            used: false,
            count: 0,
            elements: Vec::new(),
            supersets: Vec::new(),
        }
    }

    /// Declare a set with its elements and the sets it is a subset of.
    pub fn set(self, name: &str, elements: &[&str], supersets: &[&str]) -> Self {
        let symbol = Symbol {
            elements: strings(elements),
            supersets: strings(supersets),
            count: elements.len(),
            ..Self::new_symbol(name, SymbolKind::Set)
        };
        self.push_symbol(symbol)
    }

    pub fn parameter(self, name: &str, domain: &[&str], attributes: &[&str]) -> Self {
        let symbol = Symbol {
            domain: strings(domain),
            attributes: strings(attributes),
            ..Self::new_symbol(name, SymbolKind::Parameter)
        };
        self.push_symbol(symbol)
    }

    pub fn variable(self, name: &str, domain: &[&str], attributes: &[&str], description: &str) -> Self {
        let symbol = Symbol {
            domain: strings(domain),
            attributes: strings(attributes),
            description: description.to_string(),
            ..Self::new_symbol(name, SymbolKind::Variable)
        };
        self.push_symbol(symbol)
    }

    /// Set the description of the most recently declared symbol.
    pub fn describe(mut self, description: &str) -> Self {
        if let (Last::Symbol, Some(sym)) = (&self.last, self.symbols.last_mut()) {
            sym.description = description.to_string();
        }
        self
    }

    pub fn equation(mut self, lhs: Node, rhs: Node, sets: &[&str]) -> Self {
        self.equations.push(EquationDecl {
            lhs,
            rhs,
            sets: strings(sets),
            label: None,
            attributes: Vec::new(),
            count: None,
            time_ok: true,
        });
        self.last = Last::Equation;
        self
    }

    /// Parse `text` as `lhs = rhs` and add it as an equation.
    pub fn equation_text(mut self, text: &str, sets: &[&str]) -> Self {
        match parser::parse_equation(text) {
            Ok((lhs, rhs)) => self.equation(lhs, rhs, sets),
            Err(err) => {
                self.errors.push(ValidationError::new(
                    format!("could not parse equation: {}", err),
                    Some(text.to_string()),
                ));
                self.last = Last::Nothing;
                self
            }
        }
    }

    fn last_equation(&mut self) -> Option<&mut EquationDecl> {
        match self.last {
            Last::Equation => self.equations.last_mut(),
            _ => None,
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        if let Some(eq) = self.last_equation() {
            eq.label = Some(label.to_string());
        }
        self
    }

    pub fn equation_attributes(mut self, attributes: &[&str]) -> Self {
        if let Some(eq) = self.last_equation() {
            eq.attributes = strings(attributes);
        }
        self
    }

    /// Override the number of scalar instances the most recent equation is
    /// expected to produce.
    pub fn count(mut self, count: usize) -> Self {
        if let Some(eq) = self.last_equation() {
            eq.count = Some(count);
        }
        self
    }

    pub fn time_ok(mut self, ok: bool) -> Self {
        if let Some(eq) = self.last_equation() {
            eq.time_ok = ok;
        }
        self
    }

    fn check_sets(&mut self, sets: &[String], set_names: &HashSet<String>, subject: &str) {
        for set in sets {
            if !set_names.contains(set) {
                self.errors.push(ValidationError::new(
                    format!("{} is not a declared set", set),
                    Some(subject.to_string()),
                ));
            }
        }
    }

    pub fn build(mut self) -> Result<Model> {
        let set_names: HashSet<String> = self
            .symbols
            .iter()
            .filter(|s| s.is_set())
            .map(|s| s.name.clone())
            .collect();

        let mut symbols = std::mem::take(&mut self.symbols);
        for i in 0..symbols.len() {
            let (domain, supersets, name) = (
                symbols[i].domain.clone(),
                symbols[i].supersets.clone(),
                symbols[i].name.clone(),
            );
            self.check_sets(&domain, &set_names, &name);
            self.check_sets(&supersets, &set_names, &name);
            for sup in &supersets {
                if let Some(parent) = symbols.iter().find(|s| &s.name == sup) {
                    let stray = symbols[i]
                        .elements
                        .iter()
                        .find(|e| !parent.elements.contains(e));
                    if let Some(stray) = stray {
                        self.errors.push(ValidationError::new(
                            format!("element {} is not in superset {}", stray, sup),
                            Some(name.clone()),
                        ));
                    }
                }
            }
            if !symbols[i].is_set() {
                let count = set_sizes(&symbols, &domain);
                symbols[i].count = count;
            }
        }

        let declared: HashSet<&str> = symbols
            .iter()
            .filter(|s| !s.is_set())
            .map(|s| s.name.as_str())
            .collect();
        let mut used: HashSet<String> = HashSet::new();
        let mut equations = Vec::with_capacity(self.equations.len());
        let decls = std::mem::take(&mut self.equations);
        for (i, decl) in decls.into_iter().enumerate() {
            let number = i + 1;
            let subject = format!("equation {}", number);
            self.check_sets(&decl.sets, &set_names, &subject);
            let mut has_undeclared = false;
            for name in decl.lhs.referenced_names().into_iter().chain(decl.rhs.referenced_names()) {
                if declared.contains(name) {
                    used.insert(name.to_string());
                } else {
                    debug!("{} references undeclared symbol {}", subject, name);
                    has_undeclared = true;
                }
            }
            used.extend(decl.sets.iter().cloned());
            let count = decl.count.unwrap_or_else(|| set_sizes(&symbols, &decl.sets));
            let mut lhs = decl.lhs;
            lhs.mark_lhs();
            equations.push(Equation {
                number,
                label: decl.label,
                lhs,
                rhs: decl.rhs,
                sets: decl.sets,
                attributes: decl.attributes,
                has_undeclared,
                time_ok: decl.time_ok,
                count,
            });
        }

        for sym in symbols.iter_mut() {
            sym.used = used.contains(&sym.name);
        }
        let domains: Vec<String> = symbols
            .iter()
            .filter(|s| s.used)
            .flat_map(|s| s.domain.iter().cloned())
            .collect();
        for sym in symbols.iter_mut().filter(|s| s.is_set()) {
            sym.used |= domains.contains(&sym.name);
        }

        if !self.errors.is_empty() {
            return Err(self.errors.into());
        }
        Ok(Model::new(symbols, equations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeType;

    #[test]
    fn numbers_equations_and_marks_lhs() {
        let model = ModelBuilder::new()
            .set("r", &["a", "b"], &[])
            .variable("Y", &["r"], &["end"], "")
            .variable("A", &["r"], &["exo"], "")
            .equation_text("Y(r) = A(r) + Q(r)", &["r"])
            .label("output")
            .equation_text("Y(r) = A(r)", &["r"])
            .count(3)
            .build()
            .unwrap();
        let eqs = model.equations();
        assert_eq!(eqs[0].number, 1);
        assert_eq!(eqs[1].number, 2);
        assert_eq!(eqs[0].label.as_deref(), Some("output"));
        assert!(eqs[0].lhs.is_lhs);
        assert!(!eqs[0].rhs.is_lhs);
        assert!(eqs[0].has_undeclared);
        assert!(!eqs[1].has_undeclared);
        assert_eq!(eqs[0].count, 2);
        assert_eq!(eqs[1].count, 3);
        assert_eq!(eqs[0].lhs.kind, NodeType::Name);
    }

    #[test]
    fn used_flags_follow_equations() {
        let model = ModelBuilder::new()
            .set("r", &["a", "b"], &[])
            .set("s", &["c"], &[])
            .variable("Y", &["r"], &["end"], "")
            .variable("Z", &["s"], &["end"], "")
            .equation_text("Y(r) = 1", &["r"])
            .build()
            .unwrap();
        assert!(model.symbol("Y").unwrap().used);
        assert!(!model.symbol("Z").unwrap().used);
        assert!(model.symbol("r").unwrap().used);
        assert!(!model.symbol("s").unwrap().used);
    }

    #[test]
    fn collects_every_problem() {
        let err = ModelBuilder::new()
            .set("r", &["a", "b"], &[])
            .set("q", &["z"], &["r"])
            .variable("Y", &["nope"], &[], "")
            .variable("Y", &[], &[], "")
            .equation_text("Y = = 2", &[])
            .build()
            .unwrap_err();
        let errors = err.downcast_ref::<ValidationErrors>().unwrap();
        assert_eq!(errors.len(), 4);
        assert!(errors.has_error_contains("not in superset"));
        assert!(errors.has_error_contains("nope is not a declared set"));
        assert!(errors.has_error_contains("more than once"));
        assert!(errors.has_error_contains("could not parse"));
    }

    #[test]
    fn describe_applies_to_latest_symbol() {
        let model = ModelBuilder::new()
            .set("r", &["a"], &[])
            .describe("regions")
            .build()
            .unwrap();
        assert_eq!(model.symbol("r").unwrap().description, "regions");
    }
}
