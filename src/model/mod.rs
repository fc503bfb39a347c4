use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{anyhow, Result};

use crate::ast::Node;

pub mod builder;
pub mod error;
pub mod file;

pub use builder::ModelBuilder;
pub use error::{ValidationError, ValidationErrors};

/// Name of the set that carries the time dimension.
pub const TIME_SET: &str = "time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Set,
    Parameter,
    Variable,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub domain: Vec<String>,
    pub attributes: Vec<String>,
    pub description: String,
    pub used: bool,
    /// Number of scalar instances: the product of the domain's set sizes,
    /// or the number of elements for a set.
    pub count: usize,
    pub elements: Vec<String>,
    pub supersets: Vec<String>,
}

impl Symbol {
    pub fn is_set(&self) -> bool {
        self.kind == SymbolKind::Set
    }

    pub fn has_attribute(&self, attr: &str) -> bool {
        self.attributes.iter().any(|a| a == attr)
    }
}

#[derive(Debug, Clone)]
pub struct Equation {
    pub number: usize,
    pub label: Option<String>,
    pub lhs: Node,
    pub rhs: Node,
    pub sets: Vec<String>,
    pub attributes: Vec<String>,
    pub has_undeclared: bool,
    pub time_ok: bool,
    /// Number of scalar instances the equation is expected to expand to.
    pub count: usize,
}

impl Equation {
    /// The symbol the left-hand side defines, if the left-hand side is a
    /// plain reference.
    pub fn lhs_name(&self) -> Option<&str> {
        self.lhs.first_name().map(|n| n.text.as_str())
    }

    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => format!("equation {} ({})", self.number, label),
            None => format!("equation {}", self.number),
        }
    }
}

/// A validated model: symbols in declaration order plus its equations.
#[derive(Debug, Clone, Default)]
pub struct Model {
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
    equations: Vec<Equation>,
}

impl Model {
    pub(crate) fn new(symbols: Vec<Symbol>, equations: Vec<Equation>) -> Self {
        let index = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        Self {
            symbols,
            index,
            equations,
        }
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    fn of_kind(&self, kind: SymbolKind) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(move |s| s.kind == kind)
    }

    pub fn sets(&self) -> impl Iterator<Item = &Symbol> {
        self.of_kind(SymbolKind::Set)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Symbol> {
        self.of_kind(SymbolKind::Parameter)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.of_kind(SymbolKind::Variable)
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.symbol(name).is_some_and(|s| s.is_set())
    }

    pub fn set_elements(&self, name: &str) -> Result<&[String]> {
        match self.symbol(name) {
            Some(sym) if sym.is_set() => Ok(&sym.elements),
            Some(_) => Err(anyhow!("{} is not a set", name)),
            None => Err(anyhow!("unknown set {}", name)),
        }
    }

    pub fn immediate_supersets(&self, name: &str) -> &[String] {
        self.symbol(name)
            .map(|s| s.supersets.as_slice())
            .unwrap_or_default()
    }

    /// True if `sub` is `sup` or is declared, directly or through a chain of
    /// declarations, as a subset of it.
    pub fn is_subset(&self, sub: &str, sup: &str) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([sub]);
        while let Some(cur) = queue.pop_front() {
            if cur == sup {
                return true;
            }
            if seen.insert(cur) {
                queue.extend(self.immediate_supersets(cur).iter().map(|s| s.as_str()));
            }
        }
        false
    }

    pub fn is_time_set(&self, name: &str) -> bool {
        self.is_set(name) && self.is_subset(name, TIME_SET)
    }

    pub fn element_index(&self, set: &str, element: &str) -> Option<usize> {
        self.symbol(set)?.elements.iter().position(|e| e == element)
    }

    pub fn domain_size<S: AsRef<str>>(&self, domain: &[S]) -> Result<usize> {
        domain
            .iter()
            .map(|s| self.set_elements(s.as_ref()).map(|e| e.len()))
            .product()
    }

    pub fn equation_count(&self, eq: &Equation) -> usize {
        eq.count
    }

    /// Numbers of the equations whose left-hand side defines `name`.
    pub fn lhs_equations(&self, name: &str) -> Vec<usize> {
        self.equations
            .iter()
            .filter(|eq| eq.lhs_name() == Some(name))
            .map(|eq| eq.number)
            .collect()
    }

    /// Numbers of the equations whose right-hand side mentions `name`.
    pub fn rhs_equations(&self, name: &str) -> Vec<usize> {
        self.equations
            .iter()
            .filter(|eq| eq.rhs.referenced_names().contains(&name))
            .map(|eq| eq.number)
            .collect()
    }
}
