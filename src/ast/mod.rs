use std::fmt;

use crate::codegen::printer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Pow,
    Log,
    Exp,
    Sum,
    Prod,
    Name,
    Num,
    Lst,
    Lag,
    Lead,
    Dom,
    Equ,
    Nul,
}

impl NodeType {
    pub fn is_time_shift(&self) -> bool {
        matches!(self, NodeType::Lag | NodeType::Lead)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            NodeType::Add => "add",
            NodeType::Sub => "sub",
            NodeType::Mul => "mul",
            NodeType::Div => "dvd",
            NodeType::Neg => "neg",
            NodeType::Pow => "pow",
            NodeType::Log => "log",
            NodeType::Exp => "exp",
            NodeType::Sum => "sum",
            NodeType::Prod => "prd",
            NodeType::Name => "nam",
            NodeType::Num => "num",
            NodeType::Lst => "lst",
            NodeType::Lag => "lag",
            NodeType::Lead => "led",
            NodeType::Dom => "dom",
            NodeType::Equ => "equ",
            NodeType::Nul => "nul",
        };
        write!(f, "{}", name)
    }
}

/// One node of an equation's expression tree.
///
/// Children are exclusively owned. Unary forms (negation, log, exp, lag,
/// lead) keep their argument in `right`. Summations and products keep the
/// bound set as a `Name` in `left` and the body in `right`. A name
/// reference keeps its subscripts both in `domain` and as a right-chained
/// `Lst` child, which is what the compact printer walks.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeType,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>,
    pub text: String,
    pub domain: Vec<String>,
    pub is_lhs: bool,
    pub dt: i32,
}

impl Node {
    fn leaf(kind: NodeType, text: impl Into<String>) -> Self {
        Self {
            kind,
            left: None,
            right: None,
            text: text.into(),
            domain: Vec::new(),
            is_lhs: false,
            dt: 0,
        }
    }

    fn binary(kind: NodeType, text: &str, left: Node, right: Node) -> Self {
        Self {
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            ..Self::leaf(kind, text)
        }
    }

    fn unary(kind: NodeType, text: &str, arg: Node) -> Self {
        Self {
            right: Some(Box::new(arg)),
            ..Self::leaf(kind, text)
        }
    }

    /// A reference to `name`, optionally subscripted.
    pub fn name(name: &str, subscripts: &[&str]) -> Self {
        let domain: Vec<String> = subscripts.iter().map(|s| s.to_string()).collect();
        let right = if domain.is_empty() {
            None
        } else {
            Some(Box::new(Self::list(&domain)))
        };
        Self {
            right,
            domain,
            ..Self::leaf(NodeType::Name, name)
        }
    }

    pub fn number(text: &str) -> Self {
        Self::leaf(NodeType::Num, text)
    }

    /// A `Lst` head whose right-chain holds one `Name` per item.
    pub fn list<S: AsRef<str>>(items: &[S]) -> Self {
        let chain = items.iter().rev().fold(None, |next, item| {
            Some(Box::new(Self {
                right: next,
                ..Self::leaf(NodeType::Name, item.as_ref())
            }))
        });
        Self {
            right: chain,
            ..Self::leaf(NodeType::Lst, "")
        }
    }

    pub fn add(left: Node, right: Node) -> Self {
        Self::binary(NodeType::Add, " + ", left, right)
    }

    pub fn sub(left: Node, right: Node) -> Self {
        Self::binary(NodeType::Sub, " - ", left, right)
    }

    pub fn mul(left: Node, right: Node) -> Self {
        Self::binary(NodeType::Mul, "*", left, right)
    }

    pub fn div(left: Node, right: Node) -> Self {
        Self::binary(NodeType::Div, "/", left, right)
    }

    pub fn pow(left: Node, right: Node) -> Self {
        Self::binary(NodeType::Pow, "^", left, right)
    }

    pub fn equ(left: Node, right: Node) -> Self {
        Self::binary(NodeType::Equ, " = ", left, right)
    }

    pub fn neg(arg: Node) -> Self {
        Self::unary(NodeType::Neg, "-", arg)
    }

    pub fn log(arg: Node) -> Self {
        Self::unary(NodeType::Log, "log", arg)
    }

    pub fn exp(arg: Node) -> Self {
        Self::unary(NodeType::Exp, "exp", arg)
    }

    pub fn sum(set: &str, body: Node) -> Self {
        Self::binary(NodeType::Sum, "sum", Self::leaf(NodeType::Name, set), body)
    }

    pub fn prod(set: &str, body: Node) -> Self {
        Self::binary(NodeType::Prod, "prod", Self::leaf(NodeType::Name, set), body)
    }

    /// `lag(arg)`: every node beneath is shifted one period back.
    pub fn lag(mut arg: Node) -> Self {
        arg.shift(-1);
        let mut node = Self::unary(NodeType::Lag, "lag", arg);
        node.dt = -1;
        node
    }

    /// `lead(arg)`: every node beneath is shifted one period forward.
    pub fn lead(mut arg: Node) -> Self {
        arg.shift(1);
        let mut node = Self::unary(NodeType::Lead, "lead", arg);
        node.dt = 1;
        node
    }

    /// `expr#(sets)`: qualifies an expression with an explicit domain.
    pub fn dom<S: AsRef<str>>(expr: Node, sets: &[S]) -> Self {
        Self {
            domain: sets.iter().map(|s| s.as_ref().to_string()).collect(),
            ..Self::binary(NodeType::Dom, "#", expr, Self::list(sets))
        }
    }

    pub fn shift(&mut self, by: i32) {
        self.dt += by;
        for child in self.children_mut() {
            child.shift(by);
        }
    }

    pub fn mark_lhs(&mut self) {
        self.is_lhs = true;
        for child in self.children_mut() {
            child.mark_lhs();
        }
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.left.iter().chain(self.right.iter()).map(|b| &**b)
    }

    fn children_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.left
            .iter_mut()
            .chain(self.right.iter_mut())
            .map(|b| &mut **b)
    }

    /// Identifiers referenced by this tree, excluding list items and the
    /// bound sets of summations.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self.kind {
            NodeType::Name => {
                if !names.contains(&self.text.as_str()) {
                    names.push(self.text.as_str());
                }
            }
            NodeType::Lst => {}
            NodeType::Sum | NodeType::Prod => {
                if let Some(body) = self.right.as_deref() {
                    body.collect_names(names);
                }
            }
            NodeType::Dom => {
                if let Some(expr) = self.left.as_deref() {
                    expr.collect_names(names);
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_names(names);
                }
            }
        }
    }

    /// The first name reference found in the tree, if any.
    pub fn first_name(&self) -> Option<&Node> {
        match self.kind {
            NodeType::Name => Some(self),
            NodeType::Lst => None,
            _ => self.children().find_map(|c| c.first_name()),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = printer::render(NodeType::Nul, Some(self), None).map_err(|_| fmt::Error)?;
        write!(f, "{}", text)
    }
}
