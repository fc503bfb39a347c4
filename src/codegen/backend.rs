//! The hooks every target dialect implements.
//!
//! Each hook has a generic default. A dialect overrides only what it needs;
//! the defaults call back through `self`, so an override is seen by every
//! recursive step of the default algorithms.

use anyhow::Result;
use itertools::Itertools;
use log::trace;

use crate::ast::{Node, NodeType};
use crate::model::{Equation, Model, Symbol};

use super::error::GenerationError;
use super::options::{Options, SumStyle};
use super::output::{Generated, Pass};
use super::printer::{self, ParenStyle};
use super::{driver, wrap};

/// Where a name reference appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub lhs: bool,
    pub dt: i32,
}

/// One resolved subscript of a name reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscript {
    /// An enclosing set bound to a concrete element.
    Bound { set: String, element: String },
    /// A set with no concrete binding.
    Set(String),
    /// Text that names neither an enclosing set nor a declared set.
    Literal(String),
}

impl Subscript {
    pub fn text(&self) -> &str {
        match self {
            Subscript::Bound { element, .. } => element,
            Subscript::Set(set) => set,
            Subscript::Literal(text) => text,
        }
    }
}

/// Resolve the domain qualifier of a name reference against the enclosing
/// sets and the current subscript tuple. The two lists are aligned at their
/// tails and the rightmost enclosing occurrence of a set wins.
pub fn resolve_subscripts(
    model: &Model,
    domain: &[String],
    sets: &[String],
    subs: &[String],
) -> Vec<Subscript> {
    let offset = sets.len().saturating_sub(subs.len());
    domain
        .iter()
        .map(|d| match sets.iter().rposition(|s| s == d) {
            Some(i) => match i.checked_sub(offset).and_then(|j| subs.get(j)) {
                Some(element) if element != "*" => Subscript::Bound {
                    set: d.clone(),
                    element: element.clone(),
                },
                _ => Subscript::Set(d.clone()),
            },
            None if model.is_set(d) => Subscript::Set(d.clone()),
            None => Subscript::Literal(d.clone()),
        })
        .collect()
}

pub trait Backend {
    fn name(&self) -> &'static str;

    /// Generation-mode options this dialect runs with unless overridden.
    fn options(&self) -> Options {
        Options::default()
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn begin_file(&mut self, _pass: &mut Pass, _basename: &str) -> Result<()> {
        Ok(())
    }

    fn end_file(&mut self, _pass: &mut Pass) -> Result<()> {
        Ok(())
    }

    fn declare(&mut self, _pass: &mut Pass, _symbol: &Symbol) -> Result<()> {
        Ok(())
    }

    /// Whether `eq` is generated at all.
    fn include_equation(&self, eq: &Equation) -> bool {
        !eq.has_undeclared && eq.time_ok
    }

    fn begin_block(&mut self, _pass: &mut Pass, _eq: &Equation) -> Result<()> {
        Ok(())
    }

    fn end_block(&mut self, _pass: &mut Pass, _eq: &Equation) -> Result<()> {
        Ok(())
    }

    fn begin_eqn(&mut self, _pass: &mut Pass, _eq: &Equation) -> Result<()> {
        Ok(())
    }

    fn end_eqn(&mut self, pass: &mut Pass, _eq: &Equation) -> Result<()> {
        pass.out.code.push_str(" ;\n\n");
        Ok(())
    }

    fn begin_func(&self, func: &str, arg: Option<&str>) -> String {
        match arg {
            Some(arg) => format!("{}({},", func, arg),
            None => format!("{}(", func),
        }
    }

    fn end_func(&self) -> String {
        ")".to_string()
    }

    fn power_op(&self) -> &str {
        "^"
    }

    /// Inserted before an operator whose operands are too wide.
    fn continuation(&self) -> &str {
        " \n        "
    }

    /// Brackets placed around a subexpression that needs them.
    fn group(&self) -> (&str, &str) {
        ("(", ")")
    }

    /// Brackets around a scalar-unrolled summation or product, and around
    /// each factor of an unrolled product.
    fn unrolled_group(&self) -> (&str, &str) {
        ("(", ")")
    }

    /// Statement form used in normalized mode.
    fn normalize(&self, lhs: &str, rhs: &str) -> String {
        format!("{} - ({})", lhs, rhs)
    }

    /// Appended where `wrap_write` splits a line.
    fn wrap_break(&self) -> &str {
        "\n   "
    }

    fn show_symbol(&self, _pass: &Pass, name: &str, subs: &[Subscript], ctx: Context) -> Result<String> {
        Ok(default_show_symbol(name, subs, ctx))
    }

    fn show_node(
        &self,
        pass: &Pass,
        parent: NodeType,
        node: Option<&Node>,
        sets: &[String],
        subs: &[String],
    ) -> Result<String> {
        default_show_node(self, pass, parent, node, sets, subs)
    }

    /// Compact rendering used for logging and diagnostics.
    fn render(&self, parent: NodeType, node: Option<&Node>, indent: Option<&str>) -> Result<String> {
        printer::render(parent, node, indent)
    }

    fn show_eq(&mut self, pass: &mut Pass, eq: &Equation, sets: &[String], subs: &[String]) -> Result<()> {
        default_show_eq(self, pass, eq, sets, subs)
    }

    fn wrap_write(&self, pass: &mut Pass, line: &str, addcr: bool, commaok: bool) -> Result<()> {
        let limit = pass.options.line_length;
        wrap::wrap_into(&mut pass.out.code, line, limit, addcr, commaok, self.wrap_break())
    }

    fn write_file(&mut self, model: &Model, options: Options, basename: &str) -> Result<Generated> {
        driver::write_file(self, model, options, basename)
    }
}

/// `name(s1,s2)`, wrapped in `lag( )` or `lead( )` once per period of
/// offset.
pub fn default_show_symbol(name: &str, subs: &[Subscript], ctx: Context) -> String {
    let mut text = if subs.is_empty() {
        name.to_string()
    } else {
        format!("{}({})", name, subs.iter().map(|s| s.text()).join(","))
    };
    let wrapper = if ctx.dt < 0 { "lag" } else { "lead" };
    for _ in 0..ctx.dt.unsigned_abs() {
        text = format!("{}({})", wrapper, text);
    }
    text
}

pub fn default_show_node<B: Backend + ?Sized>(
    backend: &B,
    pass: &Pass,
    parent: NodeType,
    node: Option<&Node>,
    sets: &[String],
    subs: &[String],
) -> Result<String> {
    let Some(node) = node else {
        return Ok(String::new());
    };
    let parens = printer::needs_parens(parent, node.kind, ParenStyle::Full)?;
    let ctx = Context {
        lhs: node.is_lhs,
        dt: node.dt,
    };

    match node.kind {
        NodeType::Name => {
            let resolved = resolve_subscripts(pass.model, &node.domain, sets, subs);
            return backend.show_symbol(pass, &node.text, &resolved, ctx);
        }
        // the wrapper only carries the time offset, already pushed into the
        // subtree, so the argument is rendered as if it stood in its place
        NodeType::Lag | NodeType::Lead => {
            return backend.show_node(pass, parent, node.right.as_deref(), sets, subs)
        }
        NodeType::Dom => {
            return backend.show_node(pass, node.kind, node.left.as_deref(), sets, subs)
        }
        NodeType::Lst => {
            return Err(GenerationError::InvariantViolation(
                "unexpected list node in show_node".to_string(),
            )
            .into())
        }
        NodeType::Sum | NodeType::Prod => {
            return match pass.options.sum_style()? {
                SumStyle::Scalar => show_unrolled(backend, pass, node, sets, subs),
                SumStyle::Vector => show_aggregate(backend, pass, node, sets, subs),
            }
        }
        _ => {}
    }

    let (lstr, endfunc, op, is_func) = match node.kind {
        NodeType::Log | NodeType::Exp => (
            backend.begin_func(&node.text, None),
            backend.end_func(),
            String::new(),
            true,
        ),
        NodeType::Pow => (
            backend.show_node(pass, node.kind, node.left.as_deref(), sets, subs)?,
            String::new(),
            backend.power_op().to_string(),
            false,
        ),
        _ => (
            backend.show_node(pass, node.kind, node.left.as_deref(), sets, subs)?,
            String::new(),
            node.text.clone(),
            false,
        ),
    };
    let rstr = backend.show_node(pass, node.kind, node.right.as_deref(), sets, subs)?;

    let cr = if printer::too_wide(&lstr, &rstr) {
        backend.continuation()
    } else {
        ""
    };
    let (lpar, rpar) = if parens && !is_func {
        backend.group()
    } else {
        ("", "")
    };
    let rstr = if printer::wraps_right(node) {
        format!("({})", rstr)
    } else {
        rstr
    };
    Ok(format!("{}{}{}{}{}{}{}", lpar, lstr, cr, op, rstr, rpar, endfunc))
}

fn bound_set(node: &Node) -> Result<&str> {
    node.left.as_deref().map(|l| l.text.as_str()).ok_or_else(|| {
        GenerationError::InvariantViolation(format!("{} node without a bound set", node.kind)).into()
    })
}

/// A summation or product written out over every element of its bound set.
fn show_unrolled<B: Backend + ?Sized>(
    backend: &B,
    pass: &Pass,
    node: &Node,
    sets: &[String],
    subs: &[String],
) -> Result<String> {
    let set = bound_set(node)?;
    trace!("unrolling {} over {}", node.text, set);
    let mut aug_sets = sets.to_vec();
    aug_sets.push(set.to_string());
    let (open, close) = backend.unrolled_group();
    let (op, lpar, rpar) = match node.kind {
        NodeType::Prod => ("*", open, close),
        _ => ("+", "", ""),
    };

    let mut buf = open.to_string();
    let mut this_op = " ";
    for element in pass.model.set_elements(set)? {
        let mut aug_subs = subs.to_vec();
        aug_subs.push(element.clone());
        let body = backend.show_node(pass, node.kind, node.right.as_deref(), &aug_sets, &aug_subs)?;
        buf.push_str("\n      ");
        buf.push_str(this_op);
        buf.push_str(lpar);
        buf.push_str(&body);
        buf.push_str(rpar);
        this_op = op;
    }
    buf.push_str(close);
    Ok(buf)
}

/// A summation or product as one functional form over its bound set.
fn show_aggregate<B: Backend + ?Sized>(
    backend: &B,
    pass: &Pass,
    node: &Node,
    sets: &[String],
    subs: &[String],
) -> Result<String> {
    let set = bound_set(node)?;
    let mut aug_sets = sets.to_vec();
    aug_sets.push(set.to_string());
    let mut aug_subs = subs.to_vec();
    aug_subs.push("*".to_string());

    let begin = backend.begin_func(&node.text, Some(set));
    let body = backend.show_node(pass, node.kind, node.right.as_deref(), &aug_sets, &aug_subs)?;
    let end = backend.end_func();
    Ok(format!("{}{}{}", begin, body, end))
}

pub fn default_show_eq<B: Backend + ?Sized>(
    backend: &mut B,
    pass: &mut Pass,
    eq: &Equation,
    sets: &[String],
    subs: &[String],
) -> Result<()> {
    let lstr = backend.show_node(pass, NodeType::Nul, Some(&eq.lhs), sets, subs)?;
    let rstr = backend.show_node(pass, NodeType::Nul, Some(&eq.rhs), sets, subs)?;

    backend.begin_eqn(pass, eq)?;

    let all = if pass.options.normalized {
        backend.normalize(&lstr, &rstr)
    } else {
        format!("{} = {}", lstr, rstr)
    };

    let limit = pass.options.line_length;
    if limit == 0 || all.len() <= limit {
        pass.out.code.push_str(&all);
    } else {
        let mut pieces = all.split('\n').peekable();
        while let Some(piece) = pieces.next() {
            let more = pieces.peek().is_some();
            backend.wrap_write(pass, piece, more, false)?;
        }
    }
    pass.stats.statements += 1;

    backend.end_eqn(pass, eq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::options::EqnStyle;
    use crate::model::ModelBuilder;
    use crate::parser::parse_expression;

    struct Plain;

    impl Backend for Plain {
        fn name(&self) -> &'static str {
            "plain"
        }
    }

    fn model() -> Model {
        ModelBuilder::new()
            .set("r", &["usa", "row"], &[])
            .set("s", &["agr", "mfg"], &[])
            .build()
            .unwrap()
    }

    fn show(text: &str, sum: SumStyle, sets: &[&str], subs: &[&str]) -> String {
        let model = model();
        let pass = Pass::new(&model, Options::styled(EqnStyle::Scalar, sum));
        let node = parse_expression(text).unwrap();
        let sets: Vec<String> = sets.iter().map(|s| s.to_string()).collect();
        let subs: Vec<String> = subs.iter().map(|s| s.to_string()).collect();
        Plain
            .show_node(&pass, NodeType::Nul, Some(&node), &sets, &subs)
            .unwrap()
    }

    #[test]
    fn substitutes_bound_elements() {
        assert_eq!(
            show("A(r) + B(r,usa)", SumStyle::Scalar, &["r"], &["row"]),
            "A(row) + B(row,usa)"
        );
    }

    #[test]
    fn keeps_set_names_without_binding() {
        assert_eq!(show("A(r)*B", SumStyle::Vector, &["r"], &[]), "A(r)*B");
    }

    #[test]
    fn unrolls_scalar_sums() {
        assert_eq!(
            show("sum(s, X(r,s))", SumStyle::Scalar, &["r"], &["usa"]),
            "(\n       X(usa,agr)\n      +X(usa,mfg))"
        );
        assert_eq!(
            show("prod(s, X(s))", SumStyle::Scalar, &[], &[]),
            "(\n       (X(agr))\n      *(X(mfg)))"
        );
    }

    #[test]
    fn vector_sums_use_functional_form() {
        assert_eq!(
            show("sum(s, X(r,s))", SumStyle::Vector, &["r"], &[]),
            "sum(s,X(r,s))"
        );
    }

    #[test]
    fn functions_bracket_their_argument() {
        assert_eq!(show("log(A + B)", SumStyle::Vector, &[], &[]), "log(A + B)");
        assert_eq!(show("C*exp(-A)", SumStyle::Vector, &[], &[]), "C*exp(-A)");
        assert_eq!(show("A^B", SumStyle::Vector, &[], &[]), "A^B");
    }

    #[test]
    fn lag_renders_through_its_parent() {
        assert_eq!(show("C*lag(A + B)", SumStyle::Vector, &[], &[]), "C*(lag(A) + lag(B))");
        assert_eq!(show("lead(lead(X(r)))", SumStyle::Vector, &["r"], &["usa"]), "lead(lead(X(usa)))");
    }

    #[test]
    fn wide_operands_break_before_the_operator() {
        let text = "ALPHA_BETA_GAMMA_DELTA_EPSILON_ZETA_ETA_THETA + IOTA";
        assert_eq!(
            show(text, SumStyle::Vector, &[], &[]),
            "ALPHA_BETA_GAMMA_DELTA_EPSILON_ZETA_ETA_THETA \n         + IOTA"
        );
    }

    #[test]
    fn list_nodes_are_rejected() {
        let model = model();
        let pass = Pass::new(&model, Options::styled(EqnStyle::Scalar, SumStyle::Scalar));
        let node = Node::list(&["a"]);
        assert!(Plain.show_node(&pass, NodeType::Nul, Some(&node), &[], &[]).is_err());
    }

    #[test]
    fn resolves_from_the_right() {
        let model = model();
        let sets = vec!["r".to_string(), "s".to_string()];
        let subs = vec!["*".to_string()];
        let domain = vec!["r".to_string(), "s".to_string(), "usa".to_string()];
        let got = resolve_subscripts(&model, &domain, &sets, &subs);
        assert_eq!(
            got,
            vec![
                Subscript::Set("r".to_string()),
                Subscript::Set("s".to_string()),
                Subscript::Literal("usa".to_string()),
            ]
        );
    }
}
