//! Precedence printing for expression trees.
//!
//! Two bracketing variants share one table. The compact variant backs
//! `Display` for nodes and debug logging. The full variant is used by
//! `Backend::show_node`, where functional forms supply their own brackets
//! and lag/lead wrappers are rendered through.

use anyhow::Result;

use crate::ast::{Node, NodeType};

use super::error::GenerationError;

/// Combined operand width that forces a line break.
pub const WRAP_TOTAL: usize = 70;
/// Single operand width that forces a line break.
pub const WRAP_SIDE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParenStyle {
    Compact,
    Full,
}

/// Whether `child` must be parenthesised when it appears beneath an
/// operator of type `parent`.
pub fn needs_parens(parent: NodeType, child: NodeType, style: ParenStyle) -> Result<bool> {
    use NodeType::*;
    let full = style == ParenStyle::Full;
    let shift_ok = full && child.is_time_shift();
    let parens = match parent {
        Nul | Add | Sub => child == Neg,
        Mul => matches!(child, Add | Sub | Div | Neg),
        Neg => {
            !(matches!(child, Name | Num | Mul | Log | Exp | Pow | Sum | Prod) || shift_ok)
        }
        Div => {
            let func_ok = full && matches!(child, Log | Exp);
            !(matches!(child, Name | Num | Pow | Sum | Prod) || shift_ok || func_ok)
        }
        Pow => !(matches!(child, Name | Num | Log | Exp | Sum | Prod) || shift_ok),
        Log | Exp | Lag | Lead => !full,
        Equ | Sum | Prod | Dom | Name | Num => false,
        Lst => {
            return Err(GenerationError::InvariantViolation(format!(
                "no precedence rule for a {} node beneath a {} node",
                child, parent
            ))
            .into())
        }
    };
    Ok(parens)
}

/// Adjacent name/number siblings are separated by a comma.
fn separator(parent: NodeType, child: NodeType) -> &'static str {
    let atom = |t: NodeType| matches!(t, NodeType::Name | NodeType::Num);
    if atom(parent) && atom(child) {
        ","
    } else {
        ""
    }
}

/// True if operands of these widths should be split across lines.
pub fn too_wide(left: &str, right: &str) -> bool {
    left.len() + right.len() > WRAP_TOTAL || left.len() > WRAP_SIDE || right.len() > WRAP_SIDE
}

/// A subtraction whose right operand is itself additive keeps that operand
/// bracketed so the text re-parses left-associatively.
pub fn wraps_right(node: &Node) -> bool {
    node.kind == NodeType::Sub
        && node
            .right
            .as_deref()
            .is_some_and(|r| matches!(r.kind, NodeType::Add | NodeType::Sub))
}

/// Items of a `Lst` right-chain, in order.
pub fn list_items(node: &Node) -> Vec<&str> {
    let mut items = Vec::new();
    let mut cur = node.right.as_deref();
    while let Some(item) = cur {
        items.push(item.text.as_str());
        cur = item.right.as_deref();
    }
    items
}

/// Render `node` as it appears beneath `parent`.
///
/// With no `indent` nothing is broken across lines. With an indent, a break
/// followed by the indent is inserted before the operator whenever the
/// operands are too wide.
pub fn render(parent: NodeType, node: Option<&Node>, indent: Option<&str>) -> Result<String> {
    render_grouped(parent, node, indent, ("(", ")"))
}

/// [`render`] with `group` in place of the brackets placed around
/// subexpressions and subscript lists.
pub fn render_grouped(
    parent: NodeType,
    node: Option<&Node>,
    indent: Option<&str>,
    group: (&str, &str),
) -> Result<String> {
    let Some(node) = node else {
        return Ok(String::new());
    };
    let parens = needs_parens(parent, node.kind, ParenStyle::Compact)?;
    let comma = separator(parent, node.kind);

    let text = match node.kind {
        NodeType::Sum | NodeType::Prod => {
            let set = render_grouped(node.kind, node.left.as_deref(), indent, group)?;
            let body = render_grouped(node.kind, node.right.as_deref(), indent, group)?;
            format!("{}({},{})", node.text, set, body)
        }
        NodeType::Lst => format!("{}{}{}", group.0, list_items(node).join(","), group.1),
        _ => {
            let lstr = render_grouped(node.kind, node.left.as_deref(), indent, group)?;
            let rstr = render_grouped(node.kind, node.right.as_deref(), indent, group)?;
            let cr = match indent {
                Some(indent) if too_wide(&lstr, &rstr) => format!("\n{}", indent),
                _ => String::new(),
            };
            let rstr = if wraps_right(node) {
                format!("({})", rstr)
            } else {
                rstr
            };
            let body = format!("{}{}{}{}{}", lstr, comma, cr, node.text, rstr);
            if parens {
                format!("{}{}{}", group.0, body, group.1)
            } else {
                body
            }
        }
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeType::*;

    macro_rules! parens_tests {
        ($($name:ident: $style:ident, $parent:ident, $child:ident, $expect:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let got = needs_parens($parent, $child, ParenStyle::$style).unwrap();
                assert_eq!(got, $expect, "{} beneath {}", $child, $parent);
            }
        )*
        }
    }

    parens_tests! {
        neg_under_nul: Compact, Nul, Neg, true,
        neg_under_add: Compact, Add, Neg, true,
        mul_under_sub: Compact, Sub, Mul, false,
        neg_under_mul: Compact, Mul, Neg, true,
        add_under_mul: Compact, Mul, Add, true,
        div_under_mul: Compact, Mul, Div, true,
        pow_under_mul: Compact, Mul, Pow, false,
        mul_under_neg: Compact, Neg, Mul, false,
        div_under_neg: Compact, Neg, Div, true,
        lag_under_neg_compact: Compact, Neg, Lag, true,
        lag_under_neg_full: Full, Neg, Lag, false,
        pow_under_div: Compact, Div, Pow, false,
        mul_under_div: Compact, Div, Mul, true,
        log_under_div_compact: Compact, Div, Log, true,
        log_under_div_full: Full, Div, Log, false,
        lead_under_div_full: Full, Div, Lead, false,
        name_under_pow: Compact, Pow, Name, false,
        pow_under_pow: Compact, Pow, Pow, true,
        sum_under_pow: Compact, Pow, Sum, false,
        name_under_log_compact: Compact, Log, Name, true,
        add_under_log_full: Full, Log, Add, false,
        add_under_equ: Compact, Equ, Add, false,
        neg_under_sum: Full, Sum, Neg, false,
        neg_under_dom: Compact, Dom, Neg, false,
    }

    #[test]
    fn list_parent_is_invalid() {
        let err = needs_parens(Lst, Name, ParenStyle::Compact).unwrap_err();
        assert!(err.to_string().starts_with("invariant violation"));
    }

    fn a() -> Node {
        Node::name("A", &["r"])
    }

    fn b() -> Node {
        Node::name("B", &[])
    }

    #[test]
    fn renders_subscripted_names() {
        assert_eq!(Node::name("X", &["r", "s"]).to_string(), "X(r,s)");
        assert_eq!(b().to_string(), "B");
    }

    #[test]
    fn renders_binary_operators() {
        assert_eq!(Node::add(a(), b()).to_string(), "A(r) + B");
        assert_eq!(Node::mul(Node::add(a(), b()), b()).to_string(), "(A(r) + B)*B");
        assert_eq!(Node::pow(a(), Node::number("2")).to_string(), "A(r)^2");
        assert_eq!(Node::div(a(), Node::mul(b(), b())).to_string(), "A(r)/(B*B)");
    }

    #[test]
    fn renders_functions_and_aggregates() {
        assert_eq!(Node::log(a()).to_string(), "log(A(r))");
        assert_eq!(Node::sum("r", a()).to_string(), "sum(r,A(r))");
        assert_eq!(
            Node::mul(b(), Node::exp(Node::neg(b()))).to_string(),
            "B*exp(-B)"
        );
    }

    #[test]
    fn subtraction_keeps_right_grouping() {
        let e = Node::sub(a(), Node::sub(b(), Node::number("1")));
        assert_eq!(e.to_string(), "A(r) - (B - 1)");
    }

    #[test]
    fn top_level_negation_is_bracketed() {
        assert_eq!(Node::neg(b()).to_string(), "(-B)");
    }

    #[test]
    fn breaks_only_with_an_indent() {
        let long = Node::name("LONG_VARIABLE_NAME_NUMBER_ONE_ABCDEFGHIJKLMNOP", &[]);
        let e = Node::add(long.clone(), b());
        assert!(!e.to_string().contains('\n'));
        let wrapped = render(Nul, Some(&e), Some("   ")).unwrap();
        assert_eq!(wrapped, "LONG_VARIABLE_NAME_NUMBER_ONE_ABCDEFGHIJKLMNOP\n    + B");
    }

    #[test]
    fn list_renders_its_chain() {
        let l = Node::list(&["a", "b", "c"]);
        assert_eq!(render(Nul, Some(&l), None).unwrap(), "(a,b,c)");
    }

    #[test]
    fn custom_grouping() {
        let e = Node::mul(Node::add(a(), b()), b());
        assert_eq!(
            render_grouped(Nul, Some(&e), None, ("{(", ")}")).unwrap(),
            "{(A{(r)} + B)}*B"
        );
    }

    #[test]
    fn domain_qualifier() {
        let e = Node::dom(a(), &["time"]);
        assert_eq!(e.to_string(), "A(r)#(time)");
    }
}
