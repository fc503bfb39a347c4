#![allow(clippy::empty_docs)]
#[derive(Parser)]
#[grammar = "parser/expr_grammar.pest"] // relative to src
pub struct ExprParser;

use anyhow::{anyhow, Result};
use pest::iterators::{Pair, Pairs};
use pest::Parser;

use crate::ast::Node;

fn next<'i>(inner: &mut Pairs<'i, Rule>) -> Result<Pair<'i, Rule>> {
    inner
        .next()
        .ok_or_else(|| anyhow!("malformed expression: missing operand"))
}

fn subscripts(pair: Pair<Rule>) -> Vec<&str> {
    pair.into_inner().map(|p| p.as_str()).collect()
}

fn parse_value(pair: Pair<'_, Rule>) -> Result<Node> {
    match pair.as_rule() {
        // expression = { term ~ (add_op ~ term)* }
        Rule::expression => {
            let mut inner = pair.into_inner();
            let mut head = parse_value(next(&mut inner)?)?;
            while let Some(op) = inner.next() {
                let rhs = parse_value(next(&mut inner)?)?;
                head = match op.as_str() {
                    "+" => Node::add(head, rhs),
                    _ => Node::sub(head, rhs),
                };
            }
            Ok(head)
        }

        // term = { negation | product }
        // group = { "(" ~ expression ~ ")" }
        Rule::term | Rule::group => parse_value(next(&mut pair.into_inner())?),

        // negation = { neg_op ~ product }
        Rule::negation => {
            let mut inner = pair.into_inner();
            next(&mut inner)?;
            Ok(Node::neg(parse_value(next(&mut inner)?)?))
        }

        // product = { power ~ (mul_op ~ power)* }
        Rule::product => {
            let mut inner = pair.into_inner();
            let mut head = parse_value(next(&mut inner)?)?;
            while let Some(op) = inner.next() {
                let rhs = parse_value(next(&mut inner)?)?;
                head = match op.as_str() {
                    "*" => Node::mul(head, rhs),
                    _ => Node::div(head, rhs),
                };
            }
            Ok(head)
        }

        // power = { qualified ~ (pow_op ~ exponent)? }
        Rule::power => {
            let mut inner = pair.into_inner();
            let base = parse_value(next(&mut inner)?)?;
            match inner.next() {
                Some(_) => Ok(Node::pow(base, parse_value(next(&mut inner)?)?)),
                None => Ok(base),
            }
        }

        // exponent = { neg_op? ~ power }
        Rule::exponent => {
            let mut inner = pair.into_inner();
            let first = next(&mut inner)?;
            if first.as_rule() == Rule::neg_op {
                Ok(Node::neg(parse_value(next(&mut inner)?)?))
            } else {
                parse_value(first)
            }
        }

        // qualified = { primary ~ ("#" ~ subscripts)? }
        Rule::qualified => {
            let mut inner = pair.into_inner();
            let expr = parse_value(next(&mut inner)?)?;
            match inner.next() {
                Some(sets) => Ok(Node::dom(expr, &subscripts(sets))),
                None => Ok(expr),
            }
        }

        // aggregate = { aggregate_op ~ "(" ~ ident ~ "," ~ expression ~ ")" }
        Rule::aggregate => {
            let mut inner = pair.into_inner();
            let op = next(&mut inner)?.as_str();
            let set = next(&mut inner)?.as_str();
            let body = parse_value(next(&mut inner)?)?;
            Ok(match op {
                "sum" => Node::sum(set, body),
                _ => Node::prod(set, body),
            })
        }

        // call = { func_op ~ "(" ~ expression ~ ")" }
        Rule::call => {
            let mut inner = pair.into_inner();
            let op = next(&mut inner)?.as_str();
            let arg = parse_value(next(&mut inner)?)?;
            Ok(match op {
                "log" => Node::log(arg),
                "exp" => Node::exp(arg),
                "lag" => Node::lag(arg),
                _ => Node::lead(arg),
            })
        }

        // reference = { ident ~ subscripts? }
        Rule::reference => {
            let mut inner = pair.into_inner();
            let name = next(&mut inner)?.as_str();
            let subs = inner.next().map(subscripts).unwrap_or_default();
            Ok(Node::name(name, &subs))
        }

        Rule::number => Ok(Node::number(pair.as_str())),

        rule => Err(anyhow!("unexpected {:?} in expression", rule)),
    }
}

/// Parse a single expression such as `A(r) + sum(s, B(r,s))`.
pub fn parse_expression(text: &str) -> Result<Node> {
    let mut pairs = ExprParser::parse(Rule::formula, text)?;
    let formula = next(&mut pairs)?;
    parse_value(next(&mut formula.into_inner())?)
}

/// Parse `lhs = rhs` into its two sides.
pub fn parse_equation(text: &str) -> Result<(Node, Node)> {
    let mut pairs = ExprParser::parse(Rule::equation, text)?;
    let mut inner = next(&mut pairs)?.into_inner();
    let lhs = parse_value(next(&mut inner)?)?;
    let rhs = parse_value(next(&mut inner)?)?;
    Ok((lhs, rhs))
}
