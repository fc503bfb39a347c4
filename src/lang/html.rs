//! An HTML page documenting the model, with equations typeset by MathJax.

use std::fmt::Write;

use anyhow::Result;
use itertools::Itertools;
use log::info;

use crate::ast::{Node, NodeType};
use crate::codegen::backend::default_show_node;
use crate::codegen::printer;
use crate::codegen::{Backend, Context, EqnStyle, Options, Pass, SumStyle, Subscript};
use crate::model::{Equation, Model, Symbol, SymbolKind};

use super::index::SetIndexes;

const CSS: &str = "a:link { color:blue; }
body { margin-left:2em; margin-top:2em; margin-right:2em; }
td { padding-left: 1em; padding-right: 1em; }
th { text-align: left; padding-left: 1em; padding-right: 1em; }
div.heading { margin-top: 2em; font-weight: bold; font-size: 120%; }
div.dblock { margin-top: 0em; margin-left: 0em; margin-right: 0em; }
div.eblock { margin-top: 1em; overflow-x: scroll; }
div.eqn { margin-top: 1em; margin-left: 2em; }
";

const MATHJAX_CONFIG: &str = "MathJax = { jax: ['input/tex', 'output/svg'], \
tex: { tags: 'ams', packages: {'[+]': ['textmacros']} }, \
svg: { displayAlign: 'left' }, loader: {load: ['[tex]/textmacros']} };";

const MATHJAX_SRC: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-svg.js";

const NBSP: &str = "&nbsp;";

fn escape(name: &str) -> String {
    name.replace('_', "\\_")
}

fn link(target: &str) -> String {
    format!("<a href='#{}'>{}</a>", target, target)
}

fn links<T: ToString>(targets: &[T]) -> String {
    targets.iter().map(|t| link(&t.to_string())).join(", ")
}

fn or_nbsp(text: &str) -> &str {
    if text.is_empty() {
        NBSP
    } else {
        text
    }
}

fn equation_links(numbers: &[usize]) -> String {
    if numbers.is_empty() {
        "none".to_string()
    } else {
        links(numbers)
    }
}

#[derive(Debug, Default)]
pub struct Html {
    indexes: SetIndexes,
    declared: bool,
}

impl Html {
    pub fn new() -> Self {
        Self::default()
    }

    fn qualifier(&self, sets: &[String]) -> String {
        sets.iter()
            .filter(|s| self.indexes.get(s).is_some())
            .map(|s| format!("<i>{}</i> in <b>{}</b>", self.indexes.letter(s), link(s)))
            .join(", ")
    }

    fn table(code: &mut String, heading: &str, columns: &[&str], rows: Vec<String>) -> Result<()> {
        writeln!(code, "<div class=\"heading\">{}:</div>", heading)?;
        if rows.is_empty() {
            return Ok(());
        }
        writeln!(code, "<div class=\"dblock\">")?;
        writeln!(code, "<table class=\"dec\" border=1 cellspacing=0>")?;
        writeln!(code, "<tr>{}</tr>", columns.iter().map(|c| format!("<th>{}", c)).join(""))?;
        for row in rows {
            writeln!(code, "{}", row)?;
        }
        writeln!(code, "</table>\n</div>")?;
        Ok(())
    }

    fn symbol_anchor(symbol: &Symbol) -> String {
        format!("<tr><td><a id='{}'><b>{}</b></a>", symbol.name, symbol.name)
    }

    fn write_declarations(&mut self, pass: &mut Pass) -> Result<()> {
        let model: &Model = pass.model;
        self.declared = true;
        self.indexes.uniquify(model);

        let sets = model
            .sets()
            .map(|s| {
                let elements = if s.elements.is_empty() {
                    NBSP.to_string()
                } else {
                    s.elements.join(", ")
                };
                format!(
                    "{}<td>{}<td>{}</tr>",
                    Self::symbol_anchor(s),
                    elements,
                    or_nbsp(&s.description)
                )
            })
            .collect();
        Self::table(&mut pass.out.code, "Sets", &["Name", "Elements", "Description"], sets)?;

        let variables = model
            .variables()
            .map(|v| {
                format!(
                    "{}<td>{}<td>{}<td>{}<td>{}<td>{}</tr>",
                    Self::symbol_anchor(v),
                    or_nbsp(&links(&v.domain)),
                    or_nbsp(&v.description),
                    v.attributes.join(","),
                    equation_links(&model.lhs_equations(&v.name)),
                    equation_links(&model.rhs_equations(&v.name)),
                )
            })
            .collect();
        Self::table(
            &mut pass.out.code,
            "Variables",
            &["Name", "Domain", "Description", "Units", "LHS", "RHS"],
            variables,
        )?;

        let parameters = model
            .parameters()
            .map(|p| {
                format!(
                    "{}<td><b>{}</b><td>{}</tr>",
                    Self::symbol_anchor(p),
                    or_nbsp(&links(&p.domain)),
                    or_nbsp(&p.description)
                )
            })
            .collect();
        Self::table(
            &mut pass.out.code,
            "Parameters",
            &["Name", "Domain", "Description"],
            parameters,
        )?;

        pass.out.code.push_str("<div class=\"heading\">Equations:</div>\n<div class=\"dblock\">\n");
        Ok(())
    }
}

impl Backend for Html {
    fn name(&self) -> &'static str {
        "html"
    }

    /// MathJax lays out long equations itself, so nothing is wrapped.
    fn options(&self) -> Options {
        Options::styled(EqnStyle::Vector, SumStyle::Vector).with_line_length(0)
    }

    fn extension(&self) -> &'static str {
        "html"
    }

    fn begin_file(&mut self, pass: &mut Pass, basename: &str) -> Result<()> {
        *self = Self::new();
        let code = &mut pass.out.code;
        writeln!(code, "<html>\n<head>")?;
        writeln!(code, "<title>{}</title>", basename)?;
        write!(code, "<style type='text/css'>\n{}</style>\n", CSS)?;
        writeln!(code, "<script>{}</script>", MATHJAX_CONFIG)?;
        writeln!(
            code,
            "<script type='text/javascript' id='MathJax-script' async src='{}'></script>",
            MATHJAX_SRC
        )?;
        writeln!(code, "</head>\n<body>")?;
        writeln!(code, "<h1>{}</h1>", basename)?;
        Ok(())
    }

    fn declare(&mut self, pass: &mut Pass, symbol: &Symbol) -> Result<()> {
        if symbol.kind == SymbolKind::Set {
            self.indexes.declare(pass.model, &symbol.name);
        }
        Ok(())
    }

    /// Every equation is documented, including those that would not be
    /// generated.
    fn include_equation(&self, _eq: &Equation) -> bool {
        true
    }

    fn begin_block(&mut self, pass: &mut Pass, eq: &Equation) -> Result<()> {
        if !self.declared {
            self.write_declarations(pass)?;
        }
        let count = pass.model.equation_count(eq);
        let lhs = eq.lhs_name().unwrap_or("Not a variable");

        let code = &mut pass.out.code;
        write!(code, "<a id='{}'/>Equation {}: {}", eq.number, eq.number, link(lhs))?;
        match &eq.label {
            Some(label) => writeln!(code, ": {}<br>", label)?,
            None => writeln!(code, "<br>")?,
        }
        if eq.has_undeclared {
            writeln!(code, "Contains undeclared symbols<br>")?;
        } else if count > 1 {
            writeln!(code, "For {} ({} total):<br>", self.qualifier(&eq.sets), count)?;
        }
        code.push_str("<div class=\"eblock\">\n<div class=\"eqn\"> \\[ ");
        Ok(())
    }

    fn end_eqn(&mut self, pass: &mut Pass, _eq: &Equation) -> Result<()> {
        pass.out.code.push_str(" \\]\n</div>\n</div>\n");
        Ok(())
    }

    fn begin_func(&self, func: &str, arg: Option<&str>) -> String {
        match (func, arg) {
            (_, Some(set)) => format!(
                "\\{}_{{{} \\; \\text{{in}} \\; \\href{{#{}}}{{{}}}}} {{ \\left(",
                func,
                self.indexes.letter(set),
                set,
                escape(set)
            ),
            ("log", None) => "ln{ \\left(".to_string(),
            (_, None) => format!("{}{{ \\left(", func),
        }
    }

    fn end_func(&self) -> String {
        "\\right) }".to_string()
    }

    fn group(&self) -> (&str, &str) {
        ("{(", ")}")
    }

    fn unrolled_group(&self) -> (&str, &str) {
        ("{\\left(", "\\right)}")
    }

    fn render(&self, parent: NodeType, node: Option<&Node>, indent: Option<&str>) -> Result<String> {
        printer::render_grouped(parent, node, indent, self.group())
    }

    fn normalize(&self, lhs: &str, rhs: &str) -> String {
        format!("{} - \\left({}\\right)", lhs, rhs)
    }

    fn show_symbol(&self, _pass: &Pass, name: &str, subs: &[Subscript], ctx: Context) -> Result<String> {
        let mut text = if subs.is_empty() {
            format!("\\href{{#{}}}{{{}}}", name, escape(name))
        } else {
            let literal = |s: &str| format!("\\text{{{}}}", s);
            let indexes = subs
                .iter()
                .map(|s| self.indexes.subscript(s, ctx.dt, literal))
                .join(",");
            format!("\\href{{#{}}}{{{}({})}}", name, escape(name), indexes)
        };
        let wrapper = if ctx.dt < 0 { "lag" } else { "lead" };
        for _ in 0..ctx.dt.unsigned_abs() {
            text = format!("{}({{{}}})", wrapper, text);
        }
        Ok(text)
    }

    fn show_node(
        &self,
        pass: &Pass,
        parent: NodeType,
        node: Option<&Node>,
        sets: &[String],
        subs: &[String],
    ) -> Result<String> {
        match node {
            Some(node) if node.kind == NodeType::Div => {
                let num = self.show_node(pass, node.kind, node.left.as_deref(), sets, subs)?;
                let den = self.show_node(pass, node.kind, node.right.as_deref(), sets, subs)?;
                Ok(format!("\\frac{{{}}}{{{}}}", num, den))
            }
            _ => default_show_node(self, pass, parent, node, sets, subs),
        }
    }

    fn end_file(&mut self, pass: &mut Pass) -> Result<()> {
        if !self.declared {
            self.write_declarations(pass)?;
        }
        pass.out.code.push_str("</div>\n</body>\n</html>\n");
        info!("documented {} equations", pass.stats.blocks);
        Ok(())
    }
}
