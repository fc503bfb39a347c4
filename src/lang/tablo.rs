//! GEMPACK TABLO input.
//!
//! Every variable is read from a logical file chosen by the first letter of
//! its header attribute. Parameters are read from `param`, under their
//! header when they carry one or a generated `Hnnn` otherwise. References
//! use set index letters, and time sets carry offsets as `t+1`.
//!
//! In calc mode equations become `formula` statements evaluated once from
//! the data, only symbols used by some equation are declared, and every
//! computed variable is written to the logical file `calc`.

use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Write};

use anyhow::{anyhow, bail, Result};
use itertools::Itertools;
use log::{info, warn};

use crate::codegen::{
    Backend, Context, EqnStyle, GenerationError, Options, Pass, SumStyle, Subscript,
};
use crate::ast::NodeType;
use crate::model::{Equation, Model, Symbol, SymbolKind, TIME_SET};

use super::index::SetIndexes;

pub const LINE_LENGTH: usize = 75;

/// The kind of data a header holds, from its first letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderKind {
    ImplicitEndogenous,
    ImplicitExogenous,
    AddedParameter,
    Intermediate,
    Kalman,
    Make,
    Endogenous,
    IoTable,
    Parameter,
    Extra,
    Exogenous,
    Other,
}

impl HeaderKind {
    pub fn of(symbol: &Symbol) -> Self {
        match symbol.attributes.first().and_then(|a| a.chars().next()) {
            Some('A') => HeaderKind::ImplicitEndogenous,
            Some('B') => HeaderKind::ImplicitExogenous,
            Some('C') => HeaderKind::AddedParameter,
            Some('I') => HeaderKind::Intermediate,
            Some('K') => HeaderKind::Kalman,
            Some('M') => HeaderKind::Make,
            Some('N') => HeaderKind::Endogenous,
            Some('O') => HeaderKind::IoTable,
            Some('P') => HeaderKind::Parameter,
            Some('T') => HeaderKind::Extra,
            Some('X') => HeaderKind::Exogenous,
            _ => HeaderKind::Other,
        }
    }

    /// Logical file the symbol is read from.
    pub fn file_name(&self) -> &'static str {
        match self {
            HeaderKind::ImplicitEndogenous | HeaderKind::ImplicitExogenous => "impl",
            HeaderKind::AddedParameter => "addpar",
            HeaderKind::Intermediate => "inter",
            HeaderKind::Kalman => "kalman",
            HeaderKind::Make => "make",
            HeaderKind::Endogenous => "endog",
            HeaderKind::IoTable => "iotable",
            HeaderKind::Parameter => "param",
            HeaderKind::Extra => "extra",
            HeaderKind::Exogenous => "exog",
            HeaderKind::Other => "other",
        }
    }

    pub fn is_endogenous(&self) -> bool {
        matches!(
            self,
            HeaderKind::ImplicitEndogenous
                | HeaderKind::Endogenous
                | HeaderKind::Intermediate
                | HeaderKind::IoTable
                | HeaderKind::Extra
        )
    }

    pub fn is_exogenous(&self) -> bool {
        matches!(
            self,
            HeaderKind::ImplicitExogenous | HeaderKind::Exogenous | HeaderKind::Kalman | HeaderKind::Make
        )
    }
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

#[derive(Debug, Default)]
pub struct Tablo {
    calc: bool,
    indexes: SetIndexes,
    declared: bool,
    /// Sets shown in calc mode.
    shown_sets: HashSet<String>,
    /// Variables computed by formulas, in order of first definition.
    calc_vars: Vec<String>,
    blocks: usize,
    scalars: usize,
    variables: usize,
    parameters: usize,
}

impl Tablo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formula mode: evaluate the equations as calculations.
    pub fn calc() -> Self {
        Self {
            calc: true,
            ..Self::default()
        }
    }

    fn shown(&self, symbol: &Symbol) -> bool {
        if !self.calc {
            return true;
        }
        match symbol.kind {
            SymbolKind::Set => self.shown_sets.contains(&symbol.name),
            _ => symbol.used,
        }
    }

    /// Sets in the domain of a shown parameter or variable, and their
    /// supersets.
    fn mark_shown_sets(&mut self, model: &Model) {
        let mut pending: Vec<String> = model
            .parameters()
            .chain(model.variables())
            .filter(|s| self.shown(s))
            .flat_map(|s| s.domain.iter().cloned())
            .collect();
        while let Some(set) = pending.pop() {
            if self.shown_sets.insert(set.clone()) {
                pending.extend(model.immediate_supersets(&set).iter().cloned());
            }
        }
    }

    fn needs_read(&self, model: &Model, symbol: &Symbol) -> Result<bool> {
        if self.calc {
            return Ok(!symbol.attributes.is_empty() && !model.rhs_equations(&symbol.name).is_empty());
        }
        if symbol.attributes.is_empty() {
            bail!("header required for symbol {}", symbol.name);
        }
        Ok(true)
    }

    fn qualifier(&self, sets: &[String]) -> String {
        sets.iter()
            .filter(|s| self.indexes.get(s).is_some())
            .map(|s| format!("(all,{},{}) ", self.indexes.letter(s), s))
            .collect()
    }

    fn reference(&self, name: &str, subs: &[Subscript], dt: i32) -> String {
        if subs.is_empty() {
            return name.to_string();
        }
        let quote = |s: &str| format!("\"{}\"", s);
        format!(
            "{}({})",
            name,
            subs.iter().map(|s| self.indexes.subscript(s, dt, quote)).join(",")
        )
    }

    fn declaration(&self, symbol: &Symbol) -> (String, String) {
        let subs: Vec<Subscript> = symbol.domain.iter().map(|d| Subscript::Set(d.clone())).collect();
        (self.qualifier(&symbol.domain), self.reference(&symbol.name, &subs, 0))
    }

    /// Declarations for every symbol, written once ahead of the first
    /// equation.
    fn write_declarations(&mut self, pass: &mut Pass) -> Result<()> {
        let model = pass.model;
        self.declared = true;
        self.indexes.uniquify(model);
        if self.calc {
            self.mark_shown_sets(model);
        }

        let mut sets = 0;
        for set in model.sets().filter(|s| self.shown(s)) {
            let time = if self.indexes.get(&set.name).is_some_and(|i| i.time) {
                "(intertemporal) "
            } else {
                ""
            };
            let stmt = format!("set {}{} ({}) ;", time, set.name, set.elements.join(","));
            self.wrap_write(pass, &stmt, true, true)?;
            sets += 1;
        }
        if sets > 0 {
            pass.out.code.push('\n');
        }

        let mut subsets = 0;
        for set in model.sets().filter(|s| self.shown(s)) {
            for sup in &set.supersets {
                writeln!(pass.out.code, "subset {} is subset of {} ;", set.name, sup)?;
                subsets += 1;
            }
        }
        if subsets > 0 {
            pass.out.code.push('\n');
        }

        let has_params = model.parameters().any(|p| self.shown(p));
        for param in model.parameters().filter(|p| self.shown(p)) {
            let (qual, reference) = self.declaration(param);
            self.wrap_write(pass, &format!("coefficient {}{} ;", qual, reference), true, false)?;
        }
        if has_params {
            pass.out.code.push_str("\nfile param ;\n\n");
        }
        let mut generated = 0;
        for param in model.parameters().filter(|p| self.shown(p)) {
            let (qual, reference) = self.declaration(param);
            let header = match param.attributes.as_slice() {
                [header] => header.clone(),
                _ => {
                    generated += 1;
                    format!("H{:03}", generated - 1)
                }
            };
            let stmt = format!(
                "read {}\n   {} from file param header \"{}\" ;",
                qual, reference, header
            );
            self.wrap_write(pass, &stmt, true, false)?;
        }
        if has_params {
            pass.out.code.push('\n');
        }

        let mut files: Vec<&'static str> = Vec::new();
        let mut reads = Vec::new();
        let keyword = if self.calc { "coefficient" } else { "variable" };
        for var in model.variables().filter(|v| self.shown(v)) {
            let (qual, reference) = self.declaration(var);
            self.wrap_write(pass, &format!("{} {}{} ;", keyword, qual, reference), true, false)?;
            if !self.needs_read(model, var)? {
                continue;
            }
            let header = var
                .attributes
                .first()
                .ok_or_else(|| anyhow!("header required for symbol {}", var.name))?;
            let file = HeaderKind::of(var).file_name();
            if !files.contains(&file) {
                files.push(file);
            }
            reads.push(format!(
                "read {}\n   {} from file {} header \"{}\" ;",
                qual, reference, file, header
            ));
        }

        pass.out.code.push('\n');
        if !files.is_empty() {
            for file in &files {
                writeln!(pass.out.code, "file {} ;", file)?;
            }
            pass.out.code.push('\n');
        }
        for stmt in reads {
            self.wrap_write(pass, &stmt, true, false)?;
        }
        Ok(())
    }

    /// Write statements saving every formula result that has a header.
    fn write_results(&self, pass: &mut Pass) -> Result<()> {
        let model = pass.model;
        pass.out.code.push_str("\nfile (new) calc ;\n\n");
        for name in &self.calc_vars {
            let Some(var) = model.symbol(name) else {
                continue;
            };
            if let [header] = var.attributes.as_slice() {
                let (qual, reference) = self.declaration(var);
                let stmt = format!(
                    "write {}\n   {} to file calc header \"{}\" ;\n",
                    qual, reference, header
                );
                self.wrap_write(pass, &stmt, true, false)?;
            }
        }
        pass.out.code.push('\n');
        Ok(())
    }
}

impl Backend for Tablo {
    fn name(&self) -> &'static str {
        if self.calc {
            "tablo-calc"
        } else {
            "tablo"
        }
    }

    fn options(&self) -> Options {
        Options::styled(EqnStyle::Vector, SumStyle::Vector).with_line_length(LINE_LENGTH)
    }

    fn extension(&self) -> &'static str {
        "tab"
    }

    fn begin_file(&mut self, pass: &mut Pass, _basename: &str) -> Result<()> {
        *self = Self {
            calc: self.calc,
            ..Self::default()
        };
        let code = &mut pass.out.code;
        if self.calc {
            writeln!(code, "formula     (default=initial)      ;")?;
        } else {
            writeln!(code, "equation    (default=levels)       ;")?;
            writeln!(code, "equation    (default=add_homotopy) ;")?;
            writeln!(code, "variable    (default=levels)       ;")?;
        }
        writeln!(code, "coefficient (default=parameter)    ;")?;
        writeln!(code)?;
        Ok(())
    }

    fn declare(&mut self, pass: &mut Pass, symbol: &Symbol) -> Result<()> {
        match symbol.kind {
            SymbolKind::Set => self.indexes.declare(pass.model, &symbol.name),
            SymbolKind::Parameter => self.parameters += 1,
            SymbolKind::Variable => self.variables += 1,
        }
        Ok(())
    }

    fn begin_block(&mut self, pass: &mut Pass, eq: &Equation) -> Result<()> {
        if !self.declared {
            self.write_declarations(pass)?;
        }
        self.blocks += 1;
        self.scalars += pass.model.equation_count(eq);

        let qual = self.qualifier(&eq.sets);
        if self.calc {
            let lhs = match eq.lhs.kind {
                NodeType::Name => pass.model.symbol(&eq.lhs.text),
                _ => None,
            };
            match lhs {
                Some(var) if var.kind == SymbolKind::Variable => {
                    if !self.calc_vars.contains(&var.name) {
                        self.calc_vars.push(var.name.clone());
                    }
                }
                _ => bail!("LHS of equation {} in calc mode is not a variable", eq.number),
            }
            write!(pass.out.code, "\nformula {}\n   ", qual)?;
            return Ok(());
        }
        match &eq.label {
            Some(label) => write!(pass.out.code, "\nequation {} {}\n   ", label, qual)?,
            None => write!(pass.out.code, "\nequation EQN{} {}\n   ", self.blocks, qual)?,
        }
        Ok(())
    }

    fn end_eqn(&mut self, pass: &mut Pass, _eq: &Equation) -> Result<()> {
        pass.out.code.push_str(" ;\n");
        Ok(())
    }

    fn begin_func(&self, func: &str, arg: Option<&str>) -> String {
        match (func, arg) {
            (_, Some(set)) => format!("{}({},{},", func, self.indexes.letter(set), set),
            ("log", None) => "loge(".to_string(),
            (_, None) => format!("{}(", func),
        }
    }

    fn show_symbol(&self, _pass: &Pass, name: &str, subs: &[Subscript], ctx: Context) -> Result<String> {
        if ctx.dt != 0 && !self.indexes.has_time(subs) {
            return Err(GenerationError::UnrenderableContext(format!(
                "time offset on {} which has no time set among its subscripts",
                name
            ))
            .into());
        }
        Ok(self.reference(name, subs, ctx.dt))
    }

    fn end_file(&mut self, pass: &mut Pass) -> Result<()> {
        if !self.declared {
            self.write_declarations(pass)?;
        }
        if self.calc {
            self.write_results(pass)?;
        }
        let model = pass.model;

        let mut sizes: BTreeMap<HeaderKind, usize> = BTreeMap::new();
        let mut unused = 0;
        for var in model.variables() {
            if var.used {
                *sizes.entry(HeaderKind::of(var)).or_default() += var.count;
            } else {
                unused += 1;
            }
        }
        let size = |kind: HeaderKind| sizes.get(&kind).copied().unwrap_or(0);
        let total = |pred: fn(&HeaderKind) -> bool| -> usize {
            sizes.iter().filter(|(k, _)| pred(k)).map(|(_, n)| n).sum()
        };
        let endogenous = total(HeaderKind::is_endogenous);
        let exogenous = total(HeaderKind::is_exogenous);
        let other = size(HeaderKind::Other);

        let out = &mut pass.out.info;
        writeln!(out, "\nVector information:\n")?;
        writeln!(out, "   Equations: {}", self.blocks)?;
        writeln!(out, "   Variables, Used: {}", self.variables - unused)?;
        writeln!(out, "   Variables, Unused: {}", unused)?;
        writeln!(out, "   Parameters: {}", self.parameters)?;

        let periods = model.set_elements(TIME_SET).map(|e| e.len()).unwrap_or(0);
        writeln!(out, "\nTime information:\n")?;
        writeln!(out, "   Periods used: {}", periods)?;

        writeln!(out, "\nScalar information:\n")?;
        writeln!(out, "   Equations: {}", self.scalars)?;
        writeln!(out, "\n   Endogenous variables: {}", endogenous)?;
        for kind in [
            HeaderKind::Endogenous,
            HeaderKind::Intermediate,
            HeaderKind::IoTable,
            HeaderKind::Extra,
            HeaderKind::ImplicitEndogenous,
        ] {
            writeln!(out, "      Type {}: {}", kind, size(kind))?;
        }

        writeln!(out, "\n   Closure:")?;
        if self.scalars == endogenous {
            writeln!(out, "      Equations and variables match")?;
        } else if self.scalars > endogenous {
            writeln!(out, "      Excess equations: {}", self.scalars - endogenous)?;
            warn!("{} more equations than endogenous variables", self.scalars - endogenous);
        } else {
            writeln!(out, "      Excess variables: {}", endogenous - self.scalars)?;
            warn!("{} more endogenous variables than equations", endogenous - self.scalars);
        }

        writeln!(out, "\n   Exogenous variables: {}", exogenous)?;
        for kind in [
            HeaderKind::Exogenous,
            HeaderKind::Kalman,
            HeaderKind::Make,
            HeaderKind::ImplicitExogenous,
        ] {
            writeln!(out, "      Type {}: {}", kind, size(kind))?;
        }

        writeln!(out, "\n   Undetermined variables: {}", other)?;
        writeln!(out, "      Type {}: {}", HeaderKind::Other, other)?;
        for var in model
            .variables()
            .filter(|v| v.used && HeaderKind::of(v) == HeaderKind::Other)
        {
            writeln!(out, "      {:<13}: {}", var.name, var.count)?;
        }

        info!(
            "{} equation blocks, {} scalar equations, {} endogenous scalars",
            self.blocks, self.scalars, endogenous
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::error::is_kind;
    use crate::codegen::Generated;
    use crate::model::{Model, ModelBuilder};

    fn builder() -> ModelBuilder {
        ModelBuilder::new()
            .set("time", &["2020", "2021", "2022"], &[])
            .set("yrs", &["2021", "2022"], &["time"])
            .set("reg", &["usa", "row"], &[])
            .parameter("alpha", &["reg"], &["P001"])
            .parameter("beta", &[], &[])
            .variable("Y", &["reg", "yrs"], &["N001"], "output")
            .variable("K", &["reg", "yrs"], &["X002"], "capital")
    }

    fn generate(model: &Model) -> Result<Generated> {
        let mut tablo = Tablo::new();
        let options = tablo.options();
        tablo.write_file(model, options, "model")
    }

    #[test]
    fn declarations_precede_equations() {
        let model = builder()
            .equation_text("Y(reg,yrs) = alpha(reg)*lag(K(reg,yrs)) + beta", &["reg", "yrs"])
            .label("output")
            .build()
            .unwrap();
        let out = generate(&model).unwrap();
        let code = &out.code;
        assert!(code.starts_with("equation    (default=levels)       ;\n"));
        assert!(code.contains(
            "set (intertemporal) time (2020,2021,2022) ;\n\
             set (intertemporal) yrs (2021,2022) ;\n\
             set reg (usa,row) ;\n\n\
             subset yrs is subset of time ;\n\n"
        ));
        assert!(code.contains("coefficient (all,r,reg) alpha(r) ;\ncoefficient beta ;\n\nfile param ;\n\n"));
        assert!(code.contains("read (all,r,reg) \n   alpha(r) from file param header \"P001\" ;\n"));
        assert!(code.contains("read \n   beta from file param header \"H000\" ;\n"));
        assert!(code.contains("variable (all,r,reg) (all,y,yrs) Y(r,y) ;\n"));
        assert!(code.contains("\nfile endog ;\nfile exog ;\n\n"));
        assert!(code.contains("   Y(r,y) from file endog header \"N001\" ;\n"));
        assert!(code.ends_with(
            "\nequation output (all,r,reg) (all,y,yrs) \n   Y(r,y) = alpha(r)*K(r,y-1) + beta ;\n"
        ));
    }

    #[test]
    fn sums_and_logs_use_tablo_forms() {
        let model = builder()
            .equation_text("Y(reg,yrs) = log(sum(reg, K(reg,yrs)))", &["reg", "yrs"])
            .build()
            .unwrap();
        let out = generate(&model).unwrap();
        assert!(out.code.contains("\nequation EQN1 (all,r,reg) (all,y,yrs) \n   Y(r,y) = loge(sum(r,reg,K(r,y))) ;\n"));
    }

    #[test]
    fn literal_elements_are_quoted() {
        let model = builder()
            .equation_text("Y(reg,yrs) = K(usa,yrs)", &["reg", "yrs"])
            .build()
            .unwrap();
        let out = generate(&model).unwrap();
        assert!(out.code.contains("Y(r,y) = K(\"usa\",y) ;"));
    }

    #[test]
    fn closure_is_reported() {
        let model = builder()
            .equation_text("Y(reg,yrs) = K(reg,yrs)", &["reg", "yrs"])
            .build()
            .unwrap();
        let out = generate(&model).unwrap();
        assert!(out.info.contains("   Equations: 4\n"));
        assert!(out.info.contains("   Endogenous variables: 4\n      Type endog: 4\n"));
        assert!(out.info.contains("Equations and variables match"));
        assert!(out.info.contains("   Exogenous variables: 4\n      Type exog: 4\n"));
        assert!(out.info.contains("Periods used: 3"));
    }

    #[test]
    fn excess_equations_are_reported() {
        let model = builder()
            .equation_text("Y(reg,yrs) = K(reg,yrs)", &["reg", "yrs"])
            .equation_text("K(reg,yrs) = Y(reg,yrs)", &["reg", "yrs"])
            .build()
            .unwrap();
        let out = generate(&model).unwrap();
        assert!(out.info.contains("Excess equations: 4"));
    }

    #[test]
    fn variables_need_headers() {
        let model = ModelBuilder::new()
            .variable("Y", &[], &[], "")
            .equation_text("Y = 1", &[])
            .build()
            .unwrap();
        let err = generate(&model).unwrap_err();
        assert!(format!("{:#}", err).contains("header required for symbol Y"));
    }

    #[test]
    fn offsets_need_a_time_set() {
        let model = builder()
            .variable("Z", &["reg"], &["N003"], "")
            .equation_text("Z(reg) = lag(Z(reg))", &["reg"])
            .build()
            .unwrap();
        let err = generate(&model).unwrap_err();
        assert!(is_kind(&err, &GenerationError::UnrenderableContext(String::new())));
    }

    fn calc_builder() -> ModelBuilder {
        ModelBuilder::new()
            .set("reg", &["usa", "row"], &[])
            .set("sec", &["agr"], &[])
            .parameter("alpha", &["reg"], &["P001"])
            .variable("Y", &["reg"], &["N001"], "")
            .variable("X", &["reg"], &["X001"], "")
            .variable("Z", &["sec"], &["N002"], "")
    }

    #[test]
    fn calc_mode_writes_formulas() {
        let model = calc_builder()
            .equation_text("Y(reg) = alpha(reg)*X(reg)", &["reg"])
            .build()
            .unwrap();
        let mut tablo = Tablo::calc();
        let options = tablo.options();
        let out = tablo.write_file(&model, options, "model").unwrap();
        let code = &out.code;
        assert!(code.starts_with(
            "formula     (default=initial)      ;\n\
             coefficient (default=parameter)    ;\n\n\
             set reg (usa,row) ;\n\n\
             coefficient (all,r,reg) alpha(r) ;\n"
        ));
        assert!(code.contains(
            "coefficient (all,r,reg) Y(r) ;\n\
             coefficient (all,r,reg) X(r) ;\n\n\
             file exog ;\n\n\
             read (all,r,reg) \n   X(r) from file exog header \"X001\" ;\n"
        ));
        assert!(code.contains("\nformula (all,r,reg) \n   Y(r) = alpha(r)*X(r) ;\n"));
        assert!(code.ends_with(
            "\nfile (new) calc ;\n\n\
             write (all,r,reg) \n   Y(r) to file calc header \"N001\" ;\n\n\n"
        ));
        assert!(!code.contains("set sec"));
        assert!(!code.contains("Z("));
        assert!(!code.contains("file endog"));
        assert_eq!(tablo.name(), "tablo-calc");
    }

    #[test]
    fn calc_mode_needs_a_variable_on_the_left() {
        let model = calc_builder()
            .equation_text("alpha(reg) = X(reg)", &["reg"])
            .build()
            .unwrap();
        let mut tablo = Tablo::calc();
        let options = tablo.options();
        let err = tablo.write_file(&model, options, "model").unwrap_err();
        assert!(format!("{:#}", err).contains("LHS of equation 1 in calc mode is not a variable"));
    }

    #[test]
    fn header_kinds() {
        let model = builder().build().unwrap();
        let y = model.symbol("Y").unwrap();
        assert_eq!(HeaderKind::of(y), HeaderKind::Endogenous);
        assert_eq!(HeaderKind::of(model.symbol("beta").unwrap()), HeaderKind::Other);
        assert_eq!(HeaderKind::ImplicitExogenous.file_name(), "impl");
        assert!(HeaderKind::Intermediate.is_endogenous());
        assert!(HeaderKind::Make.is_exogenous());
        assert!(!HeaderKind::Parameter.is_endogenous() && !HeaderKind::Parameter.is_exogenous());
    }
}
