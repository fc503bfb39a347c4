//! Scalar equations over flat numpy vectors.
//!
//! Each variable reference becomes `vec[offset]`, where the vector is chosen
//! by the variable's type and the context it is referenced in, and the
//! offset comes from the vector allocator.

use std::collections::HashMap;
use std::fmt::Write;

use anyhow::{anyhow, bail, Result};
use itertools::Itertools;
use log::info;
use ndarray::Array1;

use crate::codegen::alloc::{ravel_index, Index, Shape};
use crate::codegen::{
    Backend, Cartesian, Context, EqnStyle, GenerationError, Options, Pass, Role, SumStyle,
    Subscript, VarType, VectorAllocator, VectorKind,
};
use crate::model::{Equation, Symbol, SymbolKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PyVector {
    Z1l,
    Zel,
    J1l,
    X1l,
    Z1r,
    Zer,
    Yjr,
    Yxr,
    Exo,
    Exz,
    Par,
    X1r,
}

impl PyVector {
    pub const ALL: [PyVector; 12] = [
        PyVector::Z1l,
        PyVector::Zel,
        PyVector::J1l,
        PyVector::X1l,
        PyVector::Z1r,
        PyVector::Zer,
        PyVector::Yjr,
        PyVector::Yxr,
        PyVector::Exo,
        PyVector::Exz,
        PyVector::Par,
        PyVector::X1r,
    ];

    /// Vectors holding endogenous unknowns.
    pub const ENDOGENOUS: [PyVector; 4] = [PyVector::Z1l, PyVector::Zel, PyVector::J1l, PyVector::X1l];
}

impl VectorKind for PyVector {
    fn driver(&self) -> Option<Self> {
        match self {
            PyVector::Z1r => Some(PyVector::Z1l),
            PyVector::Yjr => Some(PyVector::J1l),
            PyVector::Zer | PyVector::Exz => Some(PyVector::Zel),
            PyVector::Yxr | PyVector::X1r => Some(PyVector::X1l),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PyVector::Z1l => "z1l",
            PyVector::Zel => "zel",
            PyVector::J1l => "j1l",
            PyVector::X1l => "x1l",
            PyVector::Z1r => "z1r",
            PyVector::Zer => "zer",
            PyVector::Yjr => "yjr",
            PyVector::Yxr => "yxr",
            PyVector::Exo => "exo",
            PyVector::Exz => "exz",
            PyVector::Par => "par",
            PyVector::X1r => "x1r",
        }
    }
}

use PyVector::*;

/// Roles in order: lhs lag, lhs current, lhs lead, rhs lag, rhs current,
/// rhs lead.
pub static VAR_TYPES: [VarType<PyVector>; 7] = [
    VarType { name: "end", roles: [None, Some(Z1l), None, None, Some(Z1r), None] },
    VarType { name: "ets", roles: [None, Some(Zel), None, None, Some(Zer), Some(Exz)] },
    VarType { name: "exo", roles: [None, None, None, None, Some(Exo), None] },
    VarType { name: "cos", roles: [None, None, Some(J1l), None, Some(Yjr), None] },
    VarType { name: "sta", roles: [None, None, Some(X1l), None, Some(Yxr), None] },
    VarType { name: "stl", roles: [None, Some(X1l), None, Some(Yxr), Some(X1r), None] },
    VarType { name: "par", roles: [None, None, None, None, Some(Par), None] },
];

pub const UNITS: [&str; 17] = [
    "del",
    "pct",
    "gdp",
    "usgdp",
    "cent",
    "dollar",
    "gwh",
    "gwhgdp",
    "idx",
    "nomusdbillion",
    "realusdbillion",
    "btu",
    "mmt",
    "btugdp",
    "mmtgdp",
    "btuusgdp",
    "mmtusgdp",
];

fn var_type(symbol: &Symbol) -> Result<&'static VarType<PyVector>> {
    if symbol.kind == SymbolKind::Parameter {
        return VAR_TYPES
            .iter()
            .find(|t| t.name == "par")
            .ok_or_else(|| anyhow!("no parameter type"));
    }
    let mut found = VAR_TYPES
        .iter()
        .filter(|t| t.name != "par" && symbol.has_attribute(t.name));
    match (found.next(), found.next()) {
        (Some(t), None) => Ok(t),
        (Some(_), Some(_)) => bail!("multiple variable types for variable {}", symbol.name),
        (None, _) => bail!("no type declared for variable {}", symbol.name),
    }
}

fn unit(symbol: &Symbol) -> Result<&'static str> {
    UNITS
        .iter()
        .copied()
        .find(|u| symbol.has_attribute(u))
        .ok_or_else(|| {
            anyhow!(
                "no units given for variable {} with attributes {}",
                symbol.name,
                symbol.attributes.join(",")
            )
        })
}

fn qualified(name: &str, subs: &[String]) -> String {
    if subs.is_empty() {
        name.to_string()
    } else {
        format!("{}({})", name, subs.join(","))
    }
}

#[derive(Debug, Default)]
pub struct Python {
    alloc: VectorAllocator<PyVector>,
    shapes: HashMap<String, (Vec<String>, Shape)>,
    blocks: usize,
    scalars: usize,
    vars: usize,
}

impl Python {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocator(&self) -> &VectorAllocator<PyVector> {
        &self.alloc
    }

    /// Position of the referenced element within the symbol's storage.
    fn position(&self, pass: &Pass, name: &str, subs: &[Subscript]) -> Result<usize> {
        let (domain, shape) = self
            .shapes
            .get(name)
            .ok_or_else(|| anyhow!("{} is not a declared parameter or variable", name))?;
        if subs.len() != domain.len() {
            bail!(
                "{} is declared over {} sets but referenced with {} subscripts",
                name,
                domain.len(),
                subs.len()
            );
        }
        let index = domain
            .iter()
            .zip(subs)
            .map(|(set, sub)| -> Result<usize> {
                match sub {
                    Subscript::Set(unbound) => Err(GenerationError::UnrenderableContext(format!(
                        "subscript {} of {} has no element bound to it",
                        unbound, name
                    ))
                    .into()),
                    _ => pass.model.element_index(set, sub.text()).ok_or_else(|| {
                        anyhow!("{} is not an element of {} in {}", sub.text(), set, name)
                    }),
                }
            })
            .collect::<Result<Vec<usize>>>()?;
        Ok(ravel_index(&Index::from(index), shape))
    }

    fn write_listings(&mut self, pass: &mut Pass, symbol: &Symbol, unit: &str) -> Result<()> {
        let model = pass.model;
        let first_var = self.vars + 1;
        if symbol.kind == SymbolKind::Variable {
            let vars = pass.out.extra("_vars.csv");
            for tuple in Cartesian::over(model, &symbol.domain)? {
                self.vars += 1;
                writeln!(
                    vars,
                    "{},\"{}\",\"{}\",\"{}\"",
                    self.vars,
                    qualified(&symbol.name, &tuple),
                    symbol.description,
                    unit
                )?;
            }
        }

        let allocation = self
            .alloc
            .allocation(&symbol.name)
            .ok_or_else(|| anyhow!("{} was never allocated", symbol.name))?;
        for slot in allocation.slots.iter().flatten() {
            let mut n = first_var;
            for (pos, tuple) in Cartesian::over(model, &symbol.domain)?.enumerate() {
                let vec = slot.vector.name();
                let offset = slot.offset + pos;
                writeln!(
                    pass.out.extra("_varmap.csv"),
                    "\"{}\",\"{}[{}]\",{},{}",
                    qualified(&symbol.name, &tuple),
                    vec,
                    offset,
                    vec,
                    offset
                )?;
                let number = if symbol.kind == SymbolKind::Parameter { 0 } else { n };
                writeln!(
                    pass.out.extra("_optmap.csv"),
                    "{},\"{}[{}]\",{},{}",
                    number,
                    vec,
                    offset,
                    vec,
                    offset
                )?;
                n += 1;
            }
        }
        Ok(())
    }
}

impl Backend for Python {
    fn name(&self) -> &'static str {
        "python"
    }

    fn options(&self) -> Options {
        Options::styled(EqnStyle::Scalar, SumStyle::Scalar)
    }

    fn extension(&self) -> &'static str {
        "py"
    }

    fn begin_file(&mut self, pass: &mut Pass, _basename: &str) -> Result<()> {
        *self = Self::new();
        let code = &mut pass.out.code;
        writeln!(code, "import numpy as np")?;
        writeln!(code, "from math import exp")?;
        writeln!(code, "from math import log")?;
        writeln!(code, "\n")?;
        let args = PyVector::ALL
            .iter()
            .map(|v| format!("{}:np.ndarray", v.name()))
            .join(", ");
        writeln!(code, "def msgproc({}):", args)?;
        writeln!(code)?;
        Ok(())
    }

    fn declare(&mut self, pass: &mut Pass, symbol: &Symbol) -> Result<()> {
        if symbol.is_set() {
            return Ok(());
        }
        if symbol.count < 1 {
            return Err(GenerationError::InvariantViolation(format!(
                "{} has no element count",
                symbol.name
            ))
            .into());
        }
        let var_type = var_type(symbol)?;
        let unit = match symbol.kind {
            SymbolKind::Variable => unit(symbol)?,
            _ => "",
        };

        let sizes = symbol
            .domain
            .iter()
            .map(|d| pass.model.set_elements(d).map(|e| e.len()))
            .collect::<Result<Vec<usize>>>()?;
        self.shapes
            .insert(symbol.name.clone(), (symbol.domain.clone(), Array1::from(sizes)));
        self.alloc.allocate(&symbol.name, var_type, symbol.count)?;

        writeln!(
            pass.out.extra("_varinfo.csv"),
            "\"{}\",{},{},{},\"{}\",\"{}\"",
            qualified(&symbol.name, &symbol.domain),
            symbol.count,
            var_type.name,
            unit,
            symbol.description,
            symbol.attributes.join(",")
        )?;
        self.write_listings(pass, symbol, unit)
    }

    fn begin_block(&mut self, pass: &mut Pass, eq: &Equation) -> Result<()> {
        self.blocks += 1;
        let nstart = self.scalars + 1;
        let nscalar = pass.model.equation_count(eq);
        self.scalars += nscalar;

        let code = &mut pass.out.code;
        writeln!(code, "    # Equation block {}", self.blocks)?;

        let is_variable = eq
            .lhs_name()
            .and_then(|n| pass.model.symbol(n))
            .is_some_and(|s| s.kind == SymbolKind::Variable);
        if !is_variable {
            bail!("LHS of an equation is not a variable");
        }

        if !eq.sets.is_empty() {
            writeln!(code, "    #    Defined over sets ({})", eq.sets.join(","))?;
        }
        if nscalar > 0 {
            writeln!(
                code,
                "    #    Scalar equations {}-{} ({} total)\n",
                nstart, self.scalars, nscalar
            )?;
        } else {
            writeln!(code, "    #    Contains undeclared symbols")?;
        }
        Ok(())
    }

    fn begin_eqn(&mut self, pass: &mut Pass, _eq: &Equation) -> Result<()> {
        pass.out.code.push_str("    ");
        Ok(())
    }

    fn end_eqn(&mut self, pass: &mut Pass, _eq: &Equation) -> Result<()> {
        pass.out.code.push_str("\n\n");
        Ok(())
    }

    fn power_op(&self) -> &str {
        "**"
    }

    fn continuation(&self) -> &str {
        " \\\n        "
    }

    fn wrap_break(&self) -> &str {
        " \\\n   "
    }

    fn show_symbol(&self, pass: &Pass, name: &str, subs: &[Subscript], ctx: Context) -> Result<String> {
        let role = Role::from_context(ctx)?;
        let slot = self.alloc.lookup(name, role)?;
        let position = self.position(pass, name, subs)?;
        Ok(format!("{}[{}]", slot.vector.name(), slot.offset + position))
    }

    fn end_file(&mut self, pass: &mut Pass) -> Result<()> {
        pass.out.code.push_str("\n# END OF MSGPROC function declaration\n");

        let ecount = self.scalars;
        let vcount: usize = PyVector::ENDOGENOUS.iter().map(|v| self.alloc.size(*v)).sum();
        let ucount: usize = pass
            .model
            .variables()
            .filter(|v| v.has_attribute("end") && !v.used)
            .map(|v| v.count)
            .sum();

        let used = vcount.saturating_sub(ucount);
        let out = &mut pass.out.info;
        writeln!(out, "\nLength of MSGPROC Vectors:\n")?;
        for vector in PyVector::ALL.iter().filter(|v| v.driver().is_none()) {
            writeln!(out, "   {} has {} elements", vector.name(), self.alloc.size(*vector))?;
        }
        writeln!(out)?;
        writeln!(out, "Equation Count: {}", ecount)?;
        writeln!(out, "Endogenous Variables, Used:   {}", used)?;
        writeln!(out, "Endogenous Variables, Total:  {}", vcount)?;
        info!("{} scalar equations, {} endogenous variables used", ecount, used);

        if ecount != used {
            let err = "Counts of equations and endogenous variables do not match.";
            writeln!(out, "\nFatal Error:\n   {}", err)?;
            return Err(GenerationError::CountMismatch(format!(
                "{} {} equations, {} endogenous variables",
                err,
                ecount,
                used
            ))
            .into());
        }
        Ok(())
    }
}
