use anyhow::{Context, Result};
use log::{debug, info, log_enabled, Level};

use crate::model::{Equation, Model};

use super::backend::Backend;
use super::cart::Cartesian;
use super::error::GenerationError;
use super::options::{EqnStyle, Options};
use super::output::{Generated, Pass};

/// Run one complete generation pass of `backend` over `model`.
///
/// Sets, then parameters, then variables are declared in declaration order,
/// after which every included equation is emitted as one block. Nothing is
/// returned unless the whole pass succeeds.
pub fn write_file<B: Backend + ?Sized>(
    backend: &mut B,
    model: &Model,
    options: Options,
    basename: &str,
) -> Result<Generated> {
    let mut pass = Pass::new(model, options);
    info!("generating {} output for {}", backend.name(), basename);

    backend.begin_file(&mut pass, basename)?;

    let eqn_style = pass.options.eqn_style()?;
    let sum_style = pass.options.sum_style()?;
    debug!("equation style {:?}, summation style {:?}", eqn_style, sum_style);

    for symbol in model.sets().chain(model.parameters()).chain(model.variables()) {
        backend
            .declare(&mut pass, symbol)
            .with_context(|| format!("while declaring {}", symbol.name))?;
    }

    for eq in model.equations() {
        if !backend.include_equation(eq) {
            debug!("skipping {}", eq.display_name());
            continue;
        }
        write_block(backend, &mut pass, eq, eqn_style)
            .with_context(|| format!("while generating {}", eq.display_name()))?;
    }

    backend.end_file(&mut pass)?;

    info!(
        "{} blocks, {} statements written",
        pass.stats.blocks, pass.stats.statements
    );
    Ok(pass.finish(backend.extension()))
}

fn write_block<B: Backend + ?Sized>(
    backend: &mut B,
    pass: &mut Pass,
    eq: &Equation,
    eqn_style: EqnStyle,
) -> Result<()> {
    let model = pass.model;
    if log_enabled!(Level::Debug) {
        let lhs = backend.render(crate::ast::NodeType::Nul, Some(&eq.lhs), None)?;
        let rhs = backend.render(crate::ast::NodeType::Nul, Some(&eq.rhs), None)?;
        debug!("{}: {} = {} over {:?}", eq.display_name(), lhs, rhs, eq.sets);
    }

    backend.begin_block(pass, eq)?;
    pass.stats.blocks += 1;

    match eqn_style {
        EqnStyle::Vector => backend.show_eq(pass, eq, &eq.sets, &[])?,
        EqnStyle::Scalar => {
            let expected = model.equation_count(eq);
            let mut written = 0;
            for tuple in Cartesian::over(model, &eq.sets)? {
                backend.show_eq(pass, eq, &eq.sets, &tuple)?;
                written += 1;
            }
            if written != expected {
                return Err(GenerationError::CountMismatch(format!(
                    "incorrect number of equations written: expected {}, wrote {}; \
                     an implicit time dimension must be declared as a set of the equation",
                    expected, written
                ))
                .into());
            }
        }
    }

    backend.end_block(pass, eq)
}
