use std::fmt::Write;

use anyhow::Result;

use crate::codegen::{Backend, Options, Pass};

/// Every hook at its default. The generation styles come from the caller.
#[derive(Debug, Default)]
pub struct Generic {
    options: Options,
}

impl Generic {
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

impl Backend for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn options(&self) -> Options {
        self.options.clone()
    }

    fn end_file(&mut self, pass: &mut Pass) -> Result<()> {
        writeln!(pass.out.info, "Equation blocks: {}", pass.stats.blocks)?;
        writeln!(pass.out.info, "Statements:      {}", pass.stats.statements)?;
        Ok(())
    }
}
