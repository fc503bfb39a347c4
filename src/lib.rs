extern crate pest;
#[macro_use]
extern crate pest_derive;

pub mod ast;
pub mod codegen;
pub mod lang;
pub mod model;
pub mod parser;

pub use codegen::{Backend, EqnStyle, Generated, GenerationError, Options, SumStyle};
pub use model::{Model, ModelBuilder};

/// Generate `model` in the dialect called `lang`.
///
/// The dialect's own options are used, with any style or flag set in
/// `overrides` taking precedence.
pub fn generate(model: &Model, lang: &str, overrides: Overrides, basename: &str) -> anyhow::Result<Generated> {
    let mut backend = lang::select(lang, overrides.apply(Options::default()))?;
    let options = overrides.apply(backend.options());
    backend.write_file(model, options, basename)
}

/// Options given on the command line, applied over a dialect's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub eqn_style: Option<EqnStyle>,
    pub sum_style: Option<SumStyle>,
    pub normalized: bool,
    pub line_length: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, mut options: Options) -> Options {
        if self.eqn_style.is_some() {
            options.eqn_style = self.eqn_style;
        }
        if self.sum_style.is_some() {
            options.sum_style = self.sum_style;
        }
        options.normalized |= self.normalized;
        if let Some(line_length) = self.line_length {
            options.line_length = line_length;
        }
        options
    }
}
