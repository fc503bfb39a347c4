use anyhow::Result;
use clap::ValueEnum;

use super::error::GenerationError;

/// How an indexed equation is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EqnStyle {
    /// One statement per subscript tuple.
    Scalar,
    /// One statement per equation.
    Vector,
}

/// How summations and products are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SumStyle {
    /// Unrolled over the bound set's elements.
    Scalar,
    /// A single functional form over the bound set.
    Vector,
}

pub const DEFAULT_LINE_LENGTH: usize = 80;

/// Generation-mode flags for one pass. The two styles have no default and
/// must be chosen by the dialect or the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub eqn_style: Option<EqnStyle>,
    pub sum_style: Option<SumStyle>,
    pub normalized: bool,
    /// Column limit for `wrap_write`; 0 disables wrapping.
    pub line_length: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            eqn_style: None,
            sum_style: None,
            normalized: false,
            line_length: DEFAULT_LINE_LENGTH,
        }
    }
}

impl Options {
    pub fn styled(eqn_style: EqnStyle, sum_style: SumStyle) -> Self {
        Self {
            eqn_style: Some(eqn_style),
            sum_style: Some(sum_style),
            ..Self::default()
        }
    }

    pub fn with_line_length(mut self, line_length: usize) -> Self {
        self.line_length = line_length;
        self
    }

    pub fn eqn_style(&self) -> Result<EqnStyle> {
        self.eqn_style.ok_or_else(|| {
            GenerationError::Configuration("equation style has not been set".to_string()).into()
        })
    }

    pub fn sum_style(&self) -> Result<SumStyle> {
        self.sum_style.ok_or_else(|| {
            GenerationError::Configuration("summation style has not been set".to_string()).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_styles_are_configuration_errors() {
        let opts = Options::default();
        let err = opts.eqn_style().unwrap_err();
        assert!(err.to_string().contains("equation style"));
        assert!(opts.sum_style().is_err());
        let opts = Options::styled(EqnStyle::Scalar, SumStyle::Vector);
        assert_eq!(opts.eqn_style().unwrap(), EqnStyle::Scalar);
        assert_eq!(opts.sum_style().unwrap(), SumStyle::Vector);
        assert_eq!(opts.line_length, DEFAULT_LINE_LENGTH);
    }
}
