use std::path::Path;

use anyhow::Result;
use clap::Parser;
use symgen::codegen::{EqnStyle, SumStyle};
use symgen::{generate, Model, Overrides};

/// generates code in a target language from a JSON model of indexed equations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input model file (JSON)
    input: String,

    /// Target language: generic, html, python, tablo or tablo-calc
    #[arg(short, long, default_value = "generic")]
    lang: String,

    /// Output base name [default: input file name without extension]
    #[arg(short, long)]
    out: Option<String>,

    /// Equation style, overriding the language's default
    #[arg(long, value_enum)]
    eqn_style: Option<EqnStyle>,

    /// Summation style, overriding the language's default
    #[arg(long, value_enum)]
    sum_style: Option<SumStyle>,

    /// Write equations as `lhs - (rhs)`
    #[arg(short, long)]
    normalized: bool,

    /// Wrap output lines at this column (0 disables wrapping)
    #[arg(long)]
    line_length: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Args::parse();

    let model = Model::from_json_file(&cli.input)?;
    let basename = match cli.out {
        Some(out) => out,
        None => Path::new(&cli.input)
            .with_extension("")
            .to_string_lossy()
            .into_owned(),
    };
    let overrides = Overrides {
        eqn_style: cli.eqn_style,
        sum_style: cli.sum_style,
        normalized: cli.normalized,
        line_length: cli.line_length,
    };
    let generated = generate(&model, &cli.lang, overrides, &basename)?;
    generated.save(&basename)
}
