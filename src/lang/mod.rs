use anyhow::Result;

use crate::codegen::{Backend, GenerationError, Options};

pub mod generic;
pub mod html;
pub mod index;
pub mod python;
pub mod tablo;

pub use generic::Generic;
pub use html::Html;
pub use python::Python;
pub use tablo::Tablo;

pub const DIALECTS: [&str; 5] = ["generic", "html", "python", "tablo", "tablo-calc"];

/// The dialect called `name`. `options` only reaches the generic dialect;
/// the others bring their own.
pub fn select(name: &str, options: Options) -> Result<Box<dyn Backend>> {
    let backend: Box<dyn Backend> = match name.to_ascii_lowercase().as_str() {
        "generic" | "default" => Box::new(Generic::new(options)),
        "html" => Box::new(Html::new()),
        "python" => Box::new(Python::new()),
        "tablo" => Box::new(Tablo::new()),
        "tablo-calc" => Box::new(Tablo::calc()),
        _ => {
            return Err(GenerationError::Configuration(format!(
                "unknown language '{}', expected one of: {}",
                name,
                DIALECTS.join(", ")
            ))
            .into())
        }
    };
    Ok(backend)
}
