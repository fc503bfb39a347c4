//! JSON model files.
//!
//! ```json
//! {
//!   "sets": [{ "name": "r", "elements": ["usa", "row"] }],
//!   "parameters": [{ "name": "alpha", "domain": ["r"] }],
//!   "variables": [{ "name": "Y", "domain": ["r"], "attributes": ["end", "gdp"] }],
//!   "equations": [{ "equation": "Y(r) = alpha(r)", "sets": ["r"] }]
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;

use super::{Model, ModelBuilder};

fn default_true() -> bool {
    true
}

fn strs(items: &[String]) -> Vec<&str> {
    items.iter().map(|s| s.as_str()).collect()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetDecl {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<String>,
    #[serde(default)]
    pub subset_of: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// A parameter or variable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolDecl {
    pub name: String,
    #[serde(default)]
    pub domain: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquationDecl {
    /// `lhs = rhs` in expression syntax.
    pub equation: String,
    #[serde(default)]
    pub sets: Vec<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default = "default_true")]
    pub time_ok: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelFile {
    #[serde(default)]
    pub sets: Vec<SetDecl>,
    #[serde(default)]
    pub parameters: Vec<SymbolDecl>,
    #[serde(default)]
    pub variables: Vec<SymbolDecl>,
    #[serde(default)]
    pub equations: Vec<EquationDecl>,
}

impl ModelFile {
    pub fn builder(&self) -> ModelBuilder {
        let mut b = ModelBuilder::new();
        for set in &self.sets {
            b = b
                .set(&set.name, &strs(&set.elements), &strs(&set.subset_of))
                .describe(&set.description);
        }
        for param in &self.parameters {
            b = b
                .parameter(&param.name, &strs(&param.domain), &strs(&param.attributes))
                .describe(&param.description);
        }
        for var in &self.variables {
            b = b.variable(
                &var.name,
                &strs(&var.domain),
                &strs(&var.attributes),
                &var.description,
            );
        }
        for eq in &self.equations {
            b = b
                .equation_text(&eq.equation, &strs(&eq.sets))
                .equation_attributes(&strs(&eq.attributes))
                .time_ok(eq.time_ok);
            if let Some(label) = &eq.label {
                b = b.label(label);
            }
            if let Some(count) = eq.count {
                b = b.count(count);
            }
        }
        b
    }
}

impl Model {
    pub fn from_json_str(text: &str) -> Result<Model> {
        let file: ModelFile = serde_json::from_str(text).context("invalid model file")?;
        file.builder().build()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Model> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        let model = Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))?;
        info!(
            "loaded {}: {} symbols, {} equations",
            path.display(),
            model.symbols().count(),
            model.equations().len()
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "sets": [
            { "name": "r", "elements": ["usa", "row"], "description": "regions" },
            { "name": "oecd", "elements": ["usa"], "subset_of": ["r"] }
        ],
        "parameters": [{ "name": "alpha", "domain": ["r"], "description": "share" }],
        "variables": [
            { "name": "Y", "domain": ["r"], "attributes": ["end", "gdp"], "description": "output" }
        ],
        "equations": [
            { "equation": "Y(r) = alpha(r)*Y(r)", "sets": ["r"], "label": "output" },
            { "equation": "Y(oecd) = 1", "sets": ["oecd"], "count": 3, "time_ok": false }
        ]
    }"#;

    #[test]
    fn loads_declarations_and_equations() {
        let model = Model::from_json_str(MODEL).unwrap();
        assert_eq!(model.set_elements("r").unwrap(), ["usa", "row"]);
        assert!(model.is_subset("oecd", "r"));
        assert_eq!(model.symbol("alpha").unwrap().description, "share");
        assert_eq!(model.symbol("Y").unwrap().count, 2);
        let eqs = model.equations();
        assert_eq!(eqs.len(), 2);
        assert_eq!(eqs[0].label.as_deref(), Some("output"));
        assert_eq!(eqs[0].count, 2);
        assert_eq!(eqs[1].count, 3);
        assert!(!eqs[1].time_ok);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = Model::from_json_str(r#"{ "sets": [], "blocks": [] }"#).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid model file"));
    }

    #[test]
    fn reports_validation_errors() {
        let text = r#"{ "variables": [{ "name": "Y", "domain": ["nowhere"] }] }"#;
        assert!(Model::from_json_str(text).is_err());
    }
}
