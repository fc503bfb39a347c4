use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::model::Model;

use super::options::Options;

/// Text streams written during one pass.
#[derive(Debug, Default)]
pub struct Output {
    pub code: String,
    pub info: String,
    extra: BTreeMap<String, String>,
}

impl Output {
    /// An auxiliary stream saved as `<basename><suffix>`.
    pub fn extra(&mut self, suffix: &str) -> &mut String {
        self.extra.entry(suffix.to_string()).or_default()
    }
}

/// Counters kept by the driver over one pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub blocks: usize,
    pub statements: usize,
}

/// Everything one generation pass reads and writes. Created by the driver
/// and dropped with its buffers if the pass aborts.
pub struct Pass<'m> {
    pub model: &'m Model,
    pub options: Options,
    pub out: Output,
    pub stats: Stats,
}

impl<'m> Pass<'m> {
    pub fn new(model: &'m Model, options: Options) -> Self {
        Self {
            model,
            options,
            out: Output::default(),
            stats: Stats::default(),
        }
    }

    pub fn finish(self, extension: &str) -> Generated {
        Generated {
            extension: extension.to_string(),
            code: self.out.code,
            info: self.out.info,
            extra: self.out.extra,
            stats: self.stats,
        }
    }
}

/// The output of a completed pass.
#[derive(Debug)]
pub struct Generated {
    pub extension: String,
    pub code: String,
    pub info: String,
    pub extra: BTreeMap<String, String>,
    pub stats: Stats,
}

impl Generated {
    pub fn extra(&self, suffix: &str) -> Option<&str> {
        self.extra.get(suffix).map(|s| s.as_str())
    }

    /// Write `basename.<ext>`, `basename.info` and every auxiliary stream.
    pub fn save(&self, basename: &str) -> Result<()> {
        let mut files = vec![
            (format!("{}.{}", basename, self.extension), &self.code),
            (format!("{}.info", basename), &self.info),
        ];
        files.extend(self.extra.iter().map(|(suffix, text)| (format!("{}{}", basename, suffix), text)));
        for (path, text) in files {
            fs::write(Path::new(&path), text).with_context(|| format!("could not write {}", path))?;
            info!("wrote {}", path);
        }
        Ok(())
    }
}
