//! Index letters for sets, used by the dialects that write references as
//! `X(i,t+1)` rather than by element.

use std::collections::HashMap;

use crate::codegen::Subscript;
use crate::model::Model;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetIndex {
    pub letter: String,
    pub time: bool,
}

#[derive(Debug, Default)]
pub struct SetIndexes {
    order: Vec<String>,
    sets: HashMap<String, SetIndex>,
}

impl SetIndexes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a set, indexed by its first letter until [`SetIndexes::uniquify`]
    /// runs.
    pub fn declare(&mut self, model: &Model, name: &str) {
        let letter = name.chars().take(1).collect();
        let index = SetIndex {
            letter,
            time: model.is_time_set(name),
        };
        if self.sets.insert(name.to_string(), index).is_none() {
            self.order.push(name.to_string());
        }
    }

    /// Rename letters that clash with a declared symbol or with the letter
    /// of an earlier set, by appending a counter: `r` becomes `r1`, `r2`...
    pub fn uniquify(&mut self, model: &Model) {
        let mut taken: Vec<String> = Vec::new();
        for name in &self.order {
            let Some(index) = self.sets.get_mut(name) else {
                continue;
            };
            let stem: String = index.letter.chars().take(1).collect();
            let mut n = 1;
            while model.symbol(&index.letter).is_some() || taken.contains(&index.letter) {
                index.letter = format!("{}{}", stem, n);
                n += 1;
            }
            taken.push(index.letter.clone());
        }
    }

    pub fn get(&self, set: &str) -> Option<&SetIndex> {
        self.sets.get(set)
    }

    /// Letter for `set`, or the set's own name if it was never declared.
    pub fn letter<'a>(&'a self, set: &'a str) -> &'a str {
        self.get(set).map(|i| i.letter.as_str()).unwrap_or(set)
    }

    /// Index text for one subscript, with `dt` applied to time sets.
    /// Concrete elements are passed to `literal` for quoting.
    pub fn subscript<F>(&self, sub: &Subscript, dt: i32, literal: F) -> String
    where
        F: Fn(&str) -> String,
    {
        match sub {
            Subscript::Set(set) => match self.get(set) {
                Some(index) if index.time && dt != 0 => format!("{}{:+}", index.letter, dt),
                Some(index) => index.letter.clone(),
                None => set.clone(),
            },
            Subscript::Bound { element, .. } => literal(element),
            Subscript::Literal(text) => literal(text),
        }
    }

    /// True if any subscript is a time set that can carry an offset.
    pub fn has_time(&self, subs: &[Subscript]) -> bool {
        subs.iter().any(|s| match s {
            Subscript::Set(set) => self.get(set).is_some_and(|i| i.time),
            _ => false,
        })
    }
}
