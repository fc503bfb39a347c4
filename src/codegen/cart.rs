use anyhow::Result;

use crate::model::Model;

/// Every combination of elements drawn from an ordered list of sets, in
/// nested-loop order with the last set varying fastest.
///
/// The sequence is finite and can be restarted with [`Cartesian::reset`].
/// An empty list of sets yields exactly one empty tuple; a list containing
/// an empty set yields nothing.
#[derive(Debug, Clone)]
pub struct Cartesian<'a> {
    sets: Vec<&'a [String]>,
    cursor: Vec<usize>,
    remaining: usize,
}

impl<'a> Cartesian<'a> {
    pub fn new(sets: Vec<&'a [String]>) -> Self {
        let total = sets.iter().map(|s| s.len()).product();
        let cursor = vec![0; sets.len()];
        Self {
            sets,
            cursor,
            remaining: total,
        }
    }

    /// Expand the named sets of `model`.
    pub fn over<S: AsRef<str>>(model: &'a Model, names: &[S]) -> Result<Self> {
        let sets = names
            .iter()
            .map(|name| model.set_elements(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(sets))
    }

    /// Total number of tuples the full sequence yields.
    pub fn total(&self) -> usize {
        self.sets.iter().map(|s| s.len()).product()
    }

    pub fn reset(&mut self) {
        self.cursor.iter_mut().for_each(|c| *c = 0);
        self.remaining = self.total();
    }

    fn advance(&mut self) {
        for (pos, set) in self.cursor.iter_mut().zip(self.sets.iter()).rev() {
            *pos += 1;
            if *pos < set.len() {
                return;
            }
            *pos = 0;
        }
    }
}

impl Iterator for Cartesian<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let tuple = self
            .cursor
            .iter()
            .zip(self.sets.iter())
            .map(|(&pos, set)| set[pos].clone())
            .collect();
        self.remaining -= 1;
        self.advance();
        Some(tuple)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Cartesian<'_> {}
