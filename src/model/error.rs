use std::fmt;

/// A problem found while assembling a model, tied to the symbol or
/// equation it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    text: String,
    subject: Option<String>,
}

impl ValidationError {
    pub fn new(text: String, subject: Option<String>) -> Self {
        Self { text, subject }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(subject) = &self.subject {
            write!(f, "{}: Error: {}", subject, self.text)
        } else {
            write!(f, "Error: {}", self.text)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, new: ValidationError) {
        self.errors.push(new);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn has_error_contains(&self, text: &str) -> bool {
        self.errors.iter().any(|err| err.text.contains(text))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for err in &self.errors {
            writeln!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
