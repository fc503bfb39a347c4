use std::fmt;

/// Fatal conditions raised while generating code. Every one of them aborts
/// the pass; they travel inside `anyhow::Error` and can be recovered with
/// `downcast_ref` by callers that need to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// A node type reached the precedence table with no matching case.
    InvariantViolation(String),
    /// A generation-mode option was never set.
    Configuration(String),
    /// Generated counts disagree with declared counts.
    CountMismatch(String),
    /// A dependent vector role was processed before its driver.
    OrderingViolation(String),
    /// A symbol was referenced in a role its type forbids.
    UnrenderableContext(String),
    /// A line has no legal break point before the column limit.
    UnwrappableLine(String),
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::InvariantViolation(_) => "invariant violation",
            GenerationError::Configuration(_) => "configuration error",
            GenerationError::CountMismatch(_) => "count mismatch",
            GenerationError::OrderingViolation(_) => "ordering violation",
            GenerationError::UnrenderableContext(_) => "unrenderable context",
            GenerationError::UnwrappableLine(_) => "unwrappable line",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GenerationError::InvariantViolation(m)
            | GenerationError::Configuration(m)
            | GenerationError::CountMismatch(m)
            | GenerationError::OrderingViolation(m)
            | GenerationError::UnrenderableContext(m)
            | GenerationError::UnwrappableLine(m) => m,
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for GenerationError {}

/// True if `err` or anything in its context chain is a `GenerationError`
/// of the same kind as `like`.
pub fn is_kind(err: &anyhow::Error, like: &GenerationError) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<GenerationError>())
        .any(|e| std::mem::discriminant(e) == std::mem::discriminant(like))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn display_names_the_kind() {
        let err = GenerationError::UnwrappableLine("xxxx".to_string());
        assert_eq!(err.to_string(), "unwrappable line: xxxx");
    }

    #[test]
    fn kind_survives_context() {
        let err: anyhow::Result<()> =
            Err(GenerationError::CountMismatch("3 != 2".to_string())).context("equation 1");
        let err = err.unwrap_err();
        assert!(is_kind(&err, &GenerationError::CountMismatch(String::new())));
        assert!(!is_kind(&err, &GenerationError::Configuration(String::new())));
    }
}
