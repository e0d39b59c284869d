use serde::Serialize;
use std::{borrow::Cow, fmt};

/// A single broken rule, reported with a machine-readable code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub message: Cow<'static, str>,
    pub code: &'static str,
}

/// Every rule a record breaks, collected rather than stopping at the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(message: impl Into<Cow<'static, str>>, code: &'static str) -> Self {
        let mut errors = Self::new();
        errors.push(message, code);
        errors
    }

    pub fn push(&mut self, message: impl Into<Cow<'static, str>>, code: &'static str) {
        self.0.push(Violation {
            message: message.into(),
            code,
        });
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.0
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.0.iter().any(|v| v.code == code)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for v in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{} ({})", v.message, v.code)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collector_is_ok() {
        assert_eq!(ValidationErrors::new().into_result(), Ok(()));
    }

    #[test]
    fn collects_every_violation_in_order() {
        let mut errors = ValidationErrors::new();
        errors.push("first", "a");
        errors.push(String::from("second"), "b");

        let errors = errors.into_result().unwrap_err();
        let codes: Vec<_> = errors.violations().iter().map(|v| v.code).collect();
        assert_eq!(codes, ["a", "b"]);
        assert_eq!(errors.to_string(), "first (a); second (b)");
    }
}
