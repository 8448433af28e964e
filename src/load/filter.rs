// src/load/filter.rs
use glob::Pattern;

use crate::error::{ExportError, Result};

/// Glob patterns selecting which summary vectors to keep, e.g. `"F* WOPR:*"`.
#[derive(Debug, Clone)]
pub struct VectorFilter {
    patterns: Vec<Pattern>,
}

impl VectorFilter {
    /// Split on commas and whitespace. An empty filter keeps everything.
    pub fn parse(spec: &str) -> Result<Self> {
        let patterns = spec
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| {
                Pattern::new(s).map_err(|e| {
                    ExportError::Discovery(format!("invalid vector filter {:?}: {}", s, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn from_patterns<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let joined = specs
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        Self::parse(&joined)
    }

    pub fn all() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(name))
    }
}

impl Default for VectorFilter {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_keeps_everything() {
        let f = VectorFilter::parse("*").unwrap();
        assert!(f.matches("FOPT"));
        assert!(f.matches("WOPR:OP_1"));
    }

    #[test]
    fn several_patterns() {
        let f = VectorFilter::parse("F*PT, WOPR:*").unwrap();
        assert!(f.matches("FOPT"));
        assert!(f.matches("FWPT"));
        assert!(f.matches("WOPR:OP_1"));
        assert!(!f.matches("FOPR"));
        assert!(!f.matches("WWPR:OP_1"));
    }

    #[test]
    fn empty_keeps_everything() {
        assert!(VectorFilter::parse("  ").unwrap().matches("ANY"));
    }

    #[test]
    fn bad_pattern_rejected() {
        assert!(VectorFilter::parse("[F").is_err());
    }
}
