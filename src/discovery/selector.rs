//! Equality-based label selectors.
//!
//! Supports the subset of the Kubernetes selector grammar that a fixed
//! monitoring criterion needs: `key=value`, `key==value`, `key!=value`,
//! `key` (exists) and `!key` (does not exist), joined by commas (AND).

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("selector is empty")]
    Empty,
    #[error("empty key in term '{0}'")]
    EmptyKey(String),
    #[error("invalid character in term '{0}'")]
    InvalidCharacter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    NotExists(String),
}

/// A parsed, immutable label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut requirements = Vec::new();
        for term in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            requirements.push(parse_term(term)?);
        }
        if requirements.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Self { requirements })
    }

    /// Returns true if `labels` satisfy every requirement.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| match r {
            Requirement::Equals(k, v) => labels.get(k) == Some(v),
            Requirement::NotEquals(k, v) => labels.get(k) != Some(v),
            Requirement::Exists(k) => labels.contains_key(k),
            Requirement::NotExists(k) => !labels.contains_key(k),
        })
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match r {
                Requirement::Equals(k, v) => write!(f, "{k}={v}")?,
                Requirement::NotEquals(k, v) => write!(f, "{k}!={v}")?,
                Requirement::Exists(k) => write!(f, "{k}")?,
                Requirement::NotExists(k) => write!(f, "!{k}")?,
            }
        }
        Ok(())
    }
}

fn parse_term(term: &str) -> Result<Requirement, SelectorError> {
    let requirement = if let Some((k, v)) = term.split_once("!=") {
        Requirement::NotEquals(k.trim().to_string(), v.trim().to_string())
    } else if let Some((k, v)) = term.split_once("==") {
        Requirement::Equals(k.trim().to_string(), v.trim().to_string())
    } else if let Some((k, v)) = term.split_once('=') {
        Requirement::Equals(k.trim().to_string(), v.trim().to_string())
    } else if let Some(k) = term.strip_prefix('!') {
        Requirement::NotExists(k.trim().to_string())
    } else {
        Requirement::Exists(term.to_string())
    };

    let (key, value) = match &requirement {
        Requirement::Equals(k, v) | Requirement::NotEquals(k, v) => (k.as_str(), v.as_str()),
        Requirement::Exists(k) | Requirement::NotExists(k) => (k.as_str(), ""),
    };
    if key.is_empty() {
        return Err(SelectorError::EmptyKey(term.to_string()));
    }
    let key_ok = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/'));
    let value_ok = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !key_ok || !value_ok {
        return Err(SelectorError::InvalidCharacter(term.to_string()));
    }
    Ok(requirement)
}
