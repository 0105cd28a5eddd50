//! Declarative category rule tables
//!
//! Drug classes, diagnosis categories, race groups and the qualifying code
//! range are all expressed as ordered `category name -> patterns` tables and
//! evaluated by a single [`PatternClassifier`].

pub mod defaults;

use regex::Regex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;

use crate::error::{PipelineError, Result};

pub use defaults::{CompiledRules, RuleTables};

/// How a rule's patterns are compared against a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Pattern may occur anywhere in the value
    Substring,
    /// Value must start with the pattern (ICD code prefixes)
    Prefix,
}

/// One category and the literal patterns that select it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Category name, used as the column suffix
    pub name: String,
    /// Literal patterns, matched case-insensitively
    pub patterns: Vec<String>,
}

impl PatternRule {
    /// Build a rule from string literals
    #[must_use]
    pub fn new(name: &str, patterns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            patterns: patterns.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

/// Compiled rule table
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    names: Vec<String>,
    regexes: Vec<Regex>,
    mode: MatchMode,
}

impl PatternClassifier {
    /// Compile a rule table
    ///
    /// Patterns are treated as literals; category names must be unique and
    /// non-empty.
    pub fn compile(rules: &[PatternRule], mode: MatchMode) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(rules.len());
        let mut regexes = Vec::with_capacity(rules.len());

        for rule in rules {
            if rule.name.trim().is_empty() {
                return Err(PipelineError::Config(
                    "rule table contains a category without a name".to_string(),
                ));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "duplicate rule category '{}'",
                    rule.name
                )));
            }

            let alternatives: Vec<String> = rule
                .patterns
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(regex::escape)
                .collect();

            // An empty alternation would match everything
            let body = if alternatives.is_empty() {
                r"[^\s\S]".to_string()
            } else {
                format!("(?:{})", alternatives.join("|"))
            };
            let anchor = match mode {
                MatchMode::Substring => "",
                MatchMode::Prefix => "^",
            };

            regexes.push(Regex::new(&format!("(?i){anchor}{body}"))?);
            names.push(rule.name.clone());
        }

        Ok(Self {
            names,
            regexes,
            mode,
        })
    }

    /// Number of categories
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table has no categories
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Category names in table order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Match mode the table was compiled with
    #[must_use]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Indices of every category whose patterns match `value`
    #[must_use]
    pub fn matches(&self, value: &str) -> SmallVec<[usize; 4]> {
        let value = value.trim();
        self.regexes
            .iter()
            .enumerate()
            .filter(|(_, re)| re.is_match(value))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Index of the first category (in table order) matching `value`
    #[must_use]
    pub fn first_match(&self, value: &str) -> Option<usize> {
        let value = value.trim();
        self.regexes.iter().position(|re| re.is_match(value))
    }

    /// Whether any category matches `value`
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.first_match(value).is_some()
    }
}

/// A laboratory category resolved against the lab item dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabRule {
    /// Category name, used as the `lab_` column suffix
    pub name: String,
    /// Dictionary labels that belong to this category (exact, case-insensitive)
    pub labels: Vec<String>,
    /// Value used when the category was never observed in the whole cohort
    pub reference_value: f64,
}

impl LabRule {
    /// Build a lab rule from string literals
    #[must_use]
    pub fn new(name: &str, labels: &[&str], reference_value: f64) -> Self {
        Self {
            name: name.to_string(),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
            reference_value,
        }
    }

    /// Whether a dictionary label belongs to this category
    #[must_use]
    pub fn accepts(&self, label: &str) -> bool {
        let label = label.trim();
        self.labels.iter().any(|l| l.trim().eq_ignore_ascii_case(label))
    }
}
