//! Per-statement execution policy.
//!
//! Each statement is resolved once, when its function is generated, into a
//! [`Policy`]: does it run inside an explicit transaction, and does it yield
//! one record or many. An explicit per-name override always wins over the
//! configured predicate.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

static MUTATING_VERB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)INSERT|UPDATE|DELETE").expect("valid regex"));

static SINGLE_ROW_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(findOne|createOne|updateOne|deleteOne)").expect("valid regex"));

/// Resolved execution policy for one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub transactional: bool,
    pub single_result: bool,
}

/// Decides transactionality from `(name, text)`.
pub type TransactionalPredicate = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Decides single-row intent from the statement name.
pub type SingleResultPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Default transactional predicate: the text contains INSERT, UPDATE or
/// DELETE anywhere, in any case.
pub fn is_mutating(_name: &str, text: &str) -> bool {
    MUTATING_VERB.is_match(text)
}

/// Default single-result predicate: the name starts with `findOne`,
/// `createOne`, `updateOne` or `deleteOne`.
pub fn is_single_row(name: &str) -> bool {
    SINGLE_ROW_PREFIX.is_match(name)
}

/// How policies are resolved.
#[derive(Clone)]
pub struct PolicyConfig {
    pub transactional_override: HashMap<String, bool>,
    pub single_result_override: HashMap<String, bool>,
    pub transactional_predicate: TransactionalPredicate,
    pub single_result_predicate: SingleResultPredicate,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            transactional_override: HashMap::new(),
            single_result_override: HashMap::new(),
            transactional_predicate: Arc::new(is_mutating),
            single_result_predicate: Arc::new(is_single_row),
        }
    }
}

impl fmt::Debug for PolicyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyConfig")
            .field("transactional_override", &self.transactional_override)
            .field("single_result_override", &self.single_result_override)
            .finish_non_exhaustive()
    }
}

impl PolicyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `name` to be (or not be) transactional.
    pub fn transactional(mut self, name: impl Into<String>, value: bool) -> Self {
        self.transactional_override.insert(name.into(), value);
        self
    }

    /// Force `name` to yield a single record (or a sequence).
    pub fn single_result(mut self, name: impl Into<String>, value: bool) -> Self {
        self.single_result_override.insert(name.into(), value);
        self
    }

    /// Replace the transactional predicate.
    pub fn transactional_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.transactional_predicate = Arc::new(predicate);
        self
    }

    /// Replace the single-result predicate.
    pub fn single_result_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.single_result_predicate = Arc::new(predicate);
        self
    }

    /// Resolve the policy for one statement.
    pub fn resolve(&self, name: &str, text: &str) -> Policy {
        let transactional = self
            .transactional_override
            .get(name)
            .copied()
            .unwrap_or_else(|| (self.transactional_predicate)(name, text));
        let single_result = self
            .single_result_override
            .get(name)
            .copied()
            .unwrap_or_else(|| (self.single_result_predicate)(name));

        Policy {
            transactional,
            single_result,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tx = if self.transactional { "tx" } else { "auto" };
        let shape = if self.single_result { "one" } else { "many" };
        write!(f, "{tx}/{shape}")
    }
}
