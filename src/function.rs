//! Function generation.
//!
//! Binds each loaded statement to its resolved [`Policy`] and a
//! [`SessionManager`], producing one [`SqlFn`] per statement.

use crate::error::{SqlFnError, SqlFnResult};
use crate::policy::{Policy, PolicyConfig};
use crate::registry::{Statement, StatementRegistry};
use crate::session::{SessionManager, fetch_records};
use crate::value::{Record, SqlValue};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// What a generated function returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// First row of a single-result statement, `None` when no row matched.
    Single(Option<Record>),
    /// Every row, in order.
    Many(Vec<Record>),
}

impl Output {
    /// The single record. A `Many` output yields its first row.
    pub fn into_single(self) -> Option<Record> {
        match self {
            Output::Single(record) => record,
            Output::Many(rows) => rows.into_iter().next(),
        }
    }

    /// All records. A `Single` output yields zero or one row.
    pub fn into_many(self) -> Vec<Record> {
        match self {
            Output::Single(record) => record.into_iter().collect(),
            Output::Many(rows) => rows,
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Output::Single(_))
    }
}

/// A statement bound to its policy and a session.
#[derive(Debug, Clone)]
pub struct SqlFn {
    statement: Arc<Statement>,
    policy: Policy,
    session: SessionManager,
}

impl SqlFn {
    pub fn new(statement: Statement, policy: Policy, session: SessionManager) -> Self {
        Self {
            statement: Arc::new(statement),
            policy,
            session,
        }
    }

    pub fn name(&self) -> &str {
        &self.statement.name
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Execute the statement once with `params`.
    ///
    /// Transactional statements run in their own transaction; others run on a
    /// plain checked-out connection.
    pub async fn call(&self, params: Vec<SqlValue>) -> SqlFnResult<Output> {
        let statement = Arc::clone(&self.statement);

        let rows: Vec<Record> = if self.policy.transactional {
            self.session
                .with_transaction(move |conn| {
                    Box::pin(async move { fetch_records(conn, &statement.text, &params).await })
                })
                .await?
        } else {
            self.session
                .with_connection(move |conn| {
                    Box::pin(async move { fetch_records(conn, &statement.text, &params).await })
                })
                .await?
        };

        Ok(self.shape(rows))
    }

    /// Call and take the single record.
    pub async fn one(&self, params: Vec<SqlValue>) -> SqlFnResult<Option<Record>> {
        Ok(self.call(params).await?.into_single())
    }

    /// Call and take every record.
    pub async fn all(&self, params: Vec<SqlValue>) -> SqlFnResult<Vec<Record>> {
        Ok(self.call(params).await?.into_many())
    }

    fn shape(&self, rows: Vec<Record>) -> Output {
        if self.policy.single_result {
            Output::Single(rows.into_iter().next())
        } else {
            Output::Many(rows)
        }
    }
}

/// Every generated function from one statement directory, plus the raw
/// statement texts for custom compositions.
#[derive(Debug, Clone, Default)]
pub struct SqlFunctions {
    fns: BTreeMap<String, SqlFn>,
    sql: BTreeMap<String, String>,
}

impl SqlFunctions {
    /// Resolve a policy for every statement in `registry` and bind it.
    pub fn from_registry(
        session: &SessionManager,
        registry: &StatementRegistry,
        config: &PolicyConfig,
    ) -> Self {
        let fns = registry
            .iter()
            .map(|stmt| {
                let policy = config.resolve(&stmt.name, &stmt.text);
                tracing::debug!("Generated {} ({})", stmt.name, policy);
                (
                    stmt.name.clone(),
                    SqlFn::new(stmt.clone(), policy, session.clone()),
                )
            })
            .collect();

        Self {
            fns,
            sql: registry.to_sql_map(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SqlFn> {
        self.fns.get(name)
    }

    /// Call the function named `name`.
    pub async fn call(&self, name: &str, params: Vec<SqlValue>) -> SqlFnResult<Output> {
        let f = self
            .get(name)
            .ok_or_else(|| SqlFnError::UnknownStatement(name.to_string()))?;
        f.call(params).await
    }

    /// Raw text of the statement named `name`.
    pub fn statement(&self, name: &str) -> SqlFnResult<&str> {
        self.sql
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| SqlFnError::UnknownStatement(name.to_string()))
    }

    /// The raw name → text map.
    pub fn sql(&self) -> &BTreeMap<String, String> {
        &self.sql
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SqlFn> {
        self.fns.values()
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }
}

/// Load every statement in `dir` and generate its function.
///
/// # Example
///
/// ```rust,ignore
/// let session = SessionManager::connect("postgres://localhost/db", &PoolSettings::default()).await?;
/// let fns = sqlfns::generate(&session, "sql", &PolicyConfig::default())?;
/// let person = fns.call("findOnePersonById", params!["12345"]).await?.into_single();
/// ```
pub fn generate(
    session: &SessionManager,
    dir: impl AsRef<Path>,
    config: &PolicyConfig,
) -> SqlFnResult<SqlFunctions> {
    let registry = StatementRegistry::load(dir)?;
    Ok(SqlFunctions::from_registry(session, &registry, config))
}
