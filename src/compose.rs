//! Multi-statement compositions for one transaction.
//!
//! A [`Composition`] is a list of [`Step`]s run against a single open
//! connection, normally the body of
//! [`SessionManager::with_transaction`](crate::SessionManager::with_transaction):
//!
//! ```rust,ignore
//! let results = session
//!     .with_transaction(|conn| series(steps).run(conn))
//!     .await?;
//! ```
//!
//! Every combinator yields one `Vec<Record>` per step, in input order.

use crate::error::{SqlFnError, SqlFnResult};
use crate::session::{ConnFuture, SessionManager, fetch_records};
use crate::value::{Record, SqlValue};

use sqlx::AnyConnection;
use std::fmt;
use tokio::sync::Mutex;

/// Computes a step's parameters from the previous step's rows.
pub type ParamFn = Box<dyn FnOnce(Option<&[Record]>) -> Vec<SqlValue> + Send>;

/// Where a step's parameters come from.
pub enum ParamSource {
    Fixed(Vec<SqlValue>),
    Derived(ParamFn),
}

impl ParamSource {
    fn resolve(self, prior: Option<&[Record]>) -> Vec<SqlValue> {
        match self {
            ParamSource::Fixed(params) => params,
            ParamSource::Derived(f) => f(prior),
        }
    }
}

impl fmt::Debug for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSource::Fixed(params) => f.debug_tuple("Fixed").field(params).finish(),
            ParamSource::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// One statement and its parameter source.
#[derive(Debug)]
pub struct Step {
    pub sql: String,
    pub params: ParamSource,
}

impl Step {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params: ParamSource::Fixed(params),
        }
    }

    /// A step whose parameters are computed when it runs.
    pub fn derived<F>(sql: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(Option<&[Record]>) -> Vec<SqlValue> + Send + 'static,
    {
        Self {
            sql: sql.into(),
            params: ParamSource::Derived(Box::new(f)),
        }
    }

    /// Pair up a flattened `statement, params, statement, params, ...` list.
    ///
    /// Fails with [`SqlFnError::Arity`] on an odd length or when a statement
    /// and a parameter source are out of place.
    pub fn from_flat(args: Vec<StepArg>) -> SqlFnResult<Vec<Step>> {
        if args.len() % 2 != 0 {
            return Err(SqlFnError::arity(format!(
                "must be even number of args, got {}",
                args.len()
            )));
        }

        let mut steps = Vec::with_capacity(args.len() / 2);
        let mut args = args.into_iter().enumerate();
        while let (Some((i, sql)), Some((j, params))) = (args.next(), args.next()) {
            let StepArg::Sql(sql) = sql else {
                return Err(SqlFnError::arity(format!(
                    "expected a statement at position {i}"
                )));
            };
            let params = match params {
                StepArg::Params(params) => ParamSource::Fixed(params),
                StepArg::ParamFn(f) => ParamSource::Derived(f),
                StepArg::Sql(_) => {
                    return Err(SqlFnError::arity(format!(
                        "expected parameters at position {j}"
                    )));
                }
            };
            steps.push(Step { sql, params });
        }
        Ok(steps)
    }
}

/// One element of a flattened composition list.
pub enum StepArg {
    Sql(String),
    Params(Vec<SqlValue>),
    ParamFn(ParamFn),
}

impl StepArg {
    pub fn derived<F>(f: F) -> Self
    where
        F: FnOnce(Option<&[Record]>) -> Vec<SqlValue> + Send + 'static,
    {
        StepArg::ParamFn(Box::new(f))
    }
}

impl From<&str> for StepArg {
    fn from(sql: &str) -> Self {
        StepArg::Sql(sql.to_string())
    }
}

impl From<String> for StepArg {
    fn from(sql: String) -> Self {
        StepArg::Sql(sql)
    }
}

impl From<Vec<SqlValue>> for StepArg {
    fn from(params: Vec<SqlValue>) -> Self {
        StepArg::Params(params)
    }
}

/// How a [`Composition`] schedules its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Series,
    Parallel,
    Waterfall,
}

/// Steps plus how to run them.
#[derive(Debug)]
pub struct Composition {
    mode: Mode,
    steps: Vec<Step>,
}

/// Run each step to completion before starting the next.
pub fn series(steps: Vec<Step>) -> Composition {
    Composition {
        mode: Mode::Series,
        steps,
    }
}

/// Submit every step at once.
///
/// Steps share one connection, so execution is logically concurrent but
/// physically ordered by the connection. Results come back in input order;
/// the first failure aborts the rest.
pub fn parallel(steps: Vec<Step>) -> Composition {
    Composition {
        mode: Mode::Parallel,
        steps,
    }
}

/// Run steps in order, feeding each step's rows into the next step's
/// parameter function. The first step sees no prior result.
pub fn waterfall(steps: Vec<Step>) -> Composition {
    Composition {
        mode: Mode::Waterfall,
        steps,
    }
}

impl Composition {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run on an already-open connection.
    pub fn run<'c>(self, conn: &'c mut AnyConnection) -> ConnFuture<'c, Vec<Vec<Record>>> {
        Box::pin(async move {
            tracing::debug!("Running {:?} composition of {} steps", self.mode, self.steps.len());
            match self.mode {
                Mode::Series => run_series(conn, self.steps).await,
                Mode::Parallel => run_parallel(conn, self.steps).await,
                Mode::Waterfall => run_waterfall(conn, self.steps).await,
            }
        })
    }
}

async fn run_series(conn: &mut AnyConnection, steps: Vec<Step>) -> SqlFnResult<Vec<Vec<Record>>> {
    let mut results = Vec::with_capacity(steps.len());
    for step in steps {
        let params = step.params.resolve(None);
        results.push(fetch_records(&mut *conn, &step.sql, &params).await?);
    }
    Ok(results)
}

async fn run_parallel(
    conn: &mut AnyConnection,
    steps: Vec<Step>,
) -> SqlFnResult<Vec<Vec<Record>>> {
    let conn = Mutex::new(conn);
    let pending = steps.into_iter().map(|step| {
        let conn = &conn;
        async move {
            let params = step.params.resolve(None);
            let mut guard = conn.lock().await;
            fetch_records(&mut **guard, &step.sql, &params).await
        }
    });
    futures::future::try_join_all(pending).await
}

async fn run_waterfall(
    conn: &mut AnyConnection,
    steps: Vec<Step>,
) -> SqlFnResult<Vec<Vec<Record>>> {
    let mut results: Vec<Vec<Record>> = Vec::with_capacity(steps.len());
    for step in steps {
        let params = step.params.resolve(results.last().map(Vec::as_slice));
        let rows = fetch_records(&mut *conn, &step.sql, &params).await?;
        results.push(rows);
    }
    Ok(results)
}

impl SessionManager {
    /// Run `composition` as one transaction.
    pub async fn run(&self, composition: Composition) -> SqlFnResult<Vec<Vec<Record>>> {
        self.with_transaction(move |conn| composition.run(conn)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_from_flat_pairs() {
        let steps = Step::from_flat(vec![
            "INSERT INTO t VALUES ($1)".into(),
            params![1].into(),
            "SELECT * FROM t".into(),
            StepArg::derived(|_| params![]),
        ])
        .unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].sql, "INSERT INTO t VALUES ($1)");
        assert!(matches!(&steps[0].params, ParamSource::Fixed(p) if p == &params![1]));
        assert!(matches!(steps[1].params, ParamSource::Derived(_)));
    }

    #[test]
    fn test_from_flat_odd_length() {
        let err = Step::from_flat(vec![
            "SELECT 1".into(),
            params![].into(),
            "SELECT 2".into(),
        ])
        .unwrap_err();
        assert!(matches!(err, SqlFnError::Arity(_)));
        assert_eq!(err.to_string(), "Arity error: must be even number of args, got 3");
    }

    #[test]
    fn test_from_flat_misplaced() {
        let err = Step::from_flat(vec![params![1].into(), "SELECT 1".into()]).unwrap_err();
        assert!(matches!(err, SqlFnError::Arity(_)));

        let err = Step::from_flat(vec!["SELECT 1".into(), "SELECT 2".into()]).unwrap_err();
        assert_eq!(err.to_string(), "Arity error: expected parameters at position 1");
    }

    #[test]
    fn test_derived_params_see_prior() {
        let step = Step::derived("SELECT $1", |prior| {
            let n = prior.map(|rows| rows.len() as i64).unwrap_or(-1);
            params![n]
        });
        let rows = vec![Record::new(), Record::new()];
        assert_eq!(step.params.resolve(Some(rows.as_slice())), params![2]);

        let step = Step::derived("SELECT $1", |prior| params![prior.is_none()]);
        assert_eq!(step.params.resolve(None), params![true]);
    }

    #[test]
    fn test_combinator_modes() {
        assert_eq!(series(vec![]).mode(), Mode::Series);
        assert_eq!(parallel(vec![]).mode(), Mode::Parallel);
        let w = waterfall(vec![Step::new("SELECT 1", params![])]);
        assert_eq!(w.mode(), Mode::Waterfall);
        assert_eq!(w.len(), 1);
    }
}
