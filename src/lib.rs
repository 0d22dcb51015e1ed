//! # sqlfns
//!
//! Turn a directory of SQL files into callable functions.
//!
//! Each `*.sql` file becomes one function named after the file stem. Whether
//! a function runs in its own transaction, and whether it returns one record
//! or many, is decided once when the function is generated:
//!
//! | Rule                                         | Policy            |
//! |----------------------------------------------|-------------------|
//! | text contains `INSERT` / `UPDATE` / `DELETE` | transactional     |
//! | name starts with `findOne` / `createOne` / `updateOne` / `deleteOne` | single result |
//!
//! Both rules can be overridden per statement or replaced entirely through
//! [`PolicyConfig`].
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use sqlfns::prelude::*;
//!
//! let session = SessionManager::connect("postgres://localhost/app", &PoolSettings::default()).await?;
//! let fns = sqlfns::generate(&session, "sql", &PolicyConfig::default())?;
//!
//! fns.call("createOnePerson", params!["1", "John", "Smith", 18, "555-0001"]).await?;
//! let johns = fns.call("findAllPersonsByFirstName", params!["John"]).await?.into_many();
//! ```
//!
//! ## Compositions
//!
//! Several statements can share one transaction through [`series`],
//! [`parallel`] and [`waterfall`]:
//!
//! ```rust,ignore
//! let sql = fns.sql();
//! session.run(waterfall(vec![
//!     Step::new(&sql["findOnePersonById"], params!["1"]),
//!     Step::derived(&sql["updateAgeById"], |prior| {
//!         let age = prior.and_then(|rows| rows.first()).and_then(|r| r["age"].as_i64());
//!         params![age.map(|a| a + 1), "1"]
//!     }),
//! ])).await?;
//! ```

pub mod compose;
pub mod config;
pub mod error;
pub mod function;
pub mod policy;
pub mod registry;
pub mod session;
pub mod value;

pub use compose::{Composition, Mode, ParamSource, Step, StepArg, parallel, series, waterfall};
pub use config::{PoolSettings, SqlFnsConfig};
pub use error::{SqlFnError, SqlFnResult};
pub use function::{Output, SqlFn, SqlFunctions, generate};
pub use policy::{Policy, PolicyConfig};
pub use registry::{Statement, StatementRegistry};
pub use session::{ConnFuture, SessionManager, fetch_records};
pub use value::{Record, SqlValue};

pub mod prelude {
    pub use crate::compose::{Composition, Mode, Step, StepArg, parallel, series, waterfall};
    pub use crate::config::{PoolSettings, SqlFnsConfig};
    pub use crate::error::*;
    pub use crate::function::{Output, SqlFn, SqlFunctions, generate};
    pub use crate::params;
    pub use crate::policy::{Policy, PolicyConfig};
    pub use crate::session::SessionManager;
    pub use crate::value::{Record, SqlValue};
}
