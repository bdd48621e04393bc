//! # pgbridge — named-parameter SQL over an async PostgreSQL driver
//!
//! > Write `:name`, run `$1`.
//!
//! pgbridge lets application code written against a named-placeholder dialect
//! run unchanged on a positional-style async driver. It rewrites query text,
//! orders the bound values, fast-paths UUID-shaped strings, caches
//! translations, and materializes driver rows into an iterable result set.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use pgbridge::prelude::*;
//!
//! let bridge = Bridge::connect("postgres://localhost/app").await?;
//!
//! let rows = bridge
//!     .execute(
//!         "SELECT id, email FROM users WHERE org = :org AND active = :active",
//!         &Bindings::new().bind("org", "acme").bind("active", true),
//!     )
//!     .await?;
//! // rewritten as: SELECT id, email FROM users WHERE org = $1 AND active = $2
//!
//! for row in &rows {
//!     println!("{:?}", row.get_named("email"));
//! }
//! ```
//!
//! ## Pipeline
//!
//! | Stage      | Component           | Cached? |
//! |------------|---------------------|---------|
//! | recognize  | [`pattern`]         | static  |
//! | rewrite    | [`translate`]       | per query text |
//! | coerce     | [`value`]           | per call |
//! | execute    | [`engine`] via sqlx | —       |
//! | materialize| [`row`]             | —       |

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod row;
pub mod translate;
pub mod value;

pub mod prelude {
    pub use crate::cache::QueryCache;
    pub use crate::config::{BridgeConfig, SslMode};
    pub use crate::engine::{Bridge, BridgeConnection, PerformanceStats};
    pub use crate::error::{BridgeError, BridgeResult, ErrorKind};
    pub use crate::row::{ColumnInfo, ResultSet, Row};
    pub use crate::translate::{Bindings, Rewritten};
    pub use crate::value::Value;
}

/// Rewrite a named-placeholder query into positional form.
///
/// # Example
///
/// ```
/// let r = pgbridge::rewrite("SELECT * FROM users WHERE id = :id").unwrap();
/// assert_eq!(r.sql(), "SELECT * FROM users WHERE id = $1");
/// assert_eq!(r.names(), ["id"]);
/// ```
pub fn rewrite(query: &str) -> error::BridgeResult<translate::Rewritten> {
    translate::rewrite(query)
}
