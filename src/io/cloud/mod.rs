//! Object-store abstraction.
//!
//! - [`traits`] - the [`ObjectIO`] client trait, [`CloudConfig`] and [`CloudIOError`]
//! - [`fake`] - [`FakeObjectIO`], an in-memory store for tests
//! - [`helpers`] - [`Backoff`](helpers::Backoff) and [`ObjectUri`](helpers::ObjectUri)
//!
//! Real providers implement [`ObjectIO`] outside this crate and are wrapped in
//! [`ObjectStorage`](crate::io::storage::ObjectStorage).
//!
//! ```
//! use s3access::io::cloud::*;
//!
//! # fn main() -> CloudResult<()> {
//! let store = FakeObjectIO::new();
//! store.put("logs", "2019-02-07-00-00-00-ABC", b"line")?;
//! assert!(store.exists("logs", "2019-02-07-00-00-00-ABC")?);
//! # Ok(())
//! # }
//! ```

pub mod fake;
pub mod helpers;
pub mod traits;

pub use fake::*;
pub use traits::*;
