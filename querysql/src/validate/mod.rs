//! Field whitelisting and SQL identifier validation.
//!
//! # Example
//!
//! ```
//! use querysql::Whitelist;
//!
//! let whitelist = Whitelist::new()
//!     .allow_fields(&["name", "email"])
//!     .allow_if(|field| field.starts_with("json:cfg."));
//!
//! assert!(whitelist.allows("name"));
//! assert!(whitelist.allows("json:cfg.plan"));
//! assert!(!whitelist.allows("password"));
//! ```

mod column;
mod whitelist;

pub use column::is_valid_sql_identifier;
pub use whitelist::{FieldPredicate, Whitelist};
