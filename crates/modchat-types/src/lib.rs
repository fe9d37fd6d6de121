//! Core types for modchat.
//!
//! Identifier newtypes shared by every crate in the workspace, and the
//! [`ErrorCode`] trait that all error enums implement.
//!
//! # Example
//!
//! ```
//! use modchat_types::{GroupId, UserId};
//!
//! let key = (GroupId::new(0), UserId::new(2));
//! assert_eq!(key.1.index(), 2);
//! ```

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{GroupId, UserId};
