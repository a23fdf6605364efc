//! # Records
//!
//! Shared user record types and validation.
//!
//! Both the API server and the client depend on this crate so the two sides
//! agree on the wire format and on what counts as a valid record. The server
//! collects every violation into a list of messages, the client keys them by
//! form field.
pub mod status;
pub mod user;
pub mod validate;

pub use status::{DatabaseStatus, Health, Metrics};
pub use user::{Created, Failure, Gender, Interests, Message, NewUser, User, UserPayload};
pub use validate::{Field, FieldError, inspect, validate};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_INTERESTS_LEN: usize = 500;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

pub const MIN_AGE: i64 = 0;
pub const MAX_AGE: i64 = 120;
