//! Domain models for the demonstration services.
//!
//! # Core Concepts
//!
//! - [`Account`]: a login identity with its failure counter and lock state.
//! - [`LoginRequest`]: the login body, before validation.
//! - [`ErrorCode`]: stable codes carried by every rejected request as [`ErrorBody`].
//! - [`QuestionRequest`] / [`RecommendResponse`]: the token-protected question service.

mod account;
mod login;
mod question;

pub use account::*;
pub use login::*;
pub use question::*;
