//! Authentication handlers and supporting modules.
//!
//! This module coordinates credential login, OTP-based account recovery, and
//! session-token issuance for both principal kinds (admin and user).
//!
//! ## Brute-force policy
//!
//! Every login attempt is appended to a per-kind ledger. Before a password is
//! compared, the principal's most recent attempts are read newest-first and
//! the run of consecutive failures is counted; once the run reaches the
//! configured threshold the source ip is flagged and further attempts are
//! rejected before any password comparison. The check reads the ledger
//! before the current attempt is written, so an attempt never counts toward
//! its own streak. This is a best-effort control, not a hard limiter: two
//! racing attempts may both read the same streak.
//!
//! ## Handshake gate
//!
//! Every endpoint validates the `X-Handshake-Code` header against process
//! configuration before any business logic runs.

pub(crate) mod error;
mod guard;
pub(crate) mod handshake;
pub mod login;
pub mod otp;
mod password;
pub(crate) mod principal;
pub mod session;
mod state;
mod storage;
mod token;
pub mod types;
mod utils;

pub use state::{AuthConfig, AuthState};
pub use token::TokenService;
