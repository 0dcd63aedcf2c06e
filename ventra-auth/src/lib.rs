//! ventra-auth: credential handling for the Ventra pipeline.
//!
//! Turns a bearer credential into an `Identity`, with a short-lived
//! process-wide cache in front of the user directory.

pub mod cache;
pub mod directory;
pub mod guard;
pub mod options;
pub mod token;

pub use cache::{IdentityCache, MemoryIdentityCache, NoopIdentityCache};
pub use directory::{DirectoryError, MemoryUserDirectory, UserAccount, UserDirectory};
pub use guard::{extract_bearer, AuthSessionGuard};
pub use options::{AuthOptions, JwtOptions};
pub use token::TokenCodec;
