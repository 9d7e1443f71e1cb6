//! # identity-auth
//!
//! Provider-agnostic third-party authentication:
//! - Provider and session contracts every identity provider adapter implements
//! - A frozen provider registry built once at startup
//! - CSRF state issuing and validation across the redirect round-trip
//! - Compression of provider sessions for size-constrained session stores
//! - The orchestrator driving begin-auth, callback and logout
//!
//! ## Architecture
//!
//! The orchestrator only talks to the [`oauth::Provider`] / [`oauth::Session`]
//! contracts and to a per-client [`store::SessionStore`]; HTTP routing and the
//! session backend belong to the embedding web layer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use identity_auth::{
//!     oauth::providers::faux,
//!     orchestrator::Orchestrator,
//!     registry::Registry,
//!     request::AuthRequest,
//!     store::MemorySessionStore,
//! };
//!
//! let registry = Registry::builder().with_provider(faux::Provider::new())?.build();
//! let orchestrator = Orchestrator::new(registry);
//! let store = MemorySessionStore::new();
//! let url = orchestrator
//!     .begin_auth(&AuthRequest::new().with_provider("faux"), &store)
//!     .await?;
//! ```

pub mod codec;
pub mod error;
pub mod oauth;
pub mod orchestrator;
pub mod registry;
pub mod request;
pub mod store;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use oauth::{CallbackParams, Provider, Session, User};
pub use orchestrator::Orchestrator;
pub use registry::{Registry, RegistryBuilder};
pub use request::AuthRequest;
pub use store::SessionStore;
