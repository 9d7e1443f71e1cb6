//! Identity provider contracts, CSRF state handling and bundled provider adapters.

mod provider;
mod state;

pub mod providers;

pub use provider::{first_param, CallbackParams, Provider, Session, User};
pub use state::{StateGuard, STATE_PARAM};
