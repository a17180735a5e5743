//! Account and billing handlers.

mod create_checkout_session;
mod get_profile;

pub use create_checkout_session::{CreateCheckoutSessionCommand, CreateCheckoutSessionHandler};
pub use get_profile::{GetProfileHandler, GetProfileQuery};
