//! Flux adapters - AI image transformation over the BFL API.

mod flux_provider;
mod mock_provider;

pub use flux_provider::{FluxConfig, FluxProvider};
pub use mock_provider::MockImageProvider;
