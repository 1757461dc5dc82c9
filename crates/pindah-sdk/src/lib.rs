//! pindah-sdk - HTTP client for the destination platform's create-API.

mod base_url;
mod client;
mod platform;

pub use base_url::BaseUrl;
pub use platform::{HttpPlatform, SdkConfig};
