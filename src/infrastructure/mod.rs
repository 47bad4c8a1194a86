pub mod logging;
pub mod secret;
