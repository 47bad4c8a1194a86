pub mod amount;
pub mod string_utils;
pub mod time_utils;

// Re-export commonly used functions
pub use amount::{coins_to_satoshis, satoshis_to_coins};
pub use time_utils::*;
