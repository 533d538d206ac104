pub mod augmentation;
pub mod channel;
pub mod detection;
pub mod equalizer;
pub mod error;
pub mod metrics;
pub mod settings;
pub mod utils;

pub use error::{EqError, EqResult};
