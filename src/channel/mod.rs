pub mod dataset;
pub mod isi;
pub mod state;

pub use dataset::*;
pub use isi::*;
pub use state::*;
