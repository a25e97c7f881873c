pub mod codec;
mod models;

pub use models::*;
