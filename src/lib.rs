pub mod archive;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod processors;
pub mod products;
pub mod readers;
pub mod tools;
pub mod transport;
pub mod utils;

pub use error::{FetchError, Result};
