#![doc = include_str!("../README.md")]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod stream;

pub use error::{ClientError, ClientResult};
