#![forbid(unsafe_code)]

pub mod app;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod epub;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod logging;
pub mod markup;
pub mod source;
pub mod throttle;
pub mod toc;

pub use error::{Error, Result};
