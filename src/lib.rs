#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
mod http;
pub mod llm;
pub mod pipeline;
pub mod telegram;

pub use config::Config;
pub use error::BotError;
