#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]

//! Wire models and configuration shared by the Ledgerly client library and CLI.

pub mod config;
pub mod models;
