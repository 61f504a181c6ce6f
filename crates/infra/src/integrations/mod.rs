//! External service integrations

pub mod fitbit;
pub mod openai;
