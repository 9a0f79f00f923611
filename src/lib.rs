//! Aeon: a multi-mode AI chat client.
//!
//! The core is the conversation state machine: durable conversation
//! history, an Idle/AwaitingResponse submission cycle, timed reveal of
//! assistant replies and markdown-subset rendering. The terminal UI in
//! [`ui`] is a thin shell over [`controller::ConversationController`].

pub mod client;
pub mod commands;
pub mod config;
pub mod controller;
pub mod events;
pub mod mode;
pub mod render;
pub mod reveal;
pub mod storage;
pub mod store;
pub mod ui;
