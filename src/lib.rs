//! Realtime chat client core.
//!
//! The crate binds a line-oriented chat view to a single WebSocket channel:
//! [`client::ChatClient`] owns the connection for its lifetime and delivers
//! inbound events on a queue in arrival order, [`view::ChatView`] holds the
//! draft text and the bounded message log and applies pure state updates,
//! and [`event`] owns the named-event wire model shared by both directions.
//!
//! The binary (`src/main.rs`) wires the three together in one event loop;
//! nothing in the core depends on a terminal or any other UI surface.

pub mod client;
pub mod event;
pub mod view;
