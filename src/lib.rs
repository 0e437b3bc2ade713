// MIT License - Copyright (c) 2026 Peter Wright

//! Gateway between a DSC IT-100 serial panel interface and TCP keypad
//! clients.
//!
//! The daemon speaks the IT-100's checksummed ASCII line protocol, keeps a
//! live model of the panel (open zones, broadcast labels, the virtual
//! keypad's LCD/LED/cursor state), and republishes that model to any number
//! of local clients over a tiny text protocol with etag-based long-polling.
//!
//! Built on tokio, thiserror, and tracing; the serial device is driven
//! through tokio-serial.
//!
//! See [`Gateway`] for the entry point and a usage example.

pub mod action;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod frame;
pub mod gateway;
pub mod link;
pub mod queue;
pub mod schema;
pub mod server;
pub mod state;

pub use action::{ActionRunner, NullRunner, ShellRunner};
pub use config::{CommandAction, GatewayConfig, GatewayConfigBuilder, Priority};
pub use error::{GatewayError, Result, TroubleCode};
pub use event::{event_channel, EventReceiver, EventSender, PanelEvent};
pub use frame::{Frame, FrameError};
pub use gateway::Gateway;
pub use link::PanelLink;
pub use queue::OutboundQueue;
pub use state::{PanelState, Reaction};
