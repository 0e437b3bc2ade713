// MIT License - Copyright (c) 2026 Peter Wright
// Top-level gateway object tying the link, state, and client server together

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::info;

use crate::action::{ActionRunner, ShellRunner};
use crate::config::GatewayConfig;
use crate::constants::KEYPAD_KEYS;
use crate::error::Result;
use crate::event::{event_channel, EventReceiver, EventSender, PanelEvent};
use crate::link::PanelLink;
use crate::server;
use crate::state::PanelState;

/// The main public API: owns the panel model and the serial link, and serves
/// keypad clients.
///
/// # Example
///
/// ```no_run
/// use it100_bridge::{Gateway, GatewayConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = GatewayConfig::builder()
///         .device("/dev/ttyUSB0")
///         .baud(9600)
///         .listen_port(4025)
///         .build();
///
///     let gateway = Gateway::connect(config).await?;
///
///     // Watch panel activity
///     let mut events = gateway.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {event:?}");
///         }
///     });
///
///     // Serve keypad clients until the process is stopped
///     gateway.serve().await?;
///     Ok(())
/// }
/// ```
pub struct Gateway {
    config: Arc<GatewayConfig>,
    state: Arc<RwLock<PanelState>>,
    link: Arc<PanelLink>,
    event_tx: EventSender,
    etag_rx: watch::Receiver<u64>,
}

impl Gateway {
    /// Open the serial link with the default shell action runner and run the
    /// startup sequence.
    pub async fn connect(config: GatewayConfig) -> Result<Self> {
        Self::connect_with_runner(config, Arc::new(ShellRunner)).await
    }

    /// As [`Gateway::connect`], with a caller-supplied action executor.
    pub async fn connect_with_runner(
        config: GatewayConfig,
        runner: Arc<dyn ActionRunner>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let (event_tx, _event_rx) = event_channel(256);
        let state = Arc::new(RwLock::new(PanelState::new()));
        let (etag_tx, etag_rx) = watch::channel(state.read().await.keypad_etag());

        let link = Arc::new(
            PanelLink::open(
                config.clone(),
                state.clone(),
                etag_tx,
                event_tx.clone(),
                runner,
            )
            .await?,
        );

        link.startup().await?;
        let _ = event_tx.send(PanelEvent::Connected);
        info!("Panel link established, startup sequence sent");

        Ok(Self {
            config,
            state,
            link,
            event_tx,
            etag_rx,
        })
    }

    /// Subscribe to panel events.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    /// Current keypad-status line, as pushed to clients.
    pub async fn snapshot(&self) -> String {
        self.state.read().await.snapshot()
    }

    /// Watch receiver for the keypad etag; used by long-polling sessions.
    pub fn etag_receiver(&self) -> watch::Receiver<u64> {
        self.etag_rx.clone()
    }

    /// Submit a virtual keypad press. Characters outside the keypad
    /// alphabet are rejected silently, matching the client protocol.
    pub async fn key_press(&self, key: char) -> Result<()> {
        if key.is_ascii() && KEYPAD_KEYS.contains(&(key as u8)) {
            self.link.key_press(key).await?;
        }
        Ok(())
    }

    /// Bind the loopback listener and serve keypad clients until the
    /// process stops.
    pub async fn serve(&self) -> Result<()> {
        let listener = server::bind(self.config.listen_port).await?;
        server::serve(
            listener,
            self.state.clone(),
            self.etag_rx.clone(),
            self.link.clone(),
        )
        .await
    }
}
