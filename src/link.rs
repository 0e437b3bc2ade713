// MIT License - Copyright (c) 2026 Peter Wright
// Serial link to the panel: framing, state application, send path

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval, Instant};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, error, info, warn};

use crate::action::{self, ActionRunner};
use crate::config::GatewayConfig;
use crate::constants::{
    ACCESS_CODE_DIGITS, BROADCAST_LABELS, CODE_SEND, KEY_PRESSED, LABELS_REQUEST,
    MAX_PANEL_LINE, SET_TIME_AND_DATE, STATUS_REQUEST, TIME_DATE_BROADCAST_CONTROL,
    TIME_STAMP_CONTROL, VIRTUAL_KEYPAD_CONTROL, ZONE_OPEN, ZONE_RESTORED,
};
use crate::error::Result;
use crate::event::{EventSender, PanelEvent};
use crate::frame::Frame;
use crate::queue::OutboundQueue;
use crate::schema;
use crate::state::{PanelState, Reaction};

type Writer = Arc<Mutex<WriteHalf<SerialStream>>>;

/// Everything the reader and timeout tasks share with the link handle.
struct LinkShared {
    config: Arc<GatewayConfig>,
    state: Arc<RwLock<PanelState>>,
    queue: Mutex<OutboundQueue>,
    writer: Writer,
    etag_tx: watch::Sender<u64>,
    event_tx: EventSender,
    runner: Arc<dyn ActionRunner>,
    status_requested: AtomicBool,
}

/// Owns the serial descriptor. Incoming bytes become decoded frames applied
/// to [`PanelState`]; outgoing requests flow through the single-in-flight
/// [`OutboundQueue`].
pub struct PanelLink {
    shared: Arc<LinkShared>,
    reader_handle: Option<tokio::task::JoinHandle<()>>,
    timeout_handle: Option<tokio::task::JoinHandle<()>>,
}

impl PanelLink {
    /// Open the serial device and start the reader and ack-timeout tasks.
    pub async fn open(
        config: Arc<GatewayConfig>,
        state: Arc<RwLock<PanelState>>,
        etag_tx: watch::Sender<u64>,
        event_tx: EventSender,
        runner: Arc<dyn ActionRunner>,
    ) -> Result<Self> {
        info!(
            "Opening panel link on {} at {} baud",
            config.device, config.baud
        );
        let stream = tokio_serial::new(&config.device, config.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()?;

        let (reader, writer) = tokio::io::split(stream);
        let shared = Arc::new(LinkShared {
            queue: Mutex::new(OutboundQueue::new(Duration::from_millis(
                config.ack_timeout_ms,
            ))),
            config,
            state,
            writer: Arc::new(Mutex::new(writer)),
            etag_tx,
            event_tx,
            runner,
            status_requested: AtomicBool::new(false),
        });

        let reader_handle = spawn_reader_task(reader, shared.clone());
        let timeout_handle = spawn_timeout_task(shared.clone());

        Ok(Self {
            shared,
            reader_handle: Some(reader_handle),
            timeout_handle: Some(timeout_handle),
        })
    }

    /// Queue a frame for the panel; writes immediately when nothing is in
    /// flight.
    pub async fn send(&self, frame: Frame) -> Result<()> {
        submit(&self.shared, frame).await
    }

    /// Forward a client keypress as KEY_PRESSED.
    pub async fn key_press(&self, key: char) -> Result<()> {
        self.send(Frame::new(KEY_PRESSED, key.to_string())).await
    }

    /// The fixed startup sequence: timestamps off, optional clock sync,
    /// request the label transfer, turn on the virtual keypad and time/date
    /// broadcasts. A one-shot status request follows once label 151 lands.
    pub async fn startup(&self) -> Result<()> {
        self.send(Frame::new(TIME_STAMP_CONTROL, "0")).await?;
        if self.shared.config.sync_time {
            let now = Local::now().format("%H%M%m%d%y").to_string();
            self.send(Frame::new(SET_TIME_AND_DATE, now)).await?;
        }
        self.send(Frame::new(LABELS_REQUEST, "")).await?;
        self.send(Frame::new(VIRTUAL_KEYPAD_CONTROL, "1")).await?;
        self.send(Frame::new(TIME_DATE_BROADCAST_CONTROL, "1")).await?;
        Ok(())
    }
}

impl Drop for PanelLink {
    fn drop(&mut self) {
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.timeout_handle.take() {
            handle.abort();
        }
    }
}

async fn submit(shared: &Arc<LinkShared>, frame: Frame) -> Result<()> {
    let to_write = shared.queue.lock().await.submit(frame);
    if let Some(frame) = to_write {
        write_frame(&shared.writer, &frame).await?;
    }
    Ok(())
}

async fn write_frame(writer: &Writer, frame: &Frame) -> Result<()> {
    debug!("-> {:03}{}", frame.code, frame.payload);
    writer.lock().await.write_all(frame.encode().as_bytes()).await?;
    Ok(())
}

/// Read serial bytes, split CR/LF lines, and feed each through the decode
/// and apply pipeline. Loss of the panel is fatal to the daemon, so any
/// read failure or line overflow ends with a Disconnected event.
fn spawn_reader_task(
    mut reader: ReadHalf<SerialStream>,
    shared: Arc<LinkShared>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        let mut line: Vec<u8> = Vec::new();

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    error!("Panel link closed by remote end");
                    break;
                }
                Ok(n) => {
                    for &b in &buf[..n] {
                        if b == b'\n' {
                            let text = String::from_utf8_lossy(&line).into_owned();
                            line.clear();
                            handle_line(&shared, &text).await;
                        } else if b != b'\r' {
                            line.push(b);
                            if line.len() > MAX_PANEL_LINE {
                                error!(
                                    "Panel input line exceeded {MAX_PANEL_LINE} bytes, \
                                     link unusable"
                                );
                                let _ = shared.event_tx.send(PanelEvent::Disconnected);
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("Panel read error: {e}");
                    break;
                }
            }
        }
        let _ = shared.event_tx.send(PanelEvent::Disconnected);
    })
}

/// Periodically drop an in-flight command that the panel never acknowledged
/// and release the next one. Without this, one lost 500 stalls outbound
/// traffic forever.
fn spawn_timeout_task(shared: Arc<LinkShared>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let tick = Duration::from_millis((shared.config.ack_timeout_ms / 4).max(250));
        let mut ticker = interval(tick);
        loop {
            ticker.tick().await;
            let expired = shared.queue.lock().await.expire(Instant::now());
            if let Some((dropped, next)) = expired {
                warn!(
                    "No acknowledgment for command {:03} within {} ms, dropping it",
                    dropped.code, shared.config.ack_timeout_ms
                );
                let _ = shared.event_tx.send(PanelEvent::AckTimeout { code: dropped.code });
                if let Some(frame) = next {
                    if let Err(e) = write_frame(&shared.writer, &frame).await {
                        warn!("Failed to write queued command after timeout: {e}");
                    }
                }
            }
        }
    })
}

/// One received line: decode, apply the state transition, publish the etag,
/// close the acknowledge / access-code loops, then log and run any shell
/// action.
async fn handle_line(shared: &Arc<LinkShared>, text: &str) {
    if text.is_empty() {
        return;
    }
    let frame = match Frame::decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("Dropping bad panel line {text:?}: {e}");
            return;
        }
    };

    let _ = shared.event_tx.send(PanelEvent::FrameReceived { code: frame.code });

    let (reaction, etag) = {
        let mut state = shared.state.write().await;
        let reaction = state.apply(&frame);
        (reaction, state.keypad_etag())
    };

    let etag_changed = shared.etag_tx.send_if_modified(|current| {
        if *current != etag {
            *current = etag;
            true
        } else {
            false
        }
    });
    if etag_changed {
        let _ = shared.event_tx.send(PanelEvent::KeypadChanged { etag });
    }

    match frame.code {
        ZONE_OPEN => {
            let zone = schema::param_int(frame.code, &frame.payload, 0) as u8;
            let _ = shared.event_tx.send(PanelEvent::ZoneOpened { zone });
        }
        ZONE_RESTORED => {
            let zone = schema::param_int(frame.code, &frame.payload, 0) as u8;
            let _ = shared.event_tx.send(PanelEvent::ZoneRestored { zone });
        }
        BROADCAST_LABELS => {
            let done = shared.state.read().await.has_labels();
            if done && !shared.status_requested.swap(true, Ordering::SeqCst) {
                info!("Label transfer complete, requesting panel status");
                let _ = shared.event_tx.send(PanelEvent::LabelsLoaded);
                if let Err(e) = submit(shared, Frame::new(STATUS_REQUEST, "")).await {
                    warn!("Failed to send status request: {e}");
                }
            }
        }
        _ => {}
    }

    match reaction {
        Reaction::Acknowledged(code) => {
            debug!("Panel acknowledged command {code:03}");
            let _ = shared.event_tx.send(PanelEvent::CommandAcknowledged { code });
            let next = shared.queue.lock().await.acknowledge();
            if let Some(frame) = next {
                if let Err(e) = write_frame(&shared.writer, &frame).await {
                    warn!("Failed to write queued command: {e}");
                }
            }
        }
        Reaction::SendAccessCode { partition, digits } => {
            let payload = access_code_payload(&shared.config, partition, digits);
            if let Err(e) = submit(shared, Frame::new(CODE_SEND, payload)).await {
                warn!("Failed to send access code for partition {partition}: {e}");
            }
        }
        Reaction::None => {}
    }

    {
        let state = shared.state.read().await;
        action::dispatch(&shared.config, &state, &frame, shared.runner.as_ref());
    }
}

/// Build the CODE_SEND payload: a six-zero base overlaid with the
/// partition's configured access code, truncated to the digit count the
/// panel asked for. A lookup miss just means all zeros; the panel never
/// sees an error.
fn access_code_payload(config: &GatewayConfig, partition: u8, digits: usize) -> String {
    let mut code = [b'0'; ACCESS_CODE_DIGITS];
    if let Some(configured) = config.access_code(partition) {
        for (slot, b) in code.iter_mut().zip(configured.bytes()) {
            *slot = b;
        }
    }
    let len = digits.min(ACCESS_CODE_DIGITS);
    String::from_utf8_lossy(&code[..len]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_code_overlay() {
        let config = GatewayConfig::builder()
            .access_code(1, "1234")
            .default_access_code("9999")
            .build();
        // Partition code padded with zeros to the requested length
        assert_eq!(access_code_payload(&config, 1, 6), "123400");
        assert_eq!(access_code_payload(&config, 1, 4), "1234");
        // Default code used when the partition has none
        assert_eq!(access_code_payload(&config, 3, 4), "9999");
    }

    #[test]
    fn access_code_miss_is_zeros() {
        let config = GatewayConfig::default();
        assert_eq!(access_code_payload(&config, 1, 6), "000000");
        assert_eq!(access_code_payload(&config, 1, 4), "0000");
    }

    #[test]
    fn access_code_digits_capped() {
        let config = GatewayConfig::default();
        assert_eq!(access_code_payload(&config, 1, 99), "000000");
        assert_eq!(access_code_payload(&config, 1, 0), "");
    }
}
