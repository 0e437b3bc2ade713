// MIT License - Copyright (c) 2026 Peter Wright
// TCP keypad clients: keypress forwarding and etag long-polling

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::constants::{KEYPAD_KEYS, MAX_CLIENT_LINE};
use crate::error::Result;
use crate::link::PanelLink;
use crate::state::PanelState;

/// What a processed request line means for the session's lifetime.
enum Outcome {
    Continue,
    Done,
}

/// Accept keypad clients forever, one task per connection.
pub async fn serve(
    listener: TcpListener,
    state: Arc<RwLock<PanelState>>,
    etag_rx: watch::Receiver<u64>,
    link: Arc<PanelLink>,
) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("Client connected from {peer}");
        let state = state.clone();
        let etag_rx = etag_rx.clone();
        let link = link.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_session(stream, state, etag_rx, link).await {
                debug!("Session from {peer} ended with error: {e}");
            }
            debug!("Client {peer} disconnected");
        });
    }
}

/// One client session. The protocol is line oriented: a keypad character, a
/// bare `?` for an immediate snapshot, `?<etag>` for a long-poll, or `q` to
/// quit. Overflowing the line buffer, EOF, or a socket error ends the
/// session; malformed input is silently ignored.
async fn handle_session(
    stream: TcpStream,
    state: Arc<RwLock<PanelState>>,
    mut etag_rx: watch::Receiver<u64>,
    link: Arc<PanelLink>,
) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();
    let mut buf = [0u8; 256];
    let mut line: Vec<u8> = Vec::new();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) => {
                debug!("Client read error: {e}");
                return Ok(());
            }
        };

        for &b in &buf[..n] {
            if b == b'\n' {
                let request = String::from_utf8_lossy(&line).into_owned();
                line.clear();
                match process_line(&request, &state, &mut etag_rx, &link, &mut writer).await?
                {
                    Outcome::Continue => {}
                    Outcome::Done => return Ok(()),
                }
            } else if b != b'\r' {
                line.push(b);
                if line.len() > MAX_CLIENT_LINE {
                    debug!("Client line exceeded {MAX_CLIENT_LINE} bytes, dropping session");
                    return Ok(());
                }
            }
        }
    }
}

async fn process_line(
    request: &str,
    state: &Arc<RwLock<PanelState>>,
    etag_rx: &mut watch::Receiver<u64>,
    link: &Arc<PanelLink>,
    writer: &mut OwnedWriteHalf,
) -> Result<Outcome> {
    let bytes = request.as_bytes();
    if bytes.len() == 1 {
        let c = bytes[0];
        if c == b'q' {
            return Ok(Outcome::Done);
        }
        if c == b'?' {
            let snapshot = state.read().await.snapshot();
            writer.write_all(snapshot.as_bytes()).await?;
            return Ok(Outcome::Continue);
        }
        if KEYPAD_KEYS.contains(&c) {
            writer.write_all(&[c, b'\n']).await?;
            if let Err(e) = link.key_press(c as char).await {
                warn!("Failed to forward keypress: {e}");
            }
            return Ok(Outcome::Continue);
        }
        // Not a keypad character: ignore
        return Ok(Outcome::Continue);
    }

    if let Some(rest) = request.strip_prefix('?') {
        if let Ok(waiting_etag) = rest.trim().parse::<u64>() {
            // Echo the request, then park until the keypad state differs
            // from the client's etag. While parked the socket is not read,
            // so any further requests queue up and are served afterwards.
            writer.write_all(request.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            if etag_rx.wait_for(|etag| *etag != waiting_etag).await.is_err() {
                // Gateway shut down while we were waiting
                return Ok(Outcome::Done);
            }
            let snapshot = state.read().await.snapshot();
            writer.write_all(snapshot.as_bytes()).await?;
            return Ok(Outcome::Continue);
        }
    }

    // Malformed multi-character input: ignore
    Ok(Outcome::Continue)
}

/// Bind the client listener on loopback.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening for keypad clients on 127.0.0.1:{port}");
    Ok(listener)
}
