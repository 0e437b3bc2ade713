// MIT License - Copyright (c) 2026 Peter Wright
// Per-command log and shell-action dispatch

use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::frame::Frame;
use crate::schema;
use crate::state::PanelState;

/// Capability for running configured action text. The core never spawns
/// processes itself; it hands opaque command text to whatever executor it
/// was given.
pub trait ActionRunner: Send + Sync {
    fn run(&self, command: &str);
}

/// Runs actions through `sh -c`, fire and forget. A spawned task reaps the
/// child so it never lingers as a zombie.
pub struct ShellRunner;

impl ActionRunner for ShellRunner {
    fn run(&self, command: &str) {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command);
        match cmd.spawn() {
            Ok(mut child) => {
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(e) => warn!("Failed to spawn action {command:?}: {e}"),
        }
    }
}

/// Discards every action. Used in tests and when no shell is wanted.
pub struct NullRunner;

impl ActionRunner for NullRunner {
    fn run(&self, _command: &str) {}
}

/// Log a decoded frame at its configured level and run its shell action, if
/// any. Called after the state transition has been applied.
pub fn dispatch(
    config: &GatewayConfig,
    state: &PanelState,
    frame: &Frame,
    runner: &dyn ActionRunner,
) {
    let entry = config.action(frame.code);
    let description = schema::describe(frame.code, &frame.payload);

    let level = entry
        .and_then(|e| e.priority)
        .map(|p| p.as_tracing_level())
        .unwrap_or(tracing::Level::INFO);
    if level == tracing::Level::ERROR {
        error!("{description}");
    } else if level == tracing::Level::WARN {
        warn!("{description}");
    } else if level == tracing::Level::DEBUG || level == tracing::Level::TRACE {
        debug!("{description}");
    } else {
        info!("{description}");
    }

    if let Some(template) = entry.and_then(|e| e.action.as_deref()) {
        if !template.is_empty() {
            let command = expand_template(template, frame, state, config);
            debug!("Running action for {}: {command}", frame.code);
            runner.run(&command);
        }
    }
}

/// Expand an action template. Placeholders:
/// `%c` command code, `%n` command name, `%d` full description, `%z` open
/// zones as a 16-digit hex mask, `%Ni`/`%Ns`/`%Nl` (N in 1..=9) the Nth
/// field as integer, raw string, or looked-up display name. `%%` is a
/// literal percent; unrecognized sequences pass through unchanged.
pub fn expand_template(
    template: &str,
    frame: &Frame,
    state: &PanelState,
    config: &GatewayConfig,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('c') => out.push_str(&format!("{:03}", frame.code)),
            Some('n') => out.push_str(display_name(config, frame.code)),
            Some('d') => out.push_str(&schema::describe(frame.code, &frame.payload)),
            Some('z') => out.push_str(&format!("{:016X}", state.zone_mask())),
            Some(d @ '1'..='9') => {
                let i = d as usize - '1' as usize;
                match chars.next() {
                    Some('i') => {
                        out.push_str(&schema::param_int(frame.code, &frame.payload, i).to_string())
                    }
                    Some('s') => out.push_str(schema::param_str(frame.code, &frame.payload, i)),
                    Some('l') => out.push_str(&display_param(frame, i, state, config)),
                    Some(other) => {
                        out.push('%');
                        out.push(d);
                        out.push(other);
                    }
                    None => {
                        out.push('%');
                        out.push(d);
                    }
                }
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Display name for a command: config override, else the schema name.
fn display_name<'a>(config: &'a GatewayConfig, code: u16) -> &'a str {
    config
        .action(code)
        .and_then(|e| e.name.as_deref())
        .unwrap_or_else(|| schema::command_name(code))
}

/// The `%Nl` rendering: fields that reference zones, partitions, or users
/// resolve through the state's label table and the config overrides; other
/// fields fall back to the schema's display rendering.
fn display_param(frame: &Frame, i: usize, state: &PanelState, config: &GatewayConfig) -> String {
    let value = schema::param_int(frame.code, &frame.payload, i);
    match schema::param_name(frame.code, i) {
        "Zone" => state.zone_name(config, value as u8),
        "Partition" => state.partition_name(config, value as u8),
        "User" => config.user_name(value as u8),
        "Key" => config.key_name(value as u8),
        "Keypad" => config.keypad_name(value as u8),
        _ => schema::param_display(frame.code, &frame.payload, i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandAction;

    fn fixtures() -> (PanelState, GatewayConfig) {
        let mut state = PanelState::new();
        state.set_label(3, "Kitchen Window");
        state.set_zone_open(3, true);
        let config = GatewayConfig::builder()
            .partition_name(1, "House")
            .user_name(4, "Alice")
            .build();
        (state, config)
    }

    #[test]
    fn basic_placeholders() {
        let (state, config) = fixtures();
        let frame = Frame::new(609, "003");
        assert_eq!(
            expand_template("code=%c name=%n", &frame, &state, &config),
            "code=609 name=Zone Open"
        );
        assert_eq!(
            expand_template("%d", &frame, &state, &config),
            "Zone Open [Zone=3]"
        );
    }

    #[test]
    fn zone_mask_placeholder() {
        let (state, config) = fixtures();
        let frame = Frame::new(609, "003");
        // Zone 3 open: bit 2
        assert_eq!(
            expand_template("%z", &frame, &state, &config),
            "0000000000000004"
        );
    }

    #[test]
    fn indexed_placeholders() {
        let (state, config) = fixtures();
        let frame = Frame::new(609, "003");
        assert_eq!(expand_template("%1i", &frame, &state, &config), "3");
        assert_eq!(expand_template("%1s", &frame, &state, &config), "003");
        assert_eq!(
            expand_template("%1l", &frame, &state, &config),
            "Kitchen Window"
        );
    }

    #[test]
    fn lookup_placeholders_use_names() {
        let (state, config) = fixtures();
        // User Closing: partition 1, user 4
        let frame = Frame::new(700, "1004");
        assert_eq!(expand_template("%1l", &frame, &state, &config), "House");
        assert_eq!(expand_template("%2l", &frame, &state, &config), "Alice");
    }

    #[test]
    fn literal_and_unknown_sequences() {
        let (state, config) = fixtures();
        let frame = Frame::new(560, "");
        assert_eq!(expand_template("100%%", &frame, &state, &config), "100%");
        assert_eq!(expand_template("%q", &frame, &state, &config), "%q");
        assert_eq!(expand_template("%1x", &frame, &state, &config), "%1x");
        assert_eq!(expand_template("tail%", &frame, &state, &config), "tail%");
    }

    #[test]
    fn name_override_applies() {
        let (state, _) = fixtures();
        let config = GatewayConfig::builder()
            .action(
                609,
                CommandAction {
                    name: Some("Sensor Tripped".to_string()),
                    ..Default::default()
                },
            )
            .build();
        let frame = Frame::new(609, "003");
        assert_eq!(
            expand_template("%n", &frame, &state, &config),
            "Sensor Tripped"
        );
    }
}
