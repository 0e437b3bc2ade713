// MIT License - Copyright (c) 2026 Peter Wright
// Gateway configuration

use std::collections::HashMap;

use serde::Deserialize;

use crate::constants::ACCESS_CODE_DIGITS;

/// Highest user number with a configurable name.
pub const MAX_NAMED_USER: u8 = 42;

/// Log priority configured per command, mapped onto tracing levels when the
/// command is dispatched. Syslog-style names accepted in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Priority {
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info | Self::Notice => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error | Self::Critical | Self::Alert | Self::Emergency => {
                tracing::Level::ERROR
            }
        }
    }
}

/// Per-command dispatch settings: how to log it, what (if any) shell action
/// to run, and an optional display-name override.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandAction {
    pub priority: Option<Priority>,
    pub action: Option<String>,
    pub name: Option<String>,
}

/// Gateway configuration. Constructed explicitly (builder or the binary's
/// TOML loader) and passed by reference; loaded once, never mutated after.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Serial device the panel interface is attached to.
    pub device: String,
    pub baud: u32,
    /// TCP port for keypad clients, bound on loopback.
    pub listen_port: u16,
    /// Push the host clock to the panel at startup.
    pub sync_time: bool,
    /// How long an outbound command may wait for acknowledgment before it is
    /// dropped and the queue advances.
    pub ack_timeout_ms: u64,
    /// Access code used when no per-partition code is configured. Empty
    /// means "none configured".
    pub default_access_code: String,
    pub access_codes: HashMap<u8, String>,
    pub zone_names: HashMap<u8, String>,
    pub partition_names: HashMap<u8, String>,
    pub user_names: HashMap<u8, String>,
    pub key_names: HashMap<u8, String>,
    pub keypad_names: HashMap<u8, String>,
    /// Per-command dispatch table, keyed by command code.
    pub actions: HashMap<u16, CommandAction>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyS0".to_string(),
            baud: 9600,
            listen_port: 4025,
            sync_time: false,
            ack_timeout_ms: 5000,
            default_access_code: String::new(),
            access_codes: HashMap::new(),
            zone_names: HashMap::new(),
            partition_names: HashMap::new(),
            user_names: HashMap::new(),
            key_names: HashMap::new(),
            keypad_names: HashMap::new(),
            actions: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Access code for a partition: per-partition entry, then the default,
    /// then nothing. The caller substitutes zeros on a miss (the panel is
    /// never shown an error).
    pub fn access_code(&self, partition: u8) -> Option<&str> {
        self.access_codes
            .get(&partition)
            .map(String::as_str)
            .or_else(|| {
                if self.default_access_code.is_empty() {
                    None
                } else {
                    Some(self.default_access_code.as_str())
                }
            })
    }

    pub fn zone_name_override(&self, zone: u8) -> Option<&str> {
        self.zone_names.get(&zone).map(String::as_str)
    }

    pub fn partition_name_override(&self, partition: u8) -> Option<&str> {
        self.partition_names.get(&partition).map(String::as_str)
    }

    /// User names are only configurable for users 1..=42.
    pub fn user_name(&self, user: u8) -> String {
        if (1..=MAX_NAMED_USER).contains(&user) {
            if let Some(name) = self.user_names.get(&user) {
                return name.clone();
            }
        }
        format!("User {user}")
    }

    pub fn key_name(&self, key: u8) -> String {
        self.key_names
            .get(&key)
            .cloned()
            .unwrap_or_else(|| format!("Key {key}"))
    }

    pub fn keypad_name(&self, keypad: u8) -> String {
        self.keypad_names
            .get(&keypad)
            .cloned()
            .unwrap_or_else(|| format!("Keypad {keypad}"))
    }

    pub fn action(&self, code: u16) -> Option<&CommandAction> {
        self.actions.get(&code)
    }

    /// Sanity checks applied after construction.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.device.is_empty() {
            return Err(crate::error::GatewayError::InvalidConfig {
                details: "serial device path is empty".to_string(),
            });
        }
        for (partition, code) in &self.access_codes {
            if code.len() > ACCESS_CODE_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
                return Err(crate::error::GatewayError::InvalidConfig {
                    details: format!(
                        "access code for partition {partition} must be 1-{ACCESS_CODE_DIGITS} digits"
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.config.device = device.into();
        self
    }

    pub fn baud(mut self, baud: u32) -> Self {
        self.config.baud = baud;
        self
    }

    pub fn listen_port(mut self, port: u16) -> Self {
        self.config.listen_port = port;
        self
    }

    pub fn sync_time(mut self, sync: bool) -> Self {
        self.config.sync_time = sync;
        self
    }

    pub fn ack_timeout_ms(mut self, ms: u64) -> Self {
        self.config.ack_timeout_ms = ms;
        self
    }

    pub fn default_access_code(mut self, code: impl Into<String>) -> Self {
        self.config.default_access_code = code.into();
        self
    }

    pub fn access_code(mut self, partition: u8, code: impl Into<String>) -> Self {
        self.config.access_codes.insert(partition, code.into());
        self
    }

    pub fn zone_name(mut self, zone: u8, name: impl Into<String>) -> Self {
        self.config.zone_names.insert(zone, name.into());
        self
    }

    pub fn partition_name(mut self, partition: u8, name: impl Into<String>) -> Self {
        self.config.partition_names.insert(partition, name.into());
        self
    }

    pub fn user_name(mut self, user: u8, name: impl Into<String>) -> Self {
        self.config.user_names.insert(user, name.into());
        self
    }

    pub fn key_name(mut self, key: u8, name: impl Into<String>) -> Self {
        self.config.key_names.insert(key, name.into());
        self
    }

    pub fn keypad_name(mut self, keypad: u8, name: impl Into<String>) -> Self {
        self.config.keypad_names.insert(keypad, name.into());
        self
    }

    pub fn action(mut self, code: u16, action: CommandAction) -> Self {
        self.config.actions.insert(code, action);
        self
    }

    pub fn build(self) -> GatewayConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.device, "/dev/ttyS0");
        assert_eq!(config.baud, 9600);
        assert_eq!(config.listen_port, 4025);
        assert!(!config.sync_time);
        assert_eq!(config.ack_timeout_ms, 5000);
        assert!(config.access_code(1).is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let config = GatewayConfig::builder()
            .device("/dev/ttyUSB0")
            .baud(115200)
            .listen_port(9000)
            .sync_time(true)
            .default_access_code("1234")
            .access_code(2, "5678")
            .zone_name(3, "Garage Door")
            .build();

        assert_eq!(config.device, "/dev/ttyUSB0");
        assert_eq!(config.baud, 115200);
        assert!(config.sync_time);
        assert_eq!(config.access_code(1), Some("1234"));
        assert_eq!(config.access_code(2), Some("5678"));
        assert_eq!(config.zone_name_override(3), Some("Garage Door"));
        assert_eq!(config.zone_name_override(4), None);
    }

    #[test]
    fn user_name_cap() {
        let config = GatewayConfig::builder()
            .user_name(1, "Alice")
            .user_name(50, "Ghost")
            .build();
        assert_eq!(config.user_name(1), "Alice");
        assert_eq!(config.user_name(2), "User 2");
        // Entries above the cap are ignored
        assert_eq!(config.user_name(50), "User 50");
    }

    #[test]
    fn validate_rejects_bad_access_code() {
        let config = GatewayConfig::builder().access_code(1, "12345678").build();
        assert!(config.validate().is_err());

        let config = GatewayConfig::builder().access_code(1, "12a4").build();
        assert!(config.validate().is_err());

        let config = GatewayConfig::builder().access_code(1, "1234").build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn priority_level_mapping() {
        assert_eq!(Priority::Notice.as_tracing_level(), tracing::Level::INFO);
        assert_eq!(Priority::Critical.as_tracing_level(), tracing::Level::ERROR);
        assert_eq!(Priority::Debug.as_tracing_level(), tracing::Level::DEBUG);
    }
}
