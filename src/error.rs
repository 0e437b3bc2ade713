// MIT License - Copyright (c) 2026 Peter Wright
// Error types for the gateway

use crate::frame::FrameError;

/// System error codes the panel reports via SYSTEM_ERROR (502).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TroubleCode {
    KeybusBusyInstallerMode = 17,
    PartitionOutOfRange = 21,
    PartitionNotArmed = 23,
    PartitionNotReadyToArm = 24,
    UserCodeNotRequired = 26,
    VirtualKeypadDisabled = 28,
    InvalidParameter = 29,
    KeypadWontLeaveBlankMode = 30,
    AlreadyInThermostatMenu = 31,
    NotInThermostatMenu = 32,
    NoThermostatResponse = 33,
}

impl TroubleCode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            17 => Some(Self::KeybusBusyInstallerMode),
            21 => Some(Self::PartitionOutOfRange),
            23 => Some(Self::PartitionNotArmed),
            24 => Some(Self::PartitionNotReadyToArm),
            26 => Some(Self::UserCodeNotRequired),
            28 => Some(Self::VirtualKeypadDisabled),
            29 => Some(Self::InvalidParameter),
            30 => Some(Self::KeypadWontLeaveBlankMode),
            31 => Some(Self::AlreadyInThermostatMenu),
            32 => Some(Self::NotInThermostatMenu),
            33 => Some(Self::NoThermostatResponse),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::KeybusBusyInstallerMode => "Keybus Busy - Installer Mode",
            Self::PartitionOutOfRange => "Requested Partition is out of Range",
            Self::PartitionNotArmed => "Partition is Not Armed",
            Self::PartitionNotReadyToArm => "Partition is Not Ready to Arm",
            Self::UserCodeNotRequired => "User Code Not Required",
            Self::VirtualKeypadDisabled => "Virtual Keypad is Disabled",
            Self::InvalidParameter => "Not Valid Parameter",
            Self::KeypadWontLeaveBlankMode => "Keypad Does Not Come Out of Blank Mode",
            Self::AlreadyInThermostatMenu => "Already in Thermostat Menu",
            Self::NotInThermostatMenu => "Not in Thermostat Menu",
            Self::NoThermostatResponse => "No Response from Thermostat or Escort Module",
        }
    }
}

impl std::fmt::Display for TroubleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors produced by the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("bad frame: {0}")]
    Frame(#[from] FrameError),

    #[error("panel link closed")]
    Disconnected,

    #[error("panel input line exceeded {max} bytes")]
    LineOverflow { max: usize },

    #[error("no acknowledgment for command {code:03} within {timeout_ms} ms")]
    AckTimeout { code: u16, timeout_ms: u64 },

    #[error("invalid configuration: {details}")]
    InvalidConfig { details: String },
}

impl GatewayError {
    /// Whether reconnecting to the panel could clear this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Serial(_) | Self::Disconnected | Self::AckTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trouble_code_round_trip() {
        for code in [17u8, 21, 23, 24, 26, 28, 29, 30, 31, 32, 33] {
            let t = TroubleCode::from_code(code).unwrap();
            assert_eq!(t as u8, code);
            assert!(!t.description().is_empty());
        }
        assert!(TroubleCode::from_code(0).is_none());
        assert!(TroubleCode::from_code(22).is_none());
        assert!(TroubleCode::from_code(34).is_none());
    }

    #[test]
    fn retryable_classification() {
        assert!(GatewayError::Disconnected.is_retryable());
        assert!(GatewayError::AckTimeout { code: 70, timeout_ms: 5000 }.is_retryable());
        assert!(!GatewayError::InvalidConfig { details: "x".into() }.is_retryable());
        assert!(!GatewayError::LineOverflow { max: 256 }.is_retryable());
    }
}
