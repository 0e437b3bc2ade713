// MIT License - Copyright (c) 2026 Peter Wright
// Protocol constants for the IT-100 serial interface

/// Command codes the gateway acts on directly. The full catalogue of codes
/// the panel can emit lives in the schema table (`schema::SCHEMA`); these are
/// the ones with behavior beyond decode-and-log.
pub const POLL: u16 = 0;
pub const STATUS_REQUEST: u16 = 1;
pub const LABELS_REQUEST: u16 = 2;
pub const SET_TIME_AND_DATE: u16 = 10;
pub const TIME_STAMP_CONTROL: u16 = 55;
pub const TIME_DATE_BROADCAST_CONTROL: u16 = 56;
pub const VIRTUAL_KEYPAD_CONTROL: u16 = 58;
pub const KEY_PRESSED: u16 = 70;
pub const CODE_SEND: u16 = 200;
pub const COMMAND_ACKNOWLEDGE: u16 = 500;
pub const SYSTEM_ERROR: u16 = 502;
pub const BROADCAST_LABELS: u16 = 570;
pub const ZONE_OPEN: u16 = 609;
pub const ZONE_RESTORED: u16 = 610;
pub const CODE_REQUIRED: u16 = 900;
pub const LCD_UPDATE: u16 = 901;
pub const LCD_CURSOR: u16 = 902;
pub const LED_STATUS: u16 = 903;

/// Keypad LED indices as reported by LED_STATUS (903).
pub const LED_READY: usize = 1;
pub const LED_ARMED: usize = 2;
pub const LED_MEMORY: usize = 3;
pub const LED_BYPASS: usize = 4;
pub const LED_TROUBLE: usize = 5;
pub const LED_PROGRAM: usize = 6;
pub const LED_FIRE: usize = 7;
pub const LED_BACKLIGHT: usize = 8;
pub const LED_AC: usize = 9;
pub const LED_COUNT: usize = 9;

/// The virtual keypad LCD is two 16-character lines addressed as one buffer.
pub const LCD_COLS: usize = 16;
pub const LCD_SIZE: usize = 32;

/// Highest zone number the panel reports.
pub const MAX_ZONE: usize = 64;

/// Partition n's label is broadcast at index 100 + n.
pub const PARTITION_LABEL_BASE: usize = 100;
/// Label index that terminates the startup label transfer.
pub const LABEL_TRANSFER_END: usize = 151;

/// Access codes sent in CODE_SEND are at most six digits.
pub const ACCESS_CODE_DIGITS: usize = 6;

/// Characters a client may submit as a virtual keypad press.
pub const KEYPAD_KEYS: &[u8] = b"0123456789*#FAPabcde<>=^";

/// Longest line accepted from a client before the session is dropped.
pub const MAX_CLIENT_LINE: usize = 64;
/// Longest line accepted from the panel before the link is declared broken.
pub const MAX_PANEL_LINE: usize = 256;
