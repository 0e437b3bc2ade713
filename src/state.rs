// MIT License - Copyright (c) 2026 Peter Wright
// Live model of the panel: zones, labels, virtual keypad

use crate::config::GatewayConfig;
use crate::constants::{
    BROADCAST_LABELS, CODE_REQUIRED, COMMAND_ACKNOWLEDGE, LABEL_TRANSFER_END, LCD_COLS,
    LCD_SIZE, LCD_UPDATE, LCD_CURSOR, LED_COUNT, LED_STATUS, MAX_ZONE, PARTITION_LABEL_BASE,
    ZONE_OPEN, ZONE_RESTORED,
};
use crate::frame::Frame;
use crate::schema;

/// What the caller must do after a frame has been applied. Most frames are
/// log-only; these two close the loop back to the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    None,
    /// COMMAND_ACKNOWLEDGE arrived for the named code; advance the queue.
    Acknowledged(u16),
    /// CODE_REQUIRED arrived; send the partition's access code back.
    SendAccessCode { partition: u8, digits: usize },
}

/// The panel model. Owns no I/O; mutated only through [`PanelState::apply`]
/// and the individual setters, all of which maintain the keypad etag.
pub struct PanelState {
    zone_open: [bool; MAX_ZONE + 1],
    labels: Vec<Option<String>>,
    has_labels: bool,
    lcd: [u8; LCD_SIZE],
    cursor_type: u8,
    cursor_line: u8,
    cursor_column: u8,
    led: [u8; LED_COUNT + 1],
    keypad_etag: u64,
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelState {
    pub fn new() -> Self {
        Self {
            zone_open: [false; MAX_ZONE + 1],
            labels: vec![None; LABEL_TRANSFER_END + 1],
            has_labels: false,
            lcd: [b' '; LCD_SIZE],
            cursor_type: 0,
            cursor_line: 0,
            cursor_column: 0,
            led: [0; LED_COUNT + 1],
            keypad_etag: 1,
        }
    }

    /// Apply one decoded frame's state transition. Exactly zero or one
    /// transition per frame, synchronous, before any log or shell side
    /// effect happens elsewhere.
    pub fn apply(&mut self, frame: &Frame) -> Reaction {
        let code = frame.code;
        let payload = frame.payload.as_str();
        match code {
            ZONE_OPEN => {
                let zone = schema::param_int(code, payload, 0);
                self.set_zone_open(zone as usize, true);
            }
            ZONE_RESTORED => {
                let zone = schema::param_int(code, payload, 0);
                self.set_zone_open(zone as usize, false);
            }
            BROADCAST_LABELS => {
                let index = schema::param_int(code, payload, 0);
                let text = schema::param_str(code, payload, 1);
                self.set_label(index as usize, text);
            }
            LCD_UPDATE => {
                let line = schema::param_int(code, payload, 0) as usize;
                let column = schema::param_int(code, payload, 1) as usize;
                let length = schema::param_int(code, payload, 2) as usize;
                let text = schema::param_str(code, payload, 3);
                self.set_lcd(line, column, length, text);
            }
            LCD_CURSOR => {
                self.set_cursor(
                    schema::param_int(code, payload, 0) as u8,
                    schema::param_int(code, payload, 1) as u8,
                    schema::param_int(code, payload, 2) as u8,
                );
            }
            LED_STATUS => {
                let led = schema::param_int(code, payload, 0) as usize;
                let state = schema::param_int(code, payload, 1) as u8;
                self.set_led(led, state);
            }
            CODE_REQUIRED => {
                return Reaction::SendAccessCode {
                    partition: schema::param_int(code, payload, 0) as u8,
                    digits: schema::param_int(code, payload, 1) as usize,
                };
            }
            COMMAND_ACKNOWLEDGE => {
                return Reaction::Acknowledged(schema::param_int(code, payload, 0) as u16);
            }
            _ => {}
        }
        Reaction::None
    }

    pub fn set_zone_open(&mut self, zone: usize, open: bool) {
        if (1..=MAX_ZONE).contains(&zone) {
            self.zone_open[zone] = open;
        }
    }

    /// Store a broadcast label, right-trimmed. Index 151 is the terminal
    /// marker of the startup label transfer.
    pub fn set_label(&mut self, index: usize, text: &str) {
        if index <= LABEL_TRANSFER_END {
            self.labels[index] = Some(text.trim_end().to_string());
            if index == LABEL_TRANSFER_END {
                self.has_labels = true;
            }
        }
    }

    /// Write `text` (capped at `length` characters) into the LCD buffer. The
    /// line folds into the column (`column += line * 16`); a write whose text
    /// would run past the 32-byte buffer is dropped whole, not clipped. The
    /// etag bumps either way: the panel asked for a keypad change.
    pub fn set_lcd(&mut self, line: usize, column: usize, length: usize, text: &str) {
        let start = column + line * LCD_COLS;
        let effective = length.min(text.len());
        if start + effective <= LCD_SIZE {
            for (i, b) in text.bytes().take(effective).enumerate() {
                self.lcd[start + i] = b;
            }
        }
        self.bump_etag();
    }

    pub fn set_cursor(&mut self, cursor_type: u8, line: u8, column: u8) {
        self.cursor_type = cursor_type;
        self.cursor_line = line;
        self.cursor_column = column;
        self.bump_etag();
    }

    pub fn set_led(&mut self, led: usize, state: u8) {
        if (1..=LED_COUNT).contains(&led) {
            self.led[led] = state;
        }
        self.bump_etag();
    }

    fn bump_etag(&mut self) {
        self.keypad_etag = self.keypad_etag.wrapping_add(1);
    }

    pub fn keypad_etag(&self) -> u64 {
        self.keypad_etag
    }

    pub fn has_labels(&self) -> bool {
        self.has_labels
    }

    pub fn zone_open(&self, zone: usize) -> bool {
        (1..=MAX_ZONE).contains(&zone) && self.zone_open[zone]
    }

    pub fn led(&self, led: usize) -> u8 {
        if (1..=LED_COUNT).contains(&led) {
            self.led[led]
        } else {
            0
        }
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels
            .get(index)
            .and_then(|l| l.as_deref())
    }

    /// One half of the LCD as text (`line` is 0 or 1).
    pub fn lcd_line(&self, line: usize) -> String {
        let start = (line.min(1)) * LCD_COLS;
        String::from_utf8_lossy(&self.lcd[start..start + LCD_COLS]).into_owned()
    }

    /// Derived 64-bit open-zone mask, zone n at bit n-1. Display and
    /// templating only; never stored.
    pub fn zone_mask(&self) -> u64 {
        let mut mask = 0u64;
        for zone in 1..=MAX_ZONE {
            if self.zone_open[zone] {
                mask |= 1 << (zone - 1);
            }
        }
        mask
    }

    /// Zone display name: config override, then broadcast label, then a
    /// numeric fallback.
    pub fn zone_name(&self, config: &GatewayConfig, zone: u8) -> String {
        if let Some(name) = config.zone_name_override(zone) {
            return name.to_string();
        }
        if let Some(label) = self.label(zone as usize) {
            if !label.is_empty() {
                return label.to_string();
            }
        }
        format!("Zone {zone}")
    }

    /// Partition display name; broadcast labels store partition n at
    /// index 100 + n.
    pub fn partition_name(&self, config: &GatewayConfig, partition: u8) -> String {
        if let Some(name) = config.partition_name_override(partition) {
            return name.to_string();
        }
        if let Some(label) = self.label(PARTITION_LABEL_BASE + partition as usize) {
            if !label.is_empty() {
                return label.to_string();
            }
        }
        format!("Partition {partition}")
    }

    /// The keypad-status line pushed to clients:
    /// `[etag,led1..led9,'line1','line2',cursorType,cursorLine,cursorColumn,0,0,0,0,0,0]`
    /// with a trailing newline. The final six fields are reserved (audio
    /// annunciator state) and always zero in this version.
    pub fn snapshot(&self) -> String {
        format!(
            "[{},{},{},{},{},{},{},{},{},{},'{}','{}',{},{},{},0,0,0,0,0,0]\n",
            self.keypad_etag,
            self.led[1],
            self.led[2],
            self.led[3],
            self.led[4],
            self.led[5],
            self.led[6],
            self.led[7],
            self.led[8],
            self.led[9],
            self.lcd_line(0),
            self.lcd_line(1),
            self.cursor_type,
            self.cursor_line,
            self.cursor_column,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(code: u16, payload: &str) -> Frame {
        Frame::new(code, payload)
    }

    #[test]
    fn initial_snapshot() {
        let state = PanelState::new();
        let blank = " ".repeat(16);
        assert_eq!(
            state.snapshot(),
            format!("[1,0,0,0,0,0,0,0,0,0,'{blank}','{blank}',0,0,0,0,0,0,0,0,0]\n")
        );
    }

    #[test]
    fn zone_lifecycle() {
        let mut state = PanelState::new();
        assert_eq!(state.apply(&frame(609, "003")), Reaction::None);
        assert!(state.zone_open(3));
        assert_eq!(state.apply(&frame(610, "003")), Reaction::None);
        assert!(!state.zone_open(3));
        // Idempotent under repetition
        state.apply(&frame(610, "003"));
        assert!(!state.zone_open(3));
        // Zone events never touch the keypad etag
        assert_eq!(state.keypad_etag(), 1);
    }

    #[test]
    fn out_of_range_zone_ignored() {
        let mut state = PanelState::new();
        state.apply(&frame(609, "000"));
        state.apply(&frame(609, "065"));
        assert_eq!(state.zone_mask(), 0);
    }

    #[test]
    fn zone_mask_bit_per_zone() {
        let mut state = PanelState::new();
        state.set_zone_open(1, true);
        assert_eq!(state.zone_mask(), 1);
        state.set_zone_open(64, true);
        assert_eq!(state.zone_mask(), (1 << 63) | 1);
        state.set_zone_open(3, true);
        assert_eq!(state.zone_mask(), (1 << 63) | (1 << 2) | 1);
    }

    #[test]
    fn labels_and_transfer_end() {
        let mut state = PanelState::new();
        state.apply(&frame(570, "001Front Door      "));
        assert_eq!(state.label(1), Some("Front Door"));
        assert!(!state.has_labels());

        state.apply(&frame(570, "151System Label    "));
        assert!(state.has_labels());
    }

    #[test]
    fn etag_bumps_on_every_keypad_mutation() {
        let mut state = PanelState::new();
        let mut last = state.keypad_etag();

        state.apply(&frame(901, "00005Hello"));
        assert!(state.keypad_etag() > last);
        last = state.keypad_etag();

        state.apply(&frame(902, "101"));
        assert!(state.keypad_etag() > last);
        last = state.keypad_etag();

        state.apply(&frame(903, "11"));
        assert!(state.keypad_etag() > last);
    }

    #[test]
    fn lcd_write_and_fold() {
        let mut state = PanelState::new();
        // Line 1 column 2 folds to buffer offset 18
        state.apply(&frame(901, "10205Hello"));
        assert_eq!(state.lcd_line(0), " ".repeat(16));
        assert_eq!(state.lcd_line(1), "  Hello         ");
    }

    #[test]
    fn lcd_length_overstating_text_still_applies() {
        let mut state = PanelState::new();
        // Length claims 10 but only 2 characters follow; the actual text
        // fits at offset 30, so the write goes through
        state.apply(&frame(901, "11410AB"));
        assert_eq!(state.lcd_line(1), "              AB");
    }

    #[test]
    fn lcd_overflow_dropped_but_etag_bumped() {
        let mut state = PanelState::new();
        let before = state.keypad_etag();
        // Offset 16 + 16 + length 5 runs past the buffer
        state.apply(&frame(901, "11605ABCDE"));
        assert_eq!(state.lcd_line(0), " ".repeat(16));
        assert_eq!(state.lcd_line(1), " ".repeat(16));
        assert_eq!(state.keypad_etag(), before + 1);
    }

    #[test]
    fn led_status() {
        let mut state = PanelState::new();
        state.apply(&frame(903, "11"));
        assert_eq!(state.led(1), 1);
        state.apply(&frame(903, "92"));
        assert_eq!(state.led(9), 2);
        assert_eq!(state.led(2), 0);
    }

    #[test]
    fn reactions() {
        let mut state = PanelState::new();
        assert_eq!(
            state.apply(&frame(500, "070")),
            Reaction::Acknowledged(70)
        );
        assert_eq!(
            state.apply(&frame(900, "206")),
            Reaction::SendAccessCode { partition: 2, digits: 6 }
        );
        // Log-only commands do nothing
        assert_eq!(state.apply(&frame(560, "")), Reaction::None);
        assert_eq!(state.apply(&frame(111, "junk")), Reaction::None);
    }

    #[test]
    fn name_lookups() {
        let mut state = PanelState::new();
        let config = GatewayConfig::builder()
            .zone_name(2, "Back Door")
            .partition_name(1, "House")
            .build();

        state.set_label(3, "Kitchen Window");
        state.set_label(102, "Upstairs");

        // Override wins over label
        assert_eq!(state.zone_name(&config, 2), "Back Door");
        assert_eq!(state.zone_name(&config, 3), "Kitchen Window");
        assert_eq!(state.zone_name(&config, 4), "Zone 4");
        assert_eq!(state.partition_name(&config, 1), "House");
        assert_eq!(state.partition_name(&config, 2), "Upstairs");
        assert_eq!(state.partition_name(&config, 3), "Partition 3");
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut state = PanelState::new();
        state.apply(&frame(901, "00005Armed"));
        state.apply(&frame(903, "21"));
        state.apply(&frame(902, "203"));
        let snap = state.snapshot();
        assert!(snap.starts_with(&format!("[{},", state.keypad_etag())));
        assert!(snap.contains("'Armed           '"));
        assert!(snap.contains(",2,0,3,0,0,0,0,0,0]\n"));
    }
}
