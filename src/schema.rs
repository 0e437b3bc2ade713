// MIT License - Copyright (c) 2026 Peter Wright
// Declarative command schema: one table entry per IT-100 command code

use crate::constants::COMMAND_ACKNOWLEDGE;
use crate::error::TroubleCode;

/// How a payload field renders for display and logging.
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// Decimal integer; non-numeric content decodes as 0.
    Int,
    /// Raw string slice of the payload.
    Str,
    /// Integer with a mnemonic lookup; falls back to the number when the
    /// value has no mnemonic.
    Enum(fn(i64) -> Option<&'static str>),
}

/// One typed slice of a command payload. `len == None` means "to end of
/// payload".
#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub len: Option<usize>,
    pub kind: FieldKind,
}

/// Schema entry for one command code.
pub struct CommandSpec {
    pub code: u16,
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

const fn int(name: &'static str, offset: usize, len: usize) -> FieldSpec {
    FieldSpec {
        name,
        offset,
        len: Some(len),
        kind: FieldKind::Int,
    }
}

const fn int_rest(name: &'static str, offset: usize) -> FieldSpec {
    FieldSpec {
        name,
        offset,
        len: None,
        kind: FieldKind::Int,
    }
}

const fn str_rest(name: &'static str, offset: usize) -> FieldSpec {
    FieldSpec {
        name,
        offset,
        len: None,
        kind: FieldKind::Str,
    }
}

const fn enum_at(
    name: &'static str,
    offset: usize,
    len: usize,
    decode: fn(i64) -> Option<&'static str>,
) -> FieldSpec {
    FieldSpec {
        name,
        offset,
        len: Some(len),
        kind: FieldKind::Enum(decode),
    }
}

const fn enum_rest(
    name: &'static str,
    offset: usize,
    decode: fn(i64) -> Option<&'static str>,
) -> FieldSpec {
    FieldSpec {
        name,
        offset,
        len: None,
        kind: FieldKind::Enum(decode),
    }
}

fn on_off(v: i64) -> Option<&'static str> {
    match v {
        0 => Some("Off"),
        1 => Some("On"),
        _ => None,
    }
}

fn panic_key(v: i64) -> Option<&'static str> {
    match v {
        1 => Some("Fire"),
        2 => Some("Ambulance"),
        3 => Some("Panic"),
        _ => None,
    }
}

fn baud_rate(v: i64) -> Option<&'static str> {
    match v {
        0 => Some("9600"),
        1 => Some("19200"),
        2 => Some("38400"),
        3 => Some("57600"),
        4 => Some("115200"),
        _ => None,
    }
}

fn arm_mode(v: i64) -> Option<&'static str> {
    match v {
        0 => Some("Away"),
        1 => Some("Stay"),
        2 => Some("Away, No Delay"),
        3 => Some("Stay, No Delay"),
        _ => None,
    }
}

fn cursor_kind(v: i64) -> Option<&'static str> {
    match v {
        0 => Some("Off"),
        1 => Some("Underscore"),
        2 => Some("Block"),
        _ => None,
    }
}

fn led_name(v: i64) -> Option<&'static str> {
    match v {
        1 => Some("Ready"),
        2 => Some("Armed"),
        3 => Some("Memory"),
        4 => Some("Bypass"),
        5 => Some("Trouble"),
        6 => Some("Program"),
        7 => Some("Fire"),
        8 => Some("Backlight"),
        9 => Some("AC"),
        _ => None,
    }
}

fn led_state(v: i64) -> Option<&'static str> {
    match v {
        0 => Some("Off"),
        1 => Some("On"),
        2 => Some("Flashing"),
        _ => None,
    }
}

fn trouble_description(v: i64) -> Option<&'static str> {
    u8::try_from(v)
        .ok()
        .and_then(TroubleCode::from_code)
        .map(|t| t.description())
}

const TIME_FIELDS: [FieldSpec; 5] = [
    int("Hour", 0, 2),
    int("Minute", 2, 2),
    int("Month", 4, 2),
    int("Day", 6, 2),
    int_rest("Year", 8),
];

const PARTITION_ONLY: [FieldSpec; 1] = [int_rest("Partition", 0)];
const ZONE_ONLY: [FieldSpec; 1] = [int_rest("Zone", 0)];
const PARTITION_ZONE: [FieldSpec; 2] = [int("Partition", 0, 1), int_rest("Zone", 1)];
const ONOFF_ONLY: [FieldSpec; 1] = [enum_rest("On/Off", 0, on_off)];

/// The full command catalogue, sorted by code for binary search. About half
/// of these carry no parameters and exist only so the daemon can name them
/// in logs and shell actions.
pub static SCHEMA: &[CommandSpec] = &[
    CommandSpec { code: 0, name: "Poll", fields: &[] },
    CommandSpec { code: 1, name: "Status Request", fields: &[] },
    CommandSpec { code: 2, name: "Labels Request", fields: &[] },
    CommandSpec { code: 10, name: "Set Time and Date", fields: &TIME_FIELDS },
    CommandSpec {
        code: 20,
        name: "Command Output Control",
        fields: &[int("Partition", 0, 1), int_rest("Output", 1)],
    },
    CommandSpec { code: 30, name: "Partition Arm Control - Away", fields: &PARTITION_ONLY },
    CommandSpec { code: 31, name: "Partition Arm Control - Stay", fields: &PARTITION_ONLY },
    CommandSpec {
        code: 32,
        name: "Partition Arm Control - No Entry Delay",
        fields: &PARTITION_ONLY,
    },
    CommandSpec {
        code: 33,
        name: "Partition Arm Control - With Code",
        fields: &[int("Partition", 0, 1), str_rest("Code", 1)],
    },
    CommandSpec {
        code: 40,
        name: "Partition Disarm Control",
        fields: &[int("Partition", 0, 1), str_rest("Code", 1)],
    },
    CommandSpec { code: 55, name: "Time Stamp Control", fields: &ONOFF_ONLY },
    CommandSpec { code: 56, name: "Time-Date Broadcast Control", fields: &ONOFF_ONLY },
    CommandSpec { code: 57, name: "Temperature Broadcast Control", fields: &ONOFF_ONLY },
    CommandSpec { code: 58, name: "Virtual Keypad Control", fields: &ONOFF_ONLY },
    CommandSpec {
        code: 60,
        name: "Trigger Panic Alarm",
        fields: &[enum_rest("Key", 0, panic_key)],
    },
    CommandSpec { code: 70, name: "Key Pressed", fields: &[str_rest("Key", 0)] },
    CommandSpec {
        code: 80,
        name: "Baud Rate Change",
        fields: &[enum_rest("Baud Rate", 0, baud_rate)],
    },
    CommandSpec {
        code: 95,
        name: "Get Temperature Set Point",
        fields: &[int_rest("Thermostat", 0)],
    },
    CommandSpec {
        code: 96,
        name: "Temperature Change",
        fields: &[
            int("Thermostat", 0, 1),
            int("Set Point Type", 1, 1),
            int("Mode", 2, 1),
            int_rest("Temperature", 3),
        ],
    },
    CommandSpec {
        code: 97,
        name: "Save Temperature Setting",
        fields: &[int_rest("Thermostat", 0)],
    },
    CommandSpec { code: 200, name: "Code Send", fields: &[str_rest("Access Code", 0)] },
    CommandSpec {
        code: 500,
        name: "Command Acknowledge",
        fields: &[int_rest("Command", 0)],
    },
    CommandSpec { code: 501, name: "Command Error", fields: &[] },
    CommandSpec {
        code: 502,
        name: "System Error",
        fields: &[enum_rest("Error Code", 0, trouble_description)],
    },
    CommandSpec { code: 550, name: "Time-Date Broadcast", fields: &TIME_FIELDS },
    CommandSpec { code: 560, name: "Ring Detected", fields: &[] },
    CommandSpec {
        code: 561,
        name: "Indoor Temperature Broadcast",
        fields: &[int("Thermostat", 0, 1), int_rest("Temperature", 1)],
    },
    CommandSpec {
        code: 562,
        name: "Outdoor Temperature Broadcast",
        fields: &[int("Thermostat", 0, 1), int_rest("Temperature", 1)],
    },
    CommandSpec {
        code: 563,
        name: "Thermostat Set Points",
        fields: &[int("Thermostat", 0, 2), int("Cooling", 2, 3), int_rest("Heating", 5)],
    },
    CommandSpec {
        code: 570,
        name: "Broadcast Labels",
        fields: &[int("Label Number", 0, 3), str_rest("Label", 3)],
    },
    CommandSpec {
        code: 580,
        name: "Baud Rate Set",
        fields: &[enum_rest("Baud Rate", 0, baud_rate)],
    },
    CommandSpec { code: 601, name: "Zone Alarm", fields: &PARTITION_ZONE },
    CommandSpec { code: 602, name: "Zone Alarm Restore", fields: &PARTITION_ZONE },
    CommandSpec { code: 603, name: "Zone Tamper", fields: &PARTITION_ZONE },
    CommandSpec { code: 604, name: "Zone Tamper Restore", fields: &PARTITION_ZONE },
    CommandSpec { code: 605, name: "Zone Fault", fields: &ZONE_ONLY },
    CommandSpec { code: 606, name: "Zone Fault Restore", fields: &ZONE_ONLY },
    CommandSpec { code: 609, name: "Zone Open", fields: &ZONE_ONLY },
    CommandSpec { code: 610, name: "Zone Restored", fields: &ZONE_ONLY },
    CommandSpec { code: 620, name: "Duress Alarm", fields: &[str_rest("Code", 0)] },
    CommandSpec { code: 621, name: "Fire Key Alarm", fields: &[] },
    CommandSpec { code: 622, name: "Fire Key Restore", fields: &[] },
    CommandSpec { code: 623, name: "Auxiliary Key Alarm", fields: &[] },
    CommandSpec { code: 624, name: "Auxiliary Key Restore", fields: &[] },
    CommandSpec { code: 625, name: "Panic Key Alarm", fields: &[] },
    CommandSpec { code: 626, name: "Panic Key Restore", fields: &[] },
    CommandSpec { code: 631, name: "Auxiliary Input Alarm", fields: &[] },
    CommandSpec { code: 632, name: "Auxiliary Input Alarm Restore", fields: &[] },
    CommandSpec { code: 650, name: "Partition Ready", fields: &PARTITION_ONLY },
    CommandSpec { code: 651, name: "Partition Not Ready", fields: &PARTITION_ONLY },
    CommandSpec {
        code: 652,
        name: "Partition Armed",
        fields: &[int("Partition", 0, 1), enum_rest("Mode", 1, arm_mode)],
    },
    CommandSpec { code: 653, name: "Partition Ready to Force Arm", fields: &PARTITION_ONLY },
    CommandSpec { code: 654, name: "Partition in Alarm", fields: &PARTITION_ONLY },
    CommandSpec { code: 655, name: "Partition Disarmed", fields: &PARTITION_ONLY },
    CommandSpec { code: 656, name: "Exit Delay in Progress", fields: &PARTITION_ONLY },
    CommandSpec { code: 657, name: "Entry Delay in Progress", fields: &PARTITION_ONLY },
    CommandSpec { code: 658, name: "Keypad Lockout", fields: &PARTITION_ONLY },
    CommandSpec { code: 659, name: "Keypad Blanking", fields: &PARTITION_ONLY },
    CommandSpec { code: 660, name: "Command Output in Progress", fields: &PARTITION_ONLY },
    CommandSpec { code: 670, name: "Invalid Access Code", fields: &PARTITION_ONLY },
    CommandSpec { code: 671, name: "Function Not Available", fields: &PARTITION_ONLY },
    CommandSpec { code: 672, name: "Fail to Arm", fields: &PARTITION_ONLY },
    CommandSpec { code: 673, name: "Partition Busy", fields: &PARTITION_ONLY },
    CommandSpec {
        code: 700,
        name: "User Closing",
        fields: &[int("Partition", 0, 1), int_rest("User", 1)],
    },
    CommandSpec { code: 701, name: "Special Closing", fields: &PARTITION_ONLY },
    CommandSpec { code: 702, name: "Partial Closing", fields: &PARTITION_ONLY },
    CommandSpec {
        code: 750,
        name: "User Opening",
        fields: &[int("Partition", 0, 1), int_rest("User", 1)],
    },
    CommandSpec { code: 751, name: "Special Opening", fields: &PARTITION_ONLY },
    CommandSpec { code: 800, name: "Panel Battery Trouble", fields: &[] },
    CommandSpec { code: 801, name: "Panel Battery Trouble Restore", fields: &[] },
    CommandSpec { code: 802, name: "Panel AC Trouble", fields: &[] },
    CommandSpec { code: 803, name: "Panel AC Restore", fields: &[] },
    CommandSpec { code: 806, name: "System Bell Trouble", fields: &[] },
    CommandSpec { code: 807, name: "System Bell Trouble Restore", fields: &[] },
    CommandSpec { code: 810, name: "TLM Line 1 Trouble", fields: &[] },
    CommandSpec { code: 811, name: "TLM Line 1 Trouble Restored", fields: &[] },
    CommandSpec { code: 812, name: "TLM Line 2 Trouble", fields: &[] },
    CommandSpec { code: 813, name: "TLM Line 2 Trouble Restored", fields: &[] },
    CommandSpec { code: 814, name: "FTC Trouble", fields: &[] },
    CommandSpec { code: 816, name: "Buffer Near Full", fields: &[] },
    CommandSpec { code: 821, name: "General Device Low Battery", fields: &ZONE_ONLY },
    CommandSpec {
        code: 822,
        name: "General Device Low Battery Restore",
        fields: &ZONE_ONLY,
    },
    CommandSpec {
        code: 825,
        name: "Wireless Key Low Battery Trouble",
        fields: &[int_rest("Key", 0)],
    },
    CommandSpec {
        code: 826,
        name: "Wireless Key Low Battery Restore",
        fields: &[int_rest("Key", 0)],
    },
    CommandSpec {
        code: 827,
        name: "Handheld Keypad Low Battery Trouble",
        fields: &[int_rest("Keypad", 0)],
    },
    CommandSpec {
        code: 828,
        name: "Handheld Keypad Low Battery Restore",
        fields: &[int_rest("Keypad", 0)],
    },
    CommandSpec { code: 829, name: "General System Tamper", fields: &[] },
    CommandSpec { code: 830, name: "General System Tamper Restore", fields: &[] },
    CommandSpec { code: 831, name: "Home Automation Trouble", fields: &[] },
    CommandSpec { code: 832, name: "Home Automation Trouble Restore", fields: &[] },
    CommandSpec { code: 840, name: "Trouble Status", fields: &PARTITION_ONLY },
    CommandSpec { code: 841, name: "Trouble Status Restore", fields: &PARTITION_ONLY },
    CommandSpec { code: 842, name: "Fire Trouble Alarm", fields: &[] },
    CommandSpec { code: 843, name: "Fire Trouble Alarm Restore", fields: &[] },
    CommandSpec {
        code: 900,
        name: "Code Required",
        fields: &[int("Partition", 0, 1), int_rest("Digits", 1)],
    },
    CommandSpec {
        code: 901,
        name: "LCD Update",
        fields: &[
            int("Line", 0, 1),
            int("Column", 1, 2),
            int("Length", 3, 2),
            str_rest("Text", 5),
        ],
    },
    CommandSpec {
        code: 902,
        name: "LCD Cursor",
        fields: &[
            enum_at("Type", 0, 1, cursor_kind),
            int("Line", 1, 1),
            int_rest("Column", 2),
        ],
    },
    CommandSpec {
        code: 903,
        name: "LED Status",
        fields: &[enum_at("LED", 0, 1, led_name), enum_rest("State", 1, led_state)],
    },
    CommandSpec { code: 904, name: "Beep Status", fields: &[int_rest("Beeps", 0)] },
    CommandSpec { code: 905, name: "Tone Status", fields: &[str_rest("Tone", 0)] },
    CommandSpec { code: 906, name: "Buzzer Status", fields: &[int_rest("Duration", 0)] },
    CommandSpec { code: 907, name: "Door Chime Status", fields: &[] },
    CommandSpec { code: 908, name: "Software Version", fields: &[str_rest("Version", 0)] },
];

/// Look up the schema entry for a code. Unknown codes are the defined
/// "no schema" case: zero parameters, no state action.
pub fn lookup(code: u16) -> Option<&'static CommandSpec> {
    SCHEMA
        .binary_search_by_key(&code, |spec| spec.code)
        .ok()
        .map(|i| &SCHEMA[i])
}

/// Display name for a code, `"Unknown"` when the table has no entry.
pub fn command_name(code: u16) -> &'static str {
    lookup(code).map(|spec| spec.name).unwrap_or("Unknown")
}

/// Number of fields the code's payload carries.
pub fn param_count(code: u16) -> usize {
    lookup(code).map(|spec| spec.fields.len()).unwrap_or(0)
}

/// Constant label for field `i`, empty when out of range or unknown.
pub fn param_name(code: u16, i: usize) -> &'static str {
    field(code, i).map(|f| f.name).unwrap_or("")
}

fn field(code: u16, i: usize) -> Option<&'static FieldSpec> {
    lookup(code).and_then(|spec| spec.fields.get(i))
}

/// Slice the payload per the field spec, clamped to the payload bounds so a
/// short payload yields an empty string rather than a panic.
fn slice<'a>(payload: &'a str, spec: &FieldSpec) -> &'a str {
    if !payload.is_ascii() {
        return "";
    }
    let start = spec.offset.min(payload.len());
    let end = match spec.len {
        Some(len) => (start + len).min(payload.len()),
        None => payload.len(),
    };
    &payload[start..end]
}

/// Decimal value of field `i`; non-numeric or missing content decodes as 0.
pub fn param_int(code: u16, payload: &str, i: usize) -> i64 {
    field(code, i)
        .map(|f| slice(payload, f).trim().parse().unwrap_or(0))
        .unwrap_or(0)
}

/// Raw string slice of field `i`.
pub fn param_str<'a>(code: u16, payload: &'a str, i: usize) -> &'a str {
    field(code, i).map(|f| slice(payload, f)).unwrap_or("")
}

/// Human-readable rendering of field `i`, applying the field's enum decode
/// where one exists.
///
/// COMMAND_ACKNOWLEDGE is the one cross-schema case: its field names the
/// command being acknowledged, so the display resolves that code's name with
/// a single table lookup (never a recursive decode).
pub fn param_display(code: u16, payload: &str, i: usize) -> String {
    if code == COMMAND_ACKNOWLEDGE && i == 0 {
        let referenced = param_int(code, payload, 0);
        return match u16::try_from(referenced).ok().and_then(lookup) {
            Some(spec) => format!("{referenced:03} ({})", spec.name),
            None => format!("{referenced:03}"),
        };
    }

    match field(code, i) {
        Some(f) => match f.kind {
            FieldKind::Int => param_int(code, payload, i).to_string(),
            FieldKind::Str => slice(payload, f).to_string(),
            FieldKind::Enum(decode) => {
                let v = param_int(code, payload, i);
                decode(v).map(str::to_string).unwrap_or_else(|| v.to_string())
            }
        },
        None => String::new(),
    }
}

/// One-line `Name [field=value ...]` description for logs and the `%d`
/// action placeholder.
pub fn describe(code: u16, payload: &str) -> String {
    let name = command_name(code);
    let count = param_count(code);
    if count == 0 {
        return name.to_string();
    }
    let params: Vec<String> = (0..count)
        .map(|i| format!("{}={}", param_name(code, i), param_display(code, payload, i)))
        .collect();
    format!("{name} [{}]", params.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        for pair in SCHEMA.windows(2) {
            assert!(pair[0].code < pair[1].code, "table out of order at {}", pair[1].code);
        }
    }

    #[test]
    fn zone_open_decode() {
        assert_eq!(command_name(609), "Zone Open");
        assert_eq!(param_count(609), 1);
        assert_eq!(param_int(609, "003", 0), 3);
        assert_eq!(param_name(609, 0), "Zone");
    }

    #[test]
    fn lcd_update_fields() {
        let payload = "00205Hello";
        assert_eq!(param_int(901, payload, 0), 0);
        assert_eq!(param_int(901, payload, 1), 2);
        assert_eq!(param_int(901, payload, 2), 5);
        assert_eq!(param_str(901, payload, 3), "Hello");
    }

    #[test]
    fn label_broadcast_keeps_raw_padding() {
        // Right-trimming happens in the state model, not the decoder
        let payload = "012Garage Door     ";
        assert_eq!(param_int(570, payload, 0), 12);
        assert_eq!(param_str(570, payload, 1), "Garage Door     ");
    }

    #[test]
    fn enum_decodes() {
        assert_eq!(param_display(903, "11", 0), "Ready");
        assert_eq!(param_display(903, "11", 1), "On");
        assert_eq!(param_display(903, "92", 0), "AC");
        assert_eq!(param_display(903, "92", 1), "Flashing");
        assert_eq!(param_display(60, "2", 0), "Ambulance");
        assert_eq!(param_display(652, "10", 1), "Away");
        // Out-of-range enum values fall back to the number
        assert_eq!(param_display(903, "15", 1), "5");
    }

    #[test]
    fn system_error_decodes_trouble_code() {
        assert_eq!(param_display(502, "021", 0), "Requested Partition is out of Range");
        assert_eq!(param_display(502, "099", 0), "99");
    }

    #[test]
    fn acknowledge_resolves_referenced_name() {
        assert_eq!(param_display(500, "000", 0), "000 (Poll)");
        assert_eq!(param_display(500, "070", 0), "070 (Key Pressed)");
        assert_eq!(param_display(500, "123", 0), "123");
    }

    #[test]
    fn telephone_line_troubles_are_named() {
        assert_eq!(command_name(810), "TLM Line 1 Trouble");
        assert_eq!(command_name(811), "TLM Line 1 Trouble Restored");
        assert_eq!(command_name(812), "TLM Line 2 Trouble");
        assert_eq!(command_name(813), "TLM Line 2 Trouble Restored");
        for code in 810..=813 {
            assert_eq!(param_count(code), 0);
        }
    }

    #[test]
    fn unknown_code_has_no_params() {
        assert_eq!(param_count(111), 0);
        assert_eq!(command_name(111), "Unknown");
        assert_eq!(param_int(111, "whatever", 0), 0);
        assert_eq!(param_str(111, "whatever", 0), "");
    }

    #[test]
    fn short_payload_is_safe() {
        assert_eq!(param_int(901, "", 2), 0);
        assert_eq!(param_str(901, "0", 3), "");
        assert_eq!(param_int(570, "5", 0), 5);
    }

    #[test]
    fn decode_is_deterministic() {
        let payload = "00205Hello";
        for _ in 0..3 {
            assert_eq!(param_int(901, payload, 1), 2);
            assert_eq!(param_str(901, payload, 3), "Hello");
            assert_eq!(param_display(901, payload, 3), "Hello");
        }
    }

    #[test]
    fn describe_formats() {
        assert_eq!(describe(560, ""), "Ring Detected");
        assert_eq!(describe(609, "003"), "Zone Open [Zone=3]");
        assert_eq!(
            describe(903, "11"),
            "LED Status [LED=Ready State=On]"
        );
    }
}
