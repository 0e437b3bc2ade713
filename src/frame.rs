// MIT License - Copyright (c) 2026 Peter Wright
// Line codec for the IT-100 wire format

use thiserror::Error;

/// Errors from decoding a single protocol line. All of these are recoverable:
/// the caller logs the bad line and keeps reading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("line too short to hold a frame: {0:?}")]
    Truncated(String),
    #[error("command code is not numeric: {0:?}")]
    BadCode(String),
    #[error("checksum mismatch: computed {computed:02X}, line carried {carried:?}")]
    BadChecksum { computed: u8, carried: String },
}

/// Low 8 bits of the byte sum, the checksum the panel puts on every line.
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, b| acc.wrapping_add(b))
}

/// One checksum-validated protocol line: a 3-digit command code followed by
/// the command's payload. The checksum itself is only a wire artifact and is
/// recomputed on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub code: u16,
    pub payload: String,
}

impl Frame {
    pub fn new(code: u16, payload: impl Into<String>) -> Self {
        Self {
            code,
            payload: payload.into(),
        }
    }

    /// Render the frame as a wire line: `{code:03}{payload}{checksum:02X}\r\n`.
    pub fn encode(&self) -> String {
        let body = format!("{:03}{}", self.code, self.payload);
        let sum = checksum(&body);
        format!("{body}{sum:02X}\r\n")
    }

    /// Parse one received line with the trailing CR/LF already stripped.
    ///
    /// The first three characters are the decimal command code and the last
    /// two are the checksum in uppercase hex, computed over everything that
    /// precedes them. A frame that fails the check must never reach the
    /// state model.
    pub fn decode(line: &str) -> Result<Self, FrameError> {
        if !line.is_ascii() || line.len() < 5 {
            return Err(FrameError::Truncated(line.to_string()));
        }

        let (body, carried) = line.split_at(line.len() - 2);
        let computed = checksum(body);
        let matches = u8::from_str_radix(carried, 16)
            .map(|c| c == computed)
            .unwrap_or(false);
        if !matches {
            return Err(FrameError::BadChecksum {
                computed,
                carried: carried.to_string(),
            });
        }

        let code: u16 = body[..3]
            .parse()
            .map_err(|_| FrameError::BadCode(line.to_string()))?;

        Ok(Self {
            code,
            payload: body[3..].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_zone_open() {
        let frame = Frame::new(609, "003");
        assert_eq!(frame.encode(), "60900332\r\n");
    }

    #[test]
    fn encode_pads_short_codes() {
        let frame = Frame::new(1, "");
        let line = frame.encode();
        assert!(line.starts_with("001"));
        assert!(line.ends_with("\r\n"));
    }

    #[test]
    fn round_trip() {
        for (code, payload) in [
            (0u16, ""),
            (70, "5"),
            (570, "001Front Door      Label Stuff"),
            (901, "00200516 chars of text"),
            (999, "edge"),
        ] {
            let line = Frame::new(code, payload).encode();
            let stripped = line.trim_end_matches(['\r', '\n']);
            let decoded = Frame::decode(stripped).unwrap();
            assert_eq!(decoded.code, code);
            assert_eq!(decoded.payload, payload);
        }
    }

    #[test]
    fn checksum_rejection() {
        let line = Frame::new(609, "003").encode();
        let stripped = line.trim_end_matches(['\r', '\n']).to_string();

        // Corrupt the checksum trailer in every possible single-character way
        let prefix = &stripped[..stripped.len() - 2];
        let trailer = &stripped[stripped.len() - 2..];
        for pos in 0..2 {
            for c in "0123456789ABCDEF".chars() {
                let mut bad: Vec<char> = trailer.chars().collect();
                if bad[pos] == c {
                    continue;
                }
                bad[pos] = c;
                let corrupted: String = format!("{prefix}{}", bad.iter().collect::<String>());
                assert!(
                    Frame::decode(&corrupted).is_err(),
                    "corrupted line {corrupted:?} decoded"
                );
            }
        }
    }

    #[test]
    fn corrupt_payload_rejected() {
        // Flipping a payload byte invalidates the carried checksum
        let line = "60900332";
        assert!(Frame::decode(line).is_ok());
        assert!(matches!(
            Frame::decode("60900432"),
            Err(FrameError::BadChecksum { .. })
        ));
    }

    #[test]
    fn short_and_garbled_lines() {
        assert!(matches!(
            Frame::decode(""),
            Err(FrameError::Truncated(_))
        ));
        assert!(matches!(
            Frame::decode("60"),
            Err(FrameError::Truncated(_))
        ));
        // Non-numeric code with an otherwise valid checksum
        let body = "abc12";
        let line = format!("{body}{:02X}", checksum(body));
        assert!(matches!(
            Frame::decode(&line),
            Err(FrameError::BadCode(_))
        ));
    }

    #[test]
    fn non_ascii_rejected_without_panic() {
        assert!(Frame::decode("609\u{00e9}0332").is_err());
    }
}
