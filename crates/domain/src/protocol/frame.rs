use crate::error::{DomainError, Result};

/// Two-byte preamble that starts every command frame
pub const FRAME_HEADER: [u8; 2] = [0xAA, 0x55];

/// Header + length byte + checksum byte
pub const FRAME_OVERHEAD: usize = 4;

/// Longest payload the single length byte can describe
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// Plain modular byte sum over the payload (no CRC, no sign tricks)
pub const fn checksum(payload: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    let mut i = 0;
    while i < payload.len() {
        sum = sum.wrapping_add(payload[i]);
        i += 1;
    }
    sum
}

/// Build a complete frame at compile time; `N` must be `payload.len() + 4`
pub const fn fixed_frame<const N: usize>(payload: &[u8]) -> [u8; N] {
    assert!(
        payload.len() + FRAME_OVERHEAD == N,
        "frame size must be payload length + 4"
    );
    assert!(payload.len() <= MAX_PAYLOAD_LEN, "payload too long");

    let mut out = [0u8; N];
    out[0] = FRAME_HEADER[0];
    out[1] = FRAME_HEADER[1];
    out[2] = payload.len() as u8;

    let mut i = 0;
    while i < payload.len() {
        out[3 + i] = payload[i];
        i += 1;
    }
    out[N - 1] = checksum(payload);
    out
}

/// `AA 55 08 "RELAY_ON" 79`
pub const LIGHT_ON_FRAME: [u8; 12] = fixed_frame(b"RELAY_ON");
/// `AA 55 09 "RELAY_OFF" B7`
pub const LIGHT_OFF_FRAME: [u8; 13] = fixed_frame(b"RELAY_OFF");
/// `AA 55 0A "GET_STATUS" 23`
pub const GET_STATUS_FRAME: [u8; 14] = fixed_frame(b"GET_STATUS");
/// `AA 55 07 "RESTART" 25`
pub const REBOOT_FRAME: [u8; 11] = fixed_frame(b"RESTART");
/// `AA 55 0C "CLEAR_ALARMS" 86`
pub const CLEAR_ALARMS_FRAME: [u8; 16] = fixed_frame(b"CLEAR_ALARMS");

/// An outbound command frame: `[AA, 55, len, payload..., checksum]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    payload: Vec<u8>,
}

impl CommandFrame {
    /// Wrap a payload, rejecting payloads the length byte cannot describe
    pub fn new(payload: impl Into<Vec<u8>>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(DomainError::InvalidFrame(format!(
                "payload of {} bytes exceeds {} byte limit",
                payload.len(),
                MAX_PAYLOAD_LEN
            )));
        }
        Ok(Self { payload })
    }

    /// Payloads built from `Command` are always well under the limit
    pub(crate) fn from_short_payload(payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD_LEN);
        Self { payload }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as text, if it is ASCII/UTF-8
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    pub fn checksum(&self) -> u8 {
        checksum(&self.payload)
    }

    /// Total encoded size
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&FRAME_HEADER);
        out.push(self.payload.len() as u8);
        out.extend_from_slice(&self.payload);
        out.push(self.checksum());
        out
    }

    /// Parse one frame from the front of `buf`
    ///
    /// Returns `Ok(None)` while the buffer holds only a prefix of a frame,
    /// and `Ok(Some((frame, consumed)))` once a whole frame is present.
    /// A wrong header or checksum is an `InvalidFrame` error; callers that
    /// resynchronise should drop one byte and try again.
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>> {
        for (i, expected) in FRAME_HEADER.iter().enumerate() {
            match buf.get(i) {
                None => return Ok(None),
                Some(b) if b != expected => {
                    return Err(DomainError::InvalidFrame(format!(
                        "bad header byte {b:#04X} at offset {i}"
                    )));
                }
                Some(_) => {}
            }
        }

        let Some(&len) = buf.get(2) else {
            return Ok(None);
        };
        let total = len as usize + FRAME_OVERHEAD;
        if buf.len() < total {
            return Ok(None);
        }

        let payload = &buf[3..3 + len as usize];
        let declared = buf[total - 1];
        let computed = checksum(payload);
        if declared != computed {
            return Err(DomainError::InvalidFrame(format!(
                "checksum mismatch: declared {declared:#04X}, computed {computed:#04X}"
            )));
        }

        Ok(Some((
            Self {
                payload: payload.to_vec(),
            },
            total,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_on_frame_matches_wire_table() {
        assert_eq!(
            LIGHT_ON_FRAME,
            [0xAA, 0x55, 0x08, 0x52, 0x45, 0x4C, 0x41, 0x59, 0x5F, 0x4F, 0x4E, 0x79]
        );
    }

    #[test]
    fn test_fixed_frame_checksums() {
        assert_eq!(LIGHT_OFF_FRAME[2], 0x09);
        assert_eq!(LIGHT_OFF_FRAME[12], 0xB7);
        assert_eq!(GET_STATUS_FRAME[2], 0x0A);
        assert_eq!(GET_STATUS_FRAME[13], 0x23);
        assert_eq!(REBOOT_FRAME[2], 0x07);
        assert_eq!(REBOOT_FRAME[10], 0x25);
        assert_eq!(CLEAR_ALARMS_FRAME[2], 0x0C);
        assert_eq!(CLEAR_ALARMS_FRAME[15], 0x86);
    }

    #[test]
    fn test_runtime_frame_matches_const_builder() {
        let frame = CommandFrame::new(b"GET_STATUS".to_vec()).unwrap();
        assert_eq!(frame.to_bytes(), GET_STATUS_FRAME.to_vec());
        assert_eq!(frame.encoded_len(), GET_STATUS_FRAME.len());
    }

    #[test]
    fn test_checksum_wraps_modulo_256() {
        assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
        assert_eq!(checksum(&[]), 0x00);
        // Bytes above 0x7F are summed unsigned
        assert_eq!(checksum(&[0x80, 0x80, 0x01]), 0x01);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        assert!(CommandFrame::new(vec![b'A'; 256]).is_err());
        assert!(CommandFrame::new(vec![b'A'; 255]).is_ok());
    }

    #[test]
    fn test_parse_complete_frame_with_trailing_bytes() {
        let mut buf = LIGHT_ON_FRAME.to_vec();
        buf.extend_from_slice(&[0xAA, 0x55]);

        let (frame, consumed) = CommandFrame::parse(&buf).unwrap().unwrap();
        assert_eq!(frame.payload_str(), Some("RELAY_ON"));
        assert_eq!(consumed, LIGHT_ON_FRAME.len());
    }

    #[test]
    fn test_parse_incomplete_frame() {
        assert_eq!(CommandFrame::parse(&[]).unwrap(), None);
        assert_eq!(CommandFrame::parse(&[0xAA]).unwrap(), None);
        assert_eq!(CommandFrame::parse(&REBOOT_FRAME[..6]).unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_header_and_checksum() {
        assert!(CommandFrame::parse(&[0x55, 0xAA, 0x00, 0x00]).is_err());

        let mut corrupted = REBOOT_FRAME;
        corrupted[10] ^= 0xFF;
        assert!(matches!(
            CommandFrame::parse(&corrupted),
            Err(DomainError::InvalidFrame(_))
        ));
    }
}
