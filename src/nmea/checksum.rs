//! NMEA checksum verification.
//!
//! The checksum is the XOR of every printable byte between `$` and `*`,
//! transmitted as two hex digits after the `*`.

use super::MAX_SENTENCE_LEN;

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

/// XOR of the payload bytes of a `$...*` sentence.
pub fn checksum(sentence: &[u8]) -> u8 {
    sentence
        .iter()
        .skip(1)
        .take_while(|&&b| b != b'*' && is_print(b))
        .fold(0, |acc, &b| acc ^ b)
}

pub(crate) fn is_print(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

/// Validate framing and checksum.
///
/// In strict mode a sentence without a checksum is rejected.  Only an
/// empty tail, `"\n"` or `"\r\n"` may follow the checksum digits.
pub fn check(sentence: &[u8], strict: bool) -> bool {
    if sentence.len() > MAX_SENTENCE_LEN + 3 {
        return false;
    }
    if sentence.first() != Some(&b'$') {
        return false;
    }

    let body_end = sentence[1..]
        .iter()
        .position(|&b| b == b'*' || !is_print(b))
        .map_or(sentence.len(), |p| p + 1);
    let computed = checksum(sentence);

    let mut rest = &sentence[body_end..];
    if rest.first() == Some(&b'*') {
        let (Some(hi), Some(lo)) = (
            rest.get(1).copied().and_then(hex_digit),
            rest.get(2).copied().and_then(hex_digit),
        ) else {
            return false;
        };
        if computed != (hi << 4 | lo) {
            return false;
        }
        rest = &rest[3..];
    } else if strict {
        return false;
    }

    matches!(rest, b"" | b"\n" | b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RMC: &[u8] = b"$GPRMC,081836,A,3751.65,S,14507.36,E,000.0,360.0,130998,011.3,E*62";

    #[test]
    fn accepts_valid_checksum() {
        assert!(check(RMC, true));
        assert!(check(RMC, false));
    }

    #[test]
    fn accepts_trailing_newlines_only() {
        let mut s = RMC.to_vec();
        s.extend_from_slice(b"\r\n");
        assert!(check(&s, true));
        s.pop();
        s.pop();
        s.extend_from_slice(b"\n");
        assert!(check(&s, true));
        s.extend_from_slice(b"x");
        assert!(!check(&s, true));
    }

    #[test]
    fn lowercase_hex_is_accepted() {
        let body = b"$GPGLL,,,,,,V";
        let sum = checksum(body);
        let lower = format!("{}*{sum:02x}", core::str::from_utf8(body).unwrap());
        let upper = format!("{}*{sum:02X}", core::str::from_utf8(body).unwrap());
        assert!(check(lower.as_bytes(), true));
        assert!(check(upper.as_bytes(), true));
    }

    #[test]
    fn mismatched_checksum_rejected() {
        assert!(!check(
            b"$GPRMC,081836,A,3751.65,S,14507.36,E,000.0,360.0,130998,011.3,E*63",
            false
        ));
    }

    #[test]
    fn strict_mode_requires_checksum() {
        let s = b"$GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1";
        assert!(check(s, false));
        assert!(!check(s, true));
    }

    #[test]
    fn requires_leading_dollar_and_bounded_length() {
        assert!(!check(b"GPRMC,1*00", false));
        let mut long = b"$GPTXT,".to_vec();
        long.resize(MAX_SENTENCE_LEN + 4, b'A');
        assert!(!check(&long, false));
    }

    #[test]
    fn truncated_checksum_rejected() {
        assert!(!check(b"$GPGLL,,,,,,V*2", false));
    }
}
