use std::fmt;

use crate::{ShardError, ShardResult};

/// Decoded name of a link inside a shard node.
///
/// `"3F"` is a nested subshard in slot `0x3F`; `"3Fmyfile.txt"` is the
/// entry `myfile.txt` stored in that slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardLinkName {
    Subshard { slot: usize },
    Leaf { slot: usize, name: String },
}

impl ShardLinkName {
    pub fn slot(&self) -> usize {
        match self {
            ShardLinkName::Subshard { slot } | ShardLinkName::Leaf { slot, .. } => *slot,
        }
    }

    /// Two uppercase hex digits naming `slot`.
    pub fn prefix(slot: usize) -> String {
        format!("{slot:02X}")
    }

    pub fn parse(link: &str, fanout: u32) -> ShardResult<Self> {
        let bytes = link.as_bytes();
        if bytes.len() < 2 || !link.is_char_boundary(2) {
            return Err(ShardError::Malformed(format!(
                "link name {link:?} has no slot prefix"
            )));
        }
        let slot = match (hex_digit(bytes[0]), hex_digit(bytes[1])) {
            (Some(hi), Some(lo)) => ((hi << 4) | lo) as usize,
            _ => {
                return Err(ShardError::Malformed(format!(
                    "link name {link:?} has an invalid slot prefix"
                )));
            }
        };
        if slot >= fanout as usize {
            return Err(ShardError::Malformed(format!(
                "slot {slot} in link {link:?} is outside fanout {fanout}"
            )));
        }
        let name = &link[2..];
        if name.is_empty() {
            Ok(ShardLinkName::Subshard { slot })
        } else {
            Ok(ShardLinkName::Leaf {
                slot,
                name: name.to_string(),
            })
        }
    }
}

// Only the canonical uppercase form is accepted.
fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for ShardLinkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardLinkName::Subshard { slot } => write!(f, "{slot:02X}"),
            ShardLinkName::Leaf { slot, name } => write!(f, "{slot:02X}{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shapes() {
        assert_eq!(
            ShardLinkName::parse("3F", 256).unwrap(),
            ShardLinkName::Subshard { slot: 0x3F }
        );
        assert_eq!(
            ShardLinkName::parse("3Fmyfile.txt", 256).unwrap(),
            ShardLinkName::Leaf {
                slot: 0x3F,
                name: "myfile.txt".to_string()
            }
        );
        assert_eq!(
            ShardLinkName::Leaf {
                slot: 7,
                name: "x".into()
            }
            .to_string(),
            "07x"
        );
        assert_eq!(ShardLinkName::prefix(255), "FF");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "A", "3f", "G1name", "é1"] {
            assert!(
                matches!(ShardLinkName::parse(bad, 256), Err(ShardError::Malformed(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_slot_must_fit_fanout() {
        assert!(ShardLinkName::parse("0F", 16).is_ok());
        assert!(ShardLinkName::parse("10", 16).is_err());
    }
}
