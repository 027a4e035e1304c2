//! Link-layer identities
//!
//! Neighbors are reached by their 6-byte hardware address. The tree address
//! says where a node sits logically; the [`HardwareAddr`] says which radio to
//! hand a frame to.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Number of bytes in a hardware address
pub const HARDWARE_ADDR_LEN: usize = 6;

/// 6-byte link-layer address of a node
///
/// Displays and parses as colon-separated uppercase hex
/// (`AA:BB:CC:DD:EE:FF`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HardwareAddr(pub [u8; HARDWARE_ADDR_LEN]);

impl HardwareAddr {
    /// Create from raw bytes
    pub const fn new(bytes: [u8; HARDWARE_ADDR_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, failing on the wrong length
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentityError> {
        let bytes: [u8; HARDWARE_ADDR_LEN] =
            bytes
                .try_into()
                .map_err(|_| IdentityError::InvalidLength {
                    expected: HARDWARE_ADDR_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(bytes))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; HARDWARE_ADDR_LEN] {
        &self.0
    }

    /// Lowercase hex without separators, used for storage keys
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short display form for logging (last two bytes)
    pub fn short_id(&self) -> String {
        format!("{:02X}{:02X}", self.0[4], self.0[5])
    }
}

impl Display for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl Debug for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HardwareAddr({})", self)
    }
}

impl FromStr for HardwareAddr {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != HARDWARE_ADDR_LEN {
            return Err(IdentityError::InvalidFormat(s.to_string()));
        }

        let mut bytes = [0u8; HARDWARE_ADDR_LEN];
        for (slot, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(IdentityError::InvalidFormat(s.to_string()));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| IdentityError::InvalidFormat(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for HardwareAddr {
    type Error = IdentityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<HardwareAddr> for String {
    fn from(addr: HardwareAddr) -> Self {
        addr.to_string()
    }
}

impl From<[u8; HARDWARE_ADDR_LEN]> for HardwareAddr {
    fn from(bytes: [u8; HARDWARE_ADDR_LEN]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let addr = HardwareAddr::new([0xAA, 0xBB, 0x0C, 0x01, 0x02, 0xFF]);
        assert_eq!(addr.to_string(), "AA:BB:0C:01:02:FF");

        let parsed: HardwareAddr = "aa:bb:0c:01:02:ff".parse().unwrap();
        assert_eq!(parsed, addr);

        let dashed: HardwareAddr = "AA-BB-0C-01-02-FF".parse().unwrap();
        assert_eq!(dashed, addr);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("AA:BB:CC".parse::<HardwareAddr>().is_err());
        assert!("AA:BB:CC:DD:EE:GG".parse::<HardwareAddr>().is_err());
        assert!("AAA:BB:CC:DD:EE:FF".parse::<HardwareAddr>().is_err());
        assert!("".parse::<HardwareAddr>().is_err());
    }

    #[test]
    fn test_hex_key_form() {
        let addr = HardwareAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
        assert_eq!(addr.to_hex(), "aabbccddee01");
        assert_eq!(addr.short_id(), "EE01");
    }

    #[test]
    fn test_from_slice() {
        let addr = HardwareAddr::from_slice(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(addr.as_bytes(), &[1, 2, 3, 4, 5, 6]);

        let err = HardwareAddr::from_slice(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            IdentityError::InvalidLength {
                expected: 6,
                actual: 3
            }
        );
    }

    #[test]
    fn test_serde_as_string() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            hw: HardwareAddr,
        }

        let holder: Holder = toml::from_str(r#"hw = "01:02:03:04:05:06""#).unwrap();
        assert_eq!(holder.hw, HardwareAddr::new([1, 2, 3, 4, 5, 6]));

        let text = toml::to_string(&holder).unwrap();
        assert!(text.contains("01:02:03:04:05:06"));
    }
}
