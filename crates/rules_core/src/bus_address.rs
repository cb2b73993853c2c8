//! Bus source address (KNX-style three-level `area.line.device`), used by
//! `ObjectSourceCompare.src` and `Object::last_tx()`.

use crate::error::RuleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 16-bit bus source address, encoded as `area(4).line(4).device(8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BusAddress(u16);

impl BusAddress {
    pub const NULL: BusAddress = BusAddress(0);

    pub fn from_raw(raw: u16) -> Self {
        BusAddress(raw)
    }

    pub fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let area = (self.0 >> 12) & 0xF;
        let line = (self.0 >> 8) & 0xF;
        let device = self.0 & 0xFF;
        write!(f, "{}.{}.{}", area, line, device)
    }
}

impl FromStr for BusAddress {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(RuleError::BadBusAddress(s.to_string()));
        }
        let bad = || RuleError::BadBusAddress(s.to_string());
        let area: u16 = parts[0].parse().map_err(|_| bad())?;
        let line: u16 = parts[1].parse().map_err(|_| bad())?;
        let device: u16 = parts[2].parse().map_err(|_| bad())?;
        if area > 0xF || line > 0xF || device > 0xFF {
            return Err(bad());
        }
        Ok(BusAddress((area << 12) | (line << 8) | device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_display_and_parse() {
        let addr: BusAddress = "1.2.3".parse().unwrap();
        assert_eq!(addr.to_string(), "1.2.3");
    }

    #[test]
    fn rejects_malformed_address() {
        assert!("1.2".parse::<BusAddress>().is_err());
        assert!("1.2.3.4".parse::<BusAddress>().is_err());
        assert!("a.b.c".parse::<BusAddress>().is_err());
        assert!("99.0.0".parse::<BusAddress>().is_err());
    }

    #[test]
    fn null_address_is_zero() {
        assert_eq!(BusAddress::NULL.raw(), 0);
        assert_eq!(BusAddress::NULL.to_string(), "0.0.0");
    }
}
