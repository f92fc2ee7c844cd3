//! Transaction mortality windows.
//!
//! An [`Era`] bounds the block range a transaction stays valid for. A mortal
//! era encodes a power-of-two `period` and the quantized `phase` at which the
//! window opened, packed into two bytes the same way the chain encodes them.
//! On the wire the era travels as the hex string of its encoding, e.g. `"0x00"`
//! for an immortal transaction or `"0xa502"` for a 64-block window.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display, Formatter};

/// Validity window of a transaction, anchored to a block height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Era {
    /// Valid forever. Offers no replay protection beyond the nonce.
    Immortal,
    /// Valid for `period` blocks starting at the block whose height has
    /// remainder `phase` modulo `period`.
    Mortal {
        /// Window length in blocks, a power of two between 4 and 65536.
        period: u64,
        /// Quantized starting offset within the window.
        phase: u64,
    },
}

/// Error produced when era bytes or hex cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EraDecodeError {
    #[error("era encoding is empty")]
    Empty,
    #[error("mortal era requires two bytes")]
    Truncated,
    #[error("era phase {phase} is outside period {period}")]
    PhaseOutOfRange { period: u64, phase: u64 },
    #[error("era hex is malformed")]
    MalformedHex,
}

impl Era {
    /// Create a mortal era for a transaction anchored at block `current`,
    /// valid for roughly `period` blocks.
    ///
    /// The period is rounded up to a power of two and clamped to the range the
    /// two-byte encoding can express. The phase is quantized exactly as the
    /// chain quantizes it, so the encoding round-trips.
    pub fn mortal(period: u64, current: u64) -> Self {
        let period = period.next_power_of_two().clamp(4, 1 << 16);
        let phase = current % period;
        let quantize_factor = (period >> 12).max(1);
        let quantized_phase = phase / quantize_factor * quantize_factor;
        Era::Mortal {
            period,
            phase: quantized_phase,
        }
    }

    /// The immortal era.
    pub fn immortal() -> Self {
        Era::Immortal
    }

    /// SCALE encoding: one zero byte for immortal, two packed bytes for mortal.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Era::Immortal => vec![0],
            Era::Mortal { period, phase } => {
                let quantize_factor = (period >> 12).max(1);
                let low = u16::try_from(period.trailing_zeros().saturating_sub(1).clamp(1, 15))
                    .expect("clamped to 15");
                let high = u16::try_from((phase / quantize_factor) & 0x0fff).expect("12 bits");
                let encoded = low | (high << 4);
                encoded.to_le_bytes().to_vec()
            }
        }
    }

    /// Decode an era from its SCALE bytes, requiring the exact byte count.
    pub fn decode(bytes: &[u8]) -> Result<Self, EraDecodeError> {
        match bytes {
            [] => Err(EraDecodeError::Empty),
            [0] => Ok(Era::Immortal),
            [_] => Err(EraDecodeError::Truncated),
            [b0, b1] => {
                let encoded = u16::from_le_bytes([*b0, *b1]);
                let period = 2u64 << (encoded & 0b1111);
                let quantize_factor = (period >> 12).max(1);
                let phase = u64::from(encoded >> 4) * quantize_factor;
                if period >= 4 && phase < period {
                    Ok(Era::Mortal { period, phase })
                } else {
                    Err(EraDecodeError::PhaseOutOfRange { period, phase })
                }
            }
            _ => Err(EraDecodeError::MalformedHex),
        }
    }

    fn from_hex(s: &str) -> Result<Self, EraDecodeError> {
        let raw = s.strip_prefix("0x").ok_or(EraDecodeError::MalformedHex)?;
        let bytes = hex::decode(raw).map_err(|_| EraDecodeError::MalformedHex)?;
        Era::decode(&bytes)
    }
}

impl Display for Era {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.encode()))
    }
}

impl Serialize for Era {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Era {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Era::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immortal_is_one_zero_byte() {
        assert_eq!(Era::Immortal.encode(), vec![0]);
        assert_eq!(Era::decode(&[0]).unwrap(), Era::Immortal);
    }

    #[test]
    fn mortal_matches_chain_encoding() {
        // period 64, anchored at block 42: 5 | (42 << 4) = 0x02a5 little-endian.
        let era = Era::mortal(64, 42);
        assert_eq!(
            era,
            Era::Mortal {
                period: 64,
                phase: 42
            }
        );
        assert_eq!(era.encode(), vec![0xa5, 0x02]);
    }

    #[test]
    fn rounds_period_up_to_power_of_two() {
        let era = Era::mortal(100, 1000);
        assert_eq!(
            era,
            Era::Mortal {
                period: 128,
                phase: 1000 % 128
            }
        );
    }

    #[test]
    fn quantizes_large_periods() {
        let era = Era::mortal(32768, 20_000);
        match era {
            Era::Mortal { period, phase } => {
                assert_eq!(period, 32768);
                let quantize_factor = period >> 12;
                assert_eq!(phase % quantize_factor, 0);
            }
            Era::Immortal => panic!("expected mortal era"),
        }
    }

    #[test]
    fn encoding_round_trips() {
        for (period, current) in [(4u64, 0u64), (64, 42), (64, 1_000_000), (32768, 987_654)] {
            let era = Era::mortal(period, current);
            assert_eq!(Era::decode(&era.encode()).unwrap(), era);
        }
    }

    #[test]
    fn hex_serde_round_trips() {
        let era = Era::mortal(64, 42);
        let json = serde_json::to_string(&era).unwrap();
        assert_eq!(json, "\"0xa502\"");
        let back: Era = serde_json::from_str(&json).unwrap();
        assert_eq!(back, era);

        let immortal: Era = serde_json::from_str("\"0x00\"").unwrap();
        assert_eq!(immortal, Era::Immortal);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(serde_json::from_str::<Era>("\"a502\"").is_err());
        assert!(serde_json::from_str::<Era>("\"0xzz\"").is_err());
        assert!(serde_json::from_str::<Era>("\"0x\"").is_err());
    }
}
