//! Instrument identification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exchange segment an instrument trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Segment {
    /// NSE equity
    #[default]
    NseEq,
    /// BSE equity
    BseEq,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::NseEq => write!(f, "NSE_EQ"),
            Segment::BseEq => write!(f, "BSE_EQ"),
        }
    }
}

/// A tradeable security, keyed by ISIN.
///
/// All per-instrument state (aggregator, pipeline, position) is keyed by
/// this type's ISIN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    /// ISIN, e.g. `INE121J01017`
    pub isin: String,
    /// Exchange segment
    pub segment: Segment,
}

impl Instrument {
    /// NSE equity instrument for the given ISIN.
    pub fn nse_eq(isin: impl Into<String>) -> Self {
        Self {
            isin: isin.into(),
            segment: Segment::NseEq,
        }
    }

    /// Brokerage instrument token, e.g. `NSE_EQ|INE121J01017`.
    pub fn token(&self) -> String {
        format!("{}|{}", self.segment, self.isin)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.segment, self.isin)
    }
}

impl FromStr for Instrument {
    type Err = String;

    /// Parse `NSE_EQ|INE121J01017` or a bare ISIN (defaults to NSE equity).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('|') {
            Some(("NSE_EQ", isin)) => Ok(Self {
                isin: isin.to_string(),
                segment: Segment::NseEq,
            }),
            Some(("BSE_EQ", isin)) => Ok(Self {
                isin: isin.to_string(),
                segment: Segment::BseEq,
            }),
            Some((segment, _)) => Err(format!("unknown segment: {segment}")),
            None if !s.is_empty() => Ok(Self::nse_eq(s)),
            None => Err("empty instrument".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token() {
        let instrument = Instrument::nse_eq("INE121J01017");
        assert_eq!(instrument.token(), "NSE_EQ|INE121J01017");
    }

    #[test]
    fn test_parse() {
        let parsed: Instrument = "NSE_EQ|INE121J01017".parse().unwrap();
        assert_eq!(parsed, Instrument::nse_eq("INE121J01017"));

        let bare: Instrument = "INE121J01017".parse().unwrap();
        assert_eq!(bare.segment, Segment::NseEq);

        assert!("MCX_FO|X".parse::<Instrument>().is_err());
        assert!("".parse::<Instrument>().is_err());
    }
}
