use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hex-encoded 20-byte account address, kept in lowercase `0x` form.
///
/// The raw credential is stored as received so that malformed values can be
/// rejected at the point of use instead of at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

/// An account acting as one oracle.
pub type Identity = Address;

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_ascii_lowercase())
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_well_formed(&self) -> bool {
        self.to_bytes().is_some()
    }

    /// Decodes the address, returning `None` unless it is `0x` followed by 40 hex digits.
    pub fn to_bytes(&self) -> Option<[u8; 20]> {
        let digits = self.0.strip_prefix("0x")?;
        if digits.len() != 40 {
            return None;
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).ok()?;
        Some(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three indexes the contract assigns an oracle when it registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexAssignment([u8; 3]);

impl IndexAssignment {
    pub fn new(first: u8, second: u8, third: u8) -> Self {
        Self([first, second, third])
    }

    pub fn contains(&self, index: u8) -> bool {
        self.0.contains(&index)
    }

    pub fn as_array(&self) -> [u8; 3] {
        self.0
    }
}

impl From<[u8; 3]> for IndexAssignment {
    fn from(indexes: [u8; 3]) -> Self {
        Self(indexes)
    }
}

impl fmt::Display for IndexAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.0[0], self.0[1], self.0[2])
    }
}

/// Flight status codes understood by the FlightSurety contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum StatusCode {
    Unknown = 0,
    OnTime = 10,
    LateAirline = 20,
    LateWeather = 30,
    LateTechnical = 40,
    LateOther = 50,
}

impl StatusCode {
    pub const ALL: [StatusCode; 6] = [
        StatusCode::Unknown,
        StatusCode::OnTime,
        StatusCode::LateAirline,
        StatusCode::LateWeather,
        StatusCode::LateTechnical,
        StatusCode::LateOther,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Unknown => "unknown",
            StatusCode::OnTime => "on-time",
            StatusCode::LateAirline => "late-airline",
            StatusCode::LateWeather => "late-weather",
            StatusCode::LateTechnical => "late-technical",
            StatusCode::LateOther => "late-other",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

impl FromStr for StatusCode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        StatusCode::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(raw) || status.code().to_string() == raw)
            .ok_or_else(|| format!("unknown flight status code: {raw}"))
    }
}

/// Where an oracle sits in its registration lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Unregistered,
    FeePaidPending,
    Registered,
    Failed,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegistrationStatus::Unregistered => "unregistered",
            RegistrationStatus::FeePaidPending => "fee-paid-pending",
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Failed => "failed",
        })
    }
}

/// Identifies one flight as the contract keys it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightKey {
    pub airline: Address,
    pub flight: String, // flight code, e.g. "ND1309"
    pub timestamp: u64,
}

impl FlightKey {
    pub fn is_well_formed(&self) -> bool {
        self.airline.is_well_formed() && !self.flight.trim().is_empty()
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.flight, self.timestamp, self.airline)
    }
}

/// An `OracleRequest` event observed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRequest {
    pub index: u8,
    pub flight: FlightKey,
    pub block_number: u64,
}

/// One oracle's answer to one status request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSubmission {
    pub identity: Identity,
    pub index: u8,
    pub flight: FlightKey,
    pub status: StatusCode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalizes_and_validates() {
        let address = Address::new("  0xF17F52151EbEF6C7334FAD080c5704D77216b732 ");
        assert_eq!(address.as_str(), "0xf17f52151ebef6c7334fad080c5704d77216b732");
        assert!(address.is_well_formed());

        assert!(!Address::new("").is_well_formed());
        assert!(!Address::new("0x1234").is_well_formed());
        assert!(!Address::new("f17f52151ebef6c7334fad080c5704d77216b732").is_well_formed());
        assert!(!Address::new("0xzz7f52151ebef6c7334fad080c5704d77216b732").is_well_formed());
    }

    #[test]
    fn test_address_bytes_round_trip() {
        let mut bytes = [0u8; 20];
        bytes[19] = 0xab;
        let address = Address::from_bytes(bytes);
        assert_eq!(address.as_str(), "0x00000000000000000000000000000000000000ab");
        assert_eq!(address.to_bytes(), Some(bytes));
    }

    #[test]
    fn test_index_assignment_contains_any_slot() {
        let indexes = IndexAssignment::new(3, 7, 9);
        assert!(indexes.contains(3));
        assert!(indexes.contains(7));
        assert!(indexes.contains(9));
        assert!(!indexes.contains(1));
        assert_eq!(indexes.to_string(), "[3, 7, 9]");
    }

    #[test]
    fn test_status_code_parsing() {
        assert_eq!("late-airline".parse::<StatusCode>(), Ok(StatusCode::LateAirline));
        assert_eq!("LATE-WEATHER".parse::<StatusCode>(), Ok(StatusCode::LateWeather));
        assert_eq!("10".parse::<StatusCode>(), Ok(StatusCode::OnTime));
        assert!("late".parse::<StatusCode>().is_err());
        assert_eq!(StatusCode::LateAirline.code(), 20);
    }

    #[test]
    fn test_flight_key_well_formed() {
        let flight = FlightKey {
            airline: Address::new("0xf17f52151ebef6c7334fad080c5704d77216b732"),
            flight: "ND1309".to_string(),
            timestamp: 1_700_000_000,
        };
        assert!(flight.is_well_formed());

        let blank = FlightKey {
            flight: "  ".to_string(),
            ..flight.clone()
        };
        assert!(!blank.is_well_formed());
    }
}
