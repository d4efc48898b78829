//! Minimal Solidity ABI codec for the FlightSuretyApp calls and events the relay uses.

use crate::ledger::{LedgerError, Wei};
use crate::models::{Address, FlightKey, IndexAssignment, ResponseSubmission};

const WORD: usize = 32;

/// `REGISTRATION_FEE()`
pub const REGISTRATION_FEE: [u8; 4] = [0x64, 0xb4, 0xf7, 0x51];
/// `registerOracle()`
pub const REGISTER_ORACLE: [u8; 4] = [0x33, 0x9d, 0x25, 0x90];
/// `getMyIndexes()`
pub const GET_MY_INDEXES: [u8; 4] = [0x5f, 0x1c, 0xc0, 0xe6];
/// `submitOracleResponse(uint8,address,string,uint256,uint8)`
pub const SUBMIT_ORACLE_RESPONSE: [u8; 4] = [0xc1, 0x0f, 0x27, 0x00];
/// keccak256 of `OracleRequest(uint8,address,string,uint256)`
pub const ORACLE_REQUEST_TOPIC: &str =
    "0x3ed01f2c3fc24c6b329d931e35b03e390d23497d22b3f90e15b600343e93df11";

pub fn encode_call(selector: [u8; 4]) -> String {
    format!("0x{}", hex::encode(selector))
}

pub fn encode_submit_oracle_response(
    submission: &ResponseSubmission,
) -> Result<String, LedgerError> {
    let airline = submission.flight.airline.to_bytes().ok_or_else(|| {
        LedgerError::Malformed(format!(
            "airline {} is not a 20-byte address",
            submission.flight.airline
        ))
    })?;
    let flight = submission.flight.flight.as_bytes();

    let mut data = Vec::new();
    data.extend_from_slice(&SUBMIT_ORACLE_RESPONSE);
    data.extend_from_slice(&uint_word(u128::from(submission.index)));
    data.extend_from_slice(&address_word(airline));
    // The string tail starts right after the five head words.
    data.extend_from_slice(&uint_word((5 * WORD) as u128));
    data.extend_from_slice(&uint_word(u128::from(submission.flight.timestamp)));
    data.extend_from_slice(&uint_word(u128::from(submission.status.code())));
    data.extend_from_slice(&uint_word(flight.len() as u128));
    data.extend_from_slice(flight);
    let padding = (WORD - flight.len() % WORD) % WORD;
    data.resize(data.len() + padding, 0);

    Ok(format!("0x{}", hex::encode(data)))
}

pub fn decode_wei(data: &str) -> Result<Wei, LedgerError> {
    let data = decode_hex(data)?;
    read_uint(word_at(&data, 0)?, 16)
}

/// Decodes the static `uint8[3]` returned by `getMyIndexes()`.
pub fn decode_index_triple(data: &str) -> Result<IndexAssignment, LedgerError> {
    let data = decode_hex(data)?;
    let mut indexes = [0u8; 3];
    for (slot, index) in indexes.iter_mut().enumerate() {
        *index = read_uint(word_at(&data, slot * WORD)?, 1)? as u8;
    }
    Ok(IndexAssignment::from(indexes))
}

/// Decodes the non-indexed `(index, airline, flight, timestamp)` payload of `OracleRequest`.
pub fn decode_oracle_request(data: &str) -> Result<(u8, FlightKey), LedgerError> {
    let data = decode_hex(data)?;

    let index = read_uint(word_at(&data, 0)?, 1)? as u8;
    let airline = read_address(word_at(&data, WORD)?)?;
    let offset = read_uint(word_at(&data, 2 * WORD)?, 8)? as usize;
    let timestamp = read_uint(word_at(&data, 3 * WORD)?, 8)? as u64;

    let length = read_uint(word_at(&data, offset)?, 8)? as usize;
    let start = offset + WORD;
    let bytes = start
        .checked_add(length)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| LedgerError::Malformed("flight string runs past the payload".to_string()))?;
    let flight = String::from_utf8(bytes.to_vec())
        .map_err(|err| LedgerError::Malformed(format!("flight code is not UTF-8: {err}")))?;

    Ok((
        index,
        FlightKey {
            airline,
            flight,
            timestamp,
        },
    ))
}

pub fn parse_quantity(raw: &str) -> Result<u64, LedgerError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16)
        .map_err(|err| LedgerError::Malformed(format!("invalid quantity `{raw}`: {err}")))
}

pub fn to_quantity(value: u128) -> String {
    format!("{value:#x}")
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: [u8; 20]) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(&address);
    word
}

fn decode_hex(data: &str) -> Result<Vec<u8>, LedgerError> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(digits).map_err(|err| LedgerError::Malformed(format!("invalid hex payload: {err}")))
}

fn word_at(data: &[u8], position: usize) -> Result<&[u8], LedgerError> {
    position
        .checked_add(WORD)
        .and_then(|end| data.get(position..end))
        .ok_or_else(|| LedgerError::Malformed(format!("payload has no word at byte {position}")))
}

/// Reads a big-endian word whose value must fit in its last `width` bytes (at most 16).
fn read_uint(word: &[u8], width: usize) -> Result<u128, LedgerError> {
    let (high, low) = word.split_at(WORD - width);
    if high.iter().any(|byte| *byte != 0) {
        return Err(LedgerError::Malformed(format!(
            "value does not fit in {width} bytes"
        )));
    }
    Ok(low
        .iter()
        .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte)))
}

fn read_address(word: &[u8]) -> Result<Address, LedgerError> {
    let (padding, raw) = word.split_at(WORD - 20);
    if padding.iter().any(|byte| *byte != 0) {
        return Err(LedgerError::Malformed("address word has dirty padding".to_string()));
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(raw);
    Ok(Address::from_bytes(bytes))
}
