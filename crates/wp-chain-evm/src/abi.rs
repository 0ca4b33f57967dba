//! Contract bindings for the wave portal and the hex plumbing JSON-RPC needs.

use alloy_primitives::{Address, B256, U256, hex};
use alloy_sol_types::{SolCall, SolEvent, sol};
use wp_api_types::AccountId;
use wp_chain_client::{ChainError, ChainResult, RawTimestamp, RawWaveRecord};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct Wave {
        address waver;
        string message;
        uint256 timestamp;
    }

    function wave(string message) external;
    function getTotalWaves() external view returns (uint256);
    function getAllWaves() external view returns (Wave[] memory);

    #[derive(Debug, PartialEq, Eq)]
    event NewWave(address indexed from, uint256 timestamp, string message);
}

pub fn encode_wave_call(message: &str) -> Vec<u8> {
    waveCall {
        message: message.to_owned(),
    }
    .abi_encode()
}

pub fn encode_total_waves_call() -> Vec<u8> {
    getTotalWavesCall {}.abi_encode()
}

pub fn encode_all_waves_call() -> Vec<u8> {
    getAllWavesCall {}.abi_encode()
}

pub fn decode_total_waves(data: &[u8]) -> ChainResult<u64> {
    let count = getTotalWavesCall::abi_decode_returns(data).map_err(abi_error)?;
    u64::try_from(count).map_err(|_| invalid("total wave count does not fit in u64"))
}

pub fn decode_all_waves(data: &[u8]) -> ChainResult<Vec<RawWaveRecord>> {
    let waves = getAllWavesCall::abi_decode_returns(data).map_err(abi_error)?;
    Ok(waves
        .into_iter()
        .map(|wave| record(wave.waver, wave.timestamp, wave.message))
        .collect())
}

/// Topic0 of `NewWave` logs, hex encoded for `eth_getLogs` filters.
pub fn new_wave_topic() -> String {
    hex::encode_prefixed(NewWave::SIGNATURE_HASH)
}

pub fn decode_new_wave_log(topics: &[String], data: &[u8]) -> ChainResult<RawWaveRecord> {
    let topics = topics
        .iter()
        .map(|topic| {
            topic
                .parse::<B256>()
                .map_err(|_| invalid("log topic is not a 32-byte word"))
        })
        .collect::<ChainResult<Vec<_>>>()?;
    let event = NewWave::decode_raw_log(topics, data).map_err(abi_error)?;
    Ok(record(event.from, event.timestamp, event.message))
}

pub fn encode_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode_prefixed(bytes)
}

pub fn decode_hex(input: &str) -> ChainResult<Vec<u8>> {
    hex::decode(input).map_err(|err| invalid(&format!("malformed hex string: {err}")))
}

/// JSON-RPC quantities are minimal hex without leading zeros.
pub fn encode_quantity(value: u64) -> String {
    format!("0x{value:x}")
}

pub fn parse_quantity(input: &str) -> ChainResult<u64> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    u64::from_str_radix(digits, 16).map_err(|_| invalid("malformed hex quantity"))
}

fn record(from: Address, timestamp: U256, message: String) -> RawWaveRecord {
    RawWaveRecord {
        from: AccountId(hex::encode_prefixed(from)),
        timestamp: RawTimestamp(timestamp.to_be_bytes::<32>()),
        message,
    }
}

fn abi_error(err: alloy_sol_types::Error) -> ChainError {
    ChainError::InvalidResponse(format!("ABI decode failed: {err}"))
}

fn invalid(message: &str) -> ChainError {
    ChainError::InvalidResponse(message.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(last_byte: u8) -> Address {
        let mut bytes = [0_u8; 20];
        bytes[19] = last_byte;
        Address::from(bytes)
    }

    #[test]
    fn wave_call_layout() {
        let data = encode_wave_call("hi");

        assert_eq!(&data[..4], waveCall::SELECTOR.as_slice());
        assert_eq!(U256::from_be_slice(&data[4..36]), U256::from(32));
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(2));
        assert_eq!(&data[68..70], b"hi");
        assert_eq!(data.len(), 4 + 96);
    }

    #[test]
    fn read_calls_are_bare_selectors() {
        assert_eq!(encode_total_waves_call(), getTotalWavesCall::SELECTOR.to_vec());
        assert_eq!(encode_all_waves_call(), getAllWavesCall::SELECTOR.to_vec());
    }

    #[test]
    fn decodes_get_all_waves_payload() {
        let waves = vec![
            Wave {
                waver: address(0x01),
                message: "hi".to_owned(),
                timestamp: U256::from(1000),
            },
            Wave {
                waver: address(0x02),
                message: String::new(),
                timestamp: U256::from(1001),
            },
        ];
        let data = getAllWavesCall::abi_encode_returns(&waves);

        let records = decode_all_waves(&data).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].from.0,
            "0x0000000000000000000000000000000000000001"
        );
        assert_eq!(records[0].timestamp.to_unix_seconds(), Some(1000));
        assert_eq!(records[0].message, "hi");
        assert_eq!(records[1].timestamp.to_unix_seconds(), Some(1001));
        assert_eq!(records[1].message, "");
    }

    #[test]
    fn truncated_payload_is_an_invalid_response() {
        let mut data = U256::from(32).to_be_bytes::<32>().to_vec();
        data.extend_from_slice(&U256::from(3).to_be_bytes::<32>());

        assert!(matches!(
            decode_all_waves(&data),
            Err(ChainError::InvalidResponse(_))
        ));
    }

    #[test]
    fn oversized_count_is_rejected() {
        let data = getTotalWavesCall::abi_encode_returns(&U256::MAX);

        assert!(matches!(
            decode_total_waves(&data),
            Err(ChainError::InvalidResponse(_))
        ));
        assert_eq!(
            decode_total_waves(&getTotalWavesCall::abi_encode_returns(&U256::from(5))).unwrap(),
            5
        );
    }

    #[test]
    fn decodes_new_wave_log() {
        let event = NewWave {
            from: address(0xab),
            timestamp: U256::from(1234),
            message: "hello".to_owned(),
        };
        let topics = vec![new_wave_topic(), encode_hex(event.from.into_word())];

        let record = decode_new_wave_log(&topics, &event.encode_data()).unwrap();

        assert_eq!(record.from.0, "0x00000000000000000000000000000000000000ab");
        assert_eq!(record.timestamp.to_unix_seconds(), Some(1234));
        assert_eq!(record.message, "hello");
    }

    #[test]
    fn log_with_foreign_topic_is_rejected() {
        let topics = vec![encode_hex(B256::ZERO), encode_hex(address(1).into_word())];

        assert!(decode_new_wave_log(&topics, &[]).is_err());
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(decode_hex("0x00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
        assert!(decode_hex("0xabc").is_err());
        assert!(decode_hex("0xzz").is_err());
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert_eq!(encode_quantity(300_000), "0x493e0");
    }
}
