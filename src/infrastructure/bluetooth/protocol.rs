//! Credential Peripheral Protocol
//!
//! GATT addressing and payload construction for the keyboard peripheral
//! that receives the credential.

use crate::domain::models::SubmissionReceipt;
use crate::domain::settings::PayloadSource;
use base64::Engine;
use uuid::Uuid;

use super::BleError;

/// Service exposed by the peripheral (16-bit, Device Information range)
pub const SERVICE_UUID: &str = "180A";

/// Characteristic the credential is written to
pub const CREDENTIAL_CHAR_UUID: &str = "2A57";

/// Bluetooth Base UUID: 00000000-0000-1000-8000-00805F9B34FB
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Parse a 16-bit, 32-bit or full 128-bit UUID string.
///
/// Short forms are expanded on the Bluetooth Base UUID.
pub fn parse_uuid(uuid_str: &str) -> Result<Uuid, BleError> {
    let trimmed = uuid_str.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    match hex.len() {
        4 | 8 => {
            let short = u32::from_str_radix(hex, 16)
                .map_err(|_| BleError::InvalidUuid(uuid_str.to_string()))?;
            Ok(Uuid::from_u128(BASE_UUID | (u128::from(short) << 96)))
        }
        _ => Uuid::parse_str(hex).map_err(|_| BleError::InvalidUuid(uuid_str.to_string())),
    }
}

/// Advertised-name match used to pick the peripheral
pub fn name_matches(name: &str, fragment: &str) -> bool {
    !fragment.is_empty() && name.contains(fragment)
}

/// Bytes to write for a webhook response
pub fn credential_payload(
    source: &PayloadSource,
    receipt: &SubmissionReceipt,
) -> Result<Vec<u8>, BleError> {
    match source {
        PayloadSource::ResponsePassword => receipt
            .password
            .as_deref()
            .filter(|password| !password.is_empty())
            .map(|password| password.as_bytes().to_vec())
            .ok_or(BleError::MissingCredential),
        PayloadSource::Fixed { base64 } => base64::engine::general_purpose::STANDARD
            .decode(base64.trim())
            .map_err(|e| BleError::InvalidPayload(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_uuids() {
        assert_eq!(
            parse_uuid(SERVICE_UUID).unwrap().to_string(),
            "0000180a-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            parse_uuid(CREDENTIAL_CHAR_UUID).unwrap().to_string(),
            "00002a57-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(parse_uuid("0x180a").unwrap(), parse_uuid("180A").unwrap());
    }

    #[test]
    fn test_parse_full_uuid() {
        let uuid = parse_uuid("4f63756c-7573-2054-6872-65656d6f7465").unwrap();
        assert_eq!(uuid.as_u128() >> 96, 0x4f63756c);
        assert!(parse_uuid("not-a-uuid").is_err());
        assert!(parse_uuid("XYZW").is_err());
    }

    #[test]
    fn test_name_matches() {
        assert!(name_matches("ESP32 Keyboard", "ESP32"));
        assert!(!name_matches("Headphones", "ESP32"));
        assert!(!name_matches("anything", ""));
    }

    #[test]
    fn test_password_payload() {
        let receipt = SubmissionReceipt {
            password: Some("s3cret".to_string()),
        };
        assert_eq!(
            credential_payload(&PayloadSource::ResponsePassword, &receipt).unwrap(),
            b"s3cret"
        );

        let empty = SubmissionReceipt::default();
        assert!(matches!(
            credential_payload(&PayloadSource::ResponsePassword, &empty),
            Err(BleError::MissingCredential)
        ));
    }

    #[test]
    fn test_fixed_payload_is_decoded() {
        let source = PayloadSource::Fixed {
            base64: "aGVsbG8=".to_string(),
        };
        assert_eq!(
            credential_payload(&source, &SubmissionReceipt::default()).unwrap(),
            b"hello"
        );

        let bad = PayloadSource::Fixed {
            base64: "***".to_string(),
        };
        assert!(matches!(
            credential_payload(&bad, &SubmissionReceipt::default()),
            Err(BleError::InvalidPayload(_))
        ));
    }
}
