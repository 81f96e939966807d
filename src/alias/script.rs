//! Decoding of alias registration OP_RETURN outputs.

use super::address::AliasAddress;

pub const OP_0: u8 = 0x00;
pub const OP_RETURN: u8 = 0x6a;
/// Largest opcode that pushes its own value as the data length.
const OP_MAX_DIRECT_PUSH: u8 = 0x4b;

/// Lokad-style protocol identifier, `.xec`.
pub const ALIAS_PROTOCOL_PREFIX: &[u8; 4] = b".xec";

#[derive(Debug, PartialEq, Eq)]
enum Push<'a> {
	Op0,
	Data(&'a [u8]),
}

/// Split the body of an OP_RETURN script into pushes.
///
/// Returns `None` on any opcode other than `OP_0` and direct pushes, and on truncated
/// pushes. OP_PUSHDATA1/2/4 are rejected outright: registrations are always minimally
/// encoded.
fn tokenize(mut script: &[u8]) -> Option<Vec<Push<'_>>> {
	let mut pushes = Vec::new();
	while let Some((opcode, rest)) = script.split_first() {
		match *opcode {
			OP_0 => {
				pushes.push(Push::Op0);
				script = rest;
			}
			len @ 0x01..=OP_MAX_DIRECT_PUSH => {
				let len = len as usize;
				if rest.len() < len {
					return None;
				}
				pushes.push(Push::Data(&rest[..len]));
				script = &rest[len..];
			}
			_ => return None,
		}
	}
	Some(pushes)
}

/// Decoded but not yet validated registration payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPayload {
	/// Raw alias bytes; charset and length are checked by the extractor.
	pub alias: Vec<u8>,
	pub address: AliasAddress,
}

/// Parse an output script as an alias registration.
///
/// The expected layout is
/// `OP_RETURN <".xec"> OP_0 <alias> <version || hash160>`, nothing more.
pub fn parse_registration(script: &[u8]) -> Option<RegistrationPayload> {
	let (first, body) = script.split_first()?;
	if *first != OP_RETURN {
		return None;
	}

	let pushes = tokenize(body)?;
	match pushes.as_slice() {
		[
			Push::Data(prefix),
			Push::Op0,
			Push::Data(alias),
			Push::Data(address_payload),
		] if *prefix == ALIAS_PROTOCOL_PREFIX.as_slice() => {
			let address = AliasAddress::from_payload(address_payload)?;
			Some(RegistrationPayload {
				alias: alias.to_vec(),
				address,
			})
		}
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::alias::AddressKind;

	fn parse_hex(script: &str) -> Option<RegistrationPayload> {
		parse_registration(&hex::decode(script).unwrap())
	}

	const VALID: &str =
		"6a042e786563000f6669667465656e636861726163313515006ffbe7c7d7bd01295eb1e371de9550339bdcf9fd";

	#[test]
	fn parses_minimal_registration() {
		let payload = parse_hex(VALID).unwrap();
		assert_eq!(payload.alias, b"fifteencharac15".to_vec());
		assert_eq!(payload.address.kind, AddressKind::P2pkh);
		assert_eq!(
			payload.address.hash_hex(),
			"6ffbe7c7d7bd01295eb1e371de9550339bdcf9fd"
		);
	}

	#[test]
	fn rejects_pushdata1_anywhere() {
		// version pushed with OP_PUSHDATA1
		assert!(parse_hex(
			"6a042e7865634c000f6669667465656e636861726163313515006ffbe7c7d7bd01295eb1e371de9550339bdcf9fd"
		)
		.is_none());
		// alias pushed with OP_PUSHDATA1
		assert!(parse_hex(
			"6a042e786563004c0f6669667465656e636861726163313515006ffbe7c7d7bd01295eb1e371de9550339bdcf9fd"
		)
		.is_none());
		// address pushed with OP_PUSHDATA1
		assert!(parse_hex(
			"6a042e786563000f6669667465656e63686172616331354c15006ffbe7c7d7bd01295eb1e371de9550339bdcf9fd"
		)
		.is_none());
	}

	#[test]
	fn rejects_extra_or_missing_pushes() {
		// trailing empty push
		assert!(parse_hex(&format!("{}00", VALID)).is_none());
		// no version push
		assert!(parse_hex(
			"6a042e7865630f6669667465656e636861726163313515006ffbe7c7d7bd01295eb1e371de9550339bdcf9fd"
		)
		.is_none());
		// truncated address push
		assert!(parse_hex(&VALID[..VALID.len() - 2]).is_none());
	}

	#[test]
	fn rejects_other_protocols_and_scripts() {
		// cashtab message protocol
		assert!(parse_hex("6a040074616204746573742e786563").is_none());
		// plain p2sh output
		assert!(parse_hex("a914d37c4c809fe9840e7bfa77b86bd47163f6fb6c6087").is_none());
		assert!(parse_registration(&[]).is_none());
	}

	#[test]
	fn rejects_unknown_address_version() {
		assert!(parse_hex(
			"6a042e7865630003333333150176458db0ed96fe9863fc1ccec9fa2cfab884b0f6"
		)
		.is_none());
		assert!(parse_hex(
			"6a042e7865630003333333150076458db0ed96fe9863fc1ccec9fa2cfab884b0f6"
		)
		.is_some());
	}
}
