//! Addresses that aliases resolve to, and their cashaddr rendering.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const CASHADDR_CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const HASH160_LEN: usize = 20;

/// Script type of an aliased address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
	P2pkh,
	P2sh,
}

impl AddressKind {
	/// Decode the cashaddr version byte used in registration payloads.
	///
	/// Only 160-bit hashes are registrable, so the size bits must be zero.
	pub fn from_version_byte(byte: u8) -> Option<Self> {
		match byte {
			0x00 => Some(AddressKind::P2pkh),
			0x08 => Some(AddressKind::P2sh),
			_ => None,
		}
	}

	pub fn version_byte(&self) -> u8 {
		match self {
			AddressKind::P2pkh => 0x00,
			AddressKind::P2sh => 0x08,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AddressKind::P2pkh => "p2pkh",
			AddressKind::P2sh => "p2sh",
		}
	}
}

/// A p2pkh or p2sh destination identified by its 20-byte hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasAddress {
	pub kind: AddressKind,
	#[serde(serialize_with = "serialize_hash", deserialize_with = "deserialize_hash")]
	pub hash: [u8; HASH160_LEN],
}

impl AliasAddress {
	pub fn new(kind: AddressKind, hash: [u8; HASH160_LEN]) -> Self {
		Self { kind, hash }
	}

	/// Parse the 21-byte `version || hash160` payload of a registration.
	pub fn from_payload(payload: &[u8]) -> Option<Self> {
		let (version, hash) = payload.split_first()?;
		let kind = AddressKind::from_version_byte(*version)?;
		let hash: [u8; HASH160_LEN] = hash.try_into().ok()?;
		Some(Self { kind, hash })
	}

	pub fn hash_hex(&self) -> String {
		hex::encode(self.hash)
	}

	/// The standard locking script paying this address.
	pub fn output_script(&self) -> Vec<u8> {
		let mut script = Vec::with_capacity(25);
		match self.kind {
			AddressKind::P2pkh => {
				script.extend_from_slice(&[0x76, 0xa9, 0x14]);
				script.extend_from_slice(&self.hash);
				script.extend_from_slice(&[0x88, 0xac]);
			}
			AddressKind::P2sh => {
				script.extend_from_slice(&[0xa9, 0x14]);
				script.extend_from_slice(&self.hash);
				script.push(0x87);
			}
		}
		script
	}

	/// Render as a cashaddr string, e.g. `ecash:qp...`.
	pub fn to_cashaddr(&self, prefix: &str) -> String {
		let mut payload = Vec::with_capacity(HASH160_LEN + 1);
		payload.push(self.kind.version_byte());
		payload.extend_from_slice(&self.hash);
		let data = convert_bits_8_to_5(&payload);

		let mut checksum_input: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
		checksum_input.push(0);
		checksum_input.extend_from_slice(&data);
		checksum_input.extend_from_slice(&[0u8; 8]);
		let checksum = polymod(&checksum_input);

		let mut encoded = String::with_capacity(prefix.len() + 1 + data.len() + 8);
		encoded.push_str(prefix);
		encoded.push(':');
		for value in &data {
			encoded.push(CASHADDR_CHARSET[*value as usize] as char);
		}
		for i in 0..8 {
			let value = (checksum >> (5 * (7 - i))) & 0x1f;
			encoded.push(CASHADDR_CHARSET[value as usize] as char);
		}
		encoded
	}
}

fn convert_bits_8_to_5(data: &[u8]) -> Vec<u8> {
	let mut acc: u32 = 0;
	let mut bits: u32 = 0;
	let mut out = Vec::with_capacity((data.len() * 8).div_ceil(5));
	for byte in data {
		acc = (acc << 8) | u32::from(*byte);
		bits += 8;
		while bits >= 5 {
			bits -= 5;
			out.push(((acc >> bits) & 0x1f) as u8);
		}
	}
	if bits > 0 {
		out.push(((acc << (5 - bits)) & 0x1f) as u8);
	}
	out
}

fn polymod(values: &[u8]) -> u64 {
	const GENERATORS: [u64; 5] = [
		0x98f2bc8e61,
		0x79b76d99e2,
		0xf33e5fb3c4,
		0xae2eabe2a8,
		0x1e4f43e470,
	];
	let mut c: u64 = 1;
	for value in values {
		let c0 = c >> 35;
		c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(*value);
		for (bit, generator) in GENERATORS.iter().enumerate() {
			if (c0 >> bit) & 1 == 1 {
				c ^= generator;
			}
		}
	}
	c ^ 1
}

fn serialize_hash<S: Serializer>(hash: &[u8; HASH160_LEN], serializer: S) -> Result<S::Ok, S::Error> {
	serializer.serialize_str(&hex::encode(hash))
}

fn deserialize_hash<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; HASH160_LEN], D::Error> {
	let text = String::deserialize(deserializer)?;
	let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
	bytes
		.try_into()
		.map_err(|_| serde::de::Error::custom("address hash must be 20 bytes"))
}
