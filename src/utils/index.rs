/// Satoshis per XEC.
pub const SATS_PER_XEC: u64 = 100;

/// Render a satoshi amount as XEC with its two decimal places.
pub fn format_xec_amount(sats: u64) -> String {
	format!("{}.{:02} XEC", sats / SATS_PER_XEC, sats % SATS_PER_XEC)
}
