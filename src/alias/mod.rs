//! Alias registration protocol: decoding claims and adjudicating between them.

/// Aliased addresses and cashaddr encoding
pub mod address;
/// Candidate extraction from raw transactions
pub mod extractor;
/// Registration price schedule
pub mod prices;
/// Conflict resolution over the candidate set
pub mod resolver;
/// Registration OP_RETURN decoding
pub mod script;
/// Alias records and lookup results
pub mod types;

pub use address::{AddressKind, AliasAddress};
pub use extractor::CandidateExtractor;
pub use prices::{AliasPriceTable, PriceEpoch, PriceLookupError, PriceTableError};
pub use resolver::{Resolution, resolve};
pub use types::*;
