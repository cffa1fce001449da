/// Denominator for per-mille fee math (LP fee and royalty fee).
pub const FEE_DENOMINATOR: u128 = 1_000;

/// Default LP fee: 0.5 % (fee multiplier 995)
pub const LP_FEE_DEFAULT: u16 = 5;

/// Royalty fee ceiling: 100 % of the pre-royalty price.
pub const MAX_ROYALTY_FEE: u16 = 1_000;

/// Instruction selector namespace: sha256("lotswap:{name}")[..4]
pub const SELECTOR_NAMESPACE: &str = "lotswap";
pub const SELECTOR_LEN: usize = 4;

/// Upper bound on an encoded instruction body. Keeps a hostile length prefix
/// from turning into a huge allocation during decode.
pub const MAX_PAYLOAD_LEN: u64 = 1 << 20;
