pub mod batch;
pub mod dispatch;
pub mod fee_math;
pub mod guard;
pub mod provide_liquidity;
pub mod remove_liquidity;
pub mod royalties;
pub mod swap;
pub mod transfer_shares;

pub use dispatch::{dispatch, CallContext, Deposit};
pub use fee_math::{buy_price, sell_price};
pub use swap::Funding;
