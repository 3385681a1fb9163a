pub mod audit;
pub mod bank_detail;
pub mod money;
pub mod order;
pub mod payout;
pub mod referral;
pub mod store;

pub use audit::*;
pub use bank_detail::*;
pub use money::*;
pub use order::*;
pub use payout::*;
pub use referral::*;
pub use store::*;
