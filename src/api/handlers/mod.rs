pub mod audit;
pub mod checkout;
pub mod orders;
pub mod payouts;
pub mod root;
