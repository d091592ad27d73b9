pub mod login_attempt;
pub mod session;
pub mod token_claims;
pub mod user;
