//! Value Object Module

pub mod access_token;
pub mod device_fingerprint;
pub mod email;
pub mod ip_address;
pub mod refresh_token;
pub mod session_id;
pub mod token_type;
pub mod user_agent;
pub mod user_id;
pub mod user_name;
pub mod user_password;
pub mod user_role;
pub mod user_status;
