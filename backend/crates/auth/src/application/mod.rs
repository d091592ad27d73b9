//! Application Layer
//!
//! Collaborators (token issuer, throttle ledger, credential validator,
//! session lifecycle manager, transaction coordinator), the use cases built
//! from them, and the [`AuthService`] facade.

pub mod change_password;
pub mod config;
pub mod credentials;
pub mod list_sessions;
pub mod login;
pub mod logout;
pub mod refresh_token;
pub mod service;
pub mod session_lifecycle;
pub mod throttle;
pub mod token_issuer;
pub mod transaction;
pub mod user_profile;
pub mod validate_token;

use crate::domain::repository::AuthStores;
use transaction::TransactionBackend;

// Re-exports
pub use change_password::{ChangePasswordInput, ChangePasswordUseCase, PasswordChanged};
pub use config::AuthConfig;
pub use credentials::CredentialValidator;
pub use list_sessions::ListSessionsUseCase;
pub use login::{LoginInput, LoginOutput, LoginUseCase, UserInfo};
pub use logout::{LogoutUseCase, RevokeSessionsUseCase};
pub use refresh_token::{RefreshTokenInput, RefreshTokenOutput, RefreshTokenUseCase};
pub use service::AuthService;
pub use session_lifecycle::{CreatedSession, DeviceInfo, SessionLifecycleManager, TokenPair};
pub use throttle::ThrottleLedger;
pub use token_issuer::{IssuedToken, TokenIssuer, TokenSubject};
pub use transaction::{TransactionCoordinator, TxOptions};
pub use user_profile::{UserProfile, UserProfileUseCase};
pub use validate_token::{Principal, ValidateTokenUseCase};

/// Storage usable both directly and through transactions
pub trait AuthBackend: TransactionBackend + AuthStores + 'static {}

impl<T> AuthBackend for T where T: TransactionBackend + AuthStores + 'static {}
