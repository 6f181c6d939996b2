mod authenticator;
mod session;
mod store;

pub use authenticator::{Authenticator, LoginOutcome, TokenResponse};
pub use session::{Session, SessionStatus, decode_claims};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
