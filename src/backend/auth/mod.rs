//! Authentication
//!
//! Bearer tokens are JWTs signed with `JWT_SECRET`. Issuing accounts is out
//! of scope for this server; tokens are minted by `create_token` (see the
//! `DEV_USER_ID` startup hook in the server binary).

/// JWT creation and verification
pub mod sessions;

pub use sessions::{create_token, get_user_id_from_token, verify_token, Claims};
