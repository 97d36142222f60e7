//! Persisted key names

pub const ACCESS_TOKEN: &str = "auth_token";
/// Expiry as epoch milliseconds, stored as a decimal string
pub const TOKEN_EXPIRY: &str = "auth_token_expiry";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const USER: &str = "user";
pub const USER_DISPLAY_NAME: &str = "user_display_name";
pub const TOKEN_SIGNATURE: &str = "auth_token_signature";
pub const TOKEN_BLACKLIST: &str = "token_blacklist";
pub const OAUTH_STATE: &str = "oauth_state";
pub const PKCE_VERIFIER: &str = "pkce_code_verifier";
pub const RECOVERY_SNAPSHOT: &str = "crash_recovery_snapshot";
pub const SESSION_ID: &str = "session_id";

/// Keys that make up a signed-in session
pub const SESSION_KEYS: &[&str] = &[
    ACCESS_TOKEN,
    TOKEN_EXPIRY,
    REFRESH_TOKEN,
    TOKEN_SIGNATURE,
    USER,
    USER_DISPLAY_NAME,
];

/// Keys removed on logout, including leftovers from interrupted OAuth flows
pub const LOGOUT_KEYS: &[&str] = &[
    ACCESS_TOKEN,
    TOKEN_EXPIRY,
    REFRESH_TOKEN,
    TOKEN_SIGNATURE,
    USER,
    USER_DISPLAY_NAME,
    OAUTH_STATE,
    PKCE_VERIFIER,
];
