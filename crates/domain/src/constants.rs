//! Application constants
//!
//! Provider endpoints and defaults shared by configuration and clients.

// Fitbit endpoints
pub const FITBIT_AUTHORIZE_URL: &str = "https://www.fitbit.com/oauth2/authorize";
pub const FITBIT_API_BASE_URL: &str = "https://api.fitbit.com";
pub const FITBIT_DEFAULT_SCOPE: &str = "nutrition";

// Implicit grant lifetime hint sent as `expires_in` (one day, in seconds)
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 86_400;

// Subtracted from `expires_in` so a token never expires mid-request
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 30;

// Completion service
pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_COMPLETION_MAX_TOKENS: u32 = 300;
pub const DEFAULT_COMPLETION_TEMPERATURE: f32 = 0.2;

// HTTP
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Keychain service name used by the persistent session store
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "MealScribe.fitbit";
