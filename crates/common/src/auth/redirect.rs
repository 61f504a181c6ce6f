//! Parsing of the provider's redirect back into the app
//!
//! The implicit flow returns its result in the URL fragment
//! (`#access_token=…&user_id=…&scope=…&expires_in=…&state=…`); the code flow
//! returns `code` and `state` in the query. Both are form-urlencoded.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use thiserror::Error;
use url::{form_urlencoded, Url};

use super::client::ProviderClientError;
use super::store::StoreError;

/// Errors raised while turning a redirect into a session
#[derive(Debug, Error)]
pub enum TokenExtractionError {
    #[error("Redirect URL carries no fragment")]
    MissingFragment,

    #[error("Redirect is missing required parameter `{0}`")]
    MissingField(&'static str),

    #[error("Invalid expires_in value: {0:?}")]
    InvalidExpiresIn(String),

    #[error("Granted scope {granted:?} does not match requested scope {requested:?}")]
    ScopeMismatch { requested: String, granted: String },

    #[error("No authorization request is pending")]
    NoPendingState,

    #[error("State parameter does not match the pending authorization request")]
    StateMismatch,

    #[error("Provider denied authorization: {error}")]
    Denied { error: String, description: Option<String> },

    #[error("Session store failure: {0}")]
    Storage(#[from] StoreError),

    #[error("Code exchange failed: {0}")]
    Exchange(#[from] ProviderClientError),
}

/// Decoded form parameters from a redirect fragment or query
///
/// Repeated keys keep their first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectParams {
    params: HashMap<String, String>,
}

impl RedirectParams {
    /// Parameters from the fragment, `None` when there is no fragment
    #[must_use]
    pub fn from_fragment(url: &Url) -> Option<Self> {
        url.fragment().filter(|fragment| !fragment.is_empty()).map(Self::parse)
    }

    #[must_use]
    pub fn from_query(url: &Url) -> Self {
        url.query().map(Self::parse).unwrap_or_default()
    }

    fn parse(raw: &str) -> Self {
        let mut params = HashMap::new();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
        Self { params }
    }

    /// Value for `key` when present and non-empty
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str).filter(|value| !value.is_empty())
    }

    /// # Errors
    /// `MissingField` when the parameter is absent or empty.
    pub fn required(&self, key: &'static str) -> Result<&str, TokenExtractionError> {
        self.get(key).ok_or(TokenExtractionError::MissingField(key))
    }

    /// An `error=…` response from the provider, if any
    #[must_use]
    pub fn denial(&self) -> Option<TokenExtractionError> {
        self.get("error").map(|error| TokenExtractionError::Denied {
            error: error.to_string(),
            description: self.get("error_description").map(str::to_string),
        })
    }
}

/// Fields of a successful implicit-grant redirect
#[derive(Clone, PartialEq, Eq)]
pub struct ImplicitGrant {
    pub access_token: String,
    pub user_id: String,
    pub scope: String,
    pub expires_in: u64,
    pub state: String,
}

impl ImplicitGrant {
    /// Read the grant from the redirect fragment. The query is never
    /// consulted.
    ///
    /// # Errors
    /// A provider denial, or any missing or malformed field; nothing is
    /// validated against stored state here.
    pub fn from_redirect(url: &Url) -> Result<Self, TokenExtractionError> {
        let params = RedirectParams::from_fragment(url).ok_or(TokenExtractionError::MissingFragment)?;
        if let Some(denied) = params.denial() {
            return Err(denied);
        }
        Self::from_params(&params)
    }

    /// Grant fields from already parsed fragment parameters.
    ///
    /// # Errors
    /// Any missing or malformed field.
    pub fn from_params(params: &RedirectParams) -> Result<Self, TokenExtractionError> {
        let access_token = params.required("access_token")?.to_string();
        let user_id = params.required("user_id")?.to_string();
        let scope = params.required("scope")?.to_string();
        let raw_expires_in = params.required("expires_in")?;
        let expires_in = raw_expires_in
            .trim()
            .parse::<u64>()
            .map_err(|_| TokenExtractionError::InvalidExpiresIn(raw_expires_in.to_string()))?;
        let state = params.required("state")?.to_string();

        Ok(Self { access_token, user_id, scope, expires_in, state })
    }
}

impl fmt::Debug for ImplicitGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplicitGrant")
            .field("access_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Compare scopes as sets of space-separated tokens.
#[must_use]
pub fn scopes_match(requested: &str, granted: &str) -> bool {
    let requested: BTreeSet<&str> = requested.split_whitespace().collect();
    let granted: BTreeSet<&str> = granted.split_whitespace().collect();
    !requested.is_empty() && requested == granted
}

/// # Errors
/// `ScopeMismatch` when the sets differ.
pub fn ensure_scope(requested: &str, granted: &str) -> Result<(), TokenExtractionError> {
    if scopes_match(requested, granted) {
        Ok(())
    } else {
        Err(TokenExtractionError::ScopeMismatch {
            requested: requested.to_string(),
            granted: granted.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::redirect.
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    /// Validates `ImplicitGrant::from_redirect` behavior for a complete
    /// fragment on a custom-scheme URL.
    ///
    /// Assertions:
    /// - Confirms every field is decoded, including `+` as a space.
    #[test]
    fn test_parses_complete_fragment() {
        let grant = ImplicitGrant::from_redirect(&url(
            "mealscribe://auth#access_token=tok%2Fen&user_id=ABC123&scope=nutrition+profile&expires_in=86400&state=xyz&token_type=Bearer",
        ))
        .unwrap();

        assert_eq!(grant.access_token, "tok/en");
        assert_eq!(grant.user_id, "ABC123");
        assert_eq!(grant.scope, "nutrition profile");
        assert_eq!(grant.expires_in, 86_400);
        assert_eq!(grant.state, "xyz");
    }

    /// Validates `ImplicitGrant::from_redirect` behavior when the token is in
    /// the query instead of the fragment.
    ///
    /// Assertions:
    /// - Ensures the query is ignored and `MissingFragment` is returned.
    #[test]
    fn test_query_is_never_read() {
        let result = ImplicitGrant::from_redirect(&url(
            "http://localhost:8100/?access_token=t&user_id=u&scope=nutrition&expires_in=1&state=s",
        ));
        assert!(matches!(result, Err(TokenExtractionError::MissingFragment)));
    }

    #[test]
    fn test_missing_and_empty_fields() {
        let missing = ImplicitGrant::from_redirect(&url(
            "http://localhost/#user_id=u&scope=nutrition&expires_in=1&state=s",
        ));
        assert!(matches!(missing, Err(TokenExtractionError::MissingField("access_token"))));

        let empty = ImplicitGrant::from_redirect(&url(
            "http://localhost/#access_token=t&user_id=&scope=nutrition&expires_in=1&state=s",
        ));
        assert!(matches!(empty, Err(TokenExtractionError::MissingField("user_id"))));
    }

    #[test]
    fn test_rejects_negative_expires_in() {
        let result = ImplicitGrant::from_redirect(&url(
            "http://localhost/#access_token=t&user_id=u&scope=nutrition&expires_in=-5&state=s",
        ));
        assert!(matches!(result, Err(TokenExtractionError::InvalidExpiresIn(raw)) if raw == "-5"));
    }

    #[test]
    fn test_surfaces_provider_denial() {
        let result = ImplicitGrant::from_redirect(&url(
            "http://localhost/#error=access_denied&error_description=The+user+denied+the+request",
        ));
        match result {
            Err(TokenExtractionError::Denied { error, description }) => {
                assert_eq!(error, "access_denied");
                assert_eq!(description.as_deref(), Some("The user denied the request"));
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    /// Validates `scopes_match` behavior for ordering and subset cases.
    ///
    /// Assertions:
    /// - Ensures order does not matter.
    /// - Ensures a narrower grant and an empty request are rejected.
    #[test]
    fn test_scope_set_comparison() {
        assert!(scopes_match("nutrition profile", "profile nutrition"));
        assert!(!scopes_match("nutrition profile", "nutrition"));
        assert!(!scopes_match("", ""));
        assert!(ensure_scope("nutrition", "activity").is_err());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let params = RedirectParams::from_query(&url("http://localhost/?code=one&code=two"));
        assert_eq!(params.get("code"), Some("one"));
    }
}
