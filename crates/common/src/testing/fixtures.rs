//! Redirect URL fixtures

use url::Url;

/// Builder for an implicit-flow redirect
///
/// Defaults to a complete, well-formed fragment for the `nutrition` scope.
#[derive(Debug, Clone)]
pub struct ImplicitRedirect {
    base: String,
    fields: Vec<(&'static str, String)>,
}

/// Implicit-flow redirect to `mealscribe://auth` carrying `state`
#[must_use]
pub fn implicit_redirect(state: &str) -> ImplicitRedirect {
    ImplicitRedirect {
        base: "mealscribe://auth".to_string(),
        fields: vec![
            ("access_token", "test-access-token".to_string()),
            ("user_id", "ABC123".to_string()),
            ("scope", "nutrition".to_string()),
            ("token_type", "Bearer".to_string()),
            ("expires_in", "86400".to_string()),
            ("state", state.to_string()),
        ],
    }
}

impl ImplicitRedirect {
    #[must_use]
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Override (or add) a fragment field
    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(field) => field.1 = value,
            None => self.fields.push((key, value)),
        }
        self
    }

    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.fields.retain(|(k, _)| *k != key);
        self
    }

    /// # Panics
    /// If the base is not an absolute URL.
    #[must_use]
    pub fn build(&self) -> Url {
        let fragment = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter().map(|(k, v)| (*k, v.as_str())))
            .finish();
        let mut url = Url::parse(&self.base).unwrap_or_else(|e| panic!("bad fixture base: {e}"));
        url.set_fragment(Some(&fragment));
        url
    }
}

/// Code-flow redirect with `code` and `state` in the query
///
/// # Panics
/// If `base` is not an absolute URL.
#[must_use]
pub fn code_redirect(base: &str, code: &str, state: &str) -> Url {
    let mut url = Url::parse(base).unwrap_or_else(|e| panic!("bad fixture base: {e}"));
    url.query_pairs_mut().append_pair("code", code).append_pair("state", state);
    url
}
