//! Fitbit food API client

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use mealscribe_common::auth::AuthProvider;
use mealscribe_core::FoodProvider;
use mealscribe_domain::{FoodChoice, FoodLogEntry, ProviderConfig};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use super::types::{FoodApiError, FoodSearchResponse};
use crate::http::HttpClient;

const MAX_ERROR_BODY: usize = 512;

/// Fitbit food database and diary client
///
/// Generic over the auth provider so tests can inject a double; the token
/// is read on every call and never cached here.
pub struct FitbitFoodClient<A: AuthProvider> {
    http: HttpClient,
    auth: Arc<A>,
    api_base: String,
}

impl<A: AuthProvider> FitbitFoodClient<A> {
    pub fn new(config: &ProviderConfig, http: HttpClient, auth: Arc<A>) -> Self {
        Self { http, auth, api_base: config.api_base().to_string() }
    }

    /// Point the client at another API host (for testing)
    #[must_use]
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Search the public food database.
    ///
    /// Results keep the provider's ordering, best match first. A blank query
    /// returns no results without a request.
    ///
    /// # Errors
    /// See [`FoodApiError`].
    pub async fn search_foods(&self, query: &str) -> Result<Vec<FoodChoice>, FoodApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let token = self.bearer_token().await?;
        let url = format!("{}/1/foods/search.json", self.api_base);
        let builder = self
            .http
            .request(Method::GET, url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .query(&[("query", query)]);

        let response = self.execute(builder).await?;
        let body: FoodSearchResponse = response
            .json()
            .await
            .map_err(|e| FoodApiError::InvalidResponse(format!("food search: {e}")))?;

        let choices: Vec<FoodChoice> = body.foods.into_iter().map(FoodChoice::from).collect();
        debug!(results = choices.len(), "food search complete");
        Ok(choices)
    }

    /// Add `entry` to the signed-in user's food diary on `date`.
    ///
    /// # Errors
    /// See [`FoodApiError`].
    pub async fn log_food(&self, entry: &FoodLogEntry, date: NaiveDate) -> Result<(), FoodApiError> {
        let token = self.bearer_token().await?;
        let url = format!("{}/1/user/-/foods/log.json", self.api_base);
        let form = log_form(entry, date);
        let builder = self
            .http
            .request(Method::POST, url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .form(&form);

        self.execute(builder).await?;
        info!(
            food_id = %entry.choice.id,
            meal_type = %entry.meal_type,
            %date,
            "food logged"
        );
        Ok(())
    }

    /// [`log_food`](Self::log_food) for today's local date.
    ///
    /// # Errors
    /// See [`FoodApiError`].
    pub async fn log_food_today(&self, entry: &FoodLogEntry) -> Result<(), FoodApiError> {
        self.log_food(entry, Local::now().date_naive()).await
    }

    async fn bearer_token(&self) -> Result<String, FoodApiError> {
        self.auth.get_access_token().await.ok_or(FoodApiError::NotAuthenticated)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, FoodApiError> {
        let response =
            self.http.send(builder).await.map_err(|e| FoodApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!("Fitbit rejected the access token");
            return Err(FoodApiError::Unauthorized);
        }

        let mut message = response.text().await.unwrap_or_default();
        truncate_at_char_boundary(&mut message, MAX_ERROR_BODY);
        warn!(status = status.as_u16(), "Fitbit API error");
        Err(FoodApiError::Api { status: status.as_u16(), message })
    }
}

fn log_form(entry: &FoodLogEntry, date: NaiveDate) -> [(&'static str, String); 5] {
    [
        ("foodId", entry.choice.id.clone()),
        ("mealTypeId", entry.meal_type.provider_id().to_string()),
        ("unitId", entry.choice.unit_id.clone()),
        ("amount", format!("{:.2}", entry.amount)),
        ("date", date.format("%Y-%m-%d").to_string()),
    ]
}

fn truncate_at_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[async_trait]
impl<A: AuthProvider> FoodProvider for FitbitFoodClient<A> {
    async fn search_foods(&self, query: &str) -> mealscribe_domain::Result<Vec<FoodChoice>> {
        Self::search_foods(self, query).await.map_err(Into::into)
    }

    async fn log_food(
        &self,
        entry: &FoodLogEntry,
        date: NaiveDate,
    ) -> mealscribe_domain::Result<()> {
        Self::log_food(self, entry, date).await.map_err(Into::into)
    }
}
