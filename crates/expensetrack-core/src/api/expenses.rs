//! Client for the per-user expense collection in the remote JSON store.
//!
//! Records live under `{database}/expenses/{user_id}/{expense_id}.json` and
//! every request carries the session token as the `auth` query parameter.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{Client, Method};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::http::{build_client, send_with_backoff};
use super::ApiError;
use crate::auth::Session;
use crate::models::{Expense, ExpenseDraft};

#[derive(Debug, Deserialize)]
struct CreateResponse {
    name: String,
}

/// Expense store client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct ExpenseClient {
    client: Client,
    database_url: String,
}

impl ExpenseClient {
    pub fn new(database_url: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(build_client()?, database_url))
    }

    /// Build a client sharing an existing connection pool.
    pub fn with_client(client: Client, database_url: impl Into<String>) -> Self {
        Self {
            client,
            database_url: database_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn collection_url(&self, session: &Session) -> String {
        format!("{}/expenses/{}.json", self.database_url, session.user_id)
    }

    fn item_url(&self, session: &Session, id: &str) -> String {
        format!("{}/expenses/{}/{}.json", self.database_url, session.user_id, id)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        session: &Session,
        body: Option<&ExpenseDraft>,
    ) -> Result<reqwest::Response> {
        if session.is_expired_at(Utc::now()) {
            debug!(%method, "Refusing expense request for an expired session");
            return Err(ApiError::Unauthorized.into());
        }
        let response = send_with_backoff(url, || {
            let request = self
                .client
                .request(method.clone(), url)
                .query(&[("auth", session.token.as_str())]);
            match body {
                Some(body) => request.json(body),
                None => request,
            }
        })
        .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(%method, url, %status, "Expense store request failed");
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Fetch all expenses, newest first.
    pub async fn list(&self, session: &Session) -> Result<Vec<Expense>> {
        let url = self.collection_url(session);
        let response = self.send(Method::GET, &url, session, None).await?;
        let text = response
            .text()
            .await
            .map_err(ApiError::from)
            .context("Failed to read expenses")?;
        let expenses = parse_collection(&text)?;
        info!(count = expenses.len(), "Fetched expenses");
        Ok(expenses)
    }

    /// Store a new expense and return its generated id.
    pub async fn create(&self, session: &Session, draft: &ExpenseDraft) -> Result<String> {
        let url = self.collection_url(session);
        let response = self.send(Method::POST, &url, session, Some(draft)).await?;
        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("create expense: {}", e)))?;
        info!(id = %created.name, "Expense added");
        Ok(created.name)
    }

    /// Replace an existing expense.
    pub async fn update(&self, session: &Session, id: &str, draft: &ExpenseDraft) -> Result<()> {
        let url = self.item_url(session, id);
        self.send(Method::PUT, &url, session, Some(draft)).await?;
        info!(id, "Expense updated");
        Ok(())
    }

    pub async fn delete(&self, session: &Session, id: &str) -> Result<()> {
        let url = self.item_url(session, id);
        self.send(Method::DELETE, &url, session, None).await?;
        info!(id, "Expense deleted");
        Ok(())
    }
}

/// Parse the store's `null | {id: record}` body. Keys are generated in
/// chronological order, so reversing key order gives newest first.
/// Malformed records are skipped.
fn parse_collection(text: &str) -> Result<Vec<Expense>> {
    let map: Option<BTreeMap<String, serde_json::Value>> = serde_json::from_str(text)
        .map_err(|e| ApiError::InvalidResponse(format!("expense list: {}", e)))?;

    let mut expenses: Vec<Expense> = map
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(id, value)| match serde_json::from_value::<ExpenseDraft>(value) {
            Ok(draft) => Some(Expense::from_draft(id, draft)),
            Err(e) => {
                warn!(id = %id, error = %e, "Skipping malformed expense record");
                None
            }
        })
        .collect();
    expenses.reverse();
    Ok(expenses)
}
