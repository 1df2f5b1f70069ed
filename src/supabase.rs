//! Thin PostgREST client for the managed backend. The service holds no
//! database of its own; every durable entity lives in Supabase and is
//! reached over its row-filtering REST API.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::retry::{FetchError, RetryOptions, fetch_with_retry};

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
    retry: RetryOptions,
}

impl SupabaseClient {
    pub fn new(http: reqwest::Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            http,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            retry: RetryOptions::default(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    /// Reads rows from `table`, filtered PostgREST-style
    /// (`("community", "eq.yellowknife")`, `("order", "created_at.desc")`).
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, FetchError> {
        let url = self.table_url(table);
        let response = fetch_with_retry(
            || {
                self.http
                    .get(&url)
                    .query(query)
                    .header("apikey", &self.anon_key)
                    .bearer_auth(&self.anon_key)
            },
            &self.retry,
        )
        .await?;

        response.json().await.map_err(FetchError::decode)
    }

    /// Inserts one row and returns the stored representation.
    pub async fn insert<T, R>(&self, table: &str, row: &T) -> Result<Vec<R>, FetchError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = self.table_url(table);
        let response = fetch_with_retry(
            || {
                self.http
                    .post(&url)
                    .json(row)
                    .header("apikey", &self.anon_key)
                    .bearer_auth(&self.anon_key)
                    .header("Prefer", "return=representation")
            },
            &self.retry,
        )
        .await?;

        response.json().await.map_err(FetchError::decode)
    }
}
