use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::DbError;

pub const REST_PREFIX: &str = "/rest/v1";

/// Thin PostgREST client. One instance (and so one connection pool) is shared
/// by the whole process through `AppState`.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, DbError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.service_key)
                .map_err(|e| DbError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))
                .map_err(|e| DbError::InvalidHeader(e.to_string()))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("API error ({}): {}", status, text);
            return Err(DbError::from_response(status.as_u16(), &text));
        }

        // 204 and `return=minimal` answers carry no body.
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }

        Ok(serde_json::from_str(&text)?)
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    /// GET `/rest/v1/{query}` returning every matching row.
    pub async fn select<T>(&self, query: &str) -> Result<Vec<T>, DbError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, &format!("{}/{}", REST_PREFIX, query), None)
            .await
    }

    /// GET returning the first matching row, if any.
    pub async fn select_one<T>(&self, query: &str) -> Result<Option<T>, DbError>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.select(query).await?;
        Ok(rows.into_iter().next())
    }

    /// POST a row and return its stored representation.
    pub async fn insert<T, B>(&self, table: &str, body: &B) -> Result<T, DbError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let rows: Vec<T> = self
            .request_with_headers(
                Method::POST,
                &format!("{}/{}", REST_PREFIX, table),
                Some(serde_json::to_value(body)?),
                Some(Self::representation_headers()),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::Api { status: 500, message: format!("Insert into {} returned no rows", table) })
    }

    /// Upsert rows, merging on the given conflict column.
    pub async fn upsert<B>(&self, table: &str, on_conflict: &str, body: &B) -> Result<(), DbError>
    where
        B: Serialize,
    {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=minimal"),
        );

        let _: Value = self
            .request_with_headers(
                Method::POST,
                &format!("{}/{}?on_conflict={}", REST_PREFIX, table, on_conflict),
                Some(serde_json::to_value(body)?),
                Some(headers),
            )
            .await?;
        Ok(())
    }

    /// PATCH every row matched by `query`, returning the updated rows. An
    /// empty result means the filter matched nothing.
    pub async fn update<T, B>(&self, query: &str, body: &B) -> Result<Vec<T>, DbError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.request_with_headers(
            Method::PATCH,
            &format!("{}/{}", REST_PREFIX, query),
            Some(serde_json::to_value(body)?),
            Some(Self::representation_headers()),
        )
        .await
    }

    /// DELETE every row matched by `query`, returning the deleted rows.
    pub async fn delete<T>(&self, query: &str) -> Result<Vec<T>, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(
            Method::DELETE,
            &format!("{}/{}", REST_PREFIX, query),
            None,
            Some(Self::representation_headers()),
        )
        .await
    }

    /// Invoke a Postgres function. Each call runs in its own transaction.
    pub async fn rpc<T, A>(&self, function: &str, args: &A) -> Result<T, DbError>
    where
        T: DeserializeOwned,
        A: Serialize,
    {
        self.request(
            Method::POST,
            &format!("{}/rpc/{}", REST_PREFIX, function),
            Some(serde_json::to_value(args)?),
        )
        .await
    }

    pub async fn health_check(&self) -> Result<(), DbError> {
        let _: Vec<Value> = self.select("roles?select=id&limit=1").await?;
        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// Encodes a user supplied value for use inside a PostgREST filter.
pub fn filter_value(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
