use super::{SocialGraphSource, UpstreamError};
use crate::models::{UpstreamComment, UpstreamPost, UpstreamUser};
use crate::services::auth::TokenSupplier;
use async_trait::async_trait;
use ranked_set::normalize_id;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Keys owned by the ranking record; upstream fields with these names are dropped.
const RESERVED_KEYS: [&str; 3] = ["id", "value", "fetchTime"];

/// reqwest-backed client for the upstream social-graph API
pub struct HttpSocialGraphClient {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSupplier>,
    timeout: Duration,
}

impl HttpSocialGraphClient {
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        tokens: Arc<dyn TokenSupplier>,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            timeout,
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value, UpstreamError> {
        let token = self.tokens.valid_token().await?;
        let url = format!("{}{}", self.base_url, path);

        let call = async {
            let response = self
                .http_client
                .get(&url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| UpstreamError::Unavailable(format!("GET {} failed: {}", path, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(UpstreamError::Unavailable(format!(
                    "GET {} returned {}",
                    path, status
                )));
            }

            response.json::<Value>().await.map_err(|e| {
                UpstreamError::MalformedShape(format!("GET {} returned invalid JSON: {}", path, e))
            })
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl SocialGraphSource for HttpSocialGraphClient {
    async fn fetch_users(&self) -> Result<Vec<UpstreamUser>, UpstreamError> {
        debug!("Fetching users");
        parse_users(self.get_json("/users").await?)
    }

    async fn fetch_user_posts(&self, user_id: &str) -> Result<Vec<UpstreamPost>, UpstreamError> {
        debug!(user_id = %user_id, "Fetching posts");
        parse_posts(self.get_json(&format!("/users/{}/posts", user_id)).await?)
    }

    async fn fetch_post_comments(
        &self,
        post_id: &str,
    ) -> Result<Vec<UpstreamComment>, UpstreamError> {
        debug!(post_id = %post_id, "Fetching comments");
        take_array(
            self.get_json(&format!("/posts/{}/comments", post_id))
                .await?,
            "comments",
        )
    }
}

/// `{ "users": { "<id>": "<name>", ... } }`, in JavaScript key order.
fn parse_users(body: Value) -> Result<Vec<UpstreamUser>, UpstreamError> {
    let users = match body {
        Value::Object(mut root) => root.remove("users"),
        _ => None,
    };
    let Some(Value::Object(users)) = users else {
        return Err(UpstreamError::MalformedShape(
            "expected a \"users\" object".to_string(),
        ));
    };

    Ok(js_key_order(users)
        .into_iter()
        .map(|(id, name)| UpstreamUser {
            id,
            name: match name {
                Value::String(s) => s,
                other => other.to_string(),
            },
        })
        .collect())
}

/// `{ "posts": [ { "id": .., ... } ] }`
fn parse_posts(body: Value) -> Result<Vec<UpstreamPost>, UpstreamError> {
    Ok(take_array(body, "posts")?
        .into_iter()
        .map(|post| match post {
            Value::Object(mut fields) => {
                let id = fields.get("id").and_then(normalize_id);
                for key in RESERVED_KEYS {
                    fields.remove(key);
                }
                UpstreamPost { id, fields }
            }
            _ => UpstreamPost {
                id: None,
                fields: Map::new(),
            },
        })
        .collect())
}

fn take_array(body: Value, field: &str) -> Result<Vec<Value>, UpstreamError> {
    match body {
        Value::Object(mut root) => match root.remove(field) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(UpstreamError::MalformedShape(format!(
                "expected a \"{}\" array",
                field
            ))),
        },
        _ => Err(UpstreamError::MalformedShape(format!(
            "expected an object holding \"{}\"",
            field
        ))),
    }
}

/// Canonical array-index keys ("0", "17") as a JS engine sees them
fn array_index(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

/// Integer-like keys ascending, then the remaining keys in document order.
fn js_key_order(map: Map<String, Value>) -> Vec<(String, Value)> {
    let mut indexed = Vec::new();
    let mut named = Vec::new();
    for (key, value) in map {
        match array_index(&key) {
            Some(index) => indexed.push((index, key, value)),
            None => named.push((key, value)),
        }
    }
    indexed.sort_by_key(|(index, _, _)| *index);

    indexed
        .into_iter()
        .map(|(_, key, value)| (key, value))
        .chain(named)
        .collect()
}
