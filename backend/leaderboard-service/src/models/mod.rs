use ranked_set::ScoredItem;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User entry from the upstream `/users` map
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamUser {
    pub id: String,
    pub name: String,
}

/// Post from `/users/{id}/posts`
///
/// `id` is `None` when the record carries no usable identifier; such posts
/// still count towards their author's post total.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamPost {
    pub id: Option<String>,
    pub fields: Map<String, Value>,
}

/// Comment from `/posts/{id}/comments`. Only counted, never inspected.
pub type UpstreamComment = Value;

/// Query string for GET /posts
#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopUsersResponse {
    #[serde(rename = "topUsers")]
    pub top_users: Vec<ScoredItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PopularPostsResponse {
    #[serde(rename = "mostPopularPosts")]
    pub most_popular_posts: Vec<ScoredItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LatestPostsResponse {
    #[serde(rename = "latestPosts")]
    pub latest_posts: Vec<ScoredItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
