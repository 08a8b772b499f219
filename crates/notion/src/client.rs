//! Notion REST implementation of [`DocumentApi`].

use serde::Deserialize;
use serde_json::json;
use storyloom_core::markup::DocumentBlock;

use crate::api::{ChildBlock, DocumentApi, MAX_BLOCKS_PER_APPEND};
use crate::blocks::block_to_json;
use crate::error::NotionError;

/// Public Notion API root.
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// API version sent in the `Notion-Version` header.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Default name of the title property of the target databases.
pub const DEFAULT_TITLE_PROPERTY: &str = "Title";

const PAGE_SIZE: u32 = 100;

/// HTTP client for the Notion API, scoped to one integration token.
#[derive(Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    title_property: String,
}

/// One page of a paginated list response.
#[derive(Debug, Deserialize)]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

impl<T> ListPage<T> {
    /// Cursor for the following page, if any.
    fn continuation(&self) -> Option<String> {
        if self.has_more {
            self.next_cursor.clone()
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct BlockObject {
    id: String,
    #[serde(rename = "type", default)]
    block_type: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl NotionClient {
    pub fn new(token: String, title_property: String) -> Self {
        Self::with_client(
            reqwest::Client::new(),
            DEFAULT_BASE_URL.to_string(),
            token,
            title_property,
        )
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        token: String,
        title_property: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            title_property,
        }
    }

    pub fn title_property(&self) -> &str {
        &self.title_property
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    fn query_body(&self, title: &str, cursor: Option<&str>) -> serde_json::Value {
        let mut body = json!({
            "filter": {
                "property": self.title_property,
                "title": { "equals": title }
            },
            "page_size": PAGE_SIZE,
        });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        body
    }

    fn create_body(&self, collection_id: &str, title: &str) -> serde_json::Value {
        json!({
            "parent": { "database_id": collection_id },
            "properties": {
                self.title_property.as_str(): {
                    "title": [{ "type": "text", "text": { "content": title } }]
                }
            }
        })
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, NotionError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NotionError::RateLimited { body });
        }

        let parsed = serde_json::from_str::<ErrorBody>(&body).unwrap_or(ErrorBody {
            code: String::new(),
            message: body,
        });
        Err(NotionError::Api {
            status: status.as_u16(),
            code: parsed.code,
            message: parsed.message,
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, NotionError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

impl DocumentApi for NotionClient {
    async fn query_by_title(
        &self,
        collection_id: &str,
        title: &str,
    ) -> Result<Vec<String>, NotionError> {
        let path = format!("/databases/{collection_id}/query");
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let response = self
                .request(reqwest::Method::POST, &path)
                .json(&self.query_body(title, cursor.as_deref()))
                .send()
                .await?;
            let page: ListPage<PageObject> = Self::parse_response(response).await?;

            cursor = page.continuation();
            ids.extend(page.results.into_iter().map(|p| p.id));
            if cursor.is_none() {
                break;
            }
        }

        tracing::debug!(collection_id, title, matches = ids.len(), "Queried pages by title");
        Ok(ids)
    }

    async fn create_page(&self, collection_id: &str, title: &str) -> Result<String, NotionError> {
        let response = self
            .request(reqwest::Method::POST, "/pages")
            .json(&self.create_body(collection_id, title))
            .send()
            .await?;
        let page: PageObject = Self::parse_response(response).await?;

        tracing::info!(collection_id, title, page_id = %page.id, "Created page");
        Ok(page.id)
    }

    async fn list_children(&self, block_id: &str) -> Result<Vec<ChildBlock>, NotionError> {
        let path = format!("/blocks/{block_id}/children");
        let mut children = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .request(reqwest::Method::GET, &path)
                .query(&[("page_size", PAGE_SIZE.to_string())]);
            if let Some(cursor) = &cursor {
                request = request.query(&[("start_cursor", cursor)]);
            }
            let page: ListPage<BlockObject> = Self::parse_response(request.send().await?).await?;

            cursor = page.continuation();
            children.extend(page.results.into_iter().map(|b| ChildBlock {
                id: b.id,
                block_type: b.block_type,
            }));
            if cursor.is_none() {
                break;
            }
        }

        Ok(children)
    }

    async fn append_children(
        &self,
        block_id: &str,
        blocks: &[DocumentBlock],
    ) -> Result<(), NotionError> {
        if blocks.len() > MAX_BLOCKS_PER_APPEND {
            return Err(NotionError::TooManyBlocks(blocks.len()));
        }
        let children: Vec<serde_json::Value> = blocks.iter().map(block_to_json).collect();

        let response = self
            .request(reqwest::Method::PATCH, &format!("/blocks/{block_id}/children"))
            .json(&json!({ "children": children }))
            .send()
            .await?;
        Self::ensure_success(response).await?;

        tracing::debug!(block_id, blocks = blocks.len(), "Appended children");
        Ok(())
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), NotionError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/blocks/{block_id}"))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .field("title_property", &self.title_property)
            .finish_non_exhaustive()
    }
}
