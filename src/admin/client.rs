//! HTTP access to the book API for the admin client.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::api::BookPayload;
use crate::error::ErrorBody;
use crate::model::Book;

/// Everything the client needs to reach the API, handed over at start-up.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `http://127.0.0.1:8080`. The `/books` routes hang off it.
    pub root: String,
    /// Request token sent on every call when present.
    pub token: Option<String>,
    pub token_header: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}) {code}: {message}")]
    Api { status: u16, code: String, message: String },
}

impl ClientError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            ClientError::Request(_) => None,
        }
    }
}

/// The book operations the admin view depends on.
#[async_trait]
pub trait BookApi: Send + Sync {
    async fn list_books(&self) -> Result<Vec<Book>, ClientError>;
    async fn create_book(&self, payload: &BookPayload) -> Result<Book, ClientError>;
    async fn update_book(&self, id: i64, payload: &BookPayload) -> Result<Book, ClientError>;
    async fn delete_book(&self, id: i64) -> Result<(), ClientError>;
}

pub struct HttpBookApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBookApi {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.root.trim_end_matches('/'), path);
        let builder = self.client.request(method, url);
        match &self.config.token {
            Some(token) => builder.header(self.config.token_header.as_str(), token.as_str()),
            None => builder,
        }
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.code, body.message),
            Err(_) => ("http_error".to_string(), text),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        Ok(Self::check(response).await?.json::<T>().await?)
    }
}

#[async_trait]
impl BookApi for HttpBookApi {
    async fn list_books(&self) -> Result<Vec<Book>, ClientError> {
        let response = self.request(Method::GET, "/books").send().await?;
        Self::parse(response).await
    }

    async fn create_book(&self, payload: &BookPayload) -> Result<Book, ClientError> {
        let response = self.request(Method::POST, "/books").json(payload).send().await?;
        Self::parse(response).await
    }

    async fn update_book(&self, id: i64, payload: &BookPayload) -> Result<Book, ClientError> {
        let response = self
            .request(Method::PUT, &format!("/books/{id}"))
            .json(payload)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn delete_book(&self, id: i64) -> Result<(), ClientError> {
        let response = self.request(Method::DELETE, &format!("/books/{id}")).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
