//! Repository listing fetched from the GitHub REST API.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url, header};
use tracing::debug;

use crate::application::projects::{ProjectSource, SourceError};
use crate::config::GithubSettings;

use super::error::InfraError;

pub const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";

pub struct GithubSource {
    client: Client,
    url: Url,
    api_version: String,
}

impl GithubSource {
    pub fn new(settings: &GithubSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(Duration::from_secs(settings.timeout_seconds.get()))
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self {
            client,
            url: settings.url.clone(),
            api_version: settings.api_version.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("vitrine/", env!("CARGO_PKG_VERSION"))
    }

    fn request_error(&self, err: reqwest::Error) -> SourceError {
        SourceError::Request {
            location: self.url.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ProjectSource for GithubSource {
    fn location(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch(&self) -> Result<Bytes, SourceError> {
        debug!(url = %self.url, "fetching repository listing");
        let response = self
            .client
            .get(self.url.clone())
            .header(header::ACCEPT, ACCEPT)
            .header(API_VERSION_HEADER, self.api_version.as_str())
            .send()
            .await
            .map_err(|err| self.request_error(err))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SourceError::Status {
                location: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|err| self.request_error(err))
    }
}
