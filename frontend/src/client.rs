use std::sync::Arc;

use records::{Created, Failure, Health, Message, Metrics, User, UserPayload};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::{
    error::ClientError,
    resolver::{Endpoint, EndpointResolver},
};

/// Record service calls, each one gated on endpoint resolution.
#[derive(Clone)]
pub struct RecordClient {
    http: Client,
    resolver: Arc<EndpointResolver>,
}

impl RecordClient {
    pub fn new(http: Client, resolver: Arc<EndpointResolver>) -> Self {
        Self { http, resolver }
    }

    pub async fn endpoint(&self) -> Endpoint {
        self.resolver.resolve().await
    }

    async fn url(&self, path: &str) -> String {
        self.endpoint().await.url(path)
    }

    pub async fn health(&self) -> Result<Health, ClientError> {
        let url = self.url("/health").await;
        send(self.http.get(url)).await
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        let url = self.url("/users").await;
        send(self.http.get(url)).await
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i64) -> Result<User, ClientError> {
        let url = self.url(&format!("/users/{id}")).await;
        send(self.http.get(url)).await
    }

    #[instrument(skip_all)]
    pub async fn create_user(&self, payload: &UserPayload) -> Result<i64, ClientError> {
        let url = self.url("/users").await;
        let created: Created = send(self.http.post(url).json(payload)).await?;

        Ok(created.id)
    }

    #[instrument(skip(self, payload))]
    pub async fn update_user(&self, id: i64, payload: &UserPayload) -> Result<String, ClientError> {
        let url = self.url(&format!("/users/{id}")).await;
        let message: Message = send(self.http.put(url).json(payload)).await?;

        Ok(message.message)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> Result<String, ClientError> {
        let url = self.url(&format!("/users/{id}")).await;
        let message: Message = send(self.http.delete(url)).await?;

        Ok(message.message)
    }

    pub async fn metrics(&self) -> Result<Metrics, ClientError> {
        let url = self.url("/metrics").await;
        send(self.http.get(url)).await
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await?;
    decode(response).await
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    debug!("{} => {status}", response.url());

    if status.is_success() {
        return Ok(response.json().await?);
    }

    // Bodies that are not a Failure still map to an error with the status text.
    let failure: Failure = response.json().await.unwrap_or_else(|_| Failure {
        message: status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
        ..Default::default()
    });

    Err(match status {
        StatusCode::BAD_REQUEST => ClientError::Validation {
            message: failure.message,
            errors: failure.errors,
        },
        StatusCode::NOT_FOUND => ClientError::NotFound {
            message: failure.message,
        },
        _ => ClientError::Server {
            status: status.as_u16(),
            message: failure.message,
            detail: failure.detail,
        },
    })
}
