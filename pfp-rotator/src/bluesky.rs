//! Minimal Bluesky (AT Protocol) XRPC client
//!
//! Only the four calls needed to replace a profile's images:
//!
//! - `com.atproto.server.createSession`
//! - `app.bsky.actor.getProfile`
//! - `com.atproto.repo.uploadBlob`
//! - `com.atproto.repo.putRecord`
//!
//! Non-2xx responses are turned into [`UpdateError::Upstream`] carrying the
//! XRPC `error`/`message` pair when the body has one.

use crate::error::UpdateError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const PROFILE_COLLECTION: &str = "app.bsky.actor.profile";
const PROFILE_RKEY: &str = "self";

/// An authenticated session
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
}

/// The profile fields that are carried over to the new record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: Option<String>,
    pub description: Option<String>,
}

/// The `app.bsky.actor.profile` record written back by `putRecord`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    #[serde(rename = "$type")]
    pub record_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub avatar: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Value>,
}

impl ProfileRecord {
    /// Keep `profile`'s text fields and swap in new images
    pub fn new(profile: Profile, avatar: Value, banner: Option<Value>) -> Self {
        ProfileRecord {
            record_type: PROFILE_COLLECTION,
            display_name: profile.display_name,
            description: profile.description,
            avatar,
            banner,
        }
    }
}

#[derive(Deserialize)]
struct UploadBlobOutput {
    blob: Value,
}

#[derive(Serialize)]
struct PutRecordInput<'a> {
    repo: &'a str,
    collection: &'a str,
    rkey: &'a str,
    record: &'a ProfileRecord,
}

#[derive(Deserialize)]
struct XrpcError {
    error: Option<String>,
    message: Option<String>,
}

/// XRPC client bound to one PDS
#[derive(Clone)]
pub struct BlueskyClient {
    http: Client,
    service_url: String,
}

impl BlueskyClient {
    /// Create a client for `service_url` (e.g. `https://bsky.social`)
    ///
    /// `timeout` bounds each request; `None` leaves requests unbounded.
    pub fn new(service_url: &str, timeout: Option<Duration>) -> Result<Self, UpdateError> {
        let mut builder = Client::builder()
            .user_agent(concat!("pfp-rotator/", env!("CARGO_PKG_VERSION")))
            .use_rustls_tls();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| UpdateError::upstream("Failed to build HTTP client", e))?;

        Ok(BlueskyClient {
            http,
            service_url: service_url.trim_end_matches('/').to_string(),
        })
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{method}", self.service_url)
    }

    /// Log in with a handle (or DID) and app password
    pub async fn create_session(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Session, UpdateError> {
        let request = self
            .http
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&serde_json::json!({
                "identifier": identifier,
                "password": password,
            }));

        send_json(request, "Login failed").await
    }

    /// Fetch the current profile of `actor`
    pub async fn get_profile(&self, session: &Session, actor: &str) -> Result<Profile, UpdateError> {
        let request = self
            .http
            .get(self.xrpc("app.bsky.actor.getProfile"))
            .header(AUTHORIZATION, bearer(session))
            .query(&[("actor", actor)]);

        send_json(request, "Fetching profile failed").await
    }

    /// Upload image bytes, returning the blob reference to embed in a record
    pub async fn upload_blob(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<Value, UpdateError> {
        let request = self
            .http
            .post(self.xrpc("com.atproto.repo.uploadBlob"))
            .header(AUTHORIZATION, bearer(session))
            .header(CONTENT_TYPE, mime_type)
            .body(bytes);

        let output: UploadBlobOutput = send_json(request, "Blob upload failed").await?;
        Ok(output.blob)
    }

    /// Replace the session owner's profile record
    pub async fn put_profile(
        &self,
        session: &Session,
        record: &ProfileRecord,
    ) -> Result<(), UpdateError> {
        let request = self
            .http
            .post(self.xrpc("com.atproto.repo.putRecord"))
            .header(AUTHORIZATION, bearer(session))
            .json(&PutRecordInput {
                repo: &session.did,
                collection: PROFILE_COLLECTION,
                rkey: PROFILE_RKEY,
                record,
            });

        let response = request
            .send()
            .await
            .map_err(|e| UpdateError::upstream("Profile update failed", e))?;
        check_status(response, "Profile update failed").await?;
        Ok(())
    }
}

fn bearer(session: &Session) -> String {
    format!("Bearer {}", session.access_jwt)
}

async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    context: &str,
) -> Result<T, UpdateError> {
    let response = request
        .send()
        .await
        .map_err(|e| UpdateError::upstream(context, e))?;
    let response = check_status(response, context).await?;

    response
        .json::<T>()
        .await
        .map_err(|e| UpdateError::upstream(context, e))
}

async fn check_status(response: Response, context: &str) -> Result<Response, UpdateError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<XrpcError>(&body) {
        Ok(XrpcError {
            error: Some(error),
            message: Some(message),
        }) => format!("{error}: {message}"),
        Ok(XrpcError {
            error: Some(error), ..
        }) => error,
        Ok(XrpcError {
            message: Some(message),
            ..
        }) => message,
        _ if body.is_empty() => status.to_string(),
        _ => body,
    };

    Err(UpdateError::Upstream(format!(
        "{context} ({}): {detail}",
        status.as_u16()
    )))
}
