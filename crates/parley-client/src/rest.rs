//! REST collaborator.
//!
//! Channel lists, presence, and history come from the server's HTTP API.
//! The [`Rest`] trait is the seam the runtime fetches through; [`HttpRest`]
//! is the production implementation over `reqwest`.
//!
//! Every request carries the session's bearer token.

use std::future::Future;

use parley_core::{
    AuthContext, Channel, ChannelId, FetchError, InboundMessage, Presence, RoomSummary, UserId,
    channel_list,
};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// REST request errors.
#[derive(Error, Debug)]
pub enum RestError {
    /// Server answered with a non-success status.
    #[error("{path}: unexpected status {status}")]
    Status {
        /// Request path.
        path: String,
        /// HTTP status code.
        status: u16,
    },

    /// Request could not be sent or the response not read.
    #[error("{path}: request failed: {source}")]
    Request {
        /// Request path.
        path: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// Response body did not match the expected shape.
    #[error("{path}: invalid response body: {source}")]
    Decode {
        /// Request path.
        path: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
}

impl From<RestError> for FetchError {
    fn from(e: RestError) -> Self {
        match e {
            RestError::Status { status, .. } => Self::Status(status),
            RestError::Request { .. } => Self::Network(e.to_string()),
            RestError::Decode { .. } => Self::Decode(e.to_string()),
        }
    }
}

/// Source of channel lists and history.
///
/// Implementations are cloned into spawned fetch tasks.
pub trait Rest: Clone + Send + Sync + 'static {
    /// Fetch rooms and presence and merge them into one channel list.
    ///
    /// Fails as a unit if either request fails.
    fn fetch_channels(
        &self,
        local_user: UserId,
    ) -> impl Future<Output = Result<Vec<Channel>, FetchError>> + Send;

    /// Fetch the history of `channel`, oldest first.
    fn fetch_history(
        &self,
        channel: ChannelId,
    ) -> impl Future<Output = Result<Vec<InboundMessage>, FetchError>> + Send;
}

/// HTTP implementation of [`Rest`].
#[derive(Debug, Clone)]
pub struct HttpRest {
    client: reqwest::Client,
    base: String,
    bearer: String,
}

impl HttpRest {
    /// Create a client for the API rooted at `base`.
    pub fn new(base: impl Into<String>, auth: &AuthContext) -> Self {
        Self { client: reqwest::Client::new(), base: base.into(), bearer: auth.bearer() }
    }

    /// Path of the history endpoint for `channel`.
    pub fn history_path(channel: ChannelId) -> String {
        match channel {
            ChannelId::Room(room) => format!("/api/rooms/{room}/messages"),
            ChannelId::Direct(peer) => format!("/api/rooms/private/{peer}/messages"),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RestError> {
        let url = format!("{}{path}", self.base);
        tracing::trace!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, &self.bearer)
            .send()
            .await
            .map_err(|source| RestError::Request { path: path.to_owned(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Status { path: path.to_owned(), status: status.as_u16() });
        }

        response.json().await.map_err(|source| RestError::Decode { path: path.to_owned(), source })
    }
}

impl Rest for HttpRest {
    async fn fetch_channels(&self, local_user: UserId) -> Result<Vec<Channel>, FetchError> {
        let (rooms, presence) = tokio::try_join!(
            self.get_json::<Vec<RoomSummary>>("/api/rooms"),
            self.get_json::<Vec<Presence>>("/api/users/presence"),
        )?;
        Ok(channel_list(rooms, presence, local_user))
    }

    async fn fetch_history(&self, channel: ChannelId) -> Result<Vec<InboundMessage>, FetchError> {
        Ok(self.get_json(&Self::history_path(channel)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_paths() {
        assert_eq!(HttpRest::history_path(ChannelId::Room(5)), "/api/rooms/5/messages");
        assert_eq!(HttpRest::history_path(ChannelId::Direct(42)), "/api/rooms/private/42/messages");
    }

    #[test]
    fn status_maps_to_fetch_error() {
        let e = RestError::Status { path: "/api/rooms".into(), status: 401 };
        assert_eq!(FetchError::from(e), FetchError::Status(401));
    }
}
