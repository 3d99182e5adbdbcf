// # Transport Trait
//
// Defines the interface for executing requests against the photo API.
//
// ## Implementations
//
// - reqwest-based: `photofeed-http` crate
// - Scripted test double: `tests/common/mod.rs`
//
// ## Usage
//
// ```rust,ignore
// use photofeed_core::traits::execute_json;
// use photofeed_core::RawPhotoPayload;
//
// let request = factory.page_request(1, 10)?;
// let page: Vec<RawPhotoPayload> = execute_json(&*transport, request).await?;
// ```

use crate::error::TransportError;
use crate::request::ApiRequest;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Trait for transport implementations
///
/// A transport performs exactly one HTTP exchange per call and hands back
/// the raw response body of a successful (2xx) response.
///
/// ## Responsibilities
///
/// - Attach authentication (bearer token) if it has one
/// - Map non-success statuses to [`TransportError::Status`]
/// - Never retry; the store decides what to do with failures
///
/// ## Cancellation
///
/// The store runs every call on its own tokio task and cancels it by
/// aborting that task. Implementations must therefore be cancel-safe:
/// dropping the future at any await point must not leave shared state
/// half-updated.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and return the response body
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<u8>)`: Body of a successful response
    /// - `Err(TransportError)`: Connection, status or timeout failure
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError>;

    /// Name used in logs
    fn transport_name(&self) -> &'static str {
        "transport"
    }
}

/// Execute a request and decode the JSON body into `T`
///
/// Decoding failures are reported as [`TransportError::Decode`].
pub async fn execute_json<T>(
    transport: &dyn Transport,
    request: ApiRequest,
) -> Result<T, TransportError>
where
    T: DeserializeOwned,
{
    let body = transport.execute(request).await?;
    let value = serde_json::from_slice(&body)?;
    Ok(value)
}
