use http::header::{CACHE_CONTROL, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde::Serialize;
use std::sync::Arc;

use crate::body::Body;
use crate::config::ConsoleClientConfig;
use crate::dedup::{InFlight, dedup_key};
use crate::error::ClientError;
use crate::notify::{ErrorNotifier, TracingNotifier};
use crate::request::{Request, RequestBuilder, RequestOptions};
use crate::response::Response;
use crate::transport::{ReqwestTransport, Transport};

/// Header identifying the signed-in console user on every request.
pub const ACTOR_HEADER: HeaderName = HeaderName::from_static("new-api-user");

/// Console API client.
///
/// Every request carries the actor identity and `Cache-Control: no-store`.
/// Failures pass through a single interception point that reports them to the
/// configured [`ErrorNotifier`] unless the call set `skip_error_handler`.
/// Concurrent identical `get` calls share one network request; other verbs
/// are never shared.
///
/// Instances are immutable once built. A session change produces a new
/// instance with its own in-flight registry (see [`crate::ApiHandle`]).
pub struct ConsoleApi {
    dispatcher: Dispatcher,
    default_headers: HeaderMap,
    actor_id: String,
    in_flight: InFlight<Response>,
}

impl std::fmt::Debug for ConsoleApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleApi")
            .field("actor_id", &self.actor_id)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

/// Sends one request and applies the error interceptor to the outcome.
#[derive(Clone)]
struct Dispatcher {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn ErrorNotifier>,
}

impl Dispatcher {
    async fn dispatch(
        self,
        request: Request,
        skip_error_handler: bool,
    ) -> Result<Response, ClientError> {
        let result = match self.transport.send(request).await {
            Ok(resp) if resp.is_success() => Ok(resp),
            Ok(resp) => Err(ClientError::Http {
                status: resp.status(),
                body: resp.body().clone(),
            }),
            Err(e) => Err(e),
        };

        if let Err(err) = &result {
            self.report(err, skip_error_handler);
        }
        result
    }

    /// Hand a failure to the notifier unless the call opted out.
    fn report(&self, err: &ClientError, skip_error_handler: bool) {
        if skip_error_handler {
            tracing::debug!(error = %err, "console request failed, notification skipped");
        } else {
            self.notifier.notify(err);
        }
    }
}

impl ConsoleApi {
    /// Build a client over `transport` for the given actor identity
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] if the actor identity is not a
    /// valid header value.
    pub fn new(
        transport: Arc<dyn Transport>,
        actor_id: &str,
        notifier: Arc<dyn ErrorNotifier>,
    ) -> Result<Self, ClientError> {
        let mut default_headers = HeaderMap::new();
        let actor = HeaderValue::from_str(actor_id)
            .map_err(|e| ClientError::BuildError(format!("Invalid actor identity: {e}")))?;
        default_headers.insert(ACTOR_HEADER, actor);
        default_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

        Ok(Self {
            dispatcher: Dispatcher {
                transport,
                notifier,
            },
            default_headers,
            actor_id: actor_id.to_owned(),
            in_flight: InFlight::new(),
        })
    }

    /// Build a `reqwest`-backed client that logs failures through `tracing`
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] for an invalid base URL or actor
    /// identity.
    pub fn from_config(config: &ConsoleClientConfig, actor_id: &str) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::from_config(config)?;
        Self::new(Arc::new(transport), actor_id, Arc::new(TracingNotifier))
    }

    /// Actor identity this instance sends
    #[must_use]
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Number of distinct reads currently in flight on this instance
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// GET `path`, sharing the network call with identical concurrent reads
    ///
    /// With `disable_duplicate` the call always gets its own request and is
    /// never joined by others.
    ///
    /// # Errors
    /// Invalid request parts, transport failures and non-2xx responses,
    /// unchanged. Every caller that shared a request receives the same error.
    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Response, ClientError> {
        let skip = options.is_error_handler_skipped();
        let request = self.request(Method::GET, path, &options, Body::Empty)?;

        if options.is_duplicate_disabled() {
            return self.dispatcher.clone().dispatch(request, skip).await;
        }

        let key = dedup_key(path, options.get_params());
        let dispatcher = self.dispatcher.clone();
        self.in_flight
            .run(key, move || dispatcher.dispatch(request, skip))
            .await
    }

    /// POST a JSON body
    ///
    /// # Errors
    /// Serialization failures, transport failures and non-2xx responses.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        self.send_json(Method::POST, path, body, options).await
    }

    /// PUT a JSON body
    ///
    /// # Errors
    /// Serialization failures, transport failures and non-2xx responses.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        self.send_json(Method::PUT, path, body, options).await
    }

    /// DELETE `path`
    ///
    /// # Errors
    /// Invalid request parts, transport failures and non-2xx responses.
    pub async fn delete(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        let request = self.request(Method::DELETE, path, &options, Body::Empty)?;
        self.dispatcher
            .clone()
            .dispatch(request, options.is_error_handler_skipped())
            .await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        let skip = options.is_error_handler_skipped();
        let request = Request::builder()
            .method(method)
            .path(path)
            .params(options.get_params().cloned())
            .headers(&self.default_headers)
            .json(body)
            .map(|builder| {
                builder
                    .headers(options.headers())
                    .timeout(options.get_timeout())
            })
            .and_then(RequestBuilder::build)
            .inspect_err(|e| self.dispatcher.report(e, skip))?;
        self.dispatcher.clone().dispatch(request, skip).await
    }

    /// Assemble a bodiless request; failures go through the interceptor too.
    fn request(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
        body: Body,
    ) -> Result<Request, ClientError> {
        Request::builder()
            .method(method)
            .path(path)
            .params(options.get_params().cloned())
            .headers(&self.default_headers)
            .headers(options.headers())
            .body(body)
            .timeout(options.get_timeout())
            .build()
            .inspect_err(|e| self.dispatcher.report(e, options.is_error_handler_skipped()))
    }
}
