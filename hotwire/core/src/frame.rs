//! Turbo Frames - full page or one frame
//!
//! Handlers return a [`View`]: an ordered list of fragments plus the state
//! they render against. The [`FrameLayer`] middleware picks it up once the
//! handler is done and decides what to send:
//!
//! - no `turbo-frame` header: every fragment is rendered and the results are
//!   joined with newlines into a full page
//! - `turbo-frame: F`: only the frame whose id is `F` is rendered; if the view
//!   has no such frame, a placeholder frame explaining that is sent instead
//!
//! Responses that carry no view (or an empty one) pass through untouched.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::future::try_join_all;

use crate::fragment::{frame_not_found_body, wrap_in_frame, Fragment};
use crate::template::{RenderError, RenderState, TemplateRenderer};

/// Request header naming the frame a client wants
pub const DEFAULT_FRAME_HEADER: &str = "turbo-frame";

/// The fragments a handler produced for one response
///
/// Returning a `View` from an axum handler stores it in the response
/// extensions, where [`FrameLayer`] renders it.
#[derive(Clone, Debug, Default)]
pub struct View {
    fragments: Vec<Fragment>,
    state: RenderState,
}

impl View {
    /// Create an empty view rendering against `state`
    #[must_use]
    pub fn new(state: RenderState) -> Self {
        Self {
            fragments: Vec::new(),
            state,
        }
    }

    /// Create a view from a list of fragments
    #[must_use]
    pub fn from_fragments<I, F>(state: RenderState, fragments: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Fragment>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            state,
        }
    }

    /// Add a fragment (builder style)
    #[must_use]
    pub fn with(mut self, fragment: impl Into<Fragment>) -> Self {
        self.push(fragment);
        self
    }

    /// Add a fragment
    pub fn push(&mut self, fragment: impl Into<Fragment>) {
        self.fragments.push(fragment.into());
    }

    /// Fragments in render order
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// State shared by every fragment
    #[must_use]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Number of fragments
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the view has no fragments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// First frame with the given id
    #[must_use]
    pub fn find_frame(&self, id: &str) -> Option<&Fragment> {
        self.fragments
            .iter()
            .find(|fragment| fragment.frame_id() == Some(id))
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        let mut response = StatusCode::OK.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Frame id requested by the client, if any
///
/// Any UTF-8 value counts, including non-ASCII ids. Values that are not
/// UTF-8 are treated as absent.
#[must_use]
pub fn requested_frame(headers: &HeaderMap, header: &str) -> Option<String> {
    headers
        .get(header)
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
        .map(str::to_string)
}

/// Turns a [`View`] into a response body
#[derive(Clone)]
pub struct FrameDispatcher {
    renderer: Arc<dyn TemplateRenderer>,
}

impl FrameDispatcher {
    /// Create a dispatcher rendering with `renderer`
    #[must_use]
    pub fn new(renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self { renderer }
    }

    /// Render a view for a request
    ///
    /// Returns `None` for an empty view, meaning the response should be left
    /// as the handler built it.
    pub async fn dispatch(
        &self,
        view: &View,
        requested: Option<&str>,
    ) -> Result<Option<String>, RenderError> {
        if view.is_empty() {
            return Ok(None);
        }
        let body = match requested {
            Some(id) => self.render_frame(view, id).await?,
            None => self.render_page(view).await?,
        };
        Ok(Some(body))
    }

    /// Render every fragment and join them with newlines, in view order
    ///
    /// Renders run concurrently; the first failure aborts the page.
    pub async fn render_page(&self, view: &View) -> Result<String, RenderError> {
        let renders = view
            .fragments()
            .iter()
            .map(|fragment| self.renderer.render(fragment, view.state()));
        let parts = try_join_all(renders).await?;
        Ok(parts.join("\n"))
    }

    /// Render only the frame with the given id
    ///
    /// A missing frame yields a placeholder frame and never touches the
    /// renderer.
    pub async fn render_frame(&self, view: &View, id: &str) -> Result<String, RenderError> {
        match view.find_frame(id) {
            Some(fragment) => self.renderer.render(fragment, view.state()).await,
            None => {
                tracing::debug!(frame = id, "Requested frame not in view");
                Ok(wrap_in_frame(id, &frame_not_found_body(id)))
            }
        }
    }
}

/// Axum middleware rendering [`View`] responses
#[derive(Clone)]
pub struct FrameLayer {
    dispatcher: FrameDispatcher,
    header: String,
}

impl FrameLayer {
    /// Create a layer using the default `turbo-frame` header
    #[must_use]
    pub fn new(renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self {
            dispatcher: FrameDispatcher::new(renderer),
            header: DEFAULT_FRAME_HEADER.to_string(),
        }
    }

    /// Use a different request header to select frames
    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Header that selects a frame
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// The dispatcher doing the rendering
    #[must_use]
    pub fn dispatcher(&self) -> &FrameDispatcher {
        &self.dispatcher
    }

    /// Wrap every route of `router` in this middleware
    #[must_use]
    pub fn wrap<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(axum::middleware::from_fn_with_state(
            self.clone(),
            frame_middleware,
        ))
    }

    async fn handle(&self, req: Request, next: Next) -> Response {
        let requested = requested_frame(req.headers(), &self.header);
        let response = next.run(req).await;

        let (mut parts, body) = response.into_parts();
        let Some(view) = parts.extensions.remove::<View>() else {
            return Response::from_parts(parts, body);
        };

        match self.dispatcher.dispatch(&view, requested.as_deref()).await {
            Ok(Some(html)) => {
                parts.headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/html; charset=utf-8"),
                );
                parts.headers.remove(CONTENT_LENGTH);
                Response::from_parts(parts, Body::from(html))
            }
            Ok(None) => Response::from_parts(parts, body),
            Err(e) => {
                tracing::error!(error = %e, frame = ?requested, "Failed to render view");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

/// Middleware function, for use with `axum::middleware::from_fn_with_state`
pub async fn frame_middleware(
    State(layer): State<FrameLayer>,
    req: Request,
    next: Next,
) -> Response {
    layer.handle(req, next).await
}
