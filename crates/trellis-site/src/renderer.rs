//! Rendering resolved pages into responses.
//!
//! Part contents are opaque: the pipeline copies them into the response
//! body without filtering.

use serde::Serialize;
use trellis_storage::Storage;

use crate::node_kind::{DEFAULT_RESPONSE_CODE, Headers, PageBehavior};
use crate::page::Page;
use crate::resolver::ResolveMode;

/// Name of the part rendered as the response body.
pub const BODY_PART: &str = "body";

/// The incoming request, as far as rendering cares.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    path: String,
    mode: ResolveMode,
    headers: Headers,
}

impl RequestContext {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: ResolveMode::Live,
            headers: Headers::new(),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn mode(&self) -> ResolveMode {
        self.mode
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// A rendered page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Response {
    pub body: String,
    pub status_code: u16,
    pub headers: Headers,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            body: String::new(),
            status_code: 200,
            headers: Headers::new(),
        }
    }
}

/// Turns a page into a [`Response`].
///
/// By default a page without its own `body` part renders an empty body even
/// when an ancestor defines one. [`with_inherit_parts`](Self::with_inherit_parts)
/// makes rendering fall back to the nearest ancestor's part instead.
#[derive(Clone, Debug, Default)]
pub struct RenderPipeline {
    default_headers: Headers,
    inherit_parts: bool,
}

impl RenderPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers sent with every response unless the page kind overrides them.
    #[must_use]
    pub fn with_default_headers(mut self, headers: Headers) -> Self {
        self.default_headers = headers;
        self
    }

    #[must_use]
    pub fn with_inherit_parts(mut self, inherit_parts: bool) -> Self {
        self.inherit_parts = inherit_parts;
        self
    }

    /// Render `page` into a fresh response.
    pub fn render(
        &self,
        storage: &dyn Storage,
        page: &Page,
        behavior: &dyn PageBehavior,
        request: &RequestContext,
    ) -> Response {
        let mut response = Response::default();
        self.process(storage, page, behavior, request, &mut response);
        response
    }

    /// Write headers, body and status code for `page` into `response`.
    ///
    /// Never fails: a missing part renders as an empty string.
    pub fn process(
        &self,
        storage: &dyn Storage,
        page: &Page,
        behavior: &dyn PageBehavior,
        request: &RequestContext,
        response: &mut Response,
    ) {
        let mut headers = self.default_headers.clone();
        headers.extend(behavior.headers(page));
        response.headers.extend(headers);

        response.body = behavior
            .render(page, request)
            .unwrap_or_else(|| self.render_part(storage, page, BODY_PART));
        response.status_code = behavior.response_code().unwrap_or(DEFAULT_RESPONSE_CODE);

        tracing::debug!(
            key = %page.key(),
            path = request.path(),
            status = response.status_code,
            bytes = response.body.len(),
            "Rendered page"
        );
    }

    /// Content of the part `name`, or an empty string.
    pub fn render_part(&self, storage: &dyn Storage, page: &Page, name: &str) -> String {
        if let Some(part) = page.part(name) {
            return part.content().to_owned();
        }
        if !self.inherit_parts {
            return String::new();
        }
        match page.inherited_part(storage, name) {
            Ok(part) => part.map(|part| part.content).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(key = %page.key(), part = name, error = %e, "Failed to look up inherited part");
                String::new()
            }
        }
    }
}
