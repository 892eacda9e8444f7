//! Radix-tree request router and the per-request pipeline.
//!
//! One tree per HTTP method. O(path-length) lookup. Around the lookup sit the
//! two middleware legs: request hooks before it, template-response hooks
//! (and the renderer) after the handler returns.

use std::collections::HashMap;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::error;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{BoxedMiddleware, Middleware};
use crate::request::Request;
use crate::response::Response;
use crate::template::{Render, TemplateResponse};

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every builder method returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    middleware: Vec<BoxedMiddleware>,
    renderer: Option<Box<dyn Render>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), middleware: Vec::new(), renderer: None }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use tsu_pjax::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn article(_: Request) -> Response { Response::text("") }
    /// # async fn index(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET, "/articles/",       index)
    ///     .on(Method::GET, "/articles/{slug}", article);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Appends a middleware. See [`crate::middleware`] for ordering.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Box::new(middleware));
        self
    }

    /// Sets the renderer used for [`TemplateResponse`]s.
    pub fn renderer(mut self, renderer: impl Render) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    /// Runs one request through middleware, routing, the handler and, for
    /// template responses, middleware again and the renderer.
    pub async fn handle(&self, mut req: Request) -> Response {
        for middleware in &self.middleware {
            middleware.process_request(&mut req);
        }

        let Some((handler, params)) = self.lookup(&req.method, &req.path) else {
            return Response::status(StatusCode::NOT_FOUND);
        };
        req.params = params;

        let head = req.head();
        let mut response = handler.call(req).await;
        let Some(template) = response.template.take() else {
            return response;
        };

        self.finish_template(&head, template).unwrap_or_else(|e| {
            error!(method = %head.method(), path = head.path(), "template response failed: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        })
    }

    fn finish_template(
        &self,
        req: &Request,
        mut template: TemplateResponse,
    ) -> Result<Response, Error> {
        for middleware in self.middleware.iter().rev() {
            template = middleware.process_template_response(req, template)?;
        }
        let renderer = self.renderer.as_ref()
            .ok_or_else(|| Error::Render("no renderer configured".to_owned()))?;
        let body = renderer.render(&template)?;
        Ok(Response::rendered(&template, body))
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(&BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
