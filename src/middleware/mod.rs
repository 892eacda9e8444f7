//! Middleware layer.
//!
//! Middleware sees every request before routing and every template response
//! before rendering. That is the right place for cross-cutting rewrites such
//! as [`pjax::PjaxMiddleware`], which narrows full pages to fragments.
//!
//! Order matters. For a router built as
//!
//! ```text
//! Router::new().middleware(a).middleware(b)
//! ```
//!
//! request hooks run `a` then `b`; template-response hooks run `b` then `a`,
//! so the first-registered middleware is the outermost one on both legs.

pub mod pjax;

use crate::error::Error;
use crate::request::Request;
use crate::template::TemplateResponse;

/// A request/response interceptor registered with
/// [`Router::middleware`](crate::Router::middleware).
///
/// Both hooks have pass-through defaults; implement the ones you need.
pub trait Middleware: Send + Sync + 'static {
    /// Runs before routing. May edit the request in place.
    fn process_request(&self, _req: &mut Request) {}

    /// Runs after the handler returned a [`TemplateResponse`], before it is
    /// rendered. Errors abort the request with `500 Internal Server Error`.
    fn process_template_response(
        &self,
        _req: &Request,
        response: TemplateResponse,
    ) -> Result<TemplateResponse, Error> {
        Ok(response)
    }
}

pub(crate) type BoxedMiddleware = Box<dyn Middleware>;
