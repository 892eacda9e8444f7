//! PJAX building blocks.
//!
//! jquery-pjax style clients ask for a fragment by sending an `X-PJAX`
//! header and add a `_pjax` query parameter as a cache buster. Views answer
//! with a full [`TemplateResponse`](crate::TemplateResponse); the decorators
//! here narrow it to a fragment when, and only when, the request asked.
//!
//! Most applications never use this module directly and configure
//! [`PjaxMiddleware`](crate::middleware::pjax::PjaxMiddleware) instead.

mod decorators;
mod expr;

pub use decorators::{
    pjax_block, pjax_template, BoxedView, Decorator, Fixed, PjaxBlock, PjaxDecorator,
    PjaxTemplate, View, DEFAULT_BLOCK,
};
pub use expr::parse_decorator;

use crate::request::Request;

/// Request header marking a fragment request.
pub const PJAX_HEADER: &str = "X-PJAX";

/// Query parameter jquery-pjax appends to fragment requests.
pub const PJAX_PARAMETER: &str = "_pjax";

/// Removes the `_pjax` cache-busting parameter so views and the URLs they
/// build never see it.
pub fn strip_pjax_parameter(req: &mut Request) {
    if req.remove_query_param(PJAX_PARAMETER) {
        tracing::trace!(path = req.path(), "stripped {PJAX_PARAMETER} parameter");
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    #[test]
    fn strips_reserved_parameter_only() {
        let mut req = Request::new(Method::GET, "/articles/?_pjax=%23main&page=2");
        strip_pjax_parameter(&mut req);
        assert_eq!(req.query_param(PJAX_PARAMETER), None);
        assert_eq!(req.query_param("page"), Some("2"));
        assert_eq!(req.query_string(), "page=2");
    }

    #[test]
    fn leaves_requests_without_it_alone() {
        let mut req = Request::new(Method::GET, "/articles/?page=2");
        strip_pjax_parameter(&mut req);
        assert_eq!(req.query_string(), "page=2");
    }
}
