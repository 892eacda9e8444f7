//! Configuration-driven PJAX decoration.
//!
//! Instead of decorating every view by hand, list URL patterns and the
//! decorators to apply to them:
//!
//! ```rust
//! use tsu_pjax::middleware::pjax::PjaxMiddleware;
//!
//! let pjax = PjaxMiddleware::new([
//!     ("^/articles/", vec!["@pjax_block('content', title_variable='title')"]),
//!     ("^/articles/archive/", vec!["@pjax_template()", "@pjax_block('archive')"]),
//! ])
//! .unwrap();
//! assert_eq!(pjax.entries().len(), 2);
//! ```
//!
//! # Precedence
//!
//! Every entry whose pattern matches the request path applies, later
//! declarations first. Within an entry the first-listed decorator is the
//! outermost wrapper, exactly as if the list had been written above a view:
//! it runs last and has the final word on the response.

use regex::Regex;
use tracing::{debug, info};

use crate::error::{ConfigErrorKind, Error, ImproperlyConfigured};
use crate::pjax::{parse_decorator, strip_pjax_parameter, Decorator, Fixed, PjaxDecorator};
use crate::request::Request;
use crate::settings::{Decorators, Settings};
use crate::template::TemplateResponse;

use super::Middleware;

/// Anything usable as a URL pattern: a regex source string or a compiled
/// [`Regex`].
pub trait IntoUrlPattern {
    fn into_pattern_source(self) -> String;
}

impl IntoUrlPattern for &str {
    fn into_pattern_source(self) -> String { self.to_owned() }
}

impl IntoUrlPattern for String {
    fn into_pattern_source(self) -> String { self }
}

impl IntoUrlPattern for Regex {
    fn into_pattern_source(self) -> String { self.as_str().to_owned() }
}

impl IntoUrlPattern for &Regex {
    fn into_pattern_source(self) -> String { self.as_str().to_owned() }
}

/// One decorator expression or a sequence of them.
pub trait IntoDecorators {
    fn into_decorator_list(self) -> Vec<String>;
}

impl IntoDecorators for &str {
    fn into_decorator_list(self) -> Vec<String> { vec![self.to_owned()] }
}

impl IntoDecorators for String {
    fn into_decorator_list(self) -> Vec<String> { vec![self] }
}

impl<T: AsRef<str>> IntoDecorators for Vec<T> {
    fn into_decorator_list(self) -> Vec<String> {
        self.iter().map(|d| d.as_ref().to_owned()).collect()
    }
}

impl<T: AsRef<str>> IntoDecorators for &[T] {
    fn into_decorator_list(self) -> Vec<String> {
        self.iter().map(|d| d.as_ref().to_owned()).collect()
    }
}

impl<T: AsRef<str>, const N: usize> IntoDecorators for [T; N] {
    fn into_decorator_list(self) -> Vec<String> {
        self.iter().map(|d| d.as_ref().to_owned()).collect()
    }
}

impl IntoDecorators for Decorators {
    fn into_decorator_list(self) -> Vec<String> {
        match self {
            Self::One(d) => vec![d],
            Self::Many(ds) => ds,
        }
    }
}

/// A URL pattern and the decorators it triggers, in application order.
#[derive(Debug)]
pub struct DecoratedUrl {
    source: String,
    matcher: Regex,
    decorators: Vec<PjaxDecorator>,
}

impl DecoratedUrl {
    fn compile(source: String, decorators: Vec<String>) -> Result<Self, ImproperlyConfigured> {
        let matcher = Regex::new(&format!("^(?:{source})"))
            .map_err(|e| ImproperlyConfigured::new(&source, ConfigErrorKind::InvalidPattern(e)))?;
        let decorators = decorators.iter()
            .rev()
            .map(|d| parse_decorator(d))
            .collect::<Result<_, _>>()?;
        Ok(Self { source, matcher, decorators })
    }

    /// The pattern as configured.
    pub fn pattern(&self) -> &str { &self.source }

    pub fn decorators(&self) -> &[PjaxDecorator] { &self.decorators }

    /// Matches at the start of `path`; the pattern need not consume all of
    /// it unless it ends in `$`.
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}

/// Strips the `_pjax` parameter from requests and applies configured PJAX
/// decorators to template responses.
#[derive(Debug)]
pub struct PjaxMiddleware {
    decorated_urls: Vec<DecoratedUrl>,
}

impl PjaxMiddleware {
    /// Builds the decorator table from `(pattern, decorators)` pairs.
    ///
    /// Fails on the first bad pattern or decorator expression; there is no
    /// partially configured middleware.
    pub fn new<I, P, D>(config: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (P, D)>,
        P: IntoUrlPattern,
        D: IntoDecorators,
    {
        let mut decorated_urls = config.into_iter()
            .map(|(pattern, decorators)| -> Result<DecoratedUrl, ImproperlyConfigured> {
                let entry = DecoratedUrl::compile(
                    pattern.into_pattern_source(),
                    decorators.into_decorator_list(),
                )?;
                debug!(pattern = entry.pattern(), decorators = entry.decorators.len(), "PJAX url configured");
                Ok(entry)
            })
            .collect::<Result<Vec<_>, _>>()?;
        decorated_urls.reverse();

        info!(entries = decorated_urls.len(), "PJAX middleware ready");
        Ok(Self { decorated_urls })
    }

    /// Builds the table from loaded [`Settings`].
    pub fn from_settings(settings: &Settings) -> Result<Self, Error> {
        Self::new(
            settings.decorated_urls.iter()
                .map(|entry| (entry.pattern.as_str(), entry.decorators.clone())),
        )
    }

    /// The table in lookup order: last-declared entry first.
    pub fn entries(&self) -> &[DecoratedUrl] {
        &self.decorated_urls
    }

    /// Runs every matching entry's decorators over `response`.
    ///
    /// Each decorator wraps a [`Fixed`] view holding the response so far, so
    /// the original handler never runs twice. Decorator errors are returned
    /// as-is.
    pub fn apply(&self, req: &Request, mut response: TemplateResponse) -> Result<TemplateResponse, Error> {
        for entry in self.decorated_urls.iter().filter(|e| e.matches(req.path())) {
            debug!(pattern = entry.pattern(), path = req.path(), "applying PJAX decorators");
            for decorator in &entry.decorators {
                response = decorator.decorate(Box::new(Fixed::new(response))).call(req)?;
            }
        }
        Ok(response)
    }
}

impl Middleware for PjaxMiddleware {
    fn process_request(&self, req: &mut Request) {
        strip_pjax_parameter(req);
    }

    fn process_template_response(
        &self,
        req: &Request,
        response: TemplateResponse,
    ) -> Result<TemplateResponse, Error> {
        self.apply(req, response)
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::pjax::{pjax_block, pjax_template};
    use crate::template::{BlockSelection, Title};

    fn pjax(path: &str) -> Request {
        Request::new(Method::GET, path).with_header("X-PJAX", "true")
    }

    #[test]
    fn table_and_decorator_lists_are_reversed() {
        let middleware = PjaxMiddleware::new([
            ("^/a/", vec!["@pjax_block('one')"]),
            ("^/b/", vec!["@pjax_block('x')", "@pjax_template('y.html')"]),
        ])
        .unwrap();

        let entries = middleware.entries();
        assert_eq!(entries[0].pattern(), "^/b/");
        assert_eq!(
            entries[0].decorators(),
            [PjaxDecorator::from(pjax_template(Some("y.html"))), PjaxDecorator::from(pjax_block("x"))],
        );
        assert_eq!(entries[1].pattern(), "^/a/");
        assert_eq!(entries[1].decorators(), [PjaxDecorator::from(pjax_block("one"))]);
    }

    #[test]
    fn bare_string_and_compiled_regex_are_accepted() {
        let middleware = PjaxMiddleware::new([(Regex::new("/x").unwrap(), "@pjax_template()")]).unwrap();
        assert_eq!(middleware.entries()[0].decorators().len(), 1);
        assert!(middleware.entries()[0].matches("/x/y"));
    }

    #[test]
    fn matching_is_anchored_at_the_start_only() {
        let middleware = PjaxMiddleware::new([("/blog", "@pjax_block()"), ("/exact/$", "@pjax_block()")]).unwrap();
        let [exact, blog] = middleware.entries() else { panic!("two entries") };

        assert!(blog.matches("/blog"));
        assert!(blog.matches("/blog/post/1"));
        assert!(!blog.matches("/archive/blog"));
        assert!(exact.matches("/exact/"));
        assert!(!exact.matches("/exact/more"));
    }

    #[test]
    fn alternation_does_not_escape_the_anchor() {
        let middleware = PjaxMiddleware::new([("/a|/b", "@pjax_block()")]).unwrap();
        assert!(middleware.entries()[0].matches("/b/c"));
        assert!(!middleware.entries()[0].matches("/c/b"));
    }

    #[test]
    fn one_bad_decorator_fails_construction() {
        let err = PjaxMiddleware::new([
            ("^/a/", vec!["@pjax_block()"]),
            ("^/b/", vec!["@pjax_block()", "@pjax_block(1)"]),
        ])
        .unwrap_err();

        let Error::ImproperlyConfigured(e) = err else { panic!("expected a configuration error") };
        assert_eq!(e.expr, "@pjax_block(1)");
        assert!(matches!(e.kind, ConfigErrorKind::NonStringArgument));
    }

    #[test]
    fn bad_pattern_fails_construction() {
        let err = PjaxMiddleware::new([("^/(unclosed", "@pjax_block()")]).unwrap_err();
        assert!(matches!(
            err,
            Error::ImproperlyConfigured(ImproperlyConfigured { kind: ConfigErrorKind::InvalidPattern(_), .. })
        ));
    }

    #[test]
    fn later_entries_apply_first_and_first_listed_decorator_last() {
        let middleware = PjaxMiddleware::new([
            ("^/", vec!["@pjax_block('outer', title_block='t')"]),
            ("^/docs/", vec!["@pjax_block('first')", "@pjax_block('second')"]),
        ])
        .unwrap();

        let response = middleware.apply(&pjax("/docs/intro"), TemplateResponse::new("docs.html")).unwrap();

        // "/docs/" entry: second, then first. "/" entry: outer, last of all.
        assert_eq!(
            response.block(),
            Some(&BlockSelection { block: "outer".into(), title: Some(Title::Block("t".into())) }),
        );
    }

    #[test]
    fn unmatched_paths_are_left_alone() {
        let middleware = PjaxMiddleware::new([("^/docs/", "@pjax_template('frag.html')")]).unwrap();
        let original = TemplateResponse::new("home.html").context("k", "v");
        let response = middleware.apply(&pjax("/"), original.clone()).unwrap();
        assert_eq!(response, original);
    }

    #[test]
    fn decorators_compose_on_the_same_response() {
        let middleware = PjaxMiddleware::from_settings(&Settings::from_toml_str(
            r#"
            [[decorated_urls]]
            pattern = "^/docs/"
            decorators = ["@pjax_block('main')", "@pjax_template()"]
            "#,
        ).unwrap()).unwrap();

        let response = middleware.apply(&pjax("/docs/"), TemplateResponse::new("docs.html")).unwrap();
        assert_eq!(response.templates(), ["docs-pjax.html"]);
        assert_eq!(response.block().map(|b| b.block.as_str()), Some("main"));
    }

    #[test]
    fn request_hook_strips_parameter() {
        let middleware = PjaxMiddleware::new(Vec::<(&str, &str)>::new()).unwrap();
        let mut req = Request::new(Method::GET, "/?_pjax=1&q=x");
        middleware.process_request(&mut req);
        assert_eq!(req.query_string(), "q=x");
    }
}
