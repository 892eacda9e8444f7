//! The two PJAX view decorators and the view protocol they wrap.
//!
//! A decorator takes a [`View`] and returns a new one that calls the original
//! and, for PJAX requests only, rewrites the [`TemplateResponse`] it produced.
//! Full-page requests pass through untouched.

use std::fmt;

use crate::error::Error;
use crate::request::Request;
use crate::template::{BlockSelection, TemplateResponse, Title};

/// Something that answers a request with a template response.
pub trait View: Send + Sync {
    fn call(&self, req: &Request) -> Result<TemplateResponse, Error>;
}

pub type BoxedView = Box<dyn View>;

impl<F> View for F
where
    F: Fn(&Request) -> Result<TemplateResponse, Error> + Send + Sync,
{
    fn call(&self, req: &Request) -> Result<TemplateResponse, Error> {
        self(req)
    }
}

/// Wraps a view in another view.
pub trait Decorator: Send + Sync + fmt::Debug {
    fn decorate(&self, view: BoxedView) -> BoxedView;
}

/// A view that ignores its request and hands back a response produced
/// earlier.
///
/// Lets middleware run view decorators over a response that already exists
/// without executing the real handler again. Every call answers with the
/// same response.
pub struct Fixed(TemplateResponse);

impl Fixed {
    pub fn new(response: TemplateResponse) -> Self {
        Self(response)
    }
}

impl View for Fixed {
    fn call(&self, _req: &Request) -> Result<TemplateResponse, Error> {
        Ok(self.0.clone())
    }
}

// ── pjax_block ────────────────────────────────────────────────────────────────

/// Block rendered when `pjax_block` is given no block name.
pub const DEFAULT_BLOCK: &str = "content";

/// Renders only one block of the view's template for PJAX requests.
///
/// ```rust
/// use tsu_pjax::pjax::pjax_block;
///
/// let decorator = pjax_block("content").title_variable("title");
/// ```
pub fn pjax_block(block: &str) -> PjaxBlock {
    PjaxBlock { selection: BlockSelection { block: block.to_owned(), title: None } }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PjaxBlock {
    selection: BlockSelection,
}

impl PjaxBlock {
    /// Take the fragment's title from a context variable.
    pub fn title_variable(mut self, variable: &str) -> Self {
        self.selection.title = Some(Title::Variable(variable.to_owned()));
        self
    }

    /// Render the fragment's title from another block of the template.
    pub fn title_block(mut self, block: &str) -> Self {
        self.selection.title = Some(Title::Block(block.to_owned()));
        self
    }

    pub fn selection(&self) -> &BlockSelection { &self.selection }
}

impl Decorator for PjaxBlock {
    fn decorate(&self, view: BoxedView) -> BoxedView {
        let selection = self.selection.clone();
        Box::new(move |req: &Request| {
            let mut response = view.call(req)?;
            if req.is_pjax() {
                response.set_block(selection.clone());
            }
            Ok(response)
        })
    }
}

// ── pjax_template ─────────────────────────────────────────────────────────────

/// Swaps the view's template for a fragment template on PJAX requests.
///
/// With `None`, each candidate `name.ext` becomes `name-pjax.ext`.
pub fn pjax_template(template: Option<&str>) -> PjaxTemplate {
    PjaxTemplate { template: template.map(str::to_owned) }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PjaxTemplate {
    template: Option<String>,
}

impl PjaxTemplate {
    pub fn template(&self) -> Option<&str> { self.template.as_deref() }
}

impl Decorator for PjaxTemplate {
    fn decorate(&self, view: BoxedView) -> BoxedView {
        let template = self.template.clone();
        Box::new(move |req: &Request| {
            let mut response = view.call(req)?;
            if req.is_pjax() {
                let templates = match &template {
                    Some(name) => vec![name.clone()],
                    None => response.templates().iter().map(|t| pjaxify(t)).collect(),
                };
                response.set_templates(templates);
            }
            Ok(response)
        })
    }
}

/// `"blog/post.html"` → `"blog/post-pjax.html"`. A leading dot in the file
/// name does not start an extension.
fn pjaxify(template: &str) -> String {
    let file_start = template.rfind('/').map_or(0, |i| i + 1);
    match template[file_start..].rfind('.') {
        Some(dot) if template[file_start..][..dot].trim_start_matches('.').is_empty() => {
            format!("{template}-pjax")
        }
        Some(dot) => {
            let (stem, ext) = template.split_at(file_start + dot);
            format!("{stem}-pjax{ext}")
        }
        None => format!("{template}-pjax"),
    }
}

// ── Parsed decorators ─────────────────────────────────────────────────────────

/// One of the two whitelisted decorators, as produced by
/// [`parse_decorator`](super::parse_decorator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PjaxDecorator {
    Block(PjaxBlock),
    Template(PjaxTemplate),
}

impl Decorator for PjaxDecorator {
    fn decorate(&self, view: BoxedView) -> BoxedView {
        match self {
            Self::Block(d) => d.decorate(view),
            Self::Template(d) => d.decorate(view),
        }
    }
}

impl From<PjaxBlock> for PjaxDecorator {
    fn from(d: PjaxBlock) -> Self { Self::Block(d) }
}

impl From<PjaxTemplate> for PjaxDecorator {
    fn from(d: PjaxTemplate) -> Self { Self::Template(d) }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    fn pjax_request() -> Request {
        Request::new(Method::GET, "/").with_header("X-PJAX", "true")
    }

    fn run(decorator: &dyn Decorator, req: &Request, response: TemplateResponse) -> TemplateResponse {
        decorator.decorate(Box::new(Fixed::new(response))).call(req).unwrap()
    }

    #[test]
    fn pjaxify_inserts_suffix_before_extension() {
        assert_eq!(pjaxify("post.html"), "post-pjax.html");
        assert_eq!(pjaxify("blog.v2/post.html"), "blog.v2/post-pjax.html");
        assert_eq!(pjaxify("blog.v2/post"), "blog.v2/post-pjax");
        assert_eq!(pjaxify(".hidden"), ".hidden-pjax");
        assert_eq!(pjaxify("archive.tar.gz"), "archive.tar-pjax.gz");
    }

    #[test]
    fn block_applies_only_to_pjax_requests() {
        let decorator = pjax_block("body").title_block("title");
        let page = TemplateResponse::new("page.html");

        let full = run(&decorator, &Request::new(Method::GET, "/"), page.clone());
        assert_eq!(full.block(), None);

        let fragment = run(&decorator, &pjax_request(), page);
        assert_eq!(
            fragment.block(),
            Some(&BlockSelection { block: "body".into(), title: Some(Title::Block("title".into())) }),
        );
        assert_eq!(fragment.templates(), ["page.html"]);
    }

    #[test]
    fn template_replaces_or_derives_names() {
        let page = TemplateResponse::with_candidates(["a.html".to_owned(), "b.html".to_owned()]);

        let explicit = run(&pjax_template(Some("frag.html")), &pjax_request(), page.clone());
        assert_eq!(explicit.templates(), ["frag.html"]);

        let derived = run(&pjax_template(None), &pjax_request(), page.clone());
        assert_eq!(derived.templates(), ["a-pjax.html", "b-pjax.html"]);

        let untouched = run(&pjax_template(None), &Request::new(Method::GET, "/"), page);
        assert_eq!(untouched.templates(), ["a.html", "b.html"]);
    }

    #[test]
    fn fixed_view_answers_every_call_with_its_response() {
        let page = TemplateResponse::new("x.html").context("k", "v");
        let view = Fixed::new(page.clone());
        let req = Request::new(Method::GET, "/");
        assert_eq!(view.call(&req).unwrap(), page);
        assert_eq!(view.call(&pjax_request()).unwrap(), page);
    }

    #[test]
    fn decorator_errors_propagate() {
        let failing: BoxedView = Box::new(|_: &Request| -> Result<TemplateResponse, Error> {
            Err(Error::Render("boom".into()))
        });
        let result = pjax_block("content").decorate(failing).call(&pjax_request());
        assert!(matches!(result, Err(Error::Render(msg)) if msg == "boom"));
    }
}
