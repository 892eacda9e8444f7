//! Deferred template responses.
//!
//! A handler that returns a [`TemplateResponse`] has decided *what* to render
//! but not yet rendered it. Middleware gets a chance to rewrite the decision
//! (swap the template, narrow it to a single block) before the application's
//! [`Render`] implementation turns it into bytes. tsu ships no template
//! engine; bring your own.

use std::collections::BTreeMap;

use http::StatusCode;

use crate::error::Error;

/// Where the page title of a block-only render comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Title {
    /// Read the title from this context variable.
    Variable(String),
    /// Render this block of the same template as the title.
    Block(String),
}

/// Restricts rendering to one block of the chosen template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockSelection {
    pub block: String,
    pub title: Option<Title>,
}

/// A response whose body is produced by rendering a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateResponse {
    templates: Vec<String>,
    context: BTreeMap<String, String>,
    block: Option<BlockSelection>,
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl TemplateResponse {
    /// `200 OK` rendering `template` with an empty context.
    pub fn new(template: impl Into<String>) -> Self {
        Self::with_candidates([template.into()])
    }

    /// Renders the first template in `candidates` that exists.
    pub fn with_candidates(candidates: impl IntoIterator<Item = String>) -> Self {
        Self {
            templates: candidates.into_iter().collect(),
            context: BTreeMap::new(),
            block: None,
            status: StatusCode::OK,
            headers: Vec::new(),
        }
    }

    pub fn context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Candidate template names, most preferred first.
    pub fn templates(&self) -> &[String] { &self.templates }
    pub fn context_data(&self) -> &BTreeMap<String, String> { &self.context }
    pub fn block(&self) -> Option<&BlockSelection> { self.block.as_ref() }
    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    pub fn set_templates(&mut self, templates: Vec<String>) {
        self.templates = templates;
    }

    pub fn set_block(&mut self, block: BlockSelection) {
        self.block = Some(block);
    }
}

/// Turns a [`TemplateResponse`] into a response body.
///
/// Implementations must honour [`TemplateResponse::block`]: when set, only
/// that block (and the title, if one is requested) is rendered.
pub trait Render: Send + Sync + 'static {
    fn render(&self, response: &TemplateResponse) -> Result<String, Error>;
}

impl<F> Render for F
where
    F: Fn(&TemplateResponse) -> Result<String, Error> + Send + Sync + 'static,
{
    fn render(&self, response: &TemplateResponse) -> Result<String, Error> {
        self(response)
    }
}
