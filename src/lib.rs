//! # tsu-pjax
//!
//! A minimal HTTP framework with PJAX partial-page rendering built in.
//!
//! ## The idea
//!
//! A PJAX client asks for a page with an `X-PJAX` header and swaps the
//! fragment it gets back into the current document. The server renders the
//! same view either way; only the template changes. Rather than decorating
//! views one by one, list the URL patterns that support fragments and the
//! decorators to apply, and let [`PjaxMiddleware`](middleware::pjax::PjaxMiddleware)
//! rewrite matching [`TemplateResponse`]s on the way out.
//!
//! - Radix-tree routing via [`matchit`]
//! - Async I/O on tokio + hyper, HTTP/1.1 and HTTP/2
//! - Graceful shutdown on SIGTERM / Ctrl-C
//! - Decorator configuration parsed and validated once, at startup
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::Method;
//! use tsu_pjax::middleware::pjax::PjaxMiddleware;
//! use tsu_pjax::{Error, Request, Router, Server, TemplateResponse};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let pjax = PjaxMiddleware::new([
//!         ("^/articles/", "@pjax_block('content', title_variable='title')"),
//!     ])?;
//!
//!     let app = Router::new()
//!         .on(Method::GET, "/articles/{slug}", article)
//!         .middleware(pjax)
//!         .renderer(render);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn article(req: Request) -> TemplateResponse {
//!     let slug = req.param("slug").unwrap_or_default();
//!     TemplateResponse::new("article.html").context("title", slug)
//! }
//!
//! fn render(response: &TemplateResponse) -> Result<String, Error> {
//!     // Hand the template names, context and block selection to your engine.
//!     # let _ = response;
//!     Ok(String::new())
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod settings;
mod template;

pub mod middleware;
pub mod pjax;

pub use error::{ConfigErrorKind, Error, ImproperlyConfigured};
pub use handler::Handler;
pub use request::Request;
pub use response::{IntoResponse, Response};
pub use router::Router;
pub use server::Server;
pub use settings::{DecoratedUrlSetting, Decorators, Settings};
pub use template::{BlockSelection, Render, TemplateResponse, Title};
