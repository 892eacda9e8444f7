//! Minimal tsu-pjax example — one article page served whole or as a fragment.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!   PJAX_SETTINGS=pjax.toml cargo run --example basic   # custom decorator table
//!
//! Try:
//!   curl http://localhost:3000/articles/hello
//!   curl -H 'X-PJAX: true' 'http://localhost:3000/articles/hello?_pjax=%23main'

use http::Method;
use tsu_pjax::middleware::pjax::PjaxMiddleware;
use tsu_pjax::{DecoratedUrlSetting, Decorators, Error, Request, Router, Server, Settings, TemplateResponse, Title};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let settings = match std::env::var("PJAX_SETTINGS") {
        Ok(path) => Settings::load(path)?,
        Err(_) => Settings {
            decorated_urls: vec![DecoratedUrlSetting {
                pattern: "^/articles/".to_owned(),
                decorators: Decorators::One("@pjax_block('content', title_variable='title')".to_owned()),
            }],
        },
    };

    let app = Router::new()
        .on(Method::GET, "/articles/{slug}", article)
        .middleware(PjaxMiddleware::from_settings(&settings)?)
        .renderer(render);

    Server::bind("0.0.0.0:3000").serve(app).await
}

// GET /articles/{slug}
async fn article(req: Request) -> TemplateResponse {
    let slug = req.param("slug").unwrap_or("unknown");
    TemplateResponse::new("article.html")
        .context("title", slug)
        .context("body", format!("All about {slug}."))
}

// A stand-in for a real template engine: one hard-coded layout with a
// `content` block.
fn render(response: &TemplateResponse) -> Result<String, Error> {
    let ctx = response.context_data();
    let title = ctx.get("title").map_or("", String::as_str);
    let content = format!("<article>{}</article>", ctx.get("body").map_or("", String::as_str));

    match response.block() {
        None => Ok(format!(
            "<html><head><title>{title}</title></head><body><main>{content}</main></body></html>"
        )),
        Some(selection) if selection.block == "content" => {
            let title = match &selection.title {
                Some(Title::Variable(var)) => ctx.get(var).map_or("", String::as_str),
                _ => "",
            };
            Ok(format!("<title>{title}</title>{content}"))
        }
        Some(selection) => Err(Error::Render(format!("no block named `{}`", selection.block))),
    }
}
