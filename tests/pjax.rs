use http::{Method, StatusCode};
use tsu_pjax::middleware::pjax::PjaxMiddleware;
use tsu_pjax::{Error, Request, Router, Settings, TemplateResponse, Title};

/// Describes what would be rendered, so assertions can read the body.
fn describe(response: &TemplateResponse) -> Result<String, Error> {
    let template = response.templates().join("|");
    let Some(selection) = response.block() else {
        return Ok(format!("page {template}"));
    };
    let title = match &selection.title {
        Some(Title::Variable(var)) => response.context_data().get(var).cloned().unwrap_or_default(),
        Some(Title::Block(block)) => format!("<{block}>"),
        None => String::new(),
    };
    Ok(format!("block {template}#{} title={title}", selection.block))
}

async fn article(req: Request) -> TemplateResponse {
    TemplateResponse::new("article.html")
        .context("title", req.param("slug").unwrap_or_default())
        .context("query", req.query_string())
}

async fn home(_req: Request) -> TemplateResponse {
    TemplateResponse::new("home.html")
}

fn app() -> Router {
    let settings = Settings::from_toml_str(
        r#"
        [[decorated_urls]]
        pattern = "/articles/"
        decorators = "@pjax_block('content', title_variable='title')"

        [[decorated_urls]]
        pattern = "/articles/archive"
        decorators = ["@pjax_template()"]
        "#,
    )
    .unwrap();

    Router::new()
        .on(Method::GET, "/", home)
        .on(Method::GET, "/articles/{slug}", article)
        .middleware(PjaxMiddleware::from_settings(&settings).unwrap())
        .renderer(describe)
}

#[tokio::test]
async fn full_page_requests_are_not_decorated() {
    let response = app().handle(Request::new(Method::GET, "/articles/hello")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.body(), b"page article.html");
    assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
}

#[tokio::test]
async fn pjax_requests_render_the_configured_block() {
    let req = Request::new(Method::GET, "/articles/hello").with_header("X-PJAX", "true");
    let response = app().handle(req).await;
    assert_eq!(response.body(), b"block article.html#content title=hello");
}

#[tokio::test]
async fn all_matching_entries_apply_latest_first() {
    let req = Request::new(Method::GET, "/articles/archive").with_header("X-PJAX", "true");
    let response = app().handle(req).await;
    assert_eq!(response.body(), b"block article-pjax.html#content title=archive");
}

#[tokio::test]
async fn unmatched_paths_render_unchanged() {
    let req = Request::new(Method::GET, "/").with_header("X-PJAX", "true");
    let response = app().handle(req).await;
    assert_eq!(response.body(), b"page home.html");
}

#[tokio::test]
async fn views_never_see_the_pjax_parameter() {
    let router = Router::new()
        .on(Method::GET, "/echo", |req: Request| async move { req.query_string().to_owned() })
        .middleware(PjaxMiddleware::new(Vec::<(&str, &str)>::new()).unwrap());

    let response = router.handle(Request::new(Method::GET, "/echo?_pjax=%23main&page=2")).await;
    assert_eq!(response.body(), b"page=2");
}

#[tokio::test]
async fn decorator_failures_become_server_errors() {
    struct Failing;

    impl tsu_pjax::middleware::Middleware for Failing {
        fn process_template_response(
            &self,
            _req: &Request,
            _response: TemplateResponse,
        ) -> Result<TemplateResponse, Error> {
            Err(Error::Render("decorator failed".to_owned()))
        }
    }

    let router = Router::new().on(Method::GET, "/", home).middleware(Failing).renderer(describe);
    let response = router.handle(Request::new(Method::GET, "/")).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}
