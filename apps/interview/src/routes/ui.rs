use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// GET /
/// The single-page interview UI. Each page load starts a new session.
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
