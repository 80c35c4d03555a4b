use crate::history::Trail;
use crate::session::HIGHLIGHT_DURATION;
use crate::{ALL_CATEGORIES, Term, TermStore, filter_terms};
use askama::Html as HtmlEscaper;
use askama::{MarkupDisplay, Template};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use cookie::Cookie;
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;
type SafeJson = MarkupDisplay<HtmlEscaper, String>;

/// Session cookie carrying the navigation trail. No expiry, so it dies with
/// the browser session.
const TRAIL_COOKIE: &str = "termgloss_trail";

pub struct AppState {
    pub store: TermStore,
    pub theme: WebTheme,
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum WebTheme {
    #[default]
    Tailwind,
    Bootstrap,
}

impl fmt::Display for WebTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebTheme::Tailwind => write!(f, "tailwind"),
            WebTheme::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    use_tailwind: bool,
    use_bootstrap: bool,
    body_class: &'static str,
    main_class: &'static str,
    shell_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    button_class: &'static str,
    pill_class: &'static str,
    pill_active_class: &'static str,
    card_class: &'static str,
    crumb_class: &'static str,
}

impl Chrome {
    fn new(theme: WebTheme) -> Self {
        match theme {
            WebTheme::Tailwind => Self {
                use_tailwind: true,
                use_bootstrap: false,
                body_class: "bg-slate-50 text-slate-900",
                main_class: "min-h-screen flex flex-col items-center justify-start py-10 px-4",
                shell_class: "max-w-4xl w-full space-y-6",
                eyebrow_class: "uppercase tracking-wide text-sm text-slate-500",
                headline_class: "text-4xl font-extrabold tracking-tight",
                lede_class: "text-lg text-slate-600",
                button_class: "inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold shadow hover:bg-slate-800 transition-colors",
                pill_class: "px-3 py-1 rounded-full bg-slate-200 text-sm text-slate-700 hover:bg-slate-300",
                pill_active_class: "px-3 py-1 rounded-full bg-slate-900 text-sm text-white",
                card_class: "bg-white shadow rounded p-4",
                crumb_class: "text-blue-700 hover:underline",
            },
            WebTheme::Bootstrap => Self {
                use_tailwind: false,
                use_bootstrap: true,
                body_class: "bg-light text-dark",
                main_class: "container py-5",
                shell_class: "mx-auto col-lg-9",
                eyebrow_class: "text-uppercase text-muted mb-2",
                headline_class: "display-5 fw-bold",
                lede_class: "lead mb-4",
                button_class: "btn btn-primary px-4 py-2",
                pill_class: "badge rounded-pill text-bg-secondary",
                pill_active_class: "badge rounded-pill text-bg-dark",
                card_class: "card card-body mb-3",
                crumb_class: "link-primary",
            },
        }
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub theme: WebTheme,
    pub base_url: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            theme: WebTheme::default(),
            base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

/// Serves the glossary browser over HTTP. The store is loaded by the caller
/// so that dataset failures surface before a socket is ever bound.
pub async fn serve(store: TermStore, config: WebConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        store,
        theme: config.theme,
        base_url: config.base_url.clone(),
    });
    let router = build_router(state);
    info!(
        %config.addr,
        theme = ?config.theme,
        base = %config.base_url,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(browse_html))
        .route("/term", get(navigate))
        .route("/trail/clear", get(clear_trail))
        .route("/api/terms", get(api_terms))
        .route("/api/term", get(api_term))
        .route("/api/trail", get(api_trail))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "termgloss-web" }))
}

#[derive(Debug, Deserialize)]
struct BrowseParams {
    category: Option<String>,
    q: Option<String>,
    focus: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NavigateParams {
    id: Option<String>,
    from: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TermParams {
    id: Option<String>,
}

async fn browse_html(
    State(state): State<SharedState>,
    Query(params): Query<BrowseParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let category = params
        .category
        .unwrap_or_else(|| ALL_CATEGORIES.to_string());
    let query = params.q.unwrap_or_default();
    let focus = params.focus.unwrap_or_default();
    let trail = trail_from_headers(&headers);
    let payload = build_browse_payload(&state.store, &category, &query, &focus, &trail);
    let chrome = Chrome::new(state.theme);
    let json_ld = MarkupDisplay::new_safe(glossary_json_ld(&state.store, &state.base_url), HtmlEscaper);
    let template = BrowseTemplate {
        chrome,
        payload: &payload,
        json_ld,
        base_url: &state.base_url,
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(state.theme, err.to_string())),
    )
}

/// Navigation event: a related-term click (`from` absent) appends to the
/// trail, a breadcrumb click (`from=trail`) truncates back to the clicked
/// entry. Either way the redirect lands on an unfiltered browse page focused
/// on the target, so the term is visible regardless of prior filter state.
async fn navigate(
    State(state): State<SharedState>,
    Query(params): Query<NavigateParams>,
    headers: HeaderMap,
) -> Response {
    let Some(id) = params.id.filter(|id| !id.is_empty()) else {
        return Redirect::to("/").into_response();
    };
    if state.store.get_by_id(&id).is_none() {
        warn!(%id, "navigation target not in store; ignoring");
        return Redirect::to("/").into_response();
    }
    let mut trail = trail_from_headers(&headers);
    if params.from.as_deref() == Some("trail") {
        trail.truncate_after(&id);
    } else {
        trail.push(&id);
    }
    // The fragment stays unencoded so the anchor matches the element id.
    let location = format!("/?focus={}#term-{id}", encode_component(&id));
    (
        [(header::SET_COOKIE, trail_cookie(&trail))],
        Redirect::to(&location),
    )
        .into_response()
}

async fn clear_trail() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, trail_cookie(&Trail::new()))],
        Redirect::to("/"),
    )
}

async fn api_terms(
    State(state): State<SharedState>,
    Query(params): Query<BrowseParams>,
) -> Json<TermListPayload> {
    let category = params
        .category
        .unwrap_or_else(|| ALL_CATEGORIES.to_string());
    let query = params.q.unwrap_or_default();
    let results = filter_terms(&state.store, &category, &query)
        .into_iter()
        .map(|term| TermPayload::from_term(term, &state.store))
        .collect::<Vec<_>>();
    Json(TermListPayload {
        category,
        query,
        count: results.len(),
        total: state.store.terms().len(),
        results,
    })
}

async fn api_term(
    State(state): State<SharedState>,
    Query(params): Query<TermParams>,
) -> Result<Json<TermPayload>, ApiError> {
    let id = params
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter `id` is required"))?;
    let term = state
        .store
        .get_by_id(id)
        .ok_or_else(|| ApiError::not_found(format!("No term found for id {id:?}")))?;
    Ok(Json(TermPayload::from_term(term, &state.store)))
}

async fn api_trail(State(state): State<SharedState>, headers: HeaderMap) -> Json<TrailPayload> {
    let trail = trail_from_headers(&headers);
    let terms = trail
        .display_list(&state.store)
        .into_iter()
        .map(|term| TermPayload::from_term(term, &state.store))
        .collect();
    Json(TrailPayload {
        ids: trail.ids().to_vec(),
        terms,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RelatedLinkPayload {
    name: String,
    id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TermPayload {
    id: String,
    term: String,
    full_form: Option<String>,
    definition: String,
    category: String,
    related_terms: Vec<RelatedLinkPayload>,
    examples: Vec<String>,
}

impl TermPayload {
    fn from_term(term: &Term, store: &TermStore) -> Self {
        Self {
            id: term.id.clone(),
            term: term.term.clone(),
            full_form: term.full_form.clone(),
            definition: term.definition.clone(),
            category: term.category.clone(),
            related_terms: store
                .related_links(term)
                .into_iter()
                .map(|link| RelatedLinkPayload {
                    name: link.name,
                    id: link.id,
                })
                .collect(),
            examples: term.examples.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TermListPayload {
    category: String,
    query: String,
    count: usize,
    total: usize,
    results: Vec<TermPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrailPayload {
    ids: Vec<String>,
    terms: Vec<TermPayload>,
}

#[derive(Debug, Clone)]
struct CategoryPill {
    name: String,
    href: String,
    active: bool,
}

#[derive(Debug, Clone)]
struct RelatedLinkView {
    name: String,
    href: Option<String>,
}

#[derive(Debug, Clone)]
struct CrumbView {
    name: String,
    href: String,
}

#[derive(Debug, Clone)]
struct TermCard {
    id: String,
    name: String,
    full_form: Option<String>,
    category: String,
    definition_html: String,
    examples: Vec<String>,
    related: Vec<RelatedLinkView>,
    focused: bool,
}

#[derive(Debug, Clone)]
struct BrowsePayload {
    category: String,
    query: String,
    visible: usize,
    total: usize,
    pills: Vec<CategoryPill>,
    cards: Vec<TermCard>,
    crumbs: Vec<CrumbView>,
    focus: String,
    highlight_ms: u128,
}

fn build_browse_payload(
    store: &TermStore,
    category: &str,
    query: &str,
    focus: &str,
    trail: &Trail,
) -> BrowsePayload {
    let visible = filter_terms(store, category, query);
    let cards = visible
        .iter()
        .map(|term| TermCard {
            id: term.id.clone(),
            name: term.term.clone(),
            full_form: term.full_form.clone(),
            category: term.category.clone(),
            definition_html: markdown::to_html(&term.definition),
            examples: term.examples.clone(),
            related: store
                .related_links(term)
                .into_iter()
                .map(|link| RelatedLinkView {
                    href: link.id.as_deref().map(term_path),
                    name: link.name,
                })
                .collect(),
            focused: !focus.is_empty() && term.id == focus,
        })
        .collect::<Vec<_>>();
    let mut pills = vec![CategoryPill {
        name: "All".to_string(),
        href: browse_path(ALL_CATEGORIES, query),
        active: category == ALL_CATEGORIES,
    }];
    pills.extend(store.categories().iter().map(|name| CategoryPill {
        name: name.clone(),
        href: browse_path(name, query),
        active: category == name,
    }));
    let crumbs = trail
        .display_list(store)
        .into_iter()
        .map(|term| CrumbView {
            name: term.term.clone(),
            href: format!("/term?id={}&from=trail", encode_component(&term.id)),
        })
        .collect();
    BrowsePayload {
        category: category.to_string(),
        query: query.to_string(),
        visible: cards.len(),
        total: store.terms().len(),
        pills,
        cards,
        crumbs,
        focus: focus.to_string(),
        highlight_ms: HIGHLIGHT_DURATION.as_millis(),
    }
}

fn trail_from_headers(headers: &HeaderMap) -> Trail {
    let Some(raw) = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
    else {
        return Trail::new();
    };
    for cookie in Cookie::split_parse(raw.to_string()).flatten() {
        if cookie.name() == TRAIL_COOKIE {
            let decoded = percent_decode_str(cookie.value())
                .decode_utf8()
                .map(|s| s.into_owned())
                .unwrap_or_default();
            return Trail::from_json(&decoded);
        }
    }
    Trail::new()
}

fn trail_cookie(trail: &Trail) -> String {
    let value = encode_component(&trail.to_json());
    Cookie::build((TRAIL_COOKIE, value))
        .path("/")
        .http_only(true)
        .build()
        .to_string()
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

fn term_path(id: &str) -> String {
    format!("/term?id={}", encode_component(id))
}

fn browse_path(category: &str, query: &str) -> String {
    if query.is_empty() {
        format!("/?category={}", encode_component(category))
    } else {
        format!(
            "/?category={}&q={}",
            encode_component(category),
            encode_component(query)
        )
    }
}

fn glossary_json_ld(store: &TermStore, base_url: &str) -> String {
    serde_json::to_string_pretty(&json!({
        "@context": "https://schema.org",
        "@type": "DefinedTermSet",
        "@id": base_url,
        "name": "Termgloss Glossary",
        "url": base_url,
        "numberOfItems": store.terms().len(),
    }))
    .unwrap_or_else(|_| "{}".to_string())
}

fn render_error_page(theme: WebTheme, message: impl Into<String>) -> String {
    let chrome = Chrome::new(theme);
    let (css_tag, js_tag) = theme_tags(theme);
    let message = message.into();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Termgloss • Error</title>
    {css_tag}
    {js_tag}
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <div class="{shell_class}">
        <h1 class="{headline_class}">Something went wrong</h1>
        <p class="{lede_class}">{message}</p>
        <a href="/" class="{button_class}">Back to the glossary</a>
      </div>
    </main>
  </body>
</html>"#,
        css_tag = css_tag,
        js_tag = js_tag,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        shell_class = chrome.shell_class,
        headline_class = chrome.headline_class,
        lede_class = chrome.lede_class,
        button_class = chrome.button_class,
        message = message,
    )
}

fn theme_tags(theme: WebTheme) -> (&'static str, &'static str) {
    match theme {
        WebTheme::Tailwind => (
            r#"<script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>"#,
            "",
        ),
        WebTheme::Bootstrap => (
            r#"<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">"#,
            r#"<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/js/bootstrap.bundle.min.js" integrity="sha384-FKyoEForCGlyvwx9Hj09JcYn3nv7wiPVlz7YYwJrWVcXK/BmnVDxM+D2scQbITxI" crossorigin="anonymous"></script>"#,
        ),
    }
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Termgloss • Glossary</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">
    <script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/js/bootstrap.bundle.min.js" integrity="sha384-FKyoEForCGlyvwx9Hj09JcYn3nv7wiPVlz7YYwJrWVcXK/BmnVDxM+D2scQbITxI" crossorigin="anonymous"></script>
    {% endif %}
    <link rel="canonical" href="{{ base_url }}/">
    <style>.term-highlight { outline: 3px solid #f59e0b; outline-offset: 2px; }</style>
    <script type="application/ld+json">
    {{ json_ld }}
    </script>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.shell_class }} space-y-6">
        <div>
          <p class="{{ chrome.eyebrow_class }}">Glossary browser</p>
          <h1 class="{{ chrome.headline_class }}">Glossary</h1>
          <p class="{{ chrome.lede_class }}">Showing {{ payload.visible }} of {{ payload.total }} terms.</p>
        </div>

        <form action="/" method="get" class="flex flex-wrap gap-2 d-flex">
          <input type="text" name="q" value="{{ payload.query }}" placeholder="Search terms…"
                 class="flex-1 rounded border border-slate-300 px-3 py-2 form-control" />
          <input type="hidden" name="category" value="{{ payload.category }}" />
          <button type="submit" class="{{ chrome.button_class }}">Search</button>
        </form>

        <nav class="flex flex-wrap gap-2 d-flex" aria-label="Categories">
          {% for pill in payload.pills %}
          {% if pill.active %}
          <a href="{{ pill.href }}" class="{{ chrome.pill_active_class }}">{{ pill.name }}</a>
          {% else %}
          <a href="{{ pill.href }}" class="{{ chrome.pill_class }}">{{ pill.name }}</a>
          {% endif %}
          {% endfor %}
        </nav>

        {% if payload.crumbs.len() > 0 %}
        <nav class="text-sm text-slate-600" aria-label="Visited terms">
          <span class="font-semibold">Trail:</span>
          {% for crumb in payload.crumbs %}
          {% if loop.first %}{% else %} › {% endif %}
          <a href="{{ crumb.href }}" class="{{ chrome.crumb_class }}">{{ crumb.name }}</a>
          {% endfor %}
          <a href="/trail/clear" class="ms-2 ml-2 text-slate-500 hover:underline">clear</a>
        </nav>
        {% endif %}

        {% if payload.cards.len() == 0 %}
        <p>No terms match the current filters.</p>
        {% endif %}
        <div class="space-y-4">
          {% for card in payload.cards %}
          <article id="term-{{ card.id }}" class="{{ chrome.card_class }}{% if card.focused %} term-highlight{% endif %}">
            <p class="text-sm text-slate-500 mb-1">{{ card.category }}</p>
            <h2 class="text-xl font-semibold">{{ card.name }}</h2>
            {% if card.full_form.is_some() %}
            <p class="text-sm italic text-slate-600">{{ card.full_form.as_ref().unwrap() }}</p>
            {% endif %}
            <div class="prose prose-slate max-w-none">{{ card.definition_html|safe }}</div>
            {% if card.examples.len() > 0 %}
            <ul class="list-disc pl-6 text-sm text-slate-600 mt-2">
              {% for example in card.examples %}
              <li><code>{{ example }}</code></li>
              {% endfor %}
            </ul>
            {% endif %}
            {% if card.related.len() > 0 %}
            <p class="text-sm mt-2"><strong>Related:</strong>
              {% for link in card.related %}
              {% if link.href.is_some() %}
              <a href="{{ link.href.as_ref().unwrap() }}" class="{{ chrome.crumb_class }}">{{ link.name }}</a>
              {% else %}
              <span class="text-slate-400" title="not in this glossary">{{ link.name }}</span>
              {% endif %}
              {% endfor %}
            </p>
            {% endif %}
          </article>
          {% endfor %}
        </div>
      </div>
    </main>
    {% if payload.focus.len() > 0 %}
    <script>
      setTimeout(function () {
        var card = document.getElementById("term-{{ payload.focus }}");
        if (card) { card.classList.remove("term-highlight"); }
      }, {{ payload.highlight_ms }});
    </script>
    {% endif %}
  </body>
</html>"#,
    ext = "html"
)]
struct BrowseTemplate<'a> {
    chrome: Chrome,
    payload: &'a BrowsePayload,
    json_ld: SafeJson,
    base_url: &'a str,
}
