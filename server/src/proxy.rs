//! `/incois-proxy/*`: pass-through to the upstream host so its chart pages
//! can be embedded in the dashboard.

use anyhow::{Context, Result};
use bytes::Bytes;
use std::convert::Infallible;
use std::time::Duration;
use warp::http::header::CONTENT_TYPE;
use warp::http::{HeaderMap, HeaderValue, Method, Response, StatusCode};
use warp::hyper::Body;
use warp::path::Tail;
use warp::{Filter, Rejection};

use crate::config::Config;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const BROWSER_HEADERS: [(&str, &str); 8] = [
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Cache-Control", "no-cache"),
    ("Pragma", "no-cache"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Sec-Fetch-Dest", "iframe"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "cross-site"),
];

/// Request headers copied from the browser.
const FORWARDED_REQUEST_HEADERS: [&str; 2] = ["content-type", "cookie"];

/// Upstream response headers that would block framing.
const FRAMING_HEADERS: [&str; 4] = [
    "x-frame-options",
    "content-security-policy",
    "x-content-type-options",
    "referrer-policy",
];

const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

#[derive(Clone)]
pub struct Proxy {
    client: reqwest::Client,
    upstream_base: String,
    frame_ancestors: String,
}

impl Proxy {
    pub fn new(config: &Config) -> Result<Proxy> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.proxy_timeout_secs))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build proxy HTTP client")?;
        Ok(Proxy {
            client,
            upstream_base: config.upstream_base.trim_end_matches('/').to_string(),
            frame_ancestors: config.frame_ancestors(),
        })
    }

    pub fn upstream_url(&self, tail: &str, query: &str) -> String {
        let mut url = format!("{}/{}", self.upstream_base, tail);
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    async fn forward(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response<Body>> {
        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .with_context(|| format!("Unsupported method {}", method))?;

        let mut request = self.client.request(method, url);
        for (name, value) in BROWSER_HEADERS {
            request = request.header(name, value);
        }
        request = request.header("Referer", format!("{}/", self.upstream_base));
        for name in FORWARDED_REQUEST_HEADERS {
            if let Some(value) = headers.get(name) {
                request = request.header(name, value.as_bytes());
            }
        }

        if !body.is_empty() {
            request = request.body(body);
        }

        let upstream = request
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = StatusCode::from_u16(upstream.status().as_u16())?;
        let mut builder = Response::builder().status(status);
        for (name, value) in upstream.headers() {
            if is_passed_through(name.as_str()) {
                builder = builder.header(name.as_str(), value.as_bytes());
            }
        }
        builder = builder
            .header("X-Frame-Options", "ALLOWALL")
            .header("Content-Security-Policy", format!("{} *", self.frame_ancestors))
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "*");

        let body = upstream
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        log::info!("Proxied {} - {}", status, url);

        builder.body(Body::from(body)).context("Invalid proxied response")
    }

    fn error_page(&self, url: &str, err: &anyhow::Error) -> Response<Body> {
        let html = format!(
            "<html>\n  <head><title>Proxy Error</title></head>\n  <body>\n    <h1>INCOIS Proxy Error</h1>\n    <p>Error: {}</p>\n    <p>Try accessing directly: <a href=\"{}\" target=\"_blank\">Open INCOIS</a></p>\n  </body>\n</html>\n",
            escape_html(&format!("{:#}", err)),
            escape_html(url)
        );
        let mut response = Response::new(Body::from(html));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        response
    }
}

fn is_passed_through(name: &str) -> bool {
    !FRAMING_HEADERS.contains(&name) && !HOP_BY_HOP_HEADERS.contains(&name)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn route(proxy: Proxy) -> impl Filter<Extract = (Response<Body>,), Error = Rejection> + Clone {
    let query = warp::query::raw()
        .or(warp::any().map(String::new))
        .unify();

    warp::path("incois-proxy")
        .and(warp::path::tail())
        .and(query)
        .and(warp::method())
        .and(warp::header::headers_cloned())
        .and(warp::body::bytes())
        .and(warp::any().map(move || proxy.clone()))
        .and_then(handle)
}

async fn handle(
    tail: Tail,
    query: String,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
    proxy: Proxy,
) -> Result<Response<Body>, Infallible> {
    let url = proxy.upstream_url(tail.as_str(), &query);
    log::info!("Proxying {} {}", method, url);
    match proxy.forward(&method, &url, &headers, body).await {
        Ok(response) => Ok(response),
        Err(e) => {
            log::error!("Proxy error: {:#}", e);
            Ok(proxy.error_page(&url, &e))
        }
    }
}
