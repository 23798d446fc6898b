//! Server-side HTML: the Tera engine, page rendering and redirects.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpRequest, HttpResponse};
use std::collections::HashMap;
use tera::{Context, Tera};

use super::flash;
use crate::entities::user;
use crate::models::AuthorView;
use crate::validation::FieldError;

const TEMPLATES: [(&str, &str); 11] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("macros.html", include_str!("../../templates/macros.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("explore.html", include_str!("../../templates/explore.html")),
    ("search.html", include_str!("../../templates/search.html")),
    ("auth/login.html", include_str!("../../templates/auth/login.html")),
    ("auth/register.html", include_str!("../../templates/auth/register.html")),
    ("posts/create.html", include_str!("../../templates/posts/create.html")),
    ("posts/detail.html", include_str!("../../templates/posts/detail.html")),
    ("users/profile.html", include_str!("../../templates/users/profile.html")),
    ("users/edit_profile.html", include_str!("../../templates/users/edit_profile.html")),
];

/// Every page template, compiled once at startup.
pub fn templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.to_vec())?;
    Ok(tera)
}

/// Render `template` with the signed-in user and any pending flash messages.
/// Showing the messages consumes them.
pub fn page(
    tera: &Tera,
    req: &HttpRequest,
    viewer: Option<&user::Model>,
    template: &str,
    mut ctx: Context,
) -> actix_web::Result<HttpResponse> {
    let messages = flash::pending(req);
    ctx.insert("current_user", &viewer.map(AuthorView::from));
    ctx.insert("messages", &messages);
    if !ctx.contains_key("notices") {
        ctx.insert("notices", &Vec::<flash::FlashMessage>::new());
    }

    let body = tera.render(template, &ctx).map_err(|e| {
        log::error!("Failed to render {}: {:?}", template, e);
        actix_web::error::ErrorInternalServerError("Template error")
    })?;

    let mut response = HttpResponse::Ok();
    response.content_type("text/html; charset=utf-8");
    if !messages.is_empty() {
        response.cookie(flash::cleared());
    }
    Ok(response.body(body))
}

/// Field errors grouped by input name, as the form templates expect them.
pub fn errors_by_field(errors: &[FieldError]) -> HashMap<&'static str, Vec<String>> {
    let mut grouped: HashMap<&'static str, Vec<String>> = HashMap::new();
    for error in errors {
        grouped
            .entry(error.field)
            .or_default()
            .push(error.message.clone());
    }
    grouped
}

/// Minimal standalone page for error responses raised outside a handler.
pub fn error_page(status: StatusCode, message: &str) -> String {
    let title = status.canonical_reason().unwrap_or("Error");
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{code} {title} - SocialConnect</title></head>\n<body>\n<h1>{code} {title}</h1>\n<p>{message}</p>\n<p><a href=\"/\">Back to SocialConnect</a></p>\n</body>\n</html>\n",
        code = status.as_u16(),
        title = title,
        message = tera::escape_html(message),
    )
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Redirect with a flash message queued for the next page.
pub fn redirect_with(
    req: &HttpRequest,
    location: &str,
    category: &str,
    message: impl Into<String>,
) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .cookie(flash::push(req, category, message))
        .finish()
}

/// Where a POST came from, falling back to `fallback`. Only same-site paths
/// are honoured.
pub fn back_to(req: &HttpRequest, fallback: &str) -> String {
    req.headers()
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|referer| {
            let uri: actix_web::http::Uri = referer.parse().ok()?;
            if let Some(host) = uri.host() {
                if Some(host) != req.connection_info().host().split(':').next() {
                    return None;
                }
            }
            Some(
                uri.path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| uri.path().to_string()),
            )
        })
        .filter(|path| is_local_path(path))
        .unwrap_or_else(|| fallback.to_string())
}

/// A path on this site: absolute, not protocol-relative.
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

/// Whether the client asked for a JSON answer instead of a redirect.
pub fn wants_json(req: &HttpRequest) -> bool {
    let header_has = |name: header::HeaderName, needle: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().contains(needle))
            .unwrap_or(false)
    };
    header_has(header::CONTENT_TYPE, "application/json")
        || header_has(header::ACCEPT, "application/json")
        || req
            .headers()
            .get("X-Requested-With")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn all_templates_compile() {
        let tera = templates().unwrap();
        assert!(tera.get_template_names().any(|name| name == "index.html"));
    }

    #[test]
    fn error_page_escapes_message() {
        let html = error_page(StatusCode::NOT_FOUND, "<script>");
        assert!(html.contains("404 Not Found"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn json_detection() {
        let plain = TestRequest::default().to_http_request();
        assert!(!wants_json(&plain));

        let accept = TestRequest::default()
            .insert_header((header::ACCEPT, "application/json"))
            .to_http_request();
        assert!(wants_json(&accept));

        let xhr = TestRequest::default()
            .insert_header(("X-Requested-With", "XMLHttpRequest"))
            .to_http_request();
        assert!(wants_json(&xhr));
    }

    #[test]
    fn local_paths_only() {
        assert!(is_local_path("/users/alice"));
        assert!(!is_local_path("//evil.example/"));
        assert!(!is_local_path("https://evil.example/"));
        assert!(!is_local_path("/\\evil.example"));
    }

    #[test]
    fn back_to_ignores_foreign_referer() {
        let req = TestRequest::default()
            .insert_header((header::REFERER, "https://evil.example/phish"))
            .to_http_request();
        assert_eq!(back_to(&req, "/"), "/");

        let req = TestRequest::default()
            .insert_header((header::REFERER, "/posts/3?page=2"))
            .to_http_request();
        assert_eq!(back_to(&req, "/"), "/posts/3?page=2");
    }
}
