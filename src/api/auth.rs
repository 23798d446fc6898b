use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use tera::{Context, Tera};

use super::flash;
use super::render::{errors_by_field, is_local_path, page, redirect, redirect_with};
use crate::auth::{clear_session_cookie, session_cookie, CurrentUser};
use crate::config::Config;
use crate::db::DbPool;
use crate::models::{LoginQuery, LoginRequest, NewAccount, RegisterRequest};
use crate::services::{accounts, ServiceError};
use crate::validation::{validate_login, validate_registration, FieldError};

fn register_page(
    tera: &Tera,
    req: &HttpRequest,
    form: &RegisterRequest,
    errors: &[FieldError],
) -> ActixResult<HttpResponse> {
    let mut ctx = Context::new();
    ctx.insert("title", "Register");
    ctx.insert("form", form);
    ctx.insert("errors", &errors_by_field(errors));
    page(tera, req, None, "auth/register.html", ctx)
}

fn login_page(
    tera: &Tera,
    req: &HttpRequest,
    form: &LoginRequest,
    next: Option<&str>,
    errors: &[FieldError],
    failed: bool,
) -> ActixResult<HttpResponse> {
    let mut ctx = Context::new();
    ctx.insert("title", "Login");
    ctx.insert("form", form);
    ctx.insert("next", &next.filter(|next| is_local_path(next)));
    ctx.insert("errors", &errors_by_field(errors));
    if failed {
        flash::now(&mut ctx, "danger", "Invalid username or password");
    }
    page(tera, req, None, "auth/login.html", ctx)
}

#[utoipa::path(
    get,
    path = "/auth/register",
    responses(
        (status = 200, description = "Registration form", body = String, content_type = "text/html"),
        (status = 302, description = "Already signed in; redirected home")
    ),
    tag = "auth"
)]
pub async fn register_form(
    req: HttpRequest,
    user: Option<CurrentUser>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    if user.is_some() {
        return Ok(redirect("/"));
    }
    register_page(&tera, &req, &RegisterRequest::default(), &[])
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body(content = RegisterRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Account created; redirected to the login page"),
        (status = 200, description = "Form re-rendered with field errors", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn register(
    req: HttpRequest,
    user: Option<CurrentUser>,
    form: web::Form<RegisterRequest>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    if user.is_some() {
        return Ok(redirect("/"));
    }
    let form = form.into_inner();

    let errors = validate_registration(&form);
    if !errors.is_empty() {
        return register_page(&tera, &req, &form, &errors);
    }

    let account = NewAccount {
        username: form.username.clone(),
        email: form.email.clone(),
        password: form.password.clone(),
    };
    match accounts::register(pool.get_ref(), account, config.session.bcrypt_cost).await {
        Ok(_) => Ok(redirect_with(
            &req,
            "/auth/login",
            "success",
            "Congratulations, you are now a registered user!",
        )),
        Err(e) => match e.field_errors() {
            Some(errors) => register_page(&tera, &req, &form, &errors),
            None => Err(e.into()),
        },
    }
}

#[utoipa::path(
    get,
    path = "/auth/login",
    params(("next" = Option<String>, Query, description = "Local path to return to after login")),
    responses(
        (status = 200, description = "Login form", body = String, content_type = "text/html"),
        (status = 302, description = "Already signed in; redirected home")
    ),
    tag = "auth"
)]
pub async fn login_form(
    req: HttpRequest,
    user: Option<CurrentUser>,
    query: web::Query<LoginQuery>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    if user.is_some() {
        return Ok(redirect("/"));
    }
    login_page(
        &tera,
        &req,
        &LoginRequest::default(),
        query.next.as_deref(),
        &[],
        false,
    )
}

#[utoipa::path(
    post,
    path = "/auth/login",
    params(("next" = Option<String>, Query, description = "Local path to return to after login")),
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Signed in; session cookie set"),
        (status = 200, description = "Form re-rendered with an error", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn login(
    req: HttpRequest,
    user: Option<CurrentUser>,
    query: web::Query<LoginQuery>,
    form: web::Form<LoginRequest>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    tera: web::Data<Tera>,
) -> ActixResult<HttpResponse> {
    if user.is_some() {
        return Ok(redirect("/"));
    }
    let form = form.into_inner();
    let next = query.next.as_deref();

    let errors = validate_login(&form.username, &form.password);
    if !errors.is_empty() {
        return login_page(&tera, &req, &form, next, &errors, false);
    }

    let user = match accounts::authenticate(pool.get_ref(), &form.username, &form.password).await {
        Ok(user) => user,
        Err(ServiceError::InvalidCredentials) => {
            return login_page(&tera, &req, &form, next, &[], true);
        }
        Err(e) => return Err(e.into()),
    };

    let cookie = session_cookie(&config.session, user.id, form.remember_me)
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let location = next.filter(|next| is_local_path(next)).unwrap_or("/");
    log::info!("User {} signed in", user.id);

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .cookie(cookie)
        .cookie(flash::push(
            &req,
            "success",
            format!("Welcome back, {}!", user.username),
        ))
        .finish())
}

#[utoipa::path(
    get,
    path = "/auth/logout",
    responses(
        (status = 302, description = "Session cleared; redirected home")
    ),
    security(("session_cookie" = [])),
    tag = "auth"
)]
pub async fn logout(req: HttpRequest, user: CurrentUser) -> ActixResult<HttpResponse> {
    log::info!("User {} signed out", user.id());
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .cookie(clear_session_cookie())
        .cookie(flash::push(&req, "info", "You have been logged out."))
        .finish())
}
