//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::DefaultClock;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use accounts_backend::Trace;
#[cfg(debug_assertions)]
use accounts_backend::doc::ApiDoc;
use accounts_backend::domain::{AccountService, InvitationService};
use accounts_backend::inbound::http::accounts::{
    bootstrap, change_roles, delete_account, get_account, list_accounts, register,
    remove_one_time_password, request_one_time_password, reset_password, update_password,
};
use accounts_backend::inbound::http::health::{HealthState, live, ready};
use accounts_backend::inbound::http::invitations::{generate_code, get_grants, redeem_code};
use accounts_backend::inbound::http::login::{login, logout};
use accounts_backend::inbound::http::state::HttpState;
use accounts_backend::outbound::persistence::{
    DbPool, DieselInvitationCodeRepository, DieselUserRepository,
};

fn build_http_state(pool: &DbPool) -> HttpState {
    let users = Arc::new(DieselUserRepository::new(pool.clone()));
    let codes = Arc::new(DieselInvitationCodeRepository::new(pool.clone()));
    HttpState::new(
        Arc::new(AccountService::new(users.clone())),
        Arc::new(InvitationService::new(codes, users, Arc::new(DefaultClock))),
    )
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1")
        .wrap(session)
        .service(login)
        .service(logout)
        .service(bootstrap)
        .service(register)
        .service(list_accounts)
        .service(get_account)
        .service(delete_account)
        .service(change_roles)
        .service(update_password)
        .service(request_one_time_password)
        .service(remove_one_time_password)
        .service(reset_password)
        .service(generate_code)
        .service(get_grants)
        .service(redeem_code);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Bind the listener and return the running server.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        db_pool,
    } = config;
    let http_state = web::Data::new(build_http_state(&db_pool));
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
