//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;

/// Session middleware with a fresh key and the `Secure` flag off for plain
/// HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// The `session` cookie set by a response.
pub fn session_cookie<B>(response: &ServiceResponse<B>) -> Cookie<'static> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::domain::{
    AccountService, InvitationService, Password, Registration, RoleSet, SecretHasher, UserName,
};
use crate::inbound::http::state::HttpState;
use crate::test_support::{FixtureClock, InMemoryInvitationCodeRepository, InMemoryUserRepository};

/// Real services over the in-memory adapters with a cheap hasher.
pub struct TestBackend {
    pub users: Arc<InMemoryUserRepository>,
    pub codes: Arc<InMemoryInvitationCodeRepository>,
    pub clock: Arc<FixtureClock>,
    pub state: HttpState,
}

impl TestBackend {
    pub fn new() -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let codes = Arc::new(InMemoryInvitationCodeRepository::new());
        let clock = Arc::new(FixtureClock::new(
            Utc.with_ymd_and_hms(2025, 3, 24, 9, 0, 0)
                .single()
                .expect("valid timestamp"),
        ));
        let hasher = SecretHasher::with_params(8, 1, 1).expect("test hasher");
        let state = HttpState::new(
            Arc::new(AccountService::with_hasher(users.clone(), hasher)),
            Arc::new(InvitationService::new(
                codes.clone(),
                users.clone(),
                clock.clone(),
            )),
        );
        Self {
            users,
            codes,
            clock,
            state,
        }
    }

    /// Register an account directly through the service.
    pub async fn seed(&self, user_name: &str, password: &str, roles: &str) {
        let registration = Registration::new(
            UserName::new(user_name).expect("valid name"),
            Password::new(password).expect("valid password"),
            roles.parse::<RoleSet>().expect("valid roles"),
        )
        .expect("valid registration");
        self.state
            .accounts
            .register(&registration)
            .await
            .expect("seed account");
    }
}

use actix_web::dev::{ServiceFactory, ServiceRequest};
use actix_web::test::TestRequest;
use actix_web::{App, web};
use serde_json::json;

use crate::inbound::http::{accounts, invitations, login};

/// The `/api/v1` scope wired to `state`, as the server builds it.
pub fn api_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(test_session_middleware())
        .service(
            web::scope("/api/v1")
                .service(login::login)
                .service(login::logout)
                .service(accounts::bootstrap)
                .service(accounts::register)
                .service(accounts::list_accounts)
                .service(accounts::get_account)
                .service(accounts::delete_account)
                .service(accounts::change_roles)
                .service(accounts::update_password)
                .service(accounts::request_one_time_password)
                .service(accounts::remove_one_time_password)
                .service(accounts::reset_password)
                .service(invitations::generate_code)
                .service(invitations::get_grants)
                .service(invitations::redeem_code),
        )
}

pub fn login_request(user_name: &str, password: &str, roles: &[&str]) -> TestRequest {
    TestRequest::post().uri("/api/v1/login").set_json(json!({
        "userName": user_name,
        "password": password,
        "roles": roles,
    }))
}
