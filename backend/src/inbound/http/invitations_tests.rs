//! Handler tests for the invitation endpoints.

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::Duration;
use mockable::Clock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::domain::{Invitation, InvitationCode, Role, RoleSet, UserName};
use crate::inbound::http::test_utils::{TestBackend, api_app, login_request, session_cookie};

#[fixture]
async fn backend() -> TestBackend {
    let backend = TestBackend::new();
    backend.seed("A", "p1", "admin").await;
    backend.seed("B", "p2", "student").await;
    backend
}

fn code(raw: &str) -> InvitationCode {
    InvitationCode::new(raw).expect("valid code")
}

#[rstest]
#[actix_web::test]
async fn admins_issue_codes(#[future] backend: TestBackend) {
    let backend = backend.await;
    let app = test::init_service(api_app(backend.state.clone())).await;
    let admin = session_cookie(
        &test::call_service(&app, login_request("A", "p1", &["admin"]).to_request()).await,
    );

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invitations")
            .cookie(admin)
            .set_json(json!({ "grants": ["reviewer", "student"] }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body.get("grants"), Some(&json!(["student", "reviewer"])));
    let issued = body.get("code").and_then(Value::as_str).expect("code");
    let stored = backend.codes.snapshot(&code(issued)).expect("stored");
    assert!(!stored.used);
    assert_eq!(stored.generated_at, backend.clock.utc());
}

#[rstest]
#[case(json!({ "grants": [] }), StatusCode::BAD_REQUEST)]
#[case(json!({ "grants": ["moderator"] }), StatusCode::BAD_REQUEST)]
#[actix_web::test]
async fn invalid_grants_are_rejected(
    #[future] backend: TestBackend,
    #[case] body: Value,
    #[case] expected: StatusCode,
) {
    let backend = backend.await;
    let app = test::init_service(api_app(backend.state.clone())).await;
    let admin = session_cookie(
        &test::call_service(&app, login_request("A", "p1", &["admin"]).to_request()).await,
    );
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invitations")
            .cookie(admin)
            .set_json(body)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), expected);
}

#[rstest]
#[actix_web::test]
async fn students_cannot_issue_codes(#[future] backend: TestBackend) {
    let backend = backend.await;
    let app = test::init_service(api_app(backend.state.clone())).await;
    let student = session_cookie(
        &test::call_service(&app, login_request("B", "p2", &["student"]).to_request()).await,
    );
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invitations")
            .cookie(student)
            .set_json(json!({ "grants": ["admin"] }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[rstest]
#[case("Ab12Cd34", StatusCode::OK)]
#[case("Nn00Gg11", StatusCode::UNPROCESSABLE_ENTITY)]
#[case("Zz99Zz99", StatusCode::NOT_FOUND)]
#[actix_web::test]
async fn grants_lookup_reports_each_state(
    #[future] backend: TestBackend,
    #[case] raw: &str,
    #[case] expected: StatusCode,
) {
    let backend = backend.await;
    let now = backend.clock.utc();
    let mut used = Invitation::new(code("Ab12Cd34"), RoleSet::only(Role::Staff), now);
    used.used = true;
    backend.codes.seed(used);
    backend
        .codes
        .seed(Invitation::new(code("Nn00Gg11"), RoleSet::new(), now));
    let app = test::init_service(api_app(backend.state.clone())).await;
    let admin = session_cookie(
        &test::call_service(&app, login_request("A", "p1", &["admin"]).to_request()).await,
    );

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invitations/{raw}"))
            .cookie(admin)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), expected);
}

#[rstest]
#[actix_web::test]
async fn redemption_reassigns_the_session_users_roles(#[future] backend: TestBackend) {
    let backend = backend.await;
    let issued = backend
        .state
        .invitations
        .generate_code(&RoleSet::only(Role::Instructor))
        .await
        .expect("code issued");
    let app = test::init_service(api_app(backend.state.clone())).await;
    let student = session_cookie(
        &test::call_service(&app, login_request("B", "p2", &["student"]).to_request()).await,
    );
    let uri = format!("/api/v1/invitations/{issued}/redemption");

    let first = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&uri)
            .cookie(student.clone())
            .to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);
    let roles = backend
        .users
        .snapshot(&UserName::new("B").expect("valid name"))
        .expect("B stored")
        .roles()
        .clone();
    assert_eq!(roles, RoleSet::only(Role::Instructor));

    let second = test::call_service(
        &app,
        test::TestRequest::post().uri(&uri).cookie(student).to_request(),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[rstest]
#[actix_web::test]
async fn expired_codes_are_gone_and_consumed(#[future] backend: TestBackend) {
    let backend = backend.await;
    let issued = backend
        .state
        .invitations
        .generate_code(&RoleSet::only(Role::Staff))
        .await
        .expect("code issued");
    backend.clock.advance(Duration::hours(1) + Duration::seconds(1));
    let app = test::init_service(api_app(backend.state.clone())).await;
    let student = session_cookie(
        &test::call_service(&app, login_request("B", "p2", &["student"]).to_request()).await,
    );

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/invitations/{issued}/redemption"))
            .cookie(student)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::GONE);
    assert!(backend.codes.snapshot(&issued).expect("stored").used);
    let roles = backend
        .users
        .snapshot(&UserName::new("B").expect("valid name"))
        .expect("B stored")
        .roles()
        .clone();
    assert_eq!(roles, RoleSet::only(Role::Student));
}

#[rstest]
#[actix_web::test]
async fn redemption_requires_a_session(#[future] backend: TestBackend) {
    let backend = backend.await;
    let app = test::init_service(api_app(backend.state.clone())).await;
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invitations/Ab12Cd34/redemption")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
