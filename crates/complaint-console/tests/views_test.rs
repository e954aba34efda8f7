//! Sign-in, agencies, users and dashboard views against a mock backend

use complaint_client::{ApiClient, ClientConfig, CreateStaffInput, Session, SessionData, StaffRole};
use complaint_console::agencies::AgencyDirectory;
use complaint_console::auth::{LoginFlow, LoginOutcome, LoginState};
use complaint_console::dashboard::{load_dashboard, DateRange};
use complaint_console::users::UserDirectory;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, session: Session) -> ApiClient {
    ApiClient::new(
        ClientConfig {
            base_url: format!("{}/api", server.uri()),
            timeout_secs: 5,
        },
        session,
    )
    .unwrap()
}

fn signed_in(role: &str) -> Session {
    Session::from_data(SessionData {
        access_token: Some("tok-123".into()),
        role: Some(role.into()),
        ..Default::default()
    })
}

// =============================================================================
// Sign-in
// =============================================================================

#[tokio::test]
async fn test_sign_in_accepts_misspelt_token_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "accesToken": "legacy-token",
            "refreshToken": {"token": "refresh-1"},
            "user": {"email": "lead@gov.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new();
    let flow = LoginFlow::new(client(&server, session.clone()));

    let outcome = flow.sign_in("lead@gov.com", "password123").await.unwrap();
    let LoginOutcome::SignedIn(data) = outcome else {
        panic!("expected a signed-in outcome");
    };
    assert_eq!(data.role.as_deref(), Some("user"));
    assert_eq!(data.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(session.token().as_deref(), Some("legacy-token"));
    assert_eq!(flow.state(), LoginState::Ready);
}

#[tokio::test]
async fn test_sign_in_without_token_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let session = Session::new();
    let flow = LoginFlow::new(client(&server, session.clone()));

    assert!(flow.sign_in("lead@gov.com", "password123").await.is_err());
    assert_eq!(
        flow.state(),
        LoginState::Failed("Login failed - invalid response".into())
    );
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_invalid_credentials_never_reach_the_server() {
    let server = MockServer::start().await;
    let flow = LoginFlow::new(client(&server, Session::new()));

    assert!(flow.sign_in("lead@gov.org", "password123").await.is_err());
    assert_eq!(flow.state(), LoginState::Failed("Invalid Email".into()));
    assert!(flow.sign_in("lead@gov.com", "short").await.is_err());
    assert_eq!(flow.state(), LoginState::Failed("Incorrect password".into()));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_sign_in_shows_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let flow = LoginFlow::new(client(&server, Session::new()));
    assert!(flow.sign_in("lead@gov.com", "password123").await.is_err());
    assert_eq!(flow.state(), LoginState::Failed("Invalid credentials".into()));
}

// =============================================================================
// Agencies
// =============================================================================

#[tokio::test]
async fn test_create_agency_trims_and_appends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/agencies"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "a1", "name": "Water Authority"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/agencies"))
        .and(body_json(json!({"name": "Roads Department"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "a2", "name": "Roads Department"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut agencies = AgencyDirectory::new(client(&server, signed_in("admin")));
    agencies.load().await.unwrap();

    assert!(agencies.create("   ").await.is_err());
    assert_eq!(agencies.error(), Some("Agency name is required"));

    agencies.create("  Roads Department ").await.unwrap();
    let names: Vec<&str> = agencies.agencies().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Water Authority", "Roads Department"]);
    assert!(agencies.error().is_none());
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_current_user_falls_back_to_session_role() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut users = UserDirectory::new(client(&server, signed_in("staff_admin")));
    assert!(users.load_current_user().await.is_none());
    assert_eq!(users.current_role(), "staff_admin");
    assert!(users.can_add_users());
    assert!(!users.can_add_admins());
}

#[tokio::test]
async fn test_staff_admin_role_rules_are_local() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut users = UserDirectory::new(client(&server, signed_in("staff_admin")));
    users.load_current_user().await;

    let input = CreateStaffInput {
        first_name: None,
        last_name: None,
        email: "lead@gov.com".into(),
        phone: "0100000000".into(),
        target_role: StaffRole::StaffAdmin,
        agency_id: None,
    };
    assert!(users.create_staff(&input).await.is_err());
    assert_eq!(users.error(), Some("Staff admins can only create complaint staff"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/api/staff"));
}

#[tokio::test]
async fn test_list_users_applies_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .and(query_param("role", "complaint_staff"))
        .and(query_param("search", "amina"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "u7",
                "email": "amina@gov.com",
                "role": "complaint_staff",
                "isActive": true,
                "createdAt": "2024-05-01T08:00:00.000Z",
                "updatedAt": "2024-05-01T08:00:00.000Z"
            }],
            "meta": {"itemCount": 1, "totalItems": 1, "itemsPerPage": 10, "totalPages": 1, "currentPage": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut users = UserDirectory::new(client(&server, signed_in("admin")));
    users.set_filters(complaint_console::users::UserFilters {
        role: Some("complaint_staff".into()),
        active: None,
        search: Some("amina".into()),
    });

    let list = users.load().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].email, "amina@gov.com");
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_tolerates_partial_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/general-managment/performance-stats"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/general-managment/analytics/complaints-by-status"))
        .and(query_param("startDate", "2024-01-01T00:00:00.000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"status": "PENDING", "count": 1}, {"status": "IN_PROGRESS", "count": 3}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/general-managment/analytics/complaints-by-type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"type": "noise", "count": 2}, {"type": "water", "count": 9}]
        })))
        .mount(&server)
        .await;

    let client = client(&server, signed_in("admin"));
    let range = DateRange::new(chrono::NaiveDate::from_ymd_opt(2024, 1, 1), None);
    let data = load_dashboard(&client, &range).await;

    assert_eq!(data.error.as_deref(), Some("Failed to load performance statistics"));
    assert!(data.performance.is_none());
    assert!(data.by_agency.is_none());

    assert_eq!(data.status_chart[1].label, "In Progress");
    assert_eq!(data.status_chart[1].color, Some("#3b82f6"));
    assert_eq!(data.status_total(), 4);
    assert_eq!(data.type_chart[0].label, "water");
}
