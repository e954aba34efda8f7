//! HTTP client integration tests against a mock backend
//!
//! Covers bearer-token attachment, 401 session teardown, the lock flag
//! on fetch-by-id, pagination parameters, and error message extraction.

use complaint_client::{
    ApiClient, ClientConfig, ClientError, ComplaintStatus, PageRequest, Session, SessionData,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn complaint(id: &str, status: &str, version: u64) -> serde_json::Value {
    json!({
        "id": id,
        "title": "Pothole",
        "description": "Deep pothole on the corner",
        "userId": "u1",
        "agencyId": "a1",
        "type": "transportation",
        "location": "Main & 3rd",
        "files": [],
        "status": status,
        "version": version,
        "createdAt": "2024-05-01T08:00:00.000Z",
        "updatedAt": "2024-05-01T08:00:00.000Z"
    })
}

fn signed_in_client(server: &MockServer) -> ApiClient {
    let session = Session::from_data(SessionData {
        access_token: Some("tok-123".into()),
        role: Some("admin".into()),
        ..Default::default()
    });
    ApiClient::new(
        ClientConfig {
            base_url: format!("{}/api/", server.uri()),
            timeout_secs: 5,
        },
        session,
    )
    .unwrap()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_sign_in_sends_no_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .and(body_json(json!({"email": "staff@gov.com", "password": "password123"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "accessToken": "fresh",
            "user": {"role": "staff_admin"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let response = client.sign_in("staff@gov.com", "password123").await.unwrap();
    assert_eq!(response.access_token.as_deref(), Some("fresh"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_unauthorized_tears_down_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/complaints"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})),
        )
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let err = client.list_complaints(PageRequest::new(1, 10)).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.server_message(), Some("Token expired"));
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_missing_token_short_circuits() {
    let server = MockServer::start().await;
    let client = ApiClient::new(
        ClientConfig {
            base_url: format!("{}/api", server.uri()),
            timeout_secs: 5,
        },
        Session::new(),
    )
    .unwrap();

    let err = client.get_complaint("c1", false).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// =============================================================================
// Complaints
// =============================================================================

#[tokio::test]
async fn test_list_complaints_passes_page_and_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/complaints"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "10"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [complaint("c11", "pending", 1)],
            "meta": {
                "itemCount": 1,
                "totalItems": 11,
                "itemsPerPage": 10,
                "totalPages": 2,
                "currentPage": 2
            },
            "links": {"first": "/complaints?page=1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let page = client.list_complaints(PageRequest::new(2, 10)).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.meta.total_pages, 2);
    assert_eq!(page.links.first.as_deref(), Some("/complaints?page=1"));
}

#[tokio::test]
async fn test_get_complaint_with_lock_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/complaints/c1"))
        .and(query_param("lock", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(complaint("c1", "pending", 4)))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let record = client.get_complaint("c1", true).await.unwrap();
    assert_eq!(record.version, 4);
}

#[tokio::test]
async fn test_change_status_returns_updated_record() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/complaints/c1/status"))
        .and(body_json(json!({"status": "resolved"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(complaint("c1", "resolved", 2)))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let record = client.change_status("c1", ComplaintStatus::Resolved).await.unwrap();
    assert_eq!(record.status, ComplaintStatus::Resolved);
    assert_eq!(record.version, 2);
}

#[tokio::test]
async fn test_conflict_is_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/complaints/c1/note"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"message": "Complaint was modified by another user"})),
        )
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let err = client.add_note("c1", "Called the resident").await.unwrap_err();
    match err {
        ClientError::Conflict { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "Complaint was modified by another user");
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    // A conflict must not end the session
    assert!(client.session().is_authenticated());
}

// =============================================================================
// Agencies & analytics
// =============================================================================

#[tokio::test]
async fn test_create_agency_and_analytics_dates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/agencies"))
        .and(body_json(json!({"name": "Water Board"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "a7", "name": "Water Board"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/general-managment/analytics/complaints-by-type"))
        .and(query_param("startDate", "2024-01-01T00:00:00.000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"type": "environmental", "count": 4}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let agency = client.create_agency("Water Board").await.unwrap();
    assert_eq!(agency.id, "a7");

    let query = complaint_client::AnalyticsQuery {
        start_date: Some("2024-01-01T00:00:00Z".parse().unwrap()),
        end_date: None,
    };
    let by_type = client.complaints_by_type(&query).await.unwrap();
    assert_eq!(by_type.data[0].count, 4);
}
