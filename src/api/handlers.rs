//! HTTP request handlers for the leave API.
//!
//! Every handler validates its input, then runs the service call on the
//! blocking pool: service operations take per-employee locks and may back
//! off between store retries.

use std::str::FromStr;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::RequestId;

use super::request::{
    ApproveBody, AsOfBody, AsOfQuery, AttendanceBody, BulkApproveBody, MAX_BULK_APPROVE,
    ManualGrantBody, MonitoringQuery, PageQuery, PaidLeaveBody, RejectBody,
};
use super::response::{ApiError, ApiErrorResponse, BulkApproveResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/requests/paid-leave", post(submit_paid_leave_handler))
        .route("/requests/attendance", post(submit_attendance_handler))
        .route("/requests/bulk-approve", post(bulk_approve_handler))
        .route("/requests/:id/approve", post(approve_handler))
        .route("/requests/:id/reject", post(reject_handler))
        .route("/employees/:id/grants", post(manual_grant_handler))
        .route("/employees/:id/leave-status", get(leave_status_handler))
        .route("/employees/:id/ledger", get(ledger_handler))
        .route("/employees/:id/requests", get(request_history_handler))
        .route("/compliance/monitoring", get(monitoring_handler))
        .route("/compliance/summary", get(summary_handler))
        .route("/compliance/reminders", post(reminders_handler))
        .route("/accruals/materialize", post(materialize_handler))
        .with_state(state)
}

/// Handler for POST /requests/paid-leave.
async fn submit_paid_leave_handler(
    State(state): State<AppState>,
    payload: Result<Json<PaidLeaveBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let body = match parse_json(correlation_id, payload) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "submit_paid_leave", StatusCode::CREATED, move || {
        service.submit_paid_leave_request(body.into())
    })
    .await
}

/// Handler for POST /requests/attendance.
async fn submit_attendance_handler(
    State(state): State<AppState>,
    payload: Result<Json<AttendanceBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let body = match parse_json(correlation_id, payload) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "submit_attendance", StatusCode::CREATED, move || {
        service.submit_attendance_request(body.into())
    })
    .await
}

/// Handler for POST /requests/:id/approve.
async fn approve_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ApproveBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request_id = match parse_request_id(correlation_id, &id) {
        Ok(request_id) => request_id,
        Err(response) => return response,
    };
    let body = match parse_json(correlation_id, payload) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "approve_request", StatusCode::OK, move || {
        service.approve_request(request_id, &body.approver_id)
    })
    .await
}

/// Handler for POST /requests/:id/reject.
async fn reject_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RejectBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request_id = match parse_request_id(correlation_id, &id) {
        Ok(request_id) => request_id,
        Err(response) => return response,
    };
    let body = match parse_json(correlation_id, payload) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "reject_request", StatusCode::OK, move || {
        service.reject_request(request_id, &body.approver_id, body.reason)
    })
    .await
}

/// Handler for POST /requests/bulk-approve.
async fn bulk_approve_handler(
    State(state): State<AppState>,
    payload: Result<Json<BulkApproveBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let body = match parse_json(correlation_id, payload) {
        Ok(body) => body,
        Err(response) => return response,
    };
    if body.request_ids.len() > MAX_BULK_APPROVE {
        warn!(
            correlation_id = %correlation_id,
            requested = body.request_ids.len(),
            "Bulk approval too large"
        );
        return bad_request(ApiError::validation_error(format!(
            "request_ids may hold at most {} ids, got {}",
            MAX_BULK_APPROVE,
            body.request_ids.len()
        )));
    }

    let service = state.service();
    run(correlation_id, "bulk_approve", StatusCode::OK, move || {
        service
            .bulk_approve(&body.request_ids, &body.approver_id)
            .map(BulkApproveResponse::from)
    })
    .await
}

/// Handler for POST /employees/:id/grants.
async fn manual_grant_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
    payload: Result<Json<ManualGrantBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let body = match parse_json(correlation_id, payload) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "grant_leave", StatusCode::CREATED, move || {
        service.grant_leave(&employee_id, body.days, &body.reason, &body.granted_by)
    })
    .await
}

/// Handler for GET /employees/:id/leave-status.
async fn leave_status_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
    query: Result<Query<AsOfQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let query = match parse_query(correlation_id, query) {
        Ok(query) => query,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "get_leave_status", StatusCode::OK, move || {
        service.get_leave_status(&employee_id, query.as_of)
    })
    .await
}

/// Handler for GET /employees/:id/ledger.
async fn ledger_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let query = match parse_query(correlation_id, query) {
        Ok(query) => query,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "ledger_history", StatusCode::OK, move || {
        service.ledger_history(&employee_id, query.into())
    })
    .await
}

/// Handler for GET /employees/:id/requests.
async fn request_history_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let service = state.service();
    run(correlation_id, "request_history", StatusCode::OK, move || {
        service.request_history(&employee_id)
    })
    .await
}

/// Handler for GET /compliance/monitoring.
async fn monitoring_handler(
    State(state): State<AppState>,
    query: Result<Query<MonitoringQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let query = match parse_query(correlation_id, query) {
        Ok(query) => query,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "compliance_monitoring", StatusCode::OK, move || {
        service.get_compliance_monitoring(query.facility.as_deref(), query.as_of)
    })
    .await
}

/// Handler for GET /compliance/summary.
async fn summary_handler(
    State(state): State<AppState>,
    query: Result<Query<MonitoringQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let query = match parse_query(correlation_id, query) {
        Ok(query) => query,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "facility_summary", StatusCode::OK, move || {
        service.facility_summary(query.facility.as_deref(), query.as_of)
    })
    .await
}

/// Handler for POST /compliance/reminders.
async fn reminders_handler(
    State(state): State<AppState>,
    payload: Result<Json<AsOfBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let body = match parse_json(correlation_id, payload) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "send_obligation_reminders", StatusCode::OK, move || {
        service.send_obligation_reminders(body.as_of)
    })
    .await
}

/// Handler for POST /accruals/materialize.
async fn materialize_handler(
    State(state): State<AppState>,
    payload: Result<Json<AsOfBody>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let body = match parse_json(correlation_id, payload) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let service = state.service();
    run(correlation_id, "materialize_due_grants", StatusCode::OK, move || {
        service.materialize_due_grants(body.as_of)
    })
    .await
}

/// Runs a service call on the blocking pool and renders its result.
async fn run<T, F>(
    correlation_id: Uuid,
    operation: &'static str,
    success: StatusCode,
    call: F,
) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> EngineResult<T> + Send + 'static,
{
    info!(correlation_id = %correlation_id, operation, "Processing request");
    let start_time = Instant::now();

    match tokio::task::spawn_blocking(call).await {
        Ok(Ok(body)) => {
            info!(
                correlation_id = %correlation_id,
                operation,
                duration_us = start_time.elapsed().as_micros() as u64,
                "Request completed successfully"
            );
            json_response(success, &body)
        }
        Ok(Err(err)) => {
            warn!(
                correlation_id = %correlation_id,
                operation,
                error = %err,
                "Request failed"
            );
            ApiErrorResponse::from(err).into_response()
        }
        Err(join_error) => {
            error!(
                correlation_id = %correlation_id,
                operation,
                error = %join_error,
                "Request worker failed"
            );
            ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::internal("The request could not be completed"),
            }
            .into_response()
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn bad_request(error: ApiError) -> Response {
    ApiErrorResponse {
        status: StatusCode::BAD_REQUEST,
        error,
    }
    .into_response()
}

/// Unwraps a JSON body, turning rejections into 400 responses.
fn parse_json<T>(
    correlation_id: Uuid,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, Response> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    // Get the body text which contains the detailed error from serde
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::validation_error(body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            Err(bad_request(error))
        }
    }
}

fn parse_query<T>(
    correlation_id: Uuid,
    query: Result<Query<T>, QueryRejection>,
) -> Result<T, Response> {
    match query {
        Ok(Query(query)) => Ok(query),
        Err(rejection) => {
            let body_text = rejection.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "Invalid query string"
            );
            Err(bad_request(ApiError::validation_error(body_text)))
        }
    }
}

fn parse_request_id(correlation_id: Uuid, raw: &str) -> Result<RequestId, Response> {
    RequestId::from_str(raw).map_err(|err| {
        warn!(correlation_id = %correlation_id, request_id = raw, "Invalid request id");
        bad_request(ApiError::with_details(
            "VALIDATION_ERROR",
            format!("Invalid request id: {}", raw),
            err.to_string(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FixedClock, MemoryDirectory, RecordingNotifier};
    use crate::config::ConfigLoader;
    use crate::service::LeaveService;
    use crate::store::MemoryStore;
    use axum::{body::Body, http::Request};
    use chrono::NaiveDate;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let config = ConfigLoader::load("./config/default").expect("Failed to load config");
        let service = LeaveService::new(
            &config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryDirectory::new(config.employees().to_vec())),
            Arc::new(RecordingNotifier::new()),
            Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2023, 7, 1).unwrap())),
        )
        .unwrap();
        AppState::new(service)
    }

    async fn send(
        router: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = router.oneshot(builder.body(body).unwrap()).await.unwrap();

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_api_001_submit_returns_201() {
        let router = create_router(create_test_state());
        let (status, _) = send(
            router.clone(),
            "POST",
            "/accruals/materialize",
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            router,
            "POST",
            "/requests/paid-leave",
            Some(json!({
                "employee_id": "emp_001",
                "start_date": "2024-01-10",
                "end_date": "2024-01-12",
                "leave_type": "full",
                "reason": "family trip"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["employee_id"], "emp_001");
    }

    #[tokio::test]
    async fn test_api_002_malformed_json_returns_400() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/requests/paid-leave")
                    .header("Content-Type", "application/json")
                    .body(Body::from("{ not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(json["code"], "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_api_003_missing_field_returns_validation_error() {
        let router = create_router(create_test_state());
        let (status, body) = send(
            router,
            "POST",
            "/requests/paid-leave",
            Some(json!({ "employee_id": "emp_001" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_api_004_bad_request_id_returns_400() {
        let router = create_router(create_test_state());
        let (status, body) = send(
            router,
            "POST",
            "/requests/not-a-uuid/approve",
            Some(json!({ "approver_id": "mgr_001" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_api_005_unknown_request_returns_404() {
        let router = create_router(create_test_state());
        let uri = format!("/requests/{}/approve", Uuid::new_v4());
        let (status, body) = send(
            router,
            "POST",
            &uri,
            Some(json!({ "approver_id": "mgr_001" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "REQUEST_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_api_006_bad_query_date_returns_400() {
        let router = create_router(create_test_state());
        let (status, body) = send(
            router,
            "GET",
            "/employees/emp_001/leave-status?as_of=yesterday",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_api_007_oversized_bulk_approve_returns_400() {
        let router = create_router(create_test_state());
        let ids: Vec<String> = (0..=MAX_BULK_APPROVE)
            .map(|_| Uuid::new_v4().to_string())
            .collect();
        let (status, body) = send(
            router,
            "POST",
            "/requests/bulk-approve",
            Some(json!({ "request_ids": ids, "approver_id": "mgr_001" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}
