//! Some helper functions for the API.

use podium_common::competition::SubmitError;
use podium_common::validation::ValidationError;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::Response;
use rocket::response::status as rocket_status;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Clone, Copy)]
pub struct RequestTimingFairing;

#[rocket::async_trait]
impl Fairing for RequestTimingFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request timing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _data: &mut rocket::Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let started_at = request.local_cache(Instant::now);
        let elapsed = started_at.elapsed();

        tracing::info!(
            method = %request.method(),
            path = %request.uri(),
            status = response.status().code,
            elapsed_ms = elapsed.as_millis(),
            "Request Completed"
        );
    }
}

/// Lets a browser front-end on another origin read the leaderboard and upload files.
#[derive(Clone, Copy)]
pub struct CorsFairing;

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Max-Age", "86400"));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    NotFound,
    BadRequest,
    UnprocessableEntity,
    ServiceUnavailable,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ApiErrorBody {
    pub error: ApiErrorKind,
    pub message: String,
}

impl ApiErrorBody {
    pub fn new(error: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}

pub type ApiError = rocket_status::Custom<Json<ApiErrorBody>>;
pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: Status, kind: ApiErrorKind, message: impl Into<String>) -> ApiError {
    rocket_status::Custom(status, Json(ApiErrorBody::new(kind, message)))
}

pub fn bad_request_error(message: impl Into<String>) -> ApiError {
    api_error(Status::BadRequest, ApiErrorKind::BadRequest, message)
}

pub fn unprocessable_entity_error(message: impl Into<String>) -> ApiError {
    api_error(
        Status::UnprocessableEntity,
        ApiErrorKind::UnprocessableEntity,
        message,
    )
}

pub fn service_unavailable_error(message: impl Into<String>) -> ApiError {
    api_error(
        Status::ServiceUnavailable,
        ApiErrorKind::ServiceUnavailable,
        message,
    )
}

pub fn internal_error(message: impl Into<String>) -> ApiError {
    api_error(Status::InternalServerError, ApiErrorKind::Internal, message)
}

/// Map a failed submission to the response the submitter sees.
/// A file that cannot be read at all is a bad request; a readable file with
/// the wrong shape or nothing left to score is unprocessable.
pub fn submit_error(err: &SubmitError) -> ApiError {
    match err {
        SubmitError::Validation(ValidationError::MalformedCsv(_)) => {
            tracing::info!(error = %err, "Rejected unreadable submission");
            bad_request_error(err.to_string())
        }
        SubmitError::Validation(_) | SubmitError::Score(_) => {
            tracing::info!(error = %err, "Rejected invalid submission");
            unprocessable_entity_error(err.to_string())
        }
        SubmitError::Store(_) => {
            tracing::error!(error = %err, "Failed to persist submission");
            service_unavailable_error(err.to_string())
        }
    }
}
