//! An api for scoring prediction submissions and serving the leaderboard.

#[macro_use]
extern crate rocket;

mod config;
mod helpers;

use config::DisplayOffset;
use helpers::{
    ApiError, ApiErrorBody, ApiErrorKind, ApiResult, CorsFairing, RequestTimingFairing,
    bad_request_error, internal_error, service_unavailable_error, submit_error,
};
use podium_common::competition::Competition;
use podium_common::store::StoreError;
use podium_common::{AnswerKeyInfo, LeaderboardResponse, Participant, SubmitReceipt};
use rocket::fairing::AdHoc;
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::response::status as rocket_status;
use rocket::serde::json::Json;
use rocket::tokio::io::AsyncReadExt;
use rocket::{Build, Request, Rocket, State};
use rocket_prometheus::PrometheusMetrics;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type SharedCompetition = Arc<Competition>;

#[derive(FromForm)]
struct SubmissionForm<'r> {
    name: String,
    model_description: String,
    predictions: TempFile<'r>,
}

async fn read_upload(file: &TempFile<'_>) -> std::io::Result<Vec<u8>> {
    let reader = file.open().await?;
    rocket::tokio::pin!(reader);
    let mut contents = Vec::new();
    reader.read_to_end(&mut contents).await?;
    Ok(contents)
}

/// Run store-bound work off the async workers.
async fn blocking<T, F>(competition: &SharedCompetition, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&Competition) -> T + Send + 'static,
    T: Send + 'static,
{
    let competition = Arc::clone(competition);
    rocket::tokio::task::spawn_blocking(move || work(&competition))
        .await
        .map_err(|e| internal_error(format!("Worker task failed: {e}")))
}

fn store_error(err: &StoreError) -> ApiError {
    tracing::error!(error = %err, "Failed to read submissions");
    service_unavailable_error(err.to_string())
}

#[post("/submit", data = "<form>")]
async fn submit(
    competition: &State<SharedCompetition>,
    form: Form<SubmissionForm<'_>>,
) -> ApiResult<SubmitReceipt> {
    let participant = Participant::new(&form.name, &form.model_description)
        .map_err(|e| bad_request_error(e.to_string()))?;
    let csv = read_upload(&form.predictions)
        .await
        .map_err(|e| bad_request_error(format!("Could not read the uploaded file: {e}")))?;

    let outcome = blocking(competition, move |c| c.submit(&participant, &csv))
        .await?
        .map_err(|e| submit_error(&e))?;

    if let Some(warning) = &outcome.warning {
        tracing::warn!(
            submission_id = outcome.submission_id,
            dropped = warning.dropped_rows.len(),
            "Submission accepted with unmapped rows"
        );
    }

    Ok(Json(SubmitReceipt::from_outcome(&outcome)))
}

#[get("/leaderboard")]
async fn leaderboard(
    competition: &State<SharedCompetition>,
    offset: &State<DisplayOffset>,
) -> ApiResult<LeaderboardResponse> {
    let board = blocking(competition, Competition::leaderboard)
        .await?
        .map_err(|e| store_error(&e))?;
    Ok(Json(LeaderboardResponse::render(&board, offset.0)))
}

#[get("/participants")]
async fn participants(competition: &State<SharedCompetition>) -> ApiResult<Vec<String>> {
    let names = blocking(competition, Competition::participants)
        .await?
        .map_err(|e| store_error(&e))?;
    Ok(Json(names))
}

#[get("/answer-key/info")]
fn answer_key_info(competition: &State<SharedCompetition>) -> Json<AnswerKeyInfo> {
    Json(AnswerKeyInfo {
        rows: competition.answer_key().len(),
    })
}

#[catch(404)]
fn not_found() -> Json<ApiErrorBody> {
    Json(ApiErrorBody::new(
        ApiErrorKind::NotFound,
        "The requested resource could not be found.",
    ))
}

#[catch(422)]
fn unprocessable_form() -> Json<ApiErrorBody> {
    Json(ApiErrorBody::new(
        ApiErrorKind::UnprocessableEntity,
        "The form must contain name, model_description and a predictions file.",
    ))
}

#[catch(default)]
fn default_catcher(status: Status, _request: &Request<'_>) -> rocket_status::Custom<Json<ApiErrorBody>> {
    let kind = if status.code >= 500 {
        ApiErrorKind::Internal
    } else {
        ApiErrorKind::BadRequest
    };
    rocket_status::Custom(status, Json(ApiErrorBody::new(kind, status.to_string())))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // rocket may have installed its own logger already
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Routes, catchers and request fairings, without any state.
fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(RequestTimingFairing)
        .attach(CorsFairing)
        .mount(
            "/",
            routes![submit, leaderboard, participants, answer_key_info],
        )
        .register("/", catchers![not_found, unprocessable_form, default_catcher])
}

#[launch]
fn rocket() -> _ {
    init_tracing();

    let prometheus = PrometheusMetrics::new();
    mount_api(rocket::build())
        .attach(AdHoc::try_on_ignite(
            "Competition",
            config::attach_competition,
        ))
        .attach(AdHoc::on_shutdown("Store teardown", |_| {
            Box::pin(async {
                tracing::info!("Shutting down, releasing the submission store");
            })
        }))
        .attach(prometheus.clone())
        .mount("/metrics", prometheus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_common::display::utc_offset_from_hours;
    use podium_common::store::{MemorySubmissionStore, SubmissionStore};
    use podium_common::{AnswerKey, NewSubmission, SubmissionId, SubmissionRecord};
    use rocket::http::ContentType;
    use rocket::local::blocking::Client;
    use std::time::Duration;

    const BOUNDARY: &str = "X-PODIUM-BOUNDARY";

    struct UnavailableStore;

    impl SubmissionStore for UnavailableStore {
        fn append(&self, _submission: NewSubmission) -> Result<SubmissionId, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn list_all(&self) -> Result<Vec<SubmissionRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn client_with_store(store: Arc<dyn SubmissionStore>) -> Client {
        let competition = Competition::new(
            AnswerKey::new(&[1, 0, 1, 0]).unwrap(),
            store,
            Duration::ZERO,
        );
        let rocket = mount_api(rocket::build())
            .manage(Arc::new(competition))
            .manage(DisplayOffset(utc_offset_from_hours(-3).unwrap()));
        Client::tracked(rocket).unwrap()
    }

    fn client() -> Client {
        client_with_store(Arc::new(MemorySubmissionStore::new()))
    }

    fn multipart_body(name: &str, model_description: &str, csv: &str) -> String {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\r\n\
             {name}\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"model_description\"\r\n\r\n\
             {model_description}\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"predictions\"; filename=\"predictions.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{BOUNDARY}--\r\n"
        )
    }

    fn post_submission(client: &Client, body: String) -> rocket::local::blocking::LocalResponse<'_> {
        client
            .post("/submit")
            .header(ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY)))
            .body(body)
            .dispatch()
    }

    #[test]
    fn test_submit_and_view_leaderboard() {
        let client = client();
        let csv = "prediction\nbad payer\ngood payer\nbad payer\ngood payer\n";

        let response = post_submission(&client, multipart_body("Team Rocket", "RandomForest", csv));
        assert_eq!(response.status(), Status::Ok);
        let receipt: SubmitReceipt = response.into_json().unwrap();
        assert_eq!(receipt.score_display, "1.0000");
        assert!(receipt.warning.is_none());

        let response = client.get("/leaderboard").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let board: LeaderboardResponse = response.into_json().unwrap();
        assert_eq!(board.history.len(), 1);
        assert_eq!(board.ranking.len(), 1);
        assert_eq!(board.ranking[0].name, "Team Rocket");
        assert_eq!(board.ranking[0].position_display, "1º 🥇");

        let names: Vec<String> = client.get("/participants").dispatch().into_json().unwrap();
        assert_eq!(names, vec!["Team Rocket"]);
    }

    #[test]
    fn test_submit_with_unmapped_rows_reports_warning() {
        let client = client();
        let csv = "prediction\nbad payer\nno idea\nbad payer\ngood payer\n";

        let response = post_submission(&client, multipart_body("Team Aqua", "svm", csv));
        assert_eq!(response.status(), Status::Ok);
        let receipt: SubmitReceipt = response.into_json().unwrap();
        assert_eq!(receipt.dropped_rows, vec![1]);
        assert!(receipt.warning.is_some());
    }

    #[test]
    fn test_submit_wrong_row_count_is_unprocessable() {
        let client = client();
        let csv = "prediction\nbad payer\n";

        let response = post_submission(&client, multipart_body("Team Rocket", "knn", csv));
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body: ApiErrorBody = response.into_json().unwrap();
        assert_eq!(body.error, ApiErrorKind::UnprocessableEntity);
        assert!(body.message.contains("1 rows but 4"));

        let board: LeaderboardResponse = client.get("/leaderboard").dispatch().into_json().unwrap();
        assert!(board.history.is_empty());
    }

    #[test]
    fn test_submit_malformed_csv_is_bad_request() {
        let client = client();
        let csv = "prediction\nbad payer\ngood payer,extra\nbad payer\ngood payer\n";

        let response = post_submission(&client, multipart_body("Team Rocket", "knn", csv));
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[test]
    fn test_submit_blank_name_is_bad_request() {
        let client = client();
        let csv = "prediction\nbad payer\ngood payer\nbad payer\ngood payer\n";

        let response = post_submission(&client, multipart_body("   ", "knn", csv));
        assert_eq!(response.status(), Status::BadRequest);
        let body: ApiErrorBody = response.into_json().unwrap();
        assert_eq!(body.error, ApiErrorKind::BadRequest);
    }

    #[test]
    fn test_store_failure_is_service_unavailable() {
        let client = client_with_store(Arc::new(UnavailableStore));
        let csv = "prediction\nbad payer\ngood payer\nbad payer\ngood payer\n";

        let response = post_submission(&client, multipart_body("Team Rocket", "knn", csv));
        assert_eq!(response.status(), Status::ServiceUnavailable);

        let response = client.get("/leaderboard").dispatch();
        assert_eq!(response.status(), Status::ServiceUnavailable);
    }

    #[test]
    fn test_answer_key_info_and_not_found() {
        let client = client();

        let info: AnswerKeyInfo = client.get("/answer-key/info").dispatch().into_json().unwrap();
        assert_eq!(info.rows, 4);

        let response = client.get("/nope").dispatch();
        assert_eq!(response.status(), Status::NotFound);
        let body: ApiErrorBody = response.into_json().unwrap();
        assert_eq!(body.error, ApiErrorKind::NotFound);
    }
}
