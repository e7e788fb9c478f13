//! Synchronous client-server connection utilities.

use crate::{
    AnswerKeyInfo, CLIENT_REQUEST_TIMEOUT_SECS, CLIENT_VERSION, LeaderboardResponse,
    SubmitReceipt,
};
use anyhow::{Context, Result, anyhow};
use log::warn;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use std::{thread, time::Duration};

/// Helper function to determine if an error is retry-able
/// - `is_timeout()` catches typical network timeouts
/// - `is_connect()` catches typical connection failures
fn is_retryable_error(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

fn error_type_str(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection"
    } else if e.is_request() {
        "request/DNS"
    } else if e.is_body() {
        "body"
    } else if e.is_decode() {
        "decode"
    } else {
        "unknown"
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(CLIENT_REQUEST_TIMEOUT_SECS))
        .user_agent(format!("podium_client/{CLIENT_VERSION}"))
        .build()
        .context("Failed to build HTTP client")
}

/// Turn a non-success response into an error carrying the server's message.
fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let msg = response
        .text()
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(anyhow!("Server returned an error ({status}): {msg}"))
}

/// GET a JSON document with exponential backoff on network and 5xx errors.
fn get_json_with_retry<T: DeserializeOwned>(url: &str, max_retries: u32) -> Result<T> {
    let client = build_client()?;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let sleep_secs = 2_u64.pow(attempts.saturating_sub(1));

        match client.get(url).send() {
            Ok(response) if response.status().is_server_error() && attempts < max_retries => {
                let status = response.status();
                warn!(
                    "Server error ({status}), retrying in {sleep_secs} seconds... (attempt {attempts}/{max_retries})"
                );
                thread::sleep(Duration::from_secs(sleep_secs));
            }
            Ok(response) => {
                return check_status(response)?
                    .json::<T>()
                    .context("Failed to deserialize server response");
            }
            Err(e) if is_retryable_error(&e) && attempts < max_retries => {
                warn!(
                    "Network error ({}), retrying in {sleep_secs} seconds... (attempt {attempts}/{max_retries}): {e}",
                    error_type_str(&e)
                );
                thread::sleep(Duration::from_secs(sleep_secs));
            }
            Err(e) => {
                return Err(anyhow!(
                    "Network error ({}) after {attempts} attempts: {e}",
                    error_type_str(&e)
                ));
            }
        }
    }
}

/// Request the rendered history and ranking tables.
///
/// # Errors
/// Returns an error if the server cannot be reached after all retries or the
/// response cannot be deserialized.
pub fn get_leaderboard_from_server(api_base: &str, max_retries: u32) -> Result<LeaderboardResponse> {
    get_json_with_retry(&format!("{api_base}/leaderboard"), max_retries)
}

/// Request the names of everyone who has submitted so far.
///
/// # Errors
/// See [`get_leaderboard_from_server`].
pub fn get_participants_from_server(api_base: &str, max_retries: u32) -> Result<Vec<String>> {
    get_json_with_retry(&format!("{api_base}/participants"), max_retries)
}

/// Request the number of rows a submission must have.
///
/// # Errors
/// See [`get_leaderboard_from_server`].
pub fn get_answer_key_info_from_server(api_base: &str, max_retries: u32) -> Result<AnswerKeyInfo> {
    get_json_with_retry(&format!("{api_base}/answer-key/info"), max_retries)
}

/// Upload a prediction file. Submissions are not idempotent, so this is
/// never retried: a failed upload must be resubmitted by the user.
///
/// # Errors
/// Returns an error on any network failure or non-success response.
pub fn submit_predictions_to_server(
    api_base: &str,
    name: &str,
    model_description: &str,
    file_name: &str,
    csv: Vec<u8>,
) -> Result<SubmitReceipt> {
    let url = format!("{api_base}/submit");

    let file_part = Part::bytes(csv)
        .file_name(file_name.to_string())
        .mime_str("text/csv")
        .context("Failed to build the file part")?;
    let form = Form::new()
        .text("name", name.to_string())
        .text("model_description", model_description.to_string())
        .part("predictions", file_part);

    let response = build_client()?
        .post(&url)
        .multipart(form)
        .send()
        .map_err(|e| anyhow!("Network error ({}): {e}", error_type_str(&e)))?;

    check_status(response)?
        .json::<SubmitReceipt>()
        .context("Failed to deserialize submission receipt")
}
