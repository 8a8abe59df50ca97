use crate::AppCore;
use crate::http::ApiError;
use crate::models::{
    CodeInput, CodeStatus, EntryRecord, EntryUpdate, NewEntry, RetrievedEntry, ValidationError,
    parse_code,
};
use crate::services::Retrieval;
use axum::{
    Json,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct CheckCodeResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CodeStatus>,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveQuery {
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub success: bool,
    pub restricted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<RetrievedEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub new_code: Option<CodeInput>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: String,
    pub data: EntryRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTextRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub code: Option<CodeInput>,
    #[serde(default)]
    pub security_question: Option<String>,
    #[serde(default)]
    pub security_answer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTextResponse {
    pub success: bool,
    pub data_id: String,
    pub code: Option<i64>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveCodeRequest {
    #[serde(default)]
    pub code: Option<CodeInput>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCodeResponse {
    pub success: bool,
    pub data_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub success: bool,
    pub data: Vec<EntryRecord>,
}

/// Resolve an optional body code, rejecting non-numeric text.
fn body_code(code: Option<CodeInput>) -> Result<Option<i64>, ValidationError> {
    match code {
        Some(input) => input.resolve(),
        None => Ok(None),
    }
}

// GET /check-code/{code}
pub async fn check_code(
    Extension(core): Extension<Arc<AppCore>>,
    raw: Result<Path<String>, PathRejection>,
) -> Result<Json<CheckCodeResponse>, ApiError> {
    let code = match raw {
        Ok(Path(raw)) => parse_code(&raw).ok().flatten(),
        Err(_) => None,
    };
    let Some(code) = code else {
        return Ok(Json(CheckCodeResponse {
            exists: false,
            data: None,
        }));
    };

    let status = core.entries.check_code_exists(code)?;
    Ok(Json(CheckCodeResponse {
        exists: status.is_some(),
        data: status,
    }))
}

// GET /retrieve/{code}?answer=
pub async fn retrieve(
    Extension(core): Extension<Arc<AppCore>>,
    raw: Result<Path<String>, PathRejection>,
    query: Result<Query<RetrieveQuery>, QueryRejection>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let Path(raw) = raw?;
    let Query(query) = query?;
    let code = parse_code(&raw)?.ok_or_else(|| ApiError::bad_request("Code parameter is required"))?;

    let response = match core.entries.retrieve(code, query.answer.as_deref())? {
        Retrieval::Unlocked(data) => RetrieveResponse {
            success: true,
            restricted: false,
            data: Some(data),
            question: None,
            message: None,
        },
        Retrieval::ChallengeRequired { question } => RetrieveResponse {
            success: true,
            restricted: true,
            data: None,
            question: Some(question),
            message: Some("Security answer required".to_string()),
        },
    };
    Ok(Json(response))
}

// PUT /update/{code}
pub async fn update(
    Extension(core): Extension<Arc<AppCore>>,
    raw: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let code = match raw.map(|Path(raw)| parse_code(&raw)) {
        Ok(Ok(Some(code))) => code,
        _ => return Err(ApiError::bad_request("Invalid code")),
    };
    let Json(request) = payload?;

    let update = EntryUpdate {
        title: request.title,
        new_code: body_code(request.new_code)?,
    };
    let entry = core.entries.update(code, update)?;

    Ok(Json(UpdateResponse {
        success: true,
        message: "Data updated successfully".to_string(),
        data: entry.to_record(),
    }))
}

// POST /save-text
pub async fn save_text(
    Extension(core): Extension<Arc<AppCore>>,
    payload: Result<Json<SaveTextRequest>, JsonRejection>,
) -> Result<Json<SaveTextResponse>, ApiError> {
    let Json(request) = payload?;

    let input = NewEntry {
        title: request.text.unwrap_or_default(),
        code: body_code(request.code)?,
        security_question: request.security_question,
        security_answer: request.security_answer,
    };
    let entry = core.entries.create(input)?;

    Ok(Json(SaveTextResponse {
        success: true,
        data_id: entry.id,
        code: entry.code,
        message: "Text saved successfully".to_string(),
    }))
}

// POST /save-code
pub async fn save_code(
    Extension(core): Extension<Arc<AppCore>>,
    payload: Result<Json<SaveCodeRequest>, JsonRejection>,
) -> Result<Json<SaveCodeResponse>, ApiError> {
    let Json(request) = payload?;

    let code = body_code(request.code)?.ok_or_else(|| ApiError::bad_request("Code is required"))?;
    let entry = core.entries.save_code(code, request.title)?;

    Ok(Json(SaveCodeResponse {
        success: true,
        data_id: entry.id,
        message: "Code saved successfully".to_string(),
    }))
}

// GET /results
pub async fn results(
    Extension(core): Extension<Arc<AppCore>>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let entries = core.entries.list_recent()?;
    Ok(Json(ResultsResponse {
        success: true,
        data: entries.iter().map(|entry| entry.to_record()).collect(),
    }))
}
