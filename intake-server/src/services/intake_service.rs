use actix_multipart::form::bytes::Bytes as UploadedImage;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use blob_store::{save_base64, BlobStore, LocalUploadStore};
use record_log::{Record, RecordLog};

use crate::errors::IntakeErr;

pub const APP_TYPE_JSON: &str = "application/json";

/// Key the server adds to a record when an image was persisted alongside it.
const SAVED_IMAGE_KEY: &str = "server_saved_image";

pub struct AppState {
    pub(crate) records: RecordLog,
    pub(crate) uploads: LocalUploadStore,
    pub(crate) auth_token: String,
}

#[derive(Deserialize)]
struct IntakeRequest {
    record: Record,
    #[serde(default)]
    image_b64: String,
}

#[derive(Serialize, Deserialize)]
struct IntakeResponse {
    ok: bool,
    id: Value,
    saved: String,
}

#[derive(Serialize, Deserialize)]
struct MultipartIntakeResponse {
    ok: bool,
    saved: String,
}

#[derive(MultipartForm)]
struct IntakeForm {
    record_json: Option<Text<String>>,
    image: Option<UploadedImage>,
}

fn auth_ok(req: &HttpRequest, token: &str) -> bool {
    if token.is_empty() {
        return true;
    }
    let expected = format!("Bearer {}", token);
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == expected)
        .unwrap_or(false)
}

#[post("/requests")]
pub(crate) async fn receive(
    req: HttpRequest,
    request_json_bytes: web::Bytes,
    shared_state: web::Data<AppState>,
) -> Result<HttpResponse, IntakeErr> {
    if !auth_ok(&req, &shared_state.auth_token) {
        return Err(IntakeErr::Unauthorized);
    }

    let intake: IntakeRequest = serde_json::from_slice(&request_json_bytes)?;
    let mut record = intake.record;

    // A broken payload aborts here, before anything is persisted.
    let saved_path = save_base64(&shared_state.uploads, &intake.image_b64)?;
    if !saved_path.is_empty() {
        record.insert(
            SAVED_IMAGE_KEY.to_string(),
            Value::String(saved_path.clone()),
        );
    }

    shared_state.records.append(&record)?;
    tracing::debug!("stored record, saved image: {:?}", saved_path);

    let resp = IntakeResponse {
        ok: true,
        id: record.get("id").cloned().unwrap_or(Value::Null),
        saved: saved_path,
    };
    Ok(HttpResponse::Created()
        .content_type(APP_TYPE_JSON)
        .json(resp))
}

#[post("/requests-mp")]
pub(crate) async fn receive_multipart(
    req: HttpRequest,
    MultipartForm(form): MultipartForm<IntakeForm>,
    shared_state: web::Data<AppState>,
) -> Result<HttpResponse, IntakeErr> {
    if !auth_ok(&req, &shared_state.auth_token) {
        return Err(IntakeErr::Unauthorized);
    }

    let mut record: Record = match form.record_json {
        Some(text) => serde_json::from_str(&text.into_inner())?,
        None => Record::new(),
    };

    let mut saved_path = String::new();
    if let Some(image) = form.image {
        saved_path = shared_state.uploads.save_blob(&image.data)?;
        record.insert(
            SAVED_IMAGE_KEY.to_string(),
            Value::String(saved_path.clone()),
        );
    }

    shared_state.records.append(&record)?;

    let resp = MultipartIntakeResponse {
        ok: true,
        saved: saved_path,
    };
    Ok(HttpResponse::Created()
        .content_type(APP_TYPE_JSON)
        .json(resp))
}

#[get("/")]
pub(crate) async fn root() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

#[get("/healthz")]
pub(crate) async fn healthz() -> impl Responder {
    HttpResponse::Ok().body("OK")
}
