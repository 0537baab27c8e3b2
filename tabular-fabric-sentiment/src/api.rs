use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, ResponseError};
use futures_util::StreamExt;
use serde_json::json;
use tracing::{error, info, warn};

use crate::analyzer::{AnalyzeResponse, SentimentAnalyzer};
use crate::errors::AnalyzeError;

const UPLOAD_FIELD_NAME: &str = "file";

impl ResponseError for AnalyzeError {
    fn status_code(&self) -> StatusCode {
        if self.is_user_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.to_string() }))
    }
}

#[get("/")]
pub async fn check_status() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "Success": "Successfully deployed" }))
}

/// Scores the `review` column of an uploaded CSV file.
#[post("/analyze")]
pub async fn analyze_reviews(
    analyzer: web::Data<SentimentAnalyzer>,
    payload: Multipart,
) -> Result<web::Json<AnalyzeResponse>, AnalyzeError> {
    let (filename, content) = read_upload(payload).await?;
    info!("analyze upload {} ({} bytes)", filename, content.len());

    match analyzer.analyze_csv(&content).await {
        Ok(response) => Ok(web::Json(response)),
        Err(err) => {
            if err.is_user_error() {
                warn!("rejected upload {}: {}", filename, err);
            } else {
                error!("failed upload {}: {}", filename, err);
            }
            Err(err)
        }
    }
}

/// Pulls the `file` part out of the multipart body and checks its extension
/// before the content is read.
async fn read_upload(mut payload: Multipart) -> Result<(String, Vec<u8>), AnalyzeError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AnalyzeError::ProcessingError { msg: e.to_string() })?;
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            while field.next().await.is_some() {}
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        if !filename.ends_with(".csv") {
            return Err(AnalyzeError::InvalidFileType { filename });
        }

        let mut content = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| AnalyzeError::ProcessingError { msg: e.to_string() })?;
            content.extend_from_slice(&bytes);
        }
        return Ok((filename, content));
    }
    Err(AnalyzeError::MissingUpload)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(check_status).service(analyze_reviews);
}
