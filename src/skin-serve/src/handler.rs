use log::{error, info, warn};
use serde_json::json;

use crate::client::SkinClassifier;
use crate::error::Error;
use crate::upload::UploadedImage;

/// Body of the `GET /` liveness response.
pub const LIVENESS_BANNER: &str = "BeautyWise skin type prediction API is running";

/// Framework-free response: the hosting adapter turns this into whatever
/// its platform wants.
#[derive(Debug)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpReply {
    fn json(status: u16, body: serde_json::Value) -> Self {
        HttpReply {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn liveness() -> Self {
        HttpReply {
            status: 200,
            content_type: "text/plain",
            body: LIVENESS_BANNER.to_owned(),
        }
    }
}

/// One request/response cycle of the prediction endpoint.
///
/// Takes the upload (or the validation failure that produced none) so it
/// can be tested without a live HTTP server. Three terminal outcomes:
/// validation failure → 400, downstream failure → 500, success → 200 with
/// the predicted label.
pub async fn handle(
    upload: Result<UploadedImage, Error>,
    classifier: &SkinClassifier,
) -> HttpReply {
    info!("received a request for skin type prediction");

    let upload = match upload {
        Ok(upload) => upload,
        Err(err) => return reject(&err),
    };

    match classifier.classify(&upload).await {
        Ok(classification) => HttpReply::json(200, json!({ "skinType": classification.skin_type })),
        Err(err) => reject(&err),
    }
}

fn reject(err: &Error) -> HttpReply {
    if err.is_client_error() {
        warn!("rejected upload: {}", err);
    } else {
        error!("error processing image: {}", err);
    }

    HttpReply::json(err.status(), json!({ "error": err.user_message() }))
}
