use bytes::Bytes;
use futures_util::Stream;
use log::{info, warn};
use multer::Multipart;

use crate::error::Error;
use crate::timer::Timer;

/// Hard ceiling on uploaded photos.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Part type multer reports when the client declared none.
const FALLBACK_PART_TYPE: &str = "application/octet-stream";

/// A validated photo upload. Request-scoped; dropped once the response is
/// sent.
#[derive(Debug)]
pub struct UploadedImage {
    bytes: Vec<u8>,
    mime: String,
    filename: Option<String>,
}

impl UploadedImage {
    /// Validate declared type and size. The MIME type must begin with
    /// `image/`; the byte length must not exceed [`MAX_UPLOAD_BYTES`].
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>, filename: Option<String>) -> Result<Self, Error> {
        let mime = mime.into();

        if !mime.starts_with("image/") {
            return Err(Error::InvalidType(mime));
        }

        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(Error::FileTooLarge {
                size: bytes.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }

        Ok(UploadedImage {
            bytes,
            mime,
            filename,
        })
    }

    /// Pull the photo out of a multipart request body.
    ///
    /// The file is the first field carrying a filename; its field name does
    /// not matter. Fields without a filename are skipped. A body with no
    /// file field, a missing or unparsable multipart content type, or a
    /// body that cannot be parsed at all are all treated as "no file".
    ///
    /// The declared part type is checked before any body bytes are pulled,
    /// and the size ceiling is enforced chunk by chunk so an oversized
    /// upload fails without buffering the whole body.
    pub async fn from_multipart<S, B, E>(content_type: Option<&str>, body: S) -> Result<Self, Error>
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let boundary = content_type
            .and_then(|ct| multer::parse_boundary(ct).ok())
            .ok_or(Error::MissingFile)?;

        let mut multipart = Multipart::new(body, boundary);
        let mut t = Timer::new_start("reading upload");

        while let Some(mut field) = multipart.next_field().await.map_err(reject_body)? {
            let filename = match field.file_name() {
                Some(name) => name.to_owned(),
                None => {
                    // Plain text field, not the photo.
                    continue;
                }
            };

            let mime = field
                .content_type()
                .map(|m| m.to_string())
                .unwrap_or_else(|| FALLBACK_PART_TYPE.to_owned());

            if !mime.starts_with("image/") {
                warn!("rejecting upload '{}' with type '{}'", filename, mime);
                return Err(Error::InvalidType(mime));
            }

            let mut data = Vec::new();
            while let Some(chunk) = field.chunk().await.map_err(reject_body)? {
                if data.len() + chunk.len() > MAX_UPLOAD_BYTES {
                    warn!("rejecting oversized upload '{}'", filename);
                    return Err(Error::FileTooLarge {
                        size: data.len() + chunk.len(),
                        limit: MAX_UPLOAD_BYTES,
                    });
                }
                data.extend_from_slice(&chunk);
            }

            t.stop();
            info!("file received: {} ({} bytes, {})", filename, data.len(), mime);

            return UploadedImage::new(data, mime, Some(filename));
        }

        Err(Error::MissingFile)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn reject_body(err: multer::Error) -> Error {
    // A body we cannot parse carries no usable file.
    warn!("unreadable multipart body: {}", err);
    Error::MissingFile
}
