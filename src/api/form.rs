//! Form bodies that may arrive url-encoded or as multipart with file parts.

use actix_multipart::Multipart;
use actix_web::error::{ErrorBadRequest, ErrorPayloadTooLarge};
use actix_web::http::header;
use actix_web::{web, HttpRequest};
use futures_util::StreamExt;
use std::collections::HashMap;

use crate::models::Upload;

#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl FormData {
    /// Read the whole body, refusing anything larger than `limit` bytes.
    pub async fn read(
        req: &HttpRequest,
        payload: web::Payload,
        limit: usize,
    ) -> actix_web::Result<Self> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if is_multipart {
            Self::read_multipart(req, payload, limit).await
        } else {
            Self::read_urlencoded(payload, limit).await
        }
    }

    async fn read_urlencoded(mut payload: web::Payload, limit: usize) -> actix_web::Result<Self> {
        let mut body = Vec::new();
        while let Some(chunk) = payload.next().await {
            let chunk = chunk?;
            if body.len() + chunk.len() > limit {
                return Err(ErrorPayloadTooLarge("Request body too large"));
            }
            body.extend_from_slice(&chunk);
        }

        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(&body).map_err(ErrorBadRequest)?;
        Ok(FormData {
            fields: pairs.into_iter().collect(),
            files: HashMap::new(),
        })
    }

    async fn read_multipart(
        req: &HttpRequest,
        payload: web::Payload,
        limit: usize,
    ) -> actix_web::Result<Self> {
        let mut multipart = Multipart::new(req.headers(), payload);
        let mut form = FormData::default();
        let mut total = 0usize;

        while let Some(field) = multipart.next().await {
            let mut field = field?;
            let name = field.name().to_string();
            let filename = field
                .content_disposition()
                .get_filename()
                .map(str::to_string);

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                total += chunk.len();
                if total > limit {
                    return Err(ErrorPayloadTooLarge("Request body too large"));
                }
                data.extend_from_slice(&chunk);
            }

            match filename {
                // A file input left empty still sends a part with no name.
                Some(filename) if filename.is_empty() && data.is_empty() => {}
                Some(filename) => {
                    form.files.insert(
                        name,
                        Upload {
                            filename,
                            bytes: data,
                        },
                    );
                }
                None => {
                    form.fields
                        .insert(name, String::from_utf8_lossy(&data).into_owned());
                }
            }
        }
        Ok(form)
    }

    /// A text field, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn optional_text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}
