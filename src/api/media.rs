use actix_web::http::header;
use actix_web::{web, HttpResponse, Result as ActixResult};

use crate::services::{ImageKind, ImageStore};

#[utoipa::path(
    get,
    path = "/static/uploads/{folder}/{filename}",
    params(
        ("folder" = String, Path, description = "`posts` or `avatars`"),
        ("filename" = String, Path, description = "Stored image name")
    ),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "No such image")
    ),
    tag = "media"
)]
pub async fn uploaded_image(
    path: web::Path<(String, String)>,
    images: web::Data<ImageStore>,
) -> ActixResult<HttpResponse> {
    let (folder, filename) = path.into_inner();
    let Some(file) = ImageKind::from_folder(&folder).and_then(|kind| images.path(kind, &filename))
    else {
        return Ok(HttpResponse::NotFound().finish());
    };

    match tokio::fs::read(&file).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&file).first_or_octet_stream();
            Ok(HttpResponse::Ok()
                .content_type(mime.as_ref())
                .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
                .body(bytes))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HttpResponse::NotFound().finish()),
        Err(e) => {
            log::error!("Failed to read {}: {}", file.display(), e);
            Err(actix_web::error::ErrorInternalServerError("Failed to read image"))
        }
    }
}
