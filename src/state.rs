use actix_web::web;
use tera::Tera;

use crate::api;
use crate::config::Config;
use crate::db::{create_pool, DbPool};
use crate::services::ImageStore;

/// Everything the handlers pull out of app data, built once per process and
/// cloned into each worker.
#[derive(Clone)]
pub struct AppState {
    pub config: web::Data<Config>,
    pub pool: web::Data<DbPool>,
    pub templates: web::Data<Tera>,
    pub images: web::Data<ImageStore>,
}

impl AppState {
    /// Connect (creating the schema), compile templates and prepare the upload
    /// folders.
    pub async fn init(config: Config) -> anyhow::Result<Self> {
        let pool = create_pool(&config).await?;

        let templates = api::render::templates()?;
        let images = ImageStore::new(config.uploads.folder.clone());
        images.prepare()?;

        Ok(AppState {
            config: web::Data::new(config),
            pool: web::Data::new(pool),
            templates: web::Data::new(templates),
            images: web::Data::new(images),
        })
    }

    /// Register app data, body limits and routes on an app or scope.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let limit = self.config.uploads.max_content_length;
        cfg.app_data(self.config.clone())
            .app_data(self.pool.clone())
            .app_data(self.templates.clone())
            .app_data(self.images.clone())
            .app_data(web::FormConfig::default().limit(limit))
            .app_data(web::PayloadConfig::new(limit))
            .configure(api::routes);
    }
}
