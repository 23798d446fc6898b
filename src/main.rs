use actix_web::{middleware::Logger, App, HttpServer};

use social_connect::config::Config;
use social_connect::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().expect("Failed to load configuration");
    let bind_address = config.bind_address();

    let state = AppState::init(config)
        .await
        .expect("Failed to initialise application state");

    log::info!("Starting server on {}", bind_address);
    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| state.configure(cfg))
    })
    .bind(bind_address)?
    .run()
    .await
}
