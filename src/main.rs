use std::io;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use log::info;

use chess_vs_engine::config::Config;
use chess_vs_engine::engine::lichess::LichessCloudEval;
use chess_vs_engine::models::AppState;
use chess_vs_engine::routes::configure_routes;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let engine = LichessCloudEval::new(&config).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    if config.lichess_api_token.is_none() {
        info!("LICHESS_API_TOKEN not set, using anonymous cloud-eval requests");
    }

    let bind_addr = config.bind_addr.clone();
    let static_dir = config.static_dir.clone();
    info!("Starting chess server at http://{}", bind_addr);

    let app_state = web::Data::new(AppState::new(config, Arc::new(engine)));

    HttpServer::new(move || {
        let static_dir = static_dir.clone();
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(move |cfg| configure_routes(cfg, &static_dir))
    })
    .bind(bind_addr)?
    .run()
    .await
}
