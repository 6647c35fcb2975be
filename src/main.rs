use fitbuddy::config::Config;
use fitbuddy::db::Db;
use fitbuddy::state::AppState;
use ntex::web;
use ntex_cors::Cors;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[ntex::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let db = Db::open(&config.db_path).map_err(std::io::Error::other)?;
    let bind = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, db);

    info!("FitBuddy server v{} starting on {}", env!("CARGO_PKG_VERSION"), bind);

    web::HttpServer::new(move || {
        web::App::new()
            .state(state.clone())
            .wrap(
                Cors::new()
                    .allowed_origin("*")
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec!["Content-Type"])
                    .max_age(3600)
                    .finish(),
            )
            .configure(fitbuddy::routes)
    })
    .bind(bind)?
    .run()
    .await
}
