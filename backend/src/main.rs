use actix_cors::Cors;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Context;
use log::{error, info};

use diabetes_api::config::ServerConfig;
use diabetes_api::routes;
use diabetes_api::ModelInference;

fn cors(origins: &[String]) -> Cors {
    let cors = if origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("🚀 Démarrage de l'API de Prédiction du Diabète");

    let config = ServerConfig::from_env();

    // Chargement unique du modèle, partagé en lecture seule
    let model = ModelInference::load(config.model_path.as_deref())
        .inspect_err(|e| error!("❌ {}", e))
        .context("Impossible de charger le modèle")?;
    let info = model.get_model_info();
    info!("✅ Modèle {} chargé ({})", info.kind, info.source);

    let model_data = web::Data::new(model);
    let bind_address = config.bind_address();

    info!("🌐 Serveur démarré sur: http://{}", bind_address);
    info!("👷 Workers: {}", config.workers);
    info!("🔧 Endpoints API:");
    info!("   GET  /             - Accueil");
    info!("   GET  /model-info   - Information modèle");
    info!("   POST /predict      - Prédiction simple");

    let json_limit = config.json_limit;
    let origins = config.cors_origins.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(cors(&origins))
            .app_data(model_data.clone())
            .app_data(routes::BodyLimit(json_limit))
            .configure(routes::configure)
            .default_service(web::route().to(routes::not_found))
    })
    .workers(config.workers)
    .bind(&bind_address)
    .with_context(|| format!("Impossible d'écouter sur {}", bind_address))?
    .run()
    .await?;

    Ok(())
}
