mod trace;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use dotenvy::dotenv;
use envconfig::Envconfig;
use tracing::info;

use tabular_fabric_sentiment::analyzer::SentimentAnalyzer;
use tabular_fabric_sentiment::api;
use tabular_fabric_sentiment::config::Config;
use tabular_fabric_sentiment::models::distilbert::CandleDistilBertClassifier;

use crate::trace::ServeLayer;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(o) = dotenv() {
        println!("config loaded from env file: {:?}", o);
    } else {
        println!("config loaded from env");
    }

    let config = Config::init_from_env()?;

    {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;
        tracing_subscriber::registry()
            .with(ServeLayer {
                app: "tabular-sentiment-server".to_string(),
                log_type: "general".to_string(),
                log_format: config.log_format.clone(),
                tz: config.timezone.clone(),
                level: Some(config.log_level.clone()),
            })
            .init();
    }
    info!("config loaded: {:?}", config);

    let classifier = CandleDistilBertClassifier::load(config.model_arg())?;
    let analyzer = SentimentAnalyzer::new(Arc::new(classifier), config.batch_size())?;
    info!(
        "sentiment analyzer ready, model {}, batch size {}",
        analyzer.model_name(),
        analyzer.batch_size()
    );
    let analyzer = web::Data::new(analyzer);

    let listen_addr = config.listen_addr();
    info!("listening on {}", listen_addr);
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(analyzer.clone())
            .configure(api::configure)
    });
    if let Some(workers) = config.serve_workers {
        server = server.workers(workers);
    }
    server.bind(listen_addr)?.run().await?;
    Ok(())
}
