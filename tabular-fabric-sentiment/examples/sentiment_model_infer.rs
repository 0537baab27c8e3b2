use std::env;
use std::sync::Arc;
use std::time::Instant;

use tabular_fabric_sentiment::analyzer::SentimentAnalyzer;
use tabular_fabric_sentiment::models::distilbert::{CandleDistilBertArg, CandleDistilBertClassifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let arg = CandleDistilBertArg {
        // MODEL_REPOS/<model> must hold config.json, tokenizer.json and model.safetensors;
        // without it the model is fetched from the hub.
        model_dir: env::var("MODEL_REPOS")
            .ok()
            .map(|repo| format!("{}/distilbert-base-uncased-finetuned-sst-2-english", repo)),
        device: "cpu".to_string(),
        ..Default::default()
    };
    let classifier = CandleDistilBertClassifier::load(arg)?;
    println!("loaded model");

    let analyzer = SentimentAnalyzer::new(Arc::new(classifier), 2)?;
    let reviews = vec![
        "great product".to_string(),
        "terrible, broke immediately".to_string(),
        "".to_string(),
    ];

    let timer = Instant::now();
    let scores = analyzer.analyze_batch(&reviews).await?;
    for (review, score) in reviews.iter().zip(&scores) {
        println!("{:?} -> {} ({:.4})", review, score.label, score.score);
    }

    let response = analyzer
        .analyze_csv(b"review\nlove it\nwould not buy again\n")
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    println!("{:#?}", timer.elapsed());
    Ok(())
}
