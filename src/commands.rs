use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::extractor::DocumentFetcher;
use crate::ollama::OllamaClient;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::server::{AnswerResponse, DocServer};

/// Where the `ask` command reads its document from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Url(String),
    File(PathBuf),
    /// A file holding already-extracted plain text
    Text(PathBuf),
}

impl DocumentSource {
    #[inline]
    pub fn parse(document: &str, plain_text: bool) -> Self {
        let lowered = document.to_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            Self::Url(document.to_string())
        } else if plain_text {
            Self::Text(PathBuf::from(document))
        } else {
            Self::File(PathBuf::from(document))
        }
    }
}

/// Connect to Ollama and verify that both models are installed
#[inline]
pub fn connect_ollama(config: &Config) -> Result<Arc<OllamaClient>> {
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    client.health_check().with_context(|| {
        format!(
            "Ollama health check failed at {}; is the server running with {} and {} pulled?",
            client.base_url(),
            config.ollama.embedding_model,
            config.ollama.generation_model
        )
    })?;
    Ok(Arc::new(client))
}

#[inline]
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let client = connect_ollama(config)?;
    let pipeline = Pipeline::new(
        PipelineConfig::from(config),
        Arc::clone(&client) as Arc<dyn crate::embeddings::Embedder>,
        client as Arc<dyn crate::generation::Generator>,
        DocumentFetcher::new(config.download.clone()),
    )?;
    Ok(pipeline)
}

/// Start the HTTP server
#[inline]
pub async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config
        .server
        .validate()
        .context("Invalid server configuration")?;

    let pipeline_config = config.clone();
    let pipeline = tokio::task::spawn_blocking(move || build_pipeline(&pipeline_config))
        .await
        .context("Pipeline setup task failed")??;
    let server = DocServer::new(&config.server, Arc::new(pipeline))?;

    println!(
        "Serving on {}",
        style(format!("http://{}", server.addr())).cyan()
    );
    server.serve().await?;
    Ok(())
}

/// Answer questions about one document and print the answers
#[inline]
pub fn ask(
    config: &Config,
    document: &str,
    questions: &[String],
    json: bool,
    plain_text: bool,
) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let source = DocumentSource::parse(document, plain_text);
    info!("Answering {} questions about {:?}", questions.len(), source);

    let answers = match &source {
        DocumentSource::Url(url) => pipeline.answer(url, questions),
        DocumentSource::File(path) => pipeline.answer_from_path(path, questions),
        DocumentSource::Text(path) => {
            let text = read_text(path)?;
            pipeline.answer_text(&text, questions)
        }
    }
    .map_err(|e| {
        error!("Failed during document processing pipeline: {}", e);
        e
    })?;

    if json {
        let response = AnswerResponse { answers };
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to serialize answers")?
        );
    } else {
        for (i, (question, answer)) in questions.iter().zip(&answers).enumerate() {
            println!("{} {}", style(format!("Q{}:", i + 1)).bold().yellow(), question);
            println!("{} {}", style(format!("A{}:", i + 1)).bold().green(), answer);
            println!();
        }
    }

    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read text file: {}", path.display()))
}

/// Report whether Ollama is reachable with both models installed
#[inline]
pub fn health(config: &Config) -> Result<()> {
    let client = connect_ollama(config)?;
    let models = client.list_models().context("Failed to list models")?;

    println!(
        "{} Ollama at {}",
        style("OK").bold().green(),
        client.base_url()
    );
    for model in models {
        println!("  {}", model.name);
    }
    Ok(())
}
