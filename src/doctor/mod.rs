//! Doctor command for environment diagnostics
//!
//! Checks the pieces a query needs before it can succeed: a reachable
//! Ollama server, the configured models, and a usable index.

use colored::Colorize;

use crate::config::{Config, EmbeddingBackend, IndexBackend};
use crate::index::{LocalVectorIndex, VectorIndex};
use crate::models::OllamaClient;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

/// Diagnostics runner
pub struct Doctor {
    client: OllamaClient,
    config: Config,
}

impl Doctor {
    pub fn new(client: OllamaClient, config: Config) -> Self {
        Self { client, config }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = Vec::new();
        checks.push(self.check_ollama_api().await);
        checks.push(self.check_generation_model().await);
        checks.push(self.check_embedding_models().await);
        checks.push(self.check_index().await);
        checks
    }

    /// Print checks and return overall success
    pub fn report(checks: &[HealthCheck]) -> bool {
        let mut ok = true;
        for check in checks {
            match &check.status {
                HealthStatus::Pass => println!("  {} {}", "✓".green(), check.name),
                HealthStatus::Warn(msg) => {
                    println!("  {} {}: {}", "!".yellow(), check.name, msg)
                }
                HealthStatus::Fail(msg) => {
                    ok = false;
                    println!("  {} {}: {}", "✗".red(), check.name, msg)
                }
            }
        }
        ok
    }

    async fn check_ollama_api(&self) -> HealthCheck {
        let status = if self.client.health_check().await {
            HealthStatus::Pass
        } else {
            HealthStatus::Fail(format!(
                "not reachable at {} (start with: ollama serve)",
                self.client.base_url()
            ))
        };
        HealthCheck {
            name: "Ollama API".to_string(),
            status,
        }
    }

    async fn check_generation_model(&self) -> HealthCheck {
        let model = &self.config.generation.model;
        let status = match self.client.list_models().await {
            Ok(models) if models.iter().any(|m| m == model) => HealthStatus::Pass,
            Ok(_) => HealthStatus::Fail(format!("'{}' not installed (ollama pull {})", model, model)),
            Err(e) => HealthStatus::Fail(e.to_string()),
        };
        HealthCheck {
            name: "Generation model".to_string(),
            status,
        }
    }

    async fn check_embedding_models(&self) -> HealthCheck {
        let status = match self.config.embedding.backend {
            EmbeddingBackend::Local => {
                HealthStatus::Warn("local backend downloads its model on first use".to_string())
            }
            EmbeddingBackend::Ollama => match self.client.list_models().await {
                Ok(models) => {
                    let candidates = &self.config.embedding.ollama_models;
                    // tags carry a :latest suffix the candidate list omits
                    let installed = candidates.iter().any(|c| {
                        models.iter().any(|m| m == c || m.starts_with(&format!("{}:", c)))
                    });
                    if installed {
                        HealthStatus::Pass
                    } else {
                        HealthStatus::Fail(format!(
                            "none of [{}] installed",
                            candidates.join(", ")
                        ))
                    }
                }
                Err(e) => HealthStatus::Fail(e.to_string()),
            },
        };
        HealthCheck {
            name: "Embedding model".to_string(),
            status,
        }
    }

    async fn check_index(&self) -> HealthCheck {
        let status = match self.config.index.backend {
            IndexBackend::Qdrant => {
                HealthStatus::Warn(format!("qdrant backend at {}", self.config.index.qdrant_url))
            }
            IndexBackend::Local => match LocalVectorIndex::open(&self.config.index.path) {
                Ok(index) => match index.count().await {
                    Ok(0) => HealthStatus::Warn(
                        "index is empty (run: docbuddy populate)".to_string(),
                    ),
                    Ok(_) => HealthStatus::Pass,
                    Err(e) => HealthStatus::Fail(e.to_string()),
                },
                Err(e) => HealthStatus::Fail(e.to_string()),
            },
        };
        HealthCheck {
            name: "Vector index".to_string(),
            status,
        }
    }
}
