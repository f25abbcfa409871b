// Generator backend abstraction
// Supports multiple chart generators: Deterministic (canonical) and Assisted (future)

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{GenerationError, GenerationResult};
use super::generate::{generate_chart, generate_chart_async, GenerationReport, GenerationRequest};
use super::state::CancellationToken;
use crate::config::GeneratorConfig;

/// Chart generator backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorBackend {
    /// Seeded rule-based pipeline
    Deterministic,

    /// Model-assisted generation (future)
    /// Would produce the same chart record through a separate implementation
    Assisted,
}

impl fmt::Display for GeneratorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorBackend::Deterministic => f.write_str("deterministic"),
            GeneratorBackend::Assisted => f.write_str("assisted"),
        }
    }
}

/// Chart generator bound to one backend and one configuration
#[derive(Debug, Clone)]
pub struct Generator {
    backend: GeneratorBackend,
    config: GeneratorConfig,
}

impl Generator {
    /// Create a generator with the specified backend and default settings
    pub fn new(backend: GeneratorBackend) -> GenerationResult<Self> {
        Self::with_config(backend, GeneratorConfig::default())
    }

    pub fn with_config(backend: GeneratorBackend, config: GeneratorConfig) -> GenerationResult<Self> {
        match backend {
            GeneratorBackend::Deterministic => {
                config.validate()?;
                Ok(Generator { backend, config })
            }
            GeneratorBackend::Assisted => Err(GenerationError::Configuration(format!(
                "generator backend '{}' is not available",
                backend
            ))),
        }
    }

    pub fn generate(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> GenerationResult<GenerationReport> {
        generate_chart(request, &self.config, cancel)
    }

    pub async fn generate_async(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> GenerationResult<GenerationReport> {
        generate_chart_async(request, self.config.clone(), cancel).await
    }

    /// Get the current backend type
    pub fn backend(&self) -> GeneratorBackend {
        self.backend
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

}

impl Default for Generator {
    fn default() -> Self {
        Generator {
            backend: GeneratorBackend::Deterministic,
            config: GeneratorConfig::default(),
        }
    }
}
