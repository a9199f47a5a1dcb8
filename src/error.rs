//! Tipos de erro compartilhados pelo crate.
//!
//! [`StreamforgeError`] é o erro de nível superior devolvido pelo binário.
//! Cada subsistema tem seu próprio enum: [`ProgramError`] para o carregamento
//! de bundles, [`DeserializationError`] para o codec de especificações,
//! [`ProvisionError`] para o build do engine e [`FlowOpsError`] para os
//! comandos de operação.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamforgeError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Program error: {0}")]
    Program(#[from] ProgramError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Flow operation error: {0}")]
    FlowOps(#[from] FlowOpsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Falhas ao carregar um bundle de programa.
///
/// Campos resolvidos sob demanda de um [`Program`](crate::program::Program)
/// guardam a falha e entregam clones dela a cada chamador; por isso as
/// variantes carregam contexto clonável em vez de um erro de origem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    /// O artefato não é um bundle legível ou não tem manifest.
    #[error("malformed bundle {path}: {reason}")]
    MalformedBundle { path: PathBuf, reason: String },

    /// Falta um atributo obrigatório no manifest.
    #[error("fail to get {attribute} attribute from bundle {path}")]
    MissingAttribute { path: PathBuf, attribute: String },

    #[error("failed to load specification {entry}: {reason}")]
    SpecificationLoad { entry: String, reason: String },

    #[error("failed to build code context for {dir}: {reason}")]
    CodeLoad { dir: PathBuf, reason: String },

    #[error("failed to unpack bundle into {dir}: {reason}")]
    Unpack { dir: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("symbol {symbol} not found in program code")]
    SymbolNotFound { symbol: String },
}

/// Erro do codec de especificações; indica o campo problemático.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid field `{field}`: {reason}")]
pub struct DeserializationError {
    pub field: String,
    pub reason: String,
}

impl DeserializationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "missing required field")
    }
}

/// Falhas de um passo externo ou do pipeline de build do engine.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Um estágio terminou com status diferente de zero. Os seguintes não rodaram.
    #[error("{message} (stage {stage} exited with {exit_code})")]
    StageFailed {
        stage: String,
        exit_code: i32,
        message: String,
    },

    /// O processo não terminou a tempo. Pode ainda estar rodando.
    #[error("stage {stage} timed out after {}s", .timeout.as_secs_f64())]
    Timeout { stage: String, timeout: Duration },

    #[error("failed to launch stage {stage}: {source}")]
    Spawn {
        stage: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    /// Nome do estágio que gerou este erro.
    pub fn stage(&self) -> &str {
        match self {
            ProvisionError::StageFailed { stage, .. }
            | ProvisionError::Timeout { stage, .. }
            | ProvisionError::Spawn { stage, .. } => stage,
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowOpsError {
    #[error("flow {0} is not running")]
    NotRunning(String),

    #[error("flow {flow} has an unreadable pid file: {reason}")]
    InvalidPid { flow: String, reason: String },

    #[error("failed to signal flow {flow} (kill exited with {exit_code})")]
    SignalFailed { flow: String, exit_code: i32 },

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
