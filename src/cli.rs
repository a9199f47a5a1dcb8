//! Interface de linha de comando construída com clap.
//!
//! Subcomandos: `stop`, `provision`, `inspect`. Flags globais:
//! `--stage-timeout`, `--verbose`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// streamforge: carregador de bundles de programa e provisionamento do stream engine.
#[derive(Debug, Parser)]
#[command(name = "streamforge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Segundos que cada estágio do build pode rodar (sobrescreve streamforge.toml).
    #[arg(long, global = true)]
    pub stage_timeout: Option<u64>,

    /// Ativa logs de debug.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Para um Flow.
    Stop {
        /// Nome do flow em execução.
        #[arg(value_name = "flow-name")]
        flow_name: String,
    },

    /// Compila os binários nativos do stream engine em um diretório alvo.
    Provision {
        /// Diretório da query, dois níveis abaixo da raiz da plataforma.
        target_dir: PathBuf,

        /// Arquivo de schema de pacotes, relativo ao diretório alvo.
        #[arg(long)]
        schema: Option<String>,

        /// Arquivo da query, relativo ao diretório alvo.
        #[arg(long)]
        query: Option<String>,
    },

    /// Abre um bundle de programa e imprime a especificação do flow.
    Inspect {
        /// Caminho do bundle de programa.
        bundle: PathBuf,

        /// Descompacta o bundle aqui e carrega sob demanda em vez de ler o arquivo empacotado.
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_stop_subcommand() {
        let cli = Cli::parse_from(["streamforge", "stop", "PacketCount"]);
        match cli.command {
            Command::Stop { flow_name } => assert_eq!(flow_name, "PacketCount"),
            _ => panic!("expected Stop command"),
        }
    }

    #[test]
    fn stop_requires_flow_name() {
        assert!(Cli::try_parse_from(["streamforge", "stop"]).is_err());
        assert!(Cli::try_parse_from(["streamforge", "stop", "a", "b"]).is_err());
    }

    #[test]
    fn cli_parses_provision_with_files() {
        let cli = Cli::parse_from([
            "streamforge",
            "--stage-timeout",
            "45",
            "provision",
            "/opt/sf/query/flow",
            "--query",
            "top.gsql",
        ]);
        assert_eq!(cli.stage_timeout, Some(45));
        match cli.command {
            Command::Provision {
                target_dir,
                schema,
                query,
            } => {
                assert_eq!(target_dir, PathBuf::from("/opt/sf/query/flow"));
                assert!(schema.is_none());
                assert_eq!(query.as_deref(), Some("top.gsql"));
            }
            _ => panic!("expected Provision command"),
        }
    }

    #[test]
    fn cli_parses_inspect_with_global_verbose() {
        let cli = Cli::parse_from(["streamforge", "inspect", "app.jar", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Inspect { work_dir: None, .. }));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
