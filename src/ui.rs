//! Saída no terminal: spinner do provisionamento e resumos coloridos.
//!
//! Usa `indicatif` para o spinner e `console` para as cores.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::engine::{BuildReport, PipelineState};
use crate::error::ProvisionError;
use crate::program::Program;
use crate::spec::FlowSpecification;

/// Spinner que acompanha o build do engine estágio por estágio.
pub struct BuildProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    cyan: Style,
}

impl BuildProgress {
    pub fn start(target: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("provisioning {target}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            cyan: Style::new().cyan(),
        }
    }

    pub fn update(&self, state: &PipelineState) {
        if let PipelineState::Running { stage } = state {
            self.pb.set_message(format!("stage {}", self.cyan.apply_to(stage)));
        }
    }

    /// Limpa o spinner. Falhas são marcadas aqui e reportadas por completo
    /// pelo caminho de erro do chamador.
    pub fn complete(&self, result: &Result<BuildReport, ProvisionError>) {
        self.pb.finish_and_clear();
        match result {
            Ok(_) => println!("  {} Engine binaries provisioned", self.green.apply_to("✓")),
            Err(e) => eprintln!("  {} stage {} failed", self.red.apply_to("✗"), e.stage()),
        }
    }

    pub fn print_report(&self, report: &BuildReport) {
        println!();
        println!("{}", self.green.apply_to("─── Build Report ───"));
        println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
    }
}

pub fn print_program(program: &Program, spec: &FlowSpecification) {
    use crate::spec::SpecificationCodec;

    let bold = Style::new().bold();
    println!("{} {}", bold.apply_to("Program:"), program.name());
    println!("{} {}", bold.apply_to("Type:"), program.program_type());
    println!("{} {}", bold.apply_to("Spec entry:"), program.spec_entry());
    println!();
    println!("{}", spec.to_json());
}
