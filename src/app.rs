//! Main application orchestration and execution

use crate::{
    config::{display_config_summary, validate_config, ValidationLevel},
    error::Result,
    models::Config,
    orchestrator::{NullSink, Orchestrator, ResultSink, RunContext, RunOutcome},
    output::{format_json, ConsoleSink, OutputFormatterFactory},
    probes::standard_plan,
    types::RunStatus,
};

/// Process exit code for a finished run
pub fn exit_code(status: RunStatus) -> i32 {
    match status {
        RunStatus::Completed | RunStatus::Restricted => 0,
        RunStatus::GateUnavailable => 2,
        RunStatus::TimedOut => 3,
        RunStatus::Cancelled => 130,
    }
}

/// Wires configuration, the standard plan and the console together
pub struct App {
    config: Config,
    orchestrator: Orchestrator,
}

impl App {
    pub fn new(config: Config) -> Self {
        let orchestrator = Orchestrator::from_config(&config);
        Self { config, orchestrator }
    }

    /// Use a prepared orchestrator (custom session factory, captured logs)
    pub fn with_orchestrator(config: Config, orchestrator: Orchestrator) -> Self {
        Self { config, orchestrator }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the standard plan until it finishes or Ctrl-C is pressed
    pub async fn run(&self) -> Result<RunOutcome> {
        self.print_preamble()?;

        let context = RunContext::from_config(&self.config);
        let token = context.cancellation_token().clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });

        let outcome = if self.config.json_output {
            self.run_with(&NullSink, &context).await
        } else {
            let formatter = OutputFormatterFactory::create_formatter(&self.config);
            self.run_with(&ConsoleSink::new(formatter), &context).await
        };
        interrupt.abort();

        let outcome = outcome?;
        println!("{}", self.render_report(&outcome)?);
        Ok(outcome)
    }

    /// Run the standard plan against an explicit sink and context
    pub async fn run_with(&self, sink: &dyn ResultSink, context: &RunContext) -> Result<RunOutcome> {
        let plan = standard_plan(&self.config)?;
        self.orchestrator.run(&plan, sink, context).await
    }

    /// Closing text: the JSON document, or the summary after the streamed lines
    pub fn render_report(&self, outcome: &RunOutcome) -> Result<String> {
        if self.config.json_output {
            return format_json(outcome);
        }

        let formatter = OutputFormatterFactory::create_formatter(&self.config);
        let mut report = format!("\n{}", formatter.format_summary(outcome));
        if self.config.show_full_ip {
            if let Some(addresses) = formatter.addresses(outcome) {
                report.push_str(&format!("\nAddresses: {}", addresses));
            }
        }
        Ok(report)
    }

    fn print_preamble(&self) -> Result<()> {
        let warnings = validate_config(&self.config)?;

        if self.config.debug {
            eprintln!(
                "{} v{} (commit {}, built {})",
                crate::PKG_NAME,
                crate::VERSION,
                crate::GIT_COMMIT.unwrap_or("unknown"),
                crate::BUILD_TIME.unwrap_or("unknown")
            );
            eprintln!("\nConfiguration Summary:\n{}\n", display_config_summary(&self.config));
        }

        let threshold = if self.config.verbose || self.config.debug {
            ValidationLevel::Info
        } else {
            ValidationLevel::Warning
        };
        for warning in warnings.iter().filter(|w| w.level >= threshold) {
            eprintln!("{}", warning.format(self.config.enable_color));
        }

        Ok(())
    }
}
