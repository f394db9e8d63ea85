use analyst_kit::app::commands;
use analyst_kit::utils::error::ErrorSeverity;
use analyst_kit::utils::logger;
use analyst_kit::Cli;
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::debug!("Starting analyst-kit");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    if let Err(e) = commands::run(cli) {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::debug!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}
