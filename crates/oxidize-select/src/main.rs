use std::io::{stdout, Write};
use std::process::ExitCode;

use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use log::{error, LevelFilter};

use oxidize_select::workflow;
use oxidize_select::{WorkflowConfig, WorkflowResult};

fn main() -> ExitCode {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Warn)
        .parse_env(env_logger::Env::default().filter_or("RUST_LOG", "warn,oxidize_select=info"))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> WorkflowResult<()> {
    // An optional first argument overrides the configured data source.
    let mut config = WorkflowConfig::from_env()?;
    if let Some(source) = std::env::args().nth(1) {
        config = config.with_source(source);
    }

    let report = workflow::run(&config)?;

    let mut stdout = stdout();
    for (title, body) in report.sections() {
        execute!(
            stdout,
            SetForegroundColor(Color::Cyan),
            Print(format!("\n== {} ==\n", title)),
            ResetColor,
            Print(format!("{}\n", body)),
        )?;
    }
    stdout.flush()?;
    Ok(())
}
