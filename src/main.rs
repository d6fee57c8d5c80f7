use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use regfinal::application::checkout::Checkout;
use regfinal::application::reconciler::Reconciler;
use regfinal::application::session::{FinalizationSession, SessionPorts};
use regfinal::config::{ConfigArgs, FinalizationConfig};
use regfinal::domain::event::ChannelEvent;
use regfinal::domain::ports::ScopeId;
use regfinal::domain::state::Seed;
use regfinal::infrastructure::in_memory::{
    InMemoryChannelHub, InMemoryStatusSource, ScriptedCheckoutUi, ScriptedGateway,
};
use regfinal::interfaces::csv::input_reader::InputReader;
use regfinal::interfaces::csv::state_writer::StateWriter;
use regfinal::interfaces::reveal::Reveal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Registration finalization reconciler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded input log and print the resulting snapshot
    Replay {
        /// Input CSV file (kind, name, pid, receipt, processing_step)
        input: PathBuf,

        /// What was known when the view opened
        #[arg(long, value_enum, default_value_t = SeedArg::Fresh)]
        seed: SeedArg,
    },
    /// Run a complete in-memory session: checkout, pipeline events, reveal
    Demo {
        /// Participant id the simulated backend issues
        #[arg(long, default_value = "INC-4821")]
        pid: String,

        /// Scope (owning identity) of the push channel
        #[arg(long, default_value = "user-1")]
        scope: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SeedArg {
    Fresh,
    PaymentConfirmed,
    Failed,
}

impl From<SeedArg> for Seed {
    fn from(seed: SeedArg) -> Self {
        match seed {
            SeedArg::Fresh => Seed::Fresh,
            SeedArg::PaymentConfirmed => Seed::PaymentConfirmed,
            SeedArg::Failed => Seed::Failed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config: FinalizationConfig = cli.config.into();

    match cli.command {
        Commands::Replay { input, seed } => replay(input, seed.into(), &config),
        Commands::Demo { pid, scope } => demo(pid, ScopeId::new(scope), config).await,
    }
}

fn replay(input: PathBuf, seed: Seed, config: &FinalizationConfig) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let mut reconciler = Reconciler::new(seed);

    for input in InputReader::new(file).inputs() {
        match input {
            Ok(input) => {
                if let Err(e) = reconciler.apply(&input) {
                    eprintln!("Error applying input: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading input: {}", e);
            }
        }
    }

    let state = reconciler.state();
    let stdout = io::stdout();
    let mut writer = StateWriter::new(stdout.lock());
    writer.write_state(state).into_diagnostic()?;
    println!("{}", Reveal::from_state(state, &config.refund_window));

    Ok(())
}

async fn demo(pid: String, scope: ScopeId, config: FinalizationConfig) -> Result<()> {
    let hub = InMemoryChannelHub::new();
    let status = InMemoryStatusSource::new();
    let ports = SessionPorts {
        transport: Box::new(hub.clone()),
        status: Box::new(status),
    };
    let refund_window = config.refund_window.clone();
    let mut session = FinalizationSession::mount(scope.clone(), Seed::Fresh, ports, config)
        .await
        .into_diagnostic()?;

    let checkout = Checkout::new(
        Box::new(ScriptedGateway::accepting()),
        Box::new(ScriptedCheckoutUi::completing()),
    );
    let checkout = checkout.spawn("REG-1".to_string(), session.sender());

    // Simulated backend pipeline for the scope.
    let backend = tokio::spawn(async move {
        let events = [
            ChannelEvent::GeneratingReceipt,
            ChannelEvent::ReceiptGenerated,
            ChannelEvent::GeneratingPid,
            ChannelEvent::pid_generated(pid),
        ];
        for event in events {
            tokio::time::sleep(Duration::from_millis(50)).await;
            hub.publish(&scope, &event).await;
        }
    });

    let mut progress = session.watch();
    let printer = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let steps = *progress.borrow_and_update().steps();
            info!(?steps, "progress");
        }
    });

    let outcome = session.run_until_terminal().await.map(Clone::clone);
    let state = session.close().await.into_diagnostic()?;
    backend.abort();
    printer.abort();

    if let Err(e) = checkout.await.into_diagnostic()? {
        error!(error = %e, "checkout could not start");
    }
    outcome.into_diagnostic()?;

    println!("{}", Reveal::from_state(&state, &refund_window));
    Ok(())
}
