//! # Catraia Alert Entry Point
//!
//! Terminal front end for the crossing dashboard. It owns the evaluation
//! timer, prints the dashboard after every tick, and exposes the onboarding,
//! forecast and chat commands.

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use catraia_lib::alerts::{Permission, TerminalBell, TerminalNotifier};
use catraia_lib::chat::{self, Conversation, GeminiChat, ASSISTANT_NAME};
use catraia_lib::config::{self, Config};
use catraia_lib::controller::Controller;
use catraia_lib::forecast::{self, ForecastProvider, SimulatedForecast};
use catraia_lib::renderer;
use catraia_lib::storage::{self, FileStore, KeyValueStore, UserProfile};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "catraia-alert")]
#[command(about = "Crossing status, tide and forecast for the Santos - Vicente de Carvalho catraias")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = config::CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate the tide on a timer and keep the dashboard on screen
    Run {
        /// Show a banner on every new interruption
        #[arg(long)]
        notifications: bool,

        /// Ring the terminal bell on every new interruption
        #[arg(long)]
        sound: bool,

        /// Evaluate once and exit
        #[arg(long)]
        once: bool,
    },

    /// Evaluate once and print the dashboard
    Status,

    /// Print the three-day tide forecast
    Forecast,

    /// Store the user profile that unlocks the dashboard
    Login {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,
    },

    /// Remove the stored user profile
    Logout,

    /// Talk to the crossing assistant
    Chat,
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load_from_path(&cli.config);
    let mut store = FileStore::new(&config.dashboard.data_dir);

    match cli.cmd {
        Commands::Login { name, email } => {
            let profile = UserProfile::new(&name, &email)?;
            storage::save_profile(&mut store, &profile)
                .with_context(|| format!("saving profile in {}", store.dir().display()))?;
            println!("Welcome, {}!", profile.first_name());
            Ok(())
        }
        Commands::Logout => {
            storage::clear_profile(&mut store)?;
            println!("Signed out.");
            Ok(())
        }
        Commands::Forecast => {
            let days = forecast::simulate(Local::now().date_naive());
            println!("{}", renderer::forecast_panel(&days).join("\n"));
            Ok(())
        }
        Commands::Status => {
            let profile = require_profile(&store)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_dashboard(&config, store, profile, RunOptions::once()))
        }
        Commands::Run {
            notifications,
            sound,
            once,
        } => {
            let profile = require_profile(&store)?;
            let options = RunOptions {
                notifications: notifications || config.alerts.notifications,
                sound: sound || config.alerts.sound,
                once,
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_dashboard(&config, store, profile, options))
        }
        Commands::Chat => {
            require_profile(&store)?;
            let assistant = GeminiChat::from_config(&config.chat)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_chat(&assistant))
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn require_profile(store: &impl KeyValueStore) -> anyhow::Result<UserProfile> {
    storage::load_profile(store).ok_or_else(|| {
        anyhow::anyhow!(
            "no user profile found; run `catraia-alert login --name <NAME> --email <EMAIL>` first"
        )
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RunOptions {
    notifications: bool,
    sound: bool,
    once: bool,
}

impl RunOptions {
    fn once() -> Self {
        Self {
            notifications: false,
            sound: false,
            once: true,
        }
    }
}

/// Evaluation loop: one tick per interval until Ctrl-C.
async fn run_dashboard(
    config: &Config,
    store: FileStore,
    profile: UserProfile,
    options: RunOptions,
) -> anyhow::Result<()> {
    let mut controller = Controller::new(store, TerminalNotifier::stdout(), TerminalBell::stdout());
    if options.notifications && controller.enable_notifications() == Permission::Denied {
        warn!("notifications unavailable: output is not an interactive terminal");
    }
    if options.sound {
        controller.toggle_sound();
    }

    let provider = SimulatedForecast;
    let period = Duration::from_secs(config.dashboard.tick_seconds.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(?period, "dashboard started");

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }

        evaluate(&mut controller, &provider).await;

        let screen = renderer::render_dashboard(&controller.view(), config, Some(&profile));
        let mut out = io::stdout().lock();
        if !options.once && out.is_terminal() {
            // clear screen, cursor home
            write!(out, "\x1b[2J\x1b[H")?;
        }
        writeln!(out, "{screen}")?;
        out.flush()?;

        if options.once {
            break;
        }
    }
    Ok(())
}

/// One tick, fetching the forecast first when today's is missing.
async fn evaluate<P, S, N, A>(controller: &mut Controller<S, N, A>, provider: &P)
where
    P: ForecastProvider,
    S: KeyValueStore,
    N: catraia_lib::alerts::Notifier,
    A: catraia_lib::alerts::AlertSound,
{
    let now = Local::now().naive_local();
    if controller.needs_forecast(now) {
        if let Err(e) = controller.load_forecast(provider, now).await {
            warn!(error = %e, "tide forecast unavailable, skipping evaluation");
        }
    }
    if controller.tick(now).is_none() {
        info!("waiting for tide forecast");
    }
}

/// Interactive chat on stdin until EOF or `/quit`.
async fn run_chat(assistant: &GeminiChat) -> anyhow::Result<()> {
    let mut conversation = Conversation::new();
    println!("{ASSISTANT_NAME}: {}", chat::WELCOME_MESSAGE);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 || line.trim() == "/quit" {
            break;
        }

        print!("{ASSISTANT_NAME}: ");
        io::stdout().flush()?;
        let mut streamed = false;
        let result = chat::send(assistant, &mut conversation, &line, &mut |delta: &str| {
            streamed = true;
            print!("{delta}");
            if let Err(e) = io::stdout().flush() {
                debug!(error = %e, "could not flush reply increment");
            }
        })
        .await;

        match result {
            Ok(reply) => match reply.unseen_text(streamed) {
                // partial reply already on screen
                Some(text) if streamed => println!("\n{text}"),
                Some(text) => println!("{text}"),
                None => println!(),
            },
            Err(e) => println!("({e})"),
        }
    }
    Ok(())
}
