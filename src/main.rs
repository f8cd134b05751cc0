//! Habitual CLI entry point

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;
use url::Url;

use habitual::auth::{
    AuthBridge, AuthOutcome, BrowserOpener, CookieSessionStore, FlightStore, GoogleProvider,
    HttpSessionExchange,
};
use habitual::config::Config;
use habitual::consumer::SignInTrigger;
use habitual::ui::{self, TerminalNavigator, TerminalNotifier};

#[derive(Parser)]
#[command(name = "habitual")]
#[command(about = "Sign in to Habitual with your Google account")]
#[command(version)]
struct Cli {
    /// URL this run was opened at; pass the address Google sent the browser
    /// back to in order to finish a redirect sign-in
    #[arg(long, global = true)]
    landing_url: Option<Url>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the API endpoint and Google OAuth client
    Init,

    /// Sign in with Google
    Login,

    /// Sign out and forget the stored session
    Logout,

    /// Show the current session
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        habitual::config::onboard()?;
        return Ok(());
    }

    let config = habitual::config::load()?;
    config.validate()?;
    let trigger = build_trigger(&config, cli.landing_url)?;

    // A redirect return must be settled before any command looks at auth state
    trigger.bootstrap().await;

    match cli.command {
        Commands::Init => {}

        Commands::Login => run_login(&trigger).await,

        Commands::Logout => trigger.sign_out().await?,

        Commands::Status => print_status(&trigger)?,
    }

    Ok(())
}

fn build_trigger(config: &Config, landing_url: Option<Url>) -> Result<SignInTrigger> {
    std::fs::create_dir_all(&config.data_dir)?;

    let store = CookieSessionStore::new(
        config.session_path(),
        config.session_ttl(),
        config.secure_cookies(),
    );
    let provider = GoogleProvider::new(
        config.google_settings(),
        FlightStore::new(config.flight_path()),
        landing_url,
    )
    .with_browser(terminal_browser());
    let exchange = HttpSessionExchange::new(&config.api_base_url);

    let bridge = AuthBridge::new(
        Arc::new(provider),
        Arc::new(exchange),
        Arc::new(store),
        config.bridge_policy(),
    );

    Ok(SignInTrigger::new(
        Arc::new(bridge),
        Arc::new(TerminalNotifier),
        Arc::new(TerminalNavigator),
        config.bridge.home_route.clone(),
    ))
}

/// Open the sign-in page, printing its URL in case no browser shows up
fn terminal_browser() -> BrowserOpener {
    Arc::new(|url: &str| -> std::io::Result<()> {
        ui::print_step("If no browser window opens, visit:");
        println!("\n    {}\n", url);
        open::that(url)
    })
}

async fn run_login(trigger: &SignInTrigger) {
    if trigger.bridge().status().is_signed_in() {
        ui::print_step("Already signed in. Run 'habitual logout' to switch accounts.");
        return;
    }

    ui::print_thinking("Opening Google sign-in in your browser");

    if let AuthOutcome::Pending = trigger.sign_in().await {
        println!();
        ui::print_step("Finish signing in with Google in your browser.");
        ui::print_step("Then run 'habitual login --landing-url <URL>' with the address it lands on.");
    }
}

fn print_status(trigger: &SignInTrigger) -> Result<()> {
    let bridge = trigger.bridge();
    ui::print_header("Status");

    match bridge.current_session()? {
        Some(session) => {
            let user = &session.user;
            println!("  Signed in: {}", "✓".green());
            println!("  User: {} ({})", user.name.as_deref().unwrap_or("-"), user.email);
            println!("  User ID: {}", user.id);
        }
        None => println!("  Signed in: not signed in (run 'habitual login')"),
    }

    if let Some(identity) = bridge.current_identity() {
        println!("  Google account: {}", identity.email);
    }

    if let Some(failure) = bridge.status().last_failure {
        println!(
            "  Last sign-in failed ({}): {}",
            failure.reason, failure.user_message
        );
    }

    Ok(())
}
