use std::time::Duration;

use anyhow::Result;
use ballot_core::{
    BallotController, CastVoteOutcome, InMemoryVoteLedger, LocalSessionProvider, ViewState,
};
use clap::Parser;
use shared::domain::{AccountId, Candidate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

mod config;

use config::Settings;

#[derive(Parser, Debug)]
struct Args {
    /// Account identity the in-process wallet session signs in with.
    #[arg(long, default_value = "guest.test")]
    account: String,
    /// Overrides the configured per-call ledger timeout.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let settings = config::load_settings();
    let fetch_timeout =
        Duration::from_millis(args.timeout_ms.unwrap_or(settings.fetch_timeout_ms));

    let session = LocalSessionProvider::signed_in(AccountId::new(args.account));
    let ledger = InMemoryVoteLedger::new(session.clone());
    let controller = BallotController::with_fetch_timeout(session, ledger, fetch_timeout);
    info!(
        fetch_timeout_ms = fetch_timeout.as_millis() as u64,
        "ballot: starting interactive loop"
    );

    controller.mount().await;
    render(&settings, &controller.snapshot().await);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "a" => report_cast(&controller, Candidate::A).await,
            "b" => report_cast(&controller, Candidate::B).await,
            "s" => {
                if controller.snapshot().await.session.signed_in {
                    controller.sign_out().await;
                } else {
                    controller.sign_in().await;
                }
                // Whose-votes-are-these changed; pull everything again.
                controller.mount().await;
            }
            "r" => controller.mount().await,
            "d" => println!(
                "{}",
                serde_json::to_string_pretty(&controller.snapshot().await)?
            ),
            "q" => break,
            "" => {}
            other => {
                println!("unknown command: {other}");
                print_help();
            }
        }
        render(&settings, &controller.snapshot().await);
    }

    Ok(())
}

async fn report_cast(controller: &BallotController, candidate: Candidate) {
    match controller.cast_vote(candidate).await {
        Ok(CastVoteOutcome::Recorded) => println!("vote recorded"),
        Ok(CastVoteOutcome::AlreadyCast) => println!("already voted for this candidate"),
        Err(err) => println!("{}", classify_vote_failure(&err.to_string())),
    }
}

fn render(settings: &Settings, state: &ViewState) {
    let account = state
        .session
        .account_id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "(signed out)".to_string());
    println!();
    println!("[{}] {account}", state.session_button_label());
    for candidate in Candidate::ALL {
        println!(
            "  {:<16} {:>4} votes   [{}]",
            settings.label_for(candidate),
            state.tally.count_for(candidate),
            state.vote_button_label(candidate),
        );
    }
}

fn print_help() {
    println!("commands: a/b vote, s toggle sign-in, r refresh, d dump state, q quit");
}

fn classify_vote_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("already recorded") || lower.contains("already voted") {
        "Vote rejected: this account already voted for that candidate.".to_string()
    } else if lower.contains("signed out") || lower.contains("not signed in") {
        "Sign in before voting.".to_string()
    } else if lower.contains("timed out") || lower.contains("unavailable") {
        "Ledger unreachable; the shown counts may be stale. Retry shortly.".to_string()
    } else {
        format!("Vote failed: {message}")
    }
}
