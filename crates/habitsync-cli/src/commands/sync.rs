//! Sync subcommand.
//!
//! Drives the cloud sync controller: one-shot pull/push/test, settings, and a
//! long-running mode that keeps the push timer and pull ticker alive.

use clap::Subcommand;
use habitsync_core::sync::{AutoConfirm, ConfirmOverwrite, Startup};
use habitsync_core::{PullOptions, PushReason, SyncController};
use std::sync::Arc;

use super::{flush_or_warn, open_controller, open_default_controller, CmdResult, StderrIndicator, StdinConfirm};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Show sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace local data with the cloud copy
    Pull {
        /// Pull even when the cloud copy is not newer
        #[arg(long)]
        force: bool,
        /// Do not ask before replacing local data
        #[arg(long, short)]
        yes: bool,
    },
    /// Upload local data now
    Push,
    /// Check endpoint and credential
    Test,
    /// Turn cloud sync on
    Enable,
    /// Turn cloud sync off and drop pending uploads
    Disable,
    /// Set endpoint and user id, then sync
    Configure {
        /// Endpoint URL (http or https)
        endpoint: String,
        /// Remote user id
        #[arg(long, default_value = "default")]
        user_id: String,
    },
    /// Start up and keep syncing until interrupted
    Run {
        /// Exit after the startup sync
        #[arg(long)]
        once: bool,
    },
}

pub async fn run(action: SyncAction) -> CmdResult {
    match action {
        SyncAction::Status { json } => {
            let controller = open_default_controller()?;
            show_status(&controller, json)?;
        }
        SyncAction::Pull { force, yes } => {
            let confirm: Box<dyn ConfirmOverwrite> = if yes {
                Box::new(AutoConfirm(true))
            } else {
                Box::new(StdinConfirm)
            };
            let controller = open_controller(confirm)?;
            let options = if force {
                PullOptions::interactive().forced()
            } else {
                PullOptions::interactive()
            };
            let ok = controller.pull(options).await;
            finish(&controller, ok)?;
        }
        SyncAction::Push => {
            let controller = open_default_controller()?;
            let ok = controller.push(PushReason::Manual).await;
            finish(&controller, ok)?;
        }
        SyncAction::Test => {
            let controller = open_default_controller()?;
            let ok = controller.test_connection().await;
            finish(&controller, ok)?;
        }
        SyncAction::Enable => {
            let controller = open_default_controller()?;
            controller.set_enabled(true);
            println!("{}", controller.message());
        }
        SyncAction::Disable => {
            let controller = open_default_controller()?;
            controller.set_enabled(false);
            println!("{}", controller.message());
        }
        SyncAction::Configure { endpoint, user_id } => {
            let controller = open_default_controller()?;
            let ok = controller.save_config(&endpoint, &user_id).await;
            finish(&controller, ok)?;
        }
        SyncAction::Run { once } => {
            let controller = open_default_controller()?;
            run_session(controller, once).await?;
        }
    }
    Ok(())
}

fn finish(controller: &SyncController, ok: bool) -> CmdResult {
    if ok {
        println!("{}", controller.message());
        Ok(())
    } else {
        Err(controller.message().into())
    }
}

fn show_status(controller: &SyncController, json: bool) -> CmdResult {
    let report = controller.report();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Status:      {} ({})", report.status, report.message);
    println!("Enabled:     {}", report.enabled);
    println!(
        "Endpoint:    {}",
        if report.endpoint_url.is_empty() { "-" } else { report.endpoint_url.as_str() }
    );
    println!("User id:     {}", report.user_id);
    println!(
        "Last synced: {}",
        if report.last_synced_at.is_empty() { "never" } else { report.last_synced_at.as_str() }
    );
    if report.signed_in {
        println!("Signed in:   {}", report.identity);
    } else {
        println!("Signed in:   no");
    }
    Ok(())
}

async fn run_session(controller: Arc<SyncController>, once: bool) -> CmdResult {
    match controller.start(&StderrIndicator).await {
        Startup::LocalOnly | Startup::MissingConfig => {
            return Err(controller.message().into());
        }
        Startup::Settled(ok) => {
            tracing::debug!(ok, "startup sync settled");
        }
        Startup::TimedOut(_) => {
            eprintln!("cloud is slow to answer, continuing with local data");
        }
    }
    println!("{}", controller.message());

    if !once {
        tokio::signal::ctrl_c().await?;
        eprintln!("stopping");
    }
    controller.stop_pull_ticker();
    flush_or_warn(&controller).await;
    Ok(())
}
