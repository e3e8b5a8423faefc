use clap::Subcommand;
use habitsync_core::auth::decode_claims;

use super::{open_default_controller, CmdResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store a credential issued by the sign-in provider
    SignIn {
        /// Signed token (header.payload.signature)
        token: String,
    },
    /// Remove the stored credential
    SignOut,
    /// Show who is signed in
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: AuthAction) -> CmdResult {
    let controller = open_default_controller()?;
    match action {
        AuthAction::SignIn { token } => {
            controller.sign_in(&token)?;
            let identity = controller.snapshot().auth.identity;
            println!("signed in as {identity}");
        }
        AuthAction::SignOut => {
            controller.sign_out();
            println!("signed out");
        }
        AuthAction::Status { json } => {
            let auth = controller.snapshot().auth;
            let signed_in = controller.is_signed_in();
            let expires_at = decode_claims(&auth.credential)
                .ok()
                .map(|claims| claims.expires_at.to_rfc3339());

            if json {
                let value = serde_json::json!({
                    "signed_in": signed_in,
                    "identity": auth.identity,
                    "expires_at": expires_at,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else if signed_in {
                println!("signed in as {}", auth.identity);
                if let Some(expires_at) = expires_at {
                    println!("expires at {expires_at}");
                }
            } else {
                println!("signed out");
            }
        }
    }
    Ok(())
}
