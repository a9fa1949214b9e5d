//! # vaq-admin
//!
//! Grants or revokes the `admin` custom claim on a Firebase Auth user.
//!
//! ```bash
//! FIREBASE_PROJECT_ID=vac-plus vaq-admin <uid> [true|false]
//! ```

use anyhow::Context;
use clap::Parser;
use vaq_api::claims::{summary, AdminClaims};
use vaq_api::google::GoogleAuth;

#[derive(Parser, Debug)]
#[command(name = "vaq-admin", version, about = "Set the admin claim on a Firebase user")]
struct Opts {
    /// Firebase Auth uid
    uid: String,

    /// Claim value; anything other than "true" revokes
    #[arg(default_value = "true")]
    value: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let value = opts.value == "true";

    let project_id =
        std::env::var("FIREBASE_PROJECT_ID").context("FIREBASE_PROJECT_ID not set")?;

    let user = AdminClaims::new(project_id, GoogleAuth::from_env())
        .set_admin(&opts.uid, value)
        .await?;

    println!("{}", summary(&user, value));
    Ok(())
}
