use std::io::{self, Write};

use ydmirror::config::MirrorConfig;
use ydmirror::run::{MirrorOptions, mirror_user};
use ydmirror::transfer::TransferClient;
use ydmirror_core::{ServiceAppClient, YadiskClient};

fn prompt_email() -> io::Result<String> {
    print!("Enter user email: ");
    io::stdout().flush()?;
    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    Ok(email.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = MirrorConfig::from_env()?;
    let email = prompt_email()?;
    if email.is_empty() {
        anyhow::bail!("no email given");
    }

    let service_apps = ServiceAppClient::new(&config.client_id, &config.client_secret)?;
    let token = match service_apps.token_for_subject(&email).await {
        Ok(token) => token,
        Err(err) => {
            log::error!("failed to obtain service application token: {err}");
            std::process::exit(1);
        }
    };
    let client = YadiskClient::new(token.access_token)?;

    log::info!("starting files download for user: {email}");
    let options = MirrorOptions {
        remote_root: config.remote_root.clone(),
        local_root: config.local_root.join(&email),
        max_streams: config.max_streams,
        on_listing_error: config.on_listing_error,
    };
    mirror_user(&client, &TransferClient::new(), &options).await?;
    Ok(())
}
