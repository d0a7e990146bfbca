use anyhow::Context;
use chrono::Utc;
use prdigest::{Gateway, GitHub, generate_digest, parse_args, write_digest};

fn handle_clap_help_version(clap_err: &clap::Error) -> ! {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            std::process::exit(0);
        }
        _ => {
            eprint!("{clap_err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = match parse_args(std::env::args()) {
        Ok(config) => config,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                handle_clap_help_version(clap_err);
            } else {
                return Err(err);
            }
        }
    };

    let github = GitHub::new(&config.token).context("Failed to create GitHub client")?;
    let gateway = Gateway::new(github, config.timeout);

    // Nothing is printed until the whole digest is ready.
    let entries = generate_digest(&config, &gateway, Utc::now())
        .await
        .with_context(|| format!("Failed to fetch pull requests for {}", config.organization))?;

    let mut stdout = std::io::stdout().lock();
    write_digest(&entries, &config.identities, &mut stdout)?;

    Ok(())
}
