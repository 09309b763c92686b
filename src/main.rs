pub mod api;
pub mod archive;
pub mod config;
pub mod draft;
pub mod error;
pub mod memoclip;
pub mod notify;
pub mod storage;
pub mod template;

use std::process::exit;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use memoclip::{failure_notice, Args, MemoClip};
use storage::FileStorage;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose, std::env::var("RUST_LOG").ok()))
        .with_writer(std::io::stderr)
        .init();

    // Locate storage
    let storage = match &args.storage {
        Some(path) => FileStorage::new(path),
        None => match FileStorage::from_xdg() {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error: {}", e);
                exit(1);
            }
        },
    };
    tracing::debug!(path = %storage.path().display(), "using storage");

    let app = MemoClip::new(storage);
    if let Err(e) = app.run(&args.command).await {
        tracing::debug!(error = ?e, "command failed");
        failure_notice(&args.command, &e).show();
        exit(1);
    }
}

/// `RUST_LOG` when set, `memoclip=warn` otherwise. `-v` raises memoclip to
/// debug on top of either.
fn log_filter(verbose: bool, rust_log: Option<String>) -> EnvFilter {
    let filter = rust_log
        .filter(|spec| !spec.trim().is_empty())
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new("memoclip=warn"));
    if verbose {
        filter.add_directive("memoclip=debug".parse().expect("static log directive"))
    } else {
        filter
    }
}
