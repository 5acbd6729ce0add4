//! zerocut binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use tracing::debug;
use zerocut::cli;
use zerocut::config::KEY_ENDPOINT;
use zerocut::{
    commands, logging, ConfigStore, ExitStatus, HttpProbe, HttpSandboxConnector, Lifecycle,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Run 'zerocut --help' for usage.");
            return ExitCode::from(2);
        }
    };

    logging::init(args.log_level.as_deref());
    debug!("zerocut v{}", env!("CARGO_PKG_VERSION"));

    // Help and version run without a config store.
    if commands::run_standalone(&args.command) {
        return ExitStatus::Success.into();
    }

    let lifecycle = match build() {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitStatus::Failure.into();
        }
    };

    let action = commands::action_for(args.command);
    lifecycle.run(action.as_ref()).await.status.into()
}

fn build() -> zerocut::Result<Lifecycle<HttpSandboxConnector>> {
    let store = ConfigStore::open()?;
    let connector = HttpSandboxConnector::from_env(store.get_string_blocking(KEY_ENDPOINT))?;
    let probe = HttpProbe::new()?;
    Ok(Lifecycle::new(store, connector, Arc::new(probe)))
}
