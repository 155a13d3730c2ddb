use std::ffi::OsString;
use std::path::Path;

use mesos_cni_wrapper::config;
use mesos_cni_wrapper::error::WrapperError;
use mesos_cni_wrapper::logging::{self, LogGuard};
use mesos_cni_wrapper::wrapper;

// The wrapper takes no flags of its own: every argument belongs to the
// wrapped plugin.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut argv = std::env::args_os();
    let argv0 = argv.next().unwrap_or_else(|| OsString::from("cni-wrapper"));
    let args: Vec<OsString> = argv.collect();

    let name = Path::new(&argv0)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cni-wrapper".to_string());

    let config = match config::load_from_env() {
        Ok(config) => config,
        Err(e) => abort(&name, e, None),
    };

    let guard = match logging::init(&config) {
        Ok(guard) => guard,
        Err(e) => abort(&name, e, None),
    };

    match wrapper::run(&config, &argv0, args).await {
        Ok(outcome) => {
            tracing::debug!("Exiting with CNI plugin status: {}", outcome);
            drop(guard);
            std::process::exit(outcome.exit_code());
        }
        Err(e) => abort(&name, e, Some(guard)),
    }
}

fn abort(name: &str, error: WrapperError, guard: Option<LogGuard>) -> ! {
    tracing::debug!("Aborting before the CNI plugin ran: {:?}", error);
    // Flush buffered log lines; process::exit skips destructors.
    drop(guard);
    eprintln!("{}: {}", name, error);
    std::process::exit(error.exit_code());
}
