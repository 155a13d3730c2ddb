//! Signal dispositions are process-wide, so this file holds a single test and
//! runs in its own process with nothing else touching the handlers.

use mesos_cni_wrapper::plugin::signals::{installed_handler, FORWARDED_SIGNALS};
use mesos_cni_wrapper::plugin::{ChildOutcome, PluginProcess};
use nix::sys::signal::SigHandler;
use std::ffi::OsString;

fn sh(script: &str) -> PluginProcess {
    PluginProcess::new("/bin/sh", vec![OsString::from("-c"), OsString::from(script)])
}

fn assert_default_handlers() {
    for sig in FORWARDED_SIGNALS {
        assert_eq!(
            installed_handler(sig).unwrap(),
            SigHandler::SigDfl,
            "{sig} not restored to default"
        );
    }
}

#[tokio::test]
async fn test_default_handlers_restored_and_forwarding_rearmed() {
    let outcome = sh("exit 0").run(b"{}").await.unwrap();
    assert_eq!(outcome, ChildOutcome::Exited(0));
    assert_default_handlers();

    // The plugin interrupts its parent. With forwarding re-armed the signal
    // comes back to the plugin; without it, SIG_DFL would kill this test.
    let outcome = sh("trap 'exit 42' INT\nkill -INT $PPID\nwhile :; do sleep 0.05; done")
        .run(b"{}")
        .await
        .unwrap();
    assert_eq!(outcome, ChildOutcome::Exited(42));
    assert_default_handlers();
}
