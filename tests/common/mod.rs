/*!
 * Shared test fixtures
 */

use jobkernel::{Host, Runtime, TableFrontend};
use std::sync::Arc;

/// Runtime with an empty table front-end; register scripts on the returned
/// front-end before launching.
pub fn runtime() -> (Runtime, Arc<TableFrontend>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let frontend = Arc::new(TableFrontend::new());
    let runtime = Runtime::new(frontend.clone());
    (runtime, frontend)
}

/// Add a rooted host carrying the named script files
pub fn add_host(runtime: &Runtime, id: &str, max_ram: f64, files: &[&str]) {
    let mut host = Host::new(id, max_ram).with_admin_rights();
    for file in files {
        host.write_file(file, "// test script");
    }
    runtime.add_host(host);
}

/// Register a script whose body just sleeps long enough to stay alive for
/// the duration of a test
pub fn register_sleeper(frontend: &TableFrontend, file: &str, static_ram: f64) {
    frontend.register(file, static_ram, |api| {
        Box::pin(async move {
            api.sleep(60_000).await?;
            Ok(())
        })
    });
}

/// Poll until `cond` holds or the deadline passes
pub async fn wait_for(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached within deadline");
}
