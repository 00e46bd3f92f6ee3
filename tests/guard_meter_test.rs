/*!
 * Concurrency Guard & RAM Meter Tests
 * Overlapping guarded calls are fatal; dynamic RAM is charged once per
 * distinct call name and an overrun kills the owner.
 */

mod common;

use common::{add_host, runtime, wait_for};
use jobkernel::{ApiError, LaunchSpec, RuntimeError};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_overlapping_call_kills_owner() {
    let (rt, frontend) = runtime();
    add_host(&rt, "home", 16.0, &["overlap.js"]);

    let violation = Arc::new(Mutex::new(None));
    let violation_in_script = Arc::clone(&violation);

    frontend.register("overlap.js", 8.0, move |api| {
        let violation = Arc::clone(&violation_in_script);
        Box::pin(async move {
            let work = api.work("hack", Duration::from_secs(60));
            tokio::pin!(work);
            tokio::select! {
                res = &mut work => res?,
                () = tokio::time::sleep(Duration::from_millis(30)) => {
                    // First call still suspended: this overlap is fatal
                    *violation.lock() = api.print("overlap").err();
                }
            }
            // The guard killed us; unwind through the pending work
            work.await?;
            Ok(())
        })
    });

    let pid = rt.launch("home", LaunchSpec::new("overlap.js"));
    assert_ne!(pid, 0);
    wait_for(|| rt.registry().len() == 0).await;

    let err = violation.lock().take().expect("violation was observed");
    assert!(matches!(
        err,
        ApiError::Runtime(RuntimeError::ConcurrencyViolation { .. })
    ));
    // Fatal: the owner was killed and its RAM released
    assert_eq!(rt.host("home").unwrap().read().ram_used(), 0.0);
}

#[tokio::test]
async fn test_sleep_may_overlap_suspension() {
    let (rt, frontend) = runtime();
    add_host(&rt, "home", 16.0, &["sleeper.js"]);

    let outcome = Arc::new(Mutex::new(None));
    let outcome_in_script = Arc::clone(&outcome);

    frontend.register("sleeper.js", 8.0, move |api| {
        let outcome = Arc::clone(&outcome_in_script);
        Box::pin(async move {
            let work = api.work("grow", Duration::from_millis(100));
            tokio::pin!(work);
            tokio::select! {
                res = &mut work => res?,
                res = api.sleep(30) => {
                    *outcome.lock() = Some(res);
                    work.await?;
                }
            }
            Ok(())
        })
    });

    let pid = rt.launch("home", LaunchSpec::new("sleeper.js"));
    assert_ne!(pid, 0);
    wait_for(|| rt.registry().len() == 0).await;
    // The overlapping sleep was allowed and the job finished normally
    assert_eq!(*outcome.lock(), Some(Ok(())));
    assert_eq!(rt.recent().len(), 1);
}

#[tokio::test]
async fn test_repeat_calls_charge_dynamic_ram_once() {
    let (rt, frontend) = runtime();
    add_host(&rt, "home", 16.0, &["repeat.js"]);

    frontend.register("repeat.js", 8.0, |api| {
        Box::pin(async move {
            for _ in 0..10 {
                api.kill(0)?; // kill costs 0.5 GB, charged on first use only
            }
            api.sleep(60_000).await?;
            Ok(())
        })
    });

    let pid = rt.launch("home", LaunchSpec::new("repeat.js"));
    let ctx = rt.registry().lookup(pid).unwrap();
    wait_for(|| ctx.suspended_in().is_some()).await;

    // base 1.6 + kill 0.5, regardless of the ten calls
    assert_eq!(ctx.dynamic_ram(), 1.6 + 0.5);
    rt.kill(pid);
}

#[tokio::test]
async fn test_ram_overrun_kills_owner() {
    let (rt, frontend) = runtime();
    add_host(&rt, "home", 16.0, &["greedy.js"]);

    let failure = Arc::new(Mutex::new(None));
    let failure_in_script = Arc::clone(&failure);

    // Static allocation of exactly the base cost: any charged call overruns
    frontend.register("greedy.js", 1.6, move |api| {
        let failure = Arc::clone(&failure_in_script);
        Box::pin(async move {
            *failure.lock() = api.exec("home", LaunchSpec::new("greedy.js")).err();
            api.sleep(60_000).await?;
            Ok(())
        })
    });

    let pid = rt.launch("home", LaunchSpec::new("greedy.js"));
    assert_ne!(pid, 0);
    wait_for(|| rt.registry().len() == 0).await;

    let err = failure.lock().take().expect("overrun was observed");
    assert!(matches!(
        err,
        ApiError::Runtime(RuntimeError::RamOverrun { .. })
    ));
    assert_eq!(rt.host("home").unwrap().read().ram_used(), 0.0);
}

#[tokio::test]
async fn test_zero_cost_ops_never_overrun() {
    let (rt, frontend) = runtime();
    add_host(&rt, "home", 16.0, &["tiny.js"]);

    // Base-cost budget, but only zero-cost operations are used
    frontend.register("tiny.js", 1.6, |api| {
        Box::pin(async move {
            api.print("hello")?;
            api.write_port(1, 1.0.into())?;
            api.read_port(1)?;
            api.sleep(1).await?;
            Ok(())
        })
    });

    let pid = rt.launch("home", LaunchSpec::new("tiny.js"));
    assert_ne!(pid, 0);
    wait_for(|| rt.registry().len() == 0).await;
    assert_eq!(rt.recent().len(), 1);
}
