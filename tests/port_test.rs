/*!
 * Mailbox Port Tests
 * Capacity invariant, eviction on blocking write, empty-read sentinel, and
 * the single-slot next-write notification.
 */

mod common;

use jobkernel::{PortManager, PortValue};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn test_capacity_invariant_keeps_most_recent() {
    let ports = PortManager::with_limits(20, 5);
    // capacity 5: write 1..=6, sixth returns the evicted 1
    for i in 1..=5 {
        assert_eq!(ports.write(7, f64::from(i).into()).unwrap(), None);
    }
    assert_eq!(
        ports.write(7, 6.0.into()).unwrap(),
        Some(PortValue::Num(1.0))
    );

    let mut contents = Vec::new();
    loop {
        match ports.read(7).unwrap() {
            PortValue::Empty => break,
            value => contents.push(value),
        }
    }
    assert_eq!(
        contents,
        vec![
            PortValue::Num(2.0),
            PortValue::Num(3.0),
            PortValue::Num(4.0),
            PortValue::Num(5.0),
            PortValue::Num(6.0),
        ]
    );
}

#[test]
fn test_try_write_on_full_port_is_a_noop() {
    let ports = PortManager::with_limits(20, 5);
    for i in 1..=5 {
        assert!(ports.try_write(1, f64::from(i).into()).unwrap());
    }
    assert!(!ports.try_write(1, 99.0.into()).unwrap());
    assert_eq!(ports.len(1).unwrap(), 5);
    assert_eq!(ports.peek(1).unwrap(), PortValue::Num(1.0));
    assert!(ports.is_full(1).unwrap());
}

#[test]
fn test_empty_read_and_peek_return_sentinel() {
    let ports = PortManager::new();
    assert_eq!(ports.read(9).unwrap(), PortValue::Empty);
    assert_eq!(ports.peek(9).unwrap(), PortValue::Empty);
    assert!(ports.is_empty(9).unwrap());
}

#[test]
fn test_ports_outlive_nothing_when_drained() {
    let ports = PortManager::new();
    ports.write(2, "payload".into()).unwrap();
    ports.write(3, "other".into()).unwrap();
    assert_eq!(ports.port_count(), 2);

    ports.clear(2).unwrap();
    assert_eq!(ports.port_count(), 1);
    assert_eq!(ports.read(3).unwrap(), PortValue::Str("other".into()));
    assert_eq!(ports.port_count(), 0);
}

#[test]
fn test_fifo_order_preserved() {
    let ports = PortManager::new();
    ports.write(4, "a".into()).unwrap();
    ports.write(4, 2.0.into()).unwrap();
    ports.write(4, "c".into()).unwrap();
    assert_eq!(ports.read(4).unwrap(), PortValue::Str("a".into()));
    assert_eq!(ports.read(4).unwrap(), PortValue::Num(2.0));
    assert_eq!(ports.read(4).unwrap(), PortValue::Str("c".into()));
}

#[tokio::test]
async fn test_next_write_wakes_on_write_not_on_read() {
    let ports = PortManager::new();
    ports.write(5, 1.0.into()).unwrap();

    let waiter = {
        let ports = ports.clone();
        tokio::spawn(async move { ports.next_write(5).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    // A read must not wake the waiter
    ports.read(5).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    ports.write(5, 2.0.into()).unwrap();
    waiter.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_ports_are_process_wide_across_jobs() {
    let (rt, frontend) = common::runtime();
    common::add_host(&rt, "home", 16.0, &["producer.js", "consumer.js"]);

    frontend.register("producer.js", 2.0, |api| {
        Box::pin(async move {
            api.write_port(1, 42.0.into())?;
            Ok(())
        })
    });
    let received = std::sync::Arc::new(parking_lot::Mutex::new(PortValue::Empty));
    let received_in_script = std::sync::Arc::clone(&received);
    frontend.register("consumer.js", 2.0, move |api| {
        let received = std::sync::Arc::clone(&received_in_script);
        Box::pin(async move {
            api.next_port_write(1).await?;
            *received.lock() = api.read_port(1)?;
            Ok(())
        })
    });

    let consumer = rt.launch("home", jobkernel::LaunchSpec::new("consumer.js"));
    assert_ne!(consumer, 0);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let producer = rt.launch("home", jobkernel::LaunchSpec::new("producer.js"));
    assert_ne!(producer, 0);

    common::wait_for(|| rt.registry().len() == 0).await;
    assert_eq!(*received.lock(), PortValue::Num(42.0));
}
