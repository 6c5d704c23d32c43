//! Multi-process integration tests for the solution channel.
//!
//! # Test Architecture
//!
//! Same "self-spawning" pattern for every test: the test process acts as the
//! supervisor (owner of the channel) and re-runs its own executable with a
//! role environment variable to obtain independent producer processes.
//!
//! ```text
//! [Owner]      --[create]--------------[recv ... / shutdown]--[wait children]
//!                   |                        ^        |
//!                   v                        |        v (terminate + posts)
//! [Producer 1] -------[attach]--[publish...]-+---[blocked]--[exit 0]
//! [Producer 2] -------[attach]--[publish...]-+---[blocked]--[exit 0]
//! [Producer 3] -------[attach]--[publish...]-+---[blocked]--[exit 0]
//! ```
//!
//! # Running the Test
//!
//! ```bash
//! cargo test -p chroma-icc --test e2e_processes -- --nocapture
//! ```

use chroma_events::{Edge, Solution};
use chroma_icc::{OwnerChannel, ProducerChannel, Publish, Receive, ResourceNames, RingConfig};
use std::env;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Writes to stderr with immediate flush to bypass test output capture.
macro_rules! log {
    ($($arg:tt)*) => {{
        let _ = writeln!(std::io::stderr(), $($arg)*);
        let _ = std::io::stderr().flush();
    }};
}

const ENV_ROLE: &str = "CHROMA_E2E_ROLE";
const ENV_NAMESPACE: &str = "CHROMA_E2E_NAMESPACE";
const ENV_PRODUCER_ID: &str = "CHROMA_E2E_PRODUCER_ID";
/// Records to publish before exiting; `0` means until terminated.
const ENV_RECORDS: &str = "CHROMA_E2E_RECORDS";

const ROLE_PRODUCER: &str = "producer";

const PRODUCERS: i32 = 3;

/// Entry point for a producer child process.
///
/// Record `seq` of producer `id` carries the single edge `id-seq`, which lets
/// the owner check per-producer ordering.
fn run_producer() {
    let namespace = env::var(ENV_NAMESPACE).expect("namespace not set");
    let id: i32 = env::var(ENV_PRODUCER_ID).unwrap().parse().unwrap();
    let records: i32 = env::var(ENV_RECORDS).unwrap().parse().unwrap();

    let mut channel = ProducerChannel::attach(&ResourceNames::with_namespace(&namespace))
        .expect("producer: failed to attach");

    let mut seq = 0;
    loop {
        if records > 0 && seq == records {
            break;
        }
        let record = Solution::from_edges(&[Edge::new(id, seq)]).unwrap();
        match channel.publish(&record).expect("producer: publish failed") {
            Publish::Written => seq += 1,
            Publish::Terminated => break,
        }
    }
    log!("[PRODUCER {id}] published {seq} records, terminated={}", channel.is_terminated());
}

fn spawn_producer(test_name: &str, namespace: &str, id: i32, records: i32) -> Child {
    let exe = env::current_exe().expect("Failed to get current executable path");
    Command::new(exe)
        .arg("--exact")
        .arg(test_name)
        .arg("--nocapture")
        .env(ENV_ROLE, ROLE_PRODUCER)
        .env(ENV_NAMESPACE, namespace)
        .env(ENV_PRODUCER_ID, id.to_string())
        .env(ENV_RECORDS, records.to_string())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("Failed to spawn producer process")
}

/// Waits for a child with a deadline, killing it if it hangs.
fn wait_with_deadline(child: &mut Child, deadline: Instant) -> std::process::ExitStatus {
    loop {
        if let Some(status) = child.try_wait().expect("try_wait failed") {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("child {} did not exit before the deadline", child.id());
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Returns true in a spawned child, after running its role.
fn run_child_role() -> bool {
    match env::var(ENV_ROLE).as_deref() {
        Ok(ROLE_PRODUCER) => {
            run_producer();
            true
        }
        Ok(other) => panic!("Unknown role: {other}"),
        Err(_) => false,
    }
}

/// Producers parked on a full ring must all leave once the owner shuts down.
#[test]
fn e2e_blocked_producers_exit_after_shutdown() {
    if run_child_role() {
        return;
    }

    let namespace = format!("chroma_e2e_{}_blocked", std::process::id());
    let names = ResourceNames::with_namespace(&namespace);
    let owner = OwnerChannel::create(&names, RingConfig::new(4)).expect("create channel");

    let mut children: Vec<Child> = (0..PRODUCERS)
        .map(|id| spawn_producer("e2e_blocked_producers_exit_after_shutdown", &namespace, id, 0))
        .collect();

    // Nobody reads, so the ring fills and every producer ends up in sem_wait.
    let fill_deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let occ = owner.occupancy().unwrap();
        if occ.used_slots == 4 {
            assert_eq!(occ.free_slots, 0);
            break;
        }
        assert!(Instant::now() < fill_deadline, "ring never filled: {occ:?}");
        std::thread::sleep(Duration::from_millis(5));
    }
    std::thread::sleep(Duration::from_millis(200));

    log!("[OWNER] ring full, shutting down");
    owner.shutdown();

    let deadline = Instant::now() + Duration::from_secs(10);
    for child in &mut children {
        let status = wait_with_deadline(child, deadline);
        assert!(status.success(), "producer failed: {status}");
    }
    assert!(ProducerChannel::attach(&names).is_err());
}

/// Every record from every producer arrives once, in per-producer order.
#[test]
fn e2e_concurrent_producers_deliver_in_order() {
    if run_child_role() {
        return;
    }

    const RECORDS: i32 = 500;

    let namespace = format!("chroma_e2e_{}_order", std::process::id());
    let names = ResourceNames::with_namespace(&namespace);
    let mut owner = OwnerChannel::create(&names, RingConfig::default()).expect("create channel");

    let mut children: Vec<Child> = (0..PRODUCERS)
        .map(|id| spawn_producer("e2e_concurrent_producers_deliver_in_order", &namespace, id, RECORDS))
        .collect();

    let mut next_seq = vec![0; PRODUCERS as usize];
    for _ in 0..PRODUCERS * RECORDS {
        let record = match owner.recv().expect("recv failed") {
            Receive::Record(record) => record,
            other => panic!("unexpected {other:?}"),
        };
        let edge = record.edges()[0];
        let expected = &mut next_seq[edge.u as usize];
        assert_eq!(edge.v, *expected, "producer {} out of order", edge.u);
        *expected += 1;
    }
    assert!(next_seq.iter().all(|&n| n == RECORDS), "{next_seq:?}");

    let deadline = Instant::now() + Duration::from_secs(10);
    for child in &mut children {
        let status = wait_with_deadline(child, deadline);
        assert!(status.success(), "producer failed: {status}");
    }

    let occ = owner.occupancy().unwrap();
    assert!(occ.is_conserved(), "{occ:?}");
    assert_eq!(occ.used_slots, 0);
    owner.shutdown();
}
