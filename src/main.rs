mod dispatch;
mod floor;
mod ledger;
mod order_queue;
mod roster;
mod tables;
mod types;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::dispatch::{TableChoice, start_dispatch};
use crate::floor::{DispatchFloor, SubmitError};
use crate::roster::Roster;
use crate::types::{Order, Role};

/// Simulated duration of one task step in the demo.
const DEMO_STEP_MS: u64 = 20;
/// How long the demo waits for the floor to drain before giving up.
const DEMO_DRAIN_DEADLINE_MS: u64 = 10_000;
/// Polling interval while waiting for completions.
const DRAIN_POLL_MS: u64 = 10;

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Answer every table-choice request with the first available table, the
/// way a host scanning the floor would.
fn spawn_auto_chooser(requests: mpsc::Receiver<TableChoice>) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("table-chooser".to_string())
        .spawn(move || {
            while let Ok(request) = requests.recv() {
                let choice = request
                    .status
                    .iter()
                    .position(|&available| available)
                    .map(|i| i + 1)
                    .unwrap_or(1);
                info!(
                    order = request.order,
                    worker = request.worker,
                    table = choice,
                    "chooser picked a table"
                );
                let _ = request.reply.send(choice);
            }
        })
        .expect("failed to spawn chooser thread")
}

/// Block until `count` orders have completed or the deadline passes.
fn wait_for_completed(floor: &DispatchFloor, count: usize, deadline: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if floor.completed_orders().len() >= count {
            return true;
        }
        thread::sleep(Duration::from_millis(DRAIN_POLL_MS));
    }
    false
}

/// Sanity checks over the final ledger: every completed order must carry an
/// in-range table and a recorded worker, and ids must be unique.
fn ledger_violations(completed: &[Order], table_count: usize) -> bool {
    let mut ids = HashSet::new();
    for order in completed {
        if !order.completed || order.completed_by.is_none() {
            return true;
        }
        match order.table {
            Some(table) if (1..=table_count).contains(&table) => {}
            _ => return true,
        }
        if !ids.insert(order.id) {
            return true;
        }
    }
    false
}

/// Register the standard five-worker crew, one per role.
fn standard_crew() -> Roster {
    let mut roster = Roster::new();
    let crew = [
        (101, "Ann Lau"),
        (102, "Ben Chow"),
        (103, "Carmen Ng"),
        (104, "Dev Patel"),
        (105, "Elise Wong"),
    ];
    for (i, (id, name)) in crew.iter().enumerate() {
        roster
            .register(*id, *name, i + 1)
            .expect("standard crew registration");
    }
    roster
}

/// Run the default demo showing dispatch, seating, retry, and shutdown.
fn run_demo() {
    let roster = standard_crew();
    println!("TASK ASSIGNMENT");
    for worker in roster.workers() {
        println!("  {} - Worker {} ({})", worker.role, worker.id, worker.name);
    }

    let floor = Arc::new(DispatchFloor::new(5));
    let (choices, requests) = mpsc::channel();
    let chooser = spawn_auto_chooser(requests);
    let handles = start_dispatch(
        &floor,
        roster.workers(),
        &choices,
        Duration::from_millis(DEMO_STEP_MS),
    );

    // Guests with a seated table claim it at submission time.
    let mut submitted = 0usize;
    for (items, table) in [
        (vec!["Pizza", "Salad"], Some(1)),
        (vec!["Burger"], Some(2)),
        (vec!["Pasta", "Pizza"], Some(3)),
        (vec!["Salad"], None),
        (vec!["Burger", "Pasta"], None),
    ] {
        let items: Vec<String> = items.into_iter().map(String::from).collect();
        floor.submit_order(items, table).expect("demo submission");
        submitted += 1;
    }

    // A sixth guest insists on table 2, which is still held: waiting list.
    match floor.submit_order(vec!["Pizza".to_string()], Some(2)) {
        Err(SubmitError::TableUnavailable(table)) => {
            info!(table, "table taken, guest joins the waiting list");
            floor
                .join_waiting_list(format!("Frank (Table {table})"))
                .expect("waiting list space");
        }
        other => warn!(?other, "expected table 2 to be unavailable"),
    }

    if !wait_for_completed(&floor, submitted, Duration::from_millis(DEMO_DRAIN_DEADLINE_MS)) {
        warn!("demo floor did not drain in time");
    }

    // The first party leaves; their table frees up for one more order.
    if let Some(first) = floor.completed_orders().first() {
        if let Some(table) = first.table {
            info!(table, "guests left, table released");
            floor.tables().release(table);
            floor
                .submit_order(vec!["Pasta".to_string()], None)
                .expect("demo submission");
            submitted += 1;
        }
    }
    if !wait_for_completed(&floor, submitted, Duration::from_millis(DEMO_DRAIN_DEADLINE_MS)) {
        warn!("demo floor did not drain in time");
    }

    floor.request_shutdown();
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
    drop(choices);
    chooser.join().expect("chooser thread panicked");

    let completed = floor.completed_orders();
    let violation = ledger_violations(&completed, floor.tables().len());
    println!("FLOOR SUMMARY");
    println!("orders_submitted={submitted}");
    println!("orders_completed={}", completed.len());
    for order in &completed {
        println!(
            "  order {} table {} worker {} items {:?}",
            order.id,
            order.table.unwrap_or(0),
            order.completed_by.unwrap_or(0),
            order.items
        );
    }
    let status: Vec<String> = floor
        .table_status()
        .iter()
        .enumerate()
        .map(|(i, &available)| {
            format!("{}:{}", i + 1, if available { "free" } else { "taken" })
        })
        .collect();
    println!("table_status={}", status.join(","));
    println!("waiting_list={:?}", floor.waiting_list());
    println!("table_violation={violation}");
}

/// Run a scripted load against the floor and print CSV metrics.
fn run_benchmark(
    workers: Option<usize>,
    orders: Option<usize>,
    tables: Option<usize>,
    items_per_order: Option<usize>,
    step_ms: Option<u64>,
    validate: bool,
) {
    let worker_count = workers.unwrap_or(4).min(Role::ALL.len());
    let orders = orders.unwrap_or(50);
    let table_count = tables.unwrap_or(5);
    let items_per_order = items_per_order.unwrap_or(2);
    let step_ms = step_ms.unwrap_or(1);
    if worker_count == 0 || orders == 0 || table_count == 0 {
        eprintln!("benchmark error: workers, orders, and tables must be > 0");
        return;
    }

    let mut roster = Roster::new();
    for i in 0..worker_count {
        roster
            .register(i as u64 + 1, format!("bench-{}", i + 1), i + 1)
            .expect("bench registration");
    }

    let floor = Arc::new(DispatchFloor::new(table_count));
    let (choices, requests) = mpsc::channel();
    let chooser = spawn_auto_chooser(requests);

    // Busser thread: releases each completed order's table so the floor
    // keeps cycling. Exercises the release-wake retry path under load.
    let busser = {
        let floor = Arc::clone(&floor);
        thread::Builder::new()
            .name("busser".to_string())
            .spawn(move || {
                let mut cleared = 0usize;
                while cleared < orders {
                    let completed = floor.completed_orders();
                    // The ledger is append-only, so a cursor never misses one.
                    for order in &completed[cleared..] {
                        if let Some(table) = order.table {
                            floor.tables().release(table);
                        }
                        cleared += 1;
                    }
                    thread::sleep(Duration::from_millis(DRAIN_POLL_MS));
                }
            })
            .expect("failed to spawn busser thread")
    };

    let handles = start_dispatch(
        &floor,
        roster.workers(),
        &choices,
        Duration::from_millis(step_ms),
    );

    let menu = ["Pizza", "Burger", "Pasta", "Salad"];
    let cpu_start = cpu_times_seconds();
    let start = Instant::now();
    let mut submitted = HashSet::new();
    for n in 0..orders {
        let items: Vec<String> = (0..items_per_order)
            .map(|k| menu[(n + k) % menu.len()].to_string())
            .collect();
        let id = floor.submit_order(items, None).expect("bench submission");
        submitted.insert(id);
    }

    let drained = wait_for_completed(&floor, orders, Duration::from_secs(120));
    let elapsed_ms = start.elapsed().as_millis() as f64;
    floor.request_shutdown();
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
    busser.join().expect("busser thread panicked");
    drop(choices);
    chooser.join().expect("chooser thread panicked");

    let completed = floor.completed_orders();
    let leftover = floor.pending_orders();
    let throughput = if elapsed_ms > 0.0 {
        completed.len() as f64 / (elapsed_ms / 1000.0)
    } else {
        0.0
    };
    let (cpu_user, cpu_sys) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => (
            format!("{:.4}", user_end - user_start),
            format!("{:.4}", sys_end - sys_start),
        ),
        _ => ("NA".to_string(), "NA".to_string()),
    };
    let violation = ledger_violations(&completed, table_count);
    let foreign = completed.iter().any(|o| !submitted.contains(&o.id));

    println!(
        "workers,orders,tables,items_per_order,elapsed_ms,throughput_orders_per_s,cpu_user_s,cpu_sys_s,completed,leftover,ledger_violation"
    );
    println!(
        "{},{},{},{},{:.2},{:.2},{},{},{},{},{}",
        worker_count,
        orders,
        table_count,
        items_per_order,
        elapsed_ms,
        throughput,
        cpu_user,
        cpu_sys,
        completed.len(),
        leftover,
        violation
    );
    if !drained {
        eprintln!("# warning,bench_drain_timeout");
    }
    if validate {
        if violation {
            eprintln!("# violation,ledger_integrity");
        }
        if foreign {
            eprintln!("# violation,unsubmitted_order_completed");
        }
    }
}

fn print_usage(program: &str) {
    println!("Service Floor CLI");
    println!("Usage:");
    println!("  {program} (run demo)");
    println!("  {program} bench [workers] [orders] [tables] [items] [step_ms] [validate]");
    println!("  {program} --help");
    println!();
    println!("Defaults:");
    println!("  bench workers=4 orders=50 tables=5 items=2 step_ms=1");
    println!("Flags:");
    println!("  validate  enable extra ledger integrity checks");
    println!();
    println!("Set RUST_LOG (e.g. RUST_LOG=debug) to control log output.");
}

fn exit_with_usage(program: &str, message: &str) -> ! {
    eprintln!("{message}");
    print_usage(program);
    std::process::exit(2);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "service_floor".to_string());
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("bench") => {
            let workers = args.next().and_then(|v| v.parse::<usize>().ok());
            let orders = args.next().and_then(|v| v.parse::<usize>().ok());
            let tables = args.next().and_then(|v| v.parse::<usize>().ok());
            let items = args.next().and_then(|v| v.parse::<usize>().ok());
            let step_ms = args.next().and_then(|v| v.parse::<u64>().ok());
            let mut validate = false;
            for arg in args {
                match arg.as_str() {
                    "validate" => validate = true,
                    other => exit_with_usage(&program, &format!("bench: unexpected argument: {other}")),
                }
            }
            run_benchmark(workers, orders, tables, items, step_ms, validate);
        }
        Some("--help") | Some("-h") | Some("help") => print_usage(&program),
        Some(other) => {
            exit_with_usage(&program, &format!("unknown command: {other}"));
        }
        None => run_demo(),
    }
}
