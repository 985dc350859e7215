//! Integration tests for client workloads spawned from a shared workload

use neobench_core::workload::{Command, Expr, Script, Scripts, SleepUnit, Workload};
use neobench_core::{Error, Value, Variables};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn baseline(x: i64) -> Variables {
    let mut vars = Variables::new();
    vars.insert("x".to_string(), Value::Int(x));
    vars
}

fn named_scripts(n: usize) -> Scripts {
    let scripts = (0..n)
        .map(|i| Script::new(format!("s{i}"), 1, vec![Command::query(format!("SELECT {i}"))]))
        .collect();
    Scripts::new(scripts).unwrap()
}

fn selection_sequence(workload: &Workload, draws: usize) -> Vec<String> {
    let mut client = workload.new_client_with_sink(Box::new(io::sink()));
    (0..draws).map(|_| client.next().unwrap().statements[0].query.clone()).collect()
}

#[test]
fn test_set_does_not_leak_between_calls() {
    // "writer" binds x=5 then records; "reader" only records
    let scripts = Scripts::new(vec![
        Script::new(
            "writer",
            1,
            vec![Command::set("x", Expr::literal(5)), Command::query("WRITE")],
        ),
        Script::new("reader", 1, vec![Command::query("READ")]),
    ])
    .unwrap();
    let workload = Workload::new(baseline(1), scripts, Some(7));
    let mut client = workload.new_client_with_sink(Box::new(io::sink()));

    let mut reads = 0;
    let mut writes = 0;
    for _ in 0..200 {
        let work = client.next().unwrap();
        let statement = &work.statements[0];
        match statement.query.as_str() {
            "READ" => {
                reads += 1;
                assert_eq!(statement.params["x"], Value::Int(1));
            }
            "WRITE" => {
                writes += 1;
                assert_eq!(statement.params["x"], Value::Int(5));
            }
            other => panic!("unexpected query {other}"),
        }
    }

    assert!(reads > 0 && writes > 0, "both scripts should run: reads={reads} writes={writes}");
    assert_eq!(client.variables()["x"], Value::Int(1));
    assert_eq!(workload.variables()["x"], Value::Int(1));
}

#[test]
fn test_third_command_failure_returns_first_two_statements() {
    let scripts = Scripts::new(vec![Script::new(
        "broken",
        1,
        vec![
            Command::query("SELECT 1"),
            Command::query("SELECT 2"),
            Command::sleep(Expr::literal("soon"), SleepUnit::Milliseconds),
            Command::query("SELECT 3"),
        ],
    )])
    .unwrap();
    let workload = Workload::new(Variables::new(), scripts, Some(3));
    let mut client = workload.new_client_with_sink(Box::new(io::sink()));

    let failure = client.next().unwrap_err();
    let queries: Vec<&str> = failure.work.statements.iter().map(|s| s.query.as_str()).collect();
    assert_eq!(queries, ["SELECT 1", "SELECT 2"]);
    assert!(matches!(failure.error, Error::TypeMismatch { .. }));
    assert!(failure.to_string().contains("soon"), "{failure}");
}

#[test]
fn test_sleep_only_blocks_its_own_client() {
    let scripts_slow = Scripts::new(vec![Script::new(
        "slow",
        1,
        vec![Command::sleep(Expr::literal(300), SleepUnit::Milliseconds), Command::query("SLOW")],
    )])
    .unwrap();
    let scripts_fast = Scripts::new(vec![Script::new("fast", 1, vec![Command::query("FAST")])])
        .unwrap();

    let slow = Workload::new(Variables::new(), scripts_slow, Some(1));
    let fast = Workload::new(Variables::new(), scripts_fast, Some(1));
    let mut slow_client = slow.new_client_with_sink(Box::new(io::sink()));
    let mut fast_client = fast.new_client_with_sink(Box::new(io::sink()));

    let slow_handle = thread::spawn(move || {
        let start = Instant::now();
        slow_client.next().unwrap();
        start.elapsed()
    });
    let fast_handle = thread::spawn(move || {
        let start = Instant::now();
        for _ in 0..100 {
            fast_client.next().unwrap();
        }
        start.elapsed()
    });

    let slow_elapsed = slow_handle.join().unwrap();
    let fast_elapsed = fast_handle.join().unwrap();

    assert!(slow_elapsed >= Duration::from_millis(300), "slow client: {slow_elapsed:?}");
    assert!(fast_elapsed < Duration::from_millis(300), "fast client blocked: {fast_elapsed:?}");
}

#[test]
fn test_clients_draw_distinct_sequences() {
    let workload = Workload::new(Variables::new(), named_scripts(4), Some(2024));

    let sequences: Vec<Vec<String>> = (0..8).map(|_| selection_sequence(&workload, 64)).collect();
    let unique: HashSet<&Vec<String>> = sequences.iter().collect();
    assert_eq!(unique.len(), sequences.len(), "two clients drew the same sequence");
}

#[test]
fn test_seeded_workloads_reproduce() {
    let first = Workload::new(Variables::new(), named_scripts(5), Some(99));
    let second = Workload::new(Variables::new(), named_scripts(5), Some(99));

    for _ in 0..3 {
        assert_eq!(selection_sequence(&first, 50), selection_sequence(&second, 50));
    }
}

#[test]
fn test_client_ids_are_sequential() {
    let workload = Workload::new(Variables::new(), named_scripts(1), None);
    let ids: Vec<usize> =
        (0..4).map(|_| workload.new_client_with_sink(Box::new(io::sink())).id()).collect();
    assert_eq!(ids, [0, 1, 2, 3]);
}

#[test]
fn test_clients_spawned_concurrently() {
    let workload = Arc::new(Workload::new(Variables::new(), named_scripts(3), Some(5)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let workload = Arc::clone(&workload);
            thread::spawn(move || workload.new_client_with_sink(Box::new(io::sink())).id())
        })
        .collect();

    let ids: HashSet<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 8);
}

/// Diagnostic sink that collects writes
#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_diagnostic_sink_unused_by_builtin_commands() {
    let sink = SharedSink::default();
    let workload = Workload::new(baseline(0), named_scripts(2), Some(8));
    let mut client = workload.new_client_with_sink(Box::new(sink.clone()));

    for _ in 0..10 {
        client.next().unwrap();
    }
    assert!(sink.0.lock().unwrap().is_empty());
}

/// External expression that reports through the diagnostic sink
#[derive(Debug)]
struct Announce(i64);

impl neobench_core::workload::Expression for Announce {
    fn eval(
        &self,
        ctx: &mut neobench_core::workload::ScriptContext<'_>,
    ) -> neobench_core::Result<Value> {
        writeln!(ctx.stderr, "announce {}", self.0)?;
        Ok(Value::Int(self.0))
    }
}

#[test]
fn test_custom_expression_reaches_sink() {
    let sink = SharedSink::default();
    let scripts = Scripts::new(vec![Script::new(
        "custom",
        1,
        vec![Command::set("n", Announce(7)), Command::query("SELECT $n")],
    )])
    .unwrap();
    let workload = Workload::new(Variables::new(), scripts, Some(8));
    let mut client = workload.new_client_with_sink(Box::new(sink.clone()));

    let work = client.next().unwrap();
    assert_eq!(work.statements[0].params["n"], Value::Int(7));
    assert_eq!(String::from_utf8(sink.0.lock().unwrap().clone()).unwrap(), "announce 7\n");
}
