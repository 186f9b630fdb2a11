//! Heap tracing with the tracking allocator installed.
//!
//! Kept to a single test: the allocator counters are process-wide.

use sa360_decorators::profiler;
use sa360_decorators::{TracingAllocator, measured_with};
use sa360_observability::{Level, MemorySink};

#[global_allocator]
static ALLOC: TracingAllocator = TracingAllocator;

fn megabytes(line: &str, prefix: &str) -> f64 {
    line.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix('M'))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_else(|| panic!("unexpected record: {line}"))
}

#[test]
fn traced_usage_follows_allocations() {
    assert!(profiler::is_installed());
    assert!(!profiler::is_tracing());

    let sink = MemorySink::new();
    let kept = measured_with(&sink, "load_rows", || {
        let scratch = vec![0u8; 8_000_000];
        std::hint::black_box(&scratch);
        drop(scratch);
        vec![1u8; 2_000_000]
    });
    assert_eq!(kept.len(), 2_000_000);
    assert!(!profiler::is_tracing());

    let infos = sink.messages(Level::Info);
    assert_eq!(infos.len(), 4);
    assert_eq!(infos[0], "Function Name        : load_rows");

    let current = megabytes(&infos[2], "Current memory usage :");
    let peak = megabytes(&infos[3], "Peak                 :");
    assert!(current >= 2.0, "current was {current}");
    assert!(peak >= 8.0, "peak was {peak}");
    assert!(peak >= current);

    // Nested sessions share the outermost one.
    assert!(profiler::start());
    assert!(!profiler::start());
    profiler::stop();
    assert!(profiler::is_tracing());
    profiler::stop();
    assert!(!profiler::is_tracing());

    // Unbalanced stops are ignored.
    profiler::stop();
    assert!(!profiler::is_tracing());
    assert!(profiler::start());
    profiler::stop();
}
