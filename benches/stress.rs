use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use vacancy::engine::Engine;
use vacancy::model::Category;
use vacancy::notify::NotifyHub;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

fn night(offset: i64) -> NaiveDate {
    let base = NaiveDate::from_ymd_opt(2030, 1, 1).expect("valid base date");
    base + chrono::Duration::days(offset)
}

/// Fresh engine on its own WAL with every category set to `units`.
async fn engine(dir: &PathBuf, name: &str, units: i64) -> Arc<Engine> {
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    let engine = Engine::new(path, Arc::new(NotifyHub::new())).expect("open engine");
    for category in Category::ALL {
        engine.set_capacity(category, units).await.expect("set capacity");
    }
    Arc::new(engine)
}

async fn phase1_sequential(dir: &PathBuf) {
    let engine = engine(dir, "sequential.wal", 1).await;
    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n as i64 {
        let t = Instant::now();
        engine
            .book_stay(Category::Queen, night(i), night(i + 1), None)
            .await
            .expect("free night");
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("book latency", &mut latencies);
}

async fn phase2_concurrent(dir: &PathBuf) {
    let engine = engine(dir, "concurrent.wal", 10).await;
    let n_tasks = 16;
    let n_per_task = 200;

    let start = Instant::now();
    let mut handles = Vec::new();
    for t in 0..n_tasks {
        let engine = engine.clone();
        let category = Category::ALL[t % Category::COUNT];
        handles.push(tokio::spawn(async move {
            let mut confirmed = 0usize;
            for j in 0..n_per_task as i64 {
                // 3-night stays sliding one night per booking, so nights fill up
                if engine
                    .book_stay(category, night(j), night(j + 3), None)
                    .await
                    .is_ok()
                {
                    confirmed += 1;
                }
            }
            confirmed
        }));
    }

    let mut confirmed = 0;
    for h in handles {
        confirmed += h.await.expect("task panicked");
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tasks x {n_per_task} attempts = {total} total ({confirmed} confirmed) in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
    for category in Category::ALL {
        let sold_out = engine
            .nights(category)
            .await
            .into_iter()
            .filter(|&(_, remaining)| remaining == 0)
            .count();
        println!("  {category}: {sold_out} nights sold out");
    }
}

async fn phase3_read_under_load(dir: &PathBuf) {
    let engine = engine(dir, "read_under_load.wal", 1_000_000).await;
    for i in 0..365 {
        engine
            .book_stay(Category::Twin, night(i), night(i + 7), None)
            .await
            .expect("prefill");
    }

    let stop = Arc::new(AtomicBool::new(false));
    let mut writer_handles = Vec::new();
    for w in 0..4i64 {
        let engine = engine.clone();
        let stop = stop.clone();
        writer_handles.push(tokio::spawn(async move {
            let mut i = 0i64;
            while !stop.load(Ordering::Relaxed) {
                let s = (w * 1000 + i) % 365;
                let _ = engine.book_stay(Category::Twin, night(s), night(s + 2), None).await;
                i += 1;
            }
        }));
    }

    let n_readers = 8;
    let reads_per_reader = 500;
    let mut reader_handles = Vec::new();
    for r in 0..n_readers {
        let engine = engine.clone();
        reader_handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for k in 0..reads_per_reader as i64 {
                let from = (r as i64 * 37 + k) % 300;
                let t = Instant::now();
                let _ = engine
                    .availability_range(Category::Twin, night(from), night(from + 30))
                    .await;
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in reader_handles {
        all_latencies.extend(h.await.expect("reader panicked"));
    }
    stop.store(true, Ordering::Relaxed);
    for h in writer_handles {
        let _ = h.await;
    }

    print_latency("30-night availability query", &mut all_latencies);
}

async fn phase4_compaction(dir: &PathBuf) {
    let engine = engine(dir, "compaction.wal", 50).await;
    for i in 0..2000i64 {
        let _ = engine
            .book_stay(Category::ALL[(i % 4) as usize], night(i % 400), night(i % 400 + 5), None)
            .await;
    }
    let path = dir.join("compaction.wal");
    let before = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    let t = Instant::now();
    engine.compact_wal().await.expect("compaction");
    let elapsed = t.elapsed();
    let after = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    println!(
        "  compacted {before} -> {after} bytes in {:.2}ms",
        elapsed.as_secs_f64() * 1000.0
    );
}

#[tokio::main]
async fn main() {
    let dir = std::env::var("VACANCY_BENCH_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("vacancy_bench"));
    std::fs::create_dir_all(&dir).expect("bench dir");

    println!("=== vacancy stress benchmark ===");
    println!("wal dir: {}\n", dir.display());

    println!("[phase 1] sequential booking throughput");
    phase1_sequential(&dir).await;

    println!("\n[phase 2] concurrent booking throughput");
    phase2_concurrent(&dir).await;

    println!("\n[phase 3] read latency under write load");
    phase3_read_under_load(&dir).await;

    println!("\n[phase 4] compaction");
    phase4_compaction(&dir).await;

    println!("\n=== done ===");
}
