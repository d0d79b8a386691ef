//! Per-stage timings of the conversion pipeline on `example.ewp`.
//!
//! Every iteration runs the whole pipeline once; each stage's share is
//! accumulated separately.

use ewp_premake::{Ewp, extract_configurations, parse_groups};
use std::hint::black_box;
use std::time::{Duration, Instant};

const STAGES: [&str; 5] = [
    "XML only (roxmltree)",
    "pass 1: extract_configurations",
    "pass 2: parse_groups",
    "normalize_paths",
    "to_premake",
];

fn timed<T>(slot: &mut Duration, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let value = black_box(f());
    *slot += start.elapsed();
    value
}

fn main() {
    let source = std::fs::read_to_string("example.ewp")
        .expect("example.ewp not found, run from the repo root");
    let iterations: u32 = 1000;
    let mut totals = [Duration::ZERO; STAGES.len()];
    let mut script_len = 0;

    for _ in 0..iterations {
        timed(&mut totals[0], || roxmltree::Document::parse(&source).map(|d| d.descendants().count()));
        let scan = timed(&mut totals[1], || extract_configurations(&source).unwrap());
        let groups = timed(&mut totals[2], || parse_groups(&source).unwrap());

        let mut ewp = Ewp::parse(source.as_str()).unwrap();
        assert_eq!(ewp.configurations, scan.configurations);
        assert_eq!(ewp.groups, groups);

        timed(&mut totals[3], || ewp.normalize_paths());
        let script = timed(&mut totals[4], || ewp.to_premake());
        script_len = script.as_str().len();
    }

    println!("example.ewp: {} bytes, {iterations} iterations", source.len());
    for (stage, total) in STAGES.iter().zip(totals) {
        println!("  {stage:<32} avg {:>10.3?}", total / iterations);
    }
    println!("script: {script_len} bytes");
}
