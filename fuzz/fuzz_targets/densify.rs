//! Fuzz target for the densifier over arbitrary rows and ranges.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use analytics_core::{
    DateRange, Densifier, DensifyOptions, FixedClock, Granularity, SeriesRow,
};

/// Fuzzer input for one densify pass.
#[derive(Arbitrary, Debug)]
struct DensifyInput {
    rows: Vec<(String, Option<f64>)>,
    gte: Option<String>,
    lte: Option<String>,
    /// 0 = minute, 1 = hour, otherwise day.
    granularity: u8,
}

fuzz_target!(|input: DensifyInput| {
    let granularity = match input.granularity {
        0 => Granularity::Minute,
        1 => Granularity::Hour,
        _ => Granularity::Day,
    };
    let rows: Vec<SeriesRow> = input
        .rows
        .into_iter()
        .map(|(ts, v)| SeriesRow::new(ts, v))
        .collect();
    let range = DateRange::new(input.gte, input.lte);

    let densifier = Densifier::with_clock(
        DensifyOptions::default().granularity(granularity),
        FixedClock(chrono::DateTime::UNIX_EPOCH),
    );

    // Keep enumeration bounded: skip ranges wider than ~40 days of minutes.
    let Ok((start, end)) = densifier.resolve_range(&range) else {
        return;
    };
    if (end - start).num_seconds() / granularity.seconds() > 60_000 {
        return;
    }

    if let Ok(buckets) = densifier.densify(&rows, &range) {
        assert!(buckets.windows(2).all(|w| w[0].time < w[1].time));
    }
});
