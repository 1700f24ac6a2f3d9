//! Run-length bucket aggregation over a stream of log lines.
//!
//! A bucket closes exactly when a line's truncated timestamp differs from the
//! bucket currently open. Only the most recent bucket is compared, so a minute
//! that reappears after another minute opens a fresh bucket instead of being
//! merged into the earlier one.

use std::io::BufRead;

use events_core::error::{EventsError, Result};
use events_core::models::Bucket;
use tracing::debug;

use crate::classifier::RecordClassifier;

// ── BucketAggregator ──────────────────────────────────────────────────────────

/// Drives a [`RecordClassifier`] over a forward-only line source.
///
/// Holds no state between calls; every aggregation owns its own cursor.
#[derive(Debug, Clone)]
pub struct BucketAggregator {
    classifier: RecordClassifier,
}

impl BucketAggregator {
    pub fn new(classifier: RecordClassifier) -> Self {
        Self { classifier }
    }

    /// Aggregate in-memory lines.
    ///
    /// All or nothing: the first malformed timestamp discards every bucket
    /// built so far and is returned as the error.
    pub fn aggregate<I, S>(&self, records: I) -> Result<Vec<Bucket>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.buckets(records.into_iter().map(Ok)).collect()
    }

    /// Aggregate every line of `reader`, with the same all-or-nothing contract
    /// as [`aggregate`](Self::aggregate). Read failures surface as
    /// [`EventsError::SourceRead`].
    pub fn aggregate_reader<R: BufRead>(&self, reader: R) -> Result<Vec<Bucket>> {
        self.buckets(reader.lines().map(|line| line.map_err(EventsError::SourceRead)))
            .collect()
    }

    /// Lazily yield buckets as they close.
    ///
    /// The open bucket is emitted when `records` is exhausted. After the
    /// first error the iterator is finished.
    pub fn buckets<I, S>(&self, records: I) -> Buckets<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Result<S>>,
        S: AsRef<str>,
    {
        Buckets {
            classifier: &self.classifier,
            records: records.into_iter(),
            open: None,
            finished: false,
            stats: AggregationStats::default(),
        }
    }
}

// ── AggregationStats ──────────────────────────────────────────────────────────

/// Counters kept while a [`Buckets`] iterator runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Lines pulled from the source.
    pub records_read: u64,
    /// Lines skipped for being shorter than the timestamp prefix.
    pub records_skipped: u64,
    /// Buckets yielded so far.
    pub buckets_emitted: u64,
}

// ── Buckets ───────────────────────────────────────────────────────────────────

/// Streaming iterator returned by [`BucketAggregator::buckets`].
pub struct Buckets<'a, I> {
    classifier: &'a RecordClassifier,
    records: I,
    /// Currently open bucket; `None` until the first classified line.
    open: Option<Bucket>,
    finished: bool,
    stats: AggregationStats,
}

impl<I> Buckets<'_, I> {
    pub fn stats(&self) -> AggregationStats {
        self.stats
    }

    fn emit(&mut self, bucket: Bucket) -> Option<Result<Bucket>> {
        self.stats.buckets_emitted += 1;
        Some(Ok(bucket))
    }

    fn fail(&mut self, err: EventsError) -> Option<Result<Bucket>> {
        self.finished = true;
        self.open = None;
        Some(Err(err))
    }
}

impl<I, S> Iterator for Buckets<'_, I>
where
    I: Iterator<Item = Result<S>>,
    S: AsRef<str>,
{
    type Item = Result<Bucket>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.records.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return self.fail(e),
                None => {
                    self.finished = true;
                    let last = self.open.take();
                    debug!(
                        records_read = self.stats.records_read,
                        records_skipped = self.stats.records_skipped,
                        buckets = self.stats.buckets_emitted + u64::from(last.is_some()),
                        "record source exhausted"
                    );
                    return match last {
                        Some(bucket) => self.emit(bucket),
                        None => None,
                    };
                }
            };
            self.stats.records_read += 1;

            let record = match self.classifier.classify(line.as_ref()) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.stats.records_skipped += 1;
                    continue;
                }
                Err(e) => return self.fail(e),
            };

            match self.open.as_mut() {
                Some(bucket) if bucket.minute == record.minute => {
                    if record.is_match {
                        bucket.record_match();
                    }
                }
                _ => {
                    let mut next = Bucket::open(record.minute);
                    if record.is_match {
                        next.record_match();
                    }
                    if let Some(closed) = self.open.replace(next) {
                        return self.emit(closed);
                    }
                }
            }
        }
    }
}

impl<I, S> std::iter::FusedIterator for Buckets<'_, I>
where
    I: Iterator<Item = Result<S>>,
    S: AsRef<str>,
{
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use events_core::time_utils::{Granularity, DEFAULT_INPUT_LAYOUT};

    fn aggregator() -> BucketAggregator {
        BucketAggregator::new(
            RecordClassifier::from_pattern(DEFAULT_INPUT_LAYOUT, Granularity::Minute, "NOK")
                .unwrap(),
        )
    }

    fn minute(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn counts(buckets: &[Bucket]) -> Vec<u64> {
        buckets.iter().map(|b| b.count).collect()
    }

    // ── aggregate ─────────────────────────────────────────────────────────

    #[test]
    fn test_scenario_six_buckets() {
        let lines = [
            "[2018-04-11 03:13:10] order 1 NOK",
            "[2018-04-11 03:14:20] order 2 OK",
            "[2018-04-11 03:15:01] order 3 NOK",
            "[2018-04-11 03:15:59] order 4 NOK",
            "[2018-04-11 04:15:30] order 5 NOK",
            "[2018-04-11 04:16:00] order 6 OK",
            "[2018-04-11 04:27:45] order 7 NOK",
        ];
        let buckets = aggregator().aggregate(lines).unwrap();

        assert_eq!(counts(&buckets), vec![1, 0, 2, 1, 0, 1]);
        assert_eq!(buckets[0].minute, minute("2018-04-11T03:13:00Z"));
        assert_eq!(buckets[2].minute, minute("2018-04-11T03:15:00Z"));
        assert_eq!(buckets[3].minute, minute("2018-04-11T04:15:00Z"));
        assert_eq!(buckets[5].minute, minute("2018-04-11T04:27:00Z"));
    }

    #[test]
    fn test_empty_input_has_no_buckets() {
        let buckets = aggregator().aggregate(Vec::<String>::new()).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_only_short_lines_has_no_buckets() {
        let buckets = aggregator().aggregate(["", "  ", "short NOK"]).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_short_lines_do_not_split_runs() {
        let lines = [
            "",
            "[2018-04-11 03:13:10] NOK",
            "",
            "[2018-04-11 03:13:40] NOK",
            "tiny",
        ];
        let buckets = aggregator().aggregate(lines).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 2);
    }

    #[test]
    fn test_non_adjacent_same_minute_stays_separate() {
        let lines = [
            "[2018-04-11 03:13:10] NOK",
            "[2018-04-11 03:14:10] NOK",
            "[2018-04-11 03:13:50] NOK",
        ];
        let buckets = aggregator().aggregate(lines).unwrap();

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].minute, buckets[2].minute);
        assert_eq!(counts(&buckets), vec![1, 1, 1]);
    }

    #[test]
    fn test_adjacent_buckets_are_distinct() {
        let lines = [
            "[2018-04-11 03:13:10] NOK",
            "[2018-04-11 03:13:20] OK",
            "[2018-04-11 03:14:10] OK",
            "[2018-04-11 03:13:50] NOK",
            "[2018-04-11 03:13:55] NOK",
        ];
        let buckets = aggregator().aggregate(lines).unwrap();
        for pair in buckets.windows(2) {
            assert_ne!(pair[0].minute, pair[1].minute);
        }
        assert_eq!(counts(&buckets), vec![1, 0, 2]);
    }

    #[test]
    fn test_epoch_minute_is_a_real_bucket() {
        let buckets = aggregator()
            .aggregate(["[1970-01-01 00:00:30] NOK"])
            .unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].minute, DateTime::<Utc>::from_timestamp(0, 0).unwrap());
        assert_eq!(buckets[0].count, 1);
    }

    #[test]
    fn test_malformed_line_discards_everything() {
        let lines = [
            "[2018-04-11 03:13:10] NOK",
            "[2018-04-11 03:14:10] NOK",
            "1214124asfasgasdfgasd",
            "[2018-04-11 03:15:10] NOK",
        ];
        let err = aggregator().aggregate(lines).unwrap_err();
        match err {
            EventsError::MalformedTimestamp { text, layout, .. } => {
                assert_eq!(text, "1214124asfasgasdfgasd");
                assert_eq!(layout, "[%Y-%m-%d %H:%M:%S]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_second_sixty_discards_everything() {
        let lines = [
            "[2018-04-11 03:13:30] NOK",
            "[2018-04-11 03:13:60] NOK",
            "[2018-04-11 03:14:10] NOK",
        ];
        let err = aggregator().aggregate(lines).unwrap_err();
        assert!(matches!(
            err,
            EventsError::MalformedTimestamp { ref text, .. } if text == "[2018-04-11 03:13:60]"
        ));
    }

    #[test]
    fn test_aggregate_is_repeatable() {
        let lines = [
            "[2018-04-11 03:13:10] NOK",
            "[2018-04-11 03:14:10] OK",
            "[2018-04-11 03:13:10] NOK",
        ];
        let agg = aggregator();
        assert_eq!(agg.aggregate(lines).unwrap(), agg.aggregate(lines).unwrap());
    }

    // ── aggregate_reader ──────────────────────────────────────────────────

    #[test]
    fn test_aggregate_reader_handles_crlf() {
        let input = "[2018-04-11 03:13:10] NOK\r\n[2018-04-11 03:13:20] NOK\r\n";
        let buckets = aggregator().aggregate_reader(input.as_bytes()).unwrap();
        assert_eq!(counts(&buckets), vec![2]);
    }

    #[test]
    fn test_aggregate_reader_invalid_utf8_is_source_read() {
        let input: &[u8] = b"[2018-04-11 03:13:10] NOK\n\xff\xfe\n";
        let err = aggregator().aggregate_reader(input).unwrap_err();
        assert!(matches!(err, EventsError::SourceRead(_)));
    }

    // ── buckets (streaming) ───────────────────────────────────────────────

    #[test]
    fn test_buckets_yield_before_source_ends() {
        let agg = aggregator();
        let lines = vec![
            Ok("[2018-04-11 03:13:10] NOK"),
            Ok("[2018-04-11 03:14:10] NOK"),
            Ok("garbage-garbage-garbage"),
        ];
        let mut iter = agg.buckets(lines);

        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.minute, minute("2018-04-11T03:13:00Z"));
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_buckets_stats() {
        let agg = aggregator();
        let lines = vec![
            Ok(""),
            Ok("[2018-04-11 03:13:10] NOK"),
            Ok("[2018-04-11 03:14:10] OK"),
        ];
        let mut iter = agg.buckets(lines);
        while iter.next().is_some() {}

        assert_eq!(
            iter.stats(),
            AggregationStats {
                records_read: 3,
                records_skipped: 1,
                buckets_emitted: 2,
            }
        );
    }

    #[test]
    fn test_buckets_source_error_is_fatal() {
        let agg = aggregator();
        let lines: Vec<Result<&str>> = vec![
            Ok("[2018-04-11 03:13:10] NOK"),
            Err(EventsError::SourceRead(std::io::Error::other("disk gone"))),
        ];
        let result: Result<Vec<Bucket>> = agg.buckets(lines).collect();
        assert!(matches!(result, Err(EventsError::SourceRead(_))));
    }
}
