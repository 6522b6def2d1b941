use crate::aircraft_cache::{AircraftCache, AircraftRecord};
use crate::parser::types::{Field, Hexident, ReceivedMessage, Value};
use crate::sink::line_protocol::{DataPoint, FieldValue};
use crate::sink::{HttpClient, InfluxWriter};
use crate::thread_manager::SteppableTask;

pub const MEASUREMENT: &str = "aircraft";
/// Records are kept this many export intervals before being evicted.
pub const RETENTION_FACTOR: i32 = 3;
const GENERATED_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.f";

/// Optional record attributes copied into every exported point, in order.
const EXPORTED_FIELDS: [Field; 10] = [
    Field::Altitude,
    Field::Speed,
    Field::Track,
    Field::Latitude,
    Field::Longitude,
    Field::VerticalRate,
    Field::Alert,
    Field::Emergency,
    Field::Spi,
    Field::OnGround,
];

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct CycleReport {
    pub exported: usize,
    pub written: bool,
    pub evicted: usize,
}

/// Builds one data point per aircraft that has a callsign and a squawk and
/// was seen within `interval` of `now`.
#[must_use]
pub fn build_export_batch(
    cache: &AircraftCache,
    now: chrono::DateTime<chrono::Utc>,
    interval: chrono::TimeDelta,
) -> Vec<DataPoint> {
    let mut records: Vec<(&Hexident, &AircraftRecord)> = cache.snapshot().collect();
    records.sort_by(|a, b| a.0.cmp(b.0));

    let mut batch = Vec::new();
    for (hexident, record) in records {
        let (Some(callsign), Some(squawk)) =
            (record.text(Field::Callsign), record.text(Field::Squawk))
        else {
            log::info!("Callsign or squawk missing for {hexident}");
            continue;
        };

        let age = cache.age(hexident, now);
        if age > interval {
            log::info!(
                "Aircraft {hexident} has not been seen for {0}s",
                age.num_seconds()
            );
            continue;
        }

        let Some(generated) = generation_timestamp(record) else {
            log::warn!("Aircraft {hexident} has an unreadable generation date/time, skipping");
            continue;
        };

        let point = EXPORTED_FIELDS.iter().fold(
            DataPoint::new()
                .tag("hexident", hexident.as_str())
                .tag("callsign", callsign)
                .tag("squawk", squawk)
                .field("hexident", FieldValue::Text(hexident.to_string()))
                .field("callsign", FieldValue::Text(callsign.to_string()))
                .field("generated", FieldValue::Integer(generated)),
            |point, field| point.optional_field(field.name(), record.get(*field).map(to_field_value)),
        );
        let count = i64::try_from(record.count()).unwrap_or(i64::MAX);
        batch.push(point.field("count", FieldValue::Integer(count)));
    }
    batch
}

/// Generation date and time of the latest message, as UTC epoch seconds.
fn generation_timestamp(record: &AircraftRecord) -> Option<i64> {
    let date = record.text(Field::GenerationDate)?;
    let time = record.text(Field::GenerationTime)?;
    chrono::NaiveDateTime::parse_from_str(&format!("{date} {time}"), GENERATED_FORMAT)
        .ok()
        .map(|datetime| datetime.and_utc().timestamp())
}

fn to_field_value(value: &Value) -> FieldValue {
    match value {
        Value::Integer(value) => FieldValue::Integer(*value),
        Value::Float(value) => FieldValue::Float(*value),
        Value::Boolean(value) => FieldValue::Boolean(*value),
        Value::Text(text) => FieldValue::Text(text.clone()),
    }
}

/// Sole owner of the aircraft cache: merges parsed messages as they arrive
/// and runs the export/eviction cycle once per interval.
pub struct Exporter<C: HttpClient> {
    cache: AircraftCache,
    writer: InfluxWriter<C>,
    receiver: crossbeam_channel::Receiver<ReceivedMessage>,
    interval: chrono::TimeDelta,
    last_run: std::time::Instant,
}

impl<C: HttpClient> Exporter<C> {
    #[must_use]
    pub fn new(
        writer: InfluxWriter<C>,
        receiver: crossbeam_channel::Receiver<ReceivedMessage>,
        interval: std::time::Duration,
    ) -> Self {
        Exporter {
            cache: AircraftCache::new(),
            writer,
            receiver,
            interval: chrono::TimeDelta::from_std(interval).unwrap_or(chrono::TimeDelta::MAX),
            last_run: std::time::Instant::now(),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &AircraftCache {
        &self.cache
    }

    /// Merges every message queued so far, in arrival order.
    pub fn merge_pending(&mut self) -> usize {
        let mut merged = 0;
        for received in self.receiver.try_iter() {
            self.cache.merge(
                received.message.hexident,
                received.message.fields,
                received.received_at,
            );
            merged += 1;
        }
        merged
    }

    /// Exports eligible aircraft, then evicts everything older than
    /// [`RETENTION_FACTOR`] intervals whether or not it was exported.
    pub fn run_cycle(&mut self, now: chrono::DateTime<chrono::Utc>) -> CycleReport {
        let batch = build_export_batch(&self.cache, now, self.interval);
        let mut report = CycleReport {
            exported: batch.len(),
            ..CycleReport::default()
        };

        if batch.is_empty() {
            log::info!("No aircraft to export.");
        } else {
            match self.writer.write(MEASUREMENT, &batch, now.timestamp()) {
                Ok(()) => {
                    log::info!("Exported {0} aircraft.", batch.len());
                    report.written = true;
                }
                Err(err) => log::error!("Dropping batch of {0} aircraft: {err}", batch.len()),
            }
        }

        let retention = self
            .interval
            .checked_mul(RETENTION_FACTOR)
            .unwrap_or(chrono::TimeDelta::MAX);
        report.evicted = self.cache.evict(now, retention);
        if report.evicted > 0 {
            log::info!(
                "Evicted {0} stale aircraft, {1} still tracked.",
                report.evicted,
                self.cache.len()
            );
        }
        report
    }
}

impl<C: HttpClient + 'static> SteppableTask for Exporter<C> {
    fn step(&mut self) -> bool {
        self.merge_pending();

        if self.interval.to_std().is_ok_and(|interval| self.last_run.elapsed() >= interval) {
            self.run_cycle(chrono::Utc::now());
            self.last_run = std::time::Instant::now();
        }
        true
    }

    fn on_stop(&mut self) {
        log::info!(
            "Exporter stopped with {0} aircraft in cache.",
            self.cache.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{build_export_batch, Exporter};
    use crate::aircraft_cache::AircraftCache;
    use crate::parser::builder::build_message_from_string;
    use crate::parser::types::{Field, Hexident, MessageFields, ReceivedMessage};
    use crate::sink::line_protocol::FieldValue;
    use crate::sink::test_utils::RecordingClient;
    use crate::sink::InfluxWriter;
    use crate::thread_manager::SteppableTask;

    const EXAMPLE_LINE: &str = "MSG,3,1,1,ABCDEF,0,2021/01/01,12:00:00.000,2021/01/01,12:00:00.000,TEST123,10000,250,90,40.0,-73.0,0,1200,0,0,0,0";
    const INTERVAL_SECONDS: i64 = 60;

    fn interval() -> chrono::TimeDelta {
        chrono::TimeDelta::seconds(INTERVAL_SECONDS)
    }

    fn cache_with(line: &str, at: chrono::DateTime<chrono::Utc>) -> AircraftCache {
        let message = build_message_from_string(line).expect("valid line");
        let mut cache = AircraftCache::new();
        cache.merge(message.hexident, message.fields, at);
        cache
    }

    fn exporter_with_status(
        status: u16,
    ) -> (
        Exporter<RecordingClient>,
        RecordingClient,
        crossbeam_channel::Sender<ReceivedMessage>,
    ) {
        let client = RecordingClient::with_status(status);
        let writer = InfluxWriter::new(client.clone(), "http://localhost:8086", "adsb").unwrap();
        let (sender, receiver) = crossbeam_channel::bounded(16);
        let exporter = Exporter::new(
            writer,
            receiver,
            std::time::Duration::from_secs(INTERVAL_SECONDS as u64),
        );
        (exporter, client, sender)
    }

    fn received(line: &str, at: chrono::DateTime<chrono::Utc>) -> ReceivedMessage {
        ReceivedMessage {
            message: build_message_from_string(line).unwrap(),
            received_at: at,
        }
    }

    #[test]
    fn when_exporting_fresh_example_then_one_point_with_expected_tags_and_fields() {
        let now = chrono::Utc::now();
        let cache = cache_with(EXAMPLE_LINE, now);

        let batch = build_export_batch(&cache, now, interval());

        assert_eq!(batch.len(), 1);
        let point = &batch[0];
        assert_eq!(
            point.tags,
            vec![
                (String::from("hexident"), String::from("ABCDEF")),
                (String::from("callsign"), String::from("TEST123")),
                (String::from("squawk"), String::from("1200")),
            ]
        );
        assert_eq!(
            point.field_value("generated"),
            Some(&FieldValue::Integer(1_609_502_400))
        );
        assert_eq!(point.field_value("altitude"), Some(&FieldValue::Integer(10000)));
        assert_eq!(point.field_value("latitude"), Some(&FieldValue::Float(40.0)));
        assert_eq!(point.field_value("onground"), Some(&FieldValue::Boolean(false)));
        assert_eq!(point.field_value("count"), Some(&FieldValue::Integer(1)));
        assert_eq!(
            point.fields.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            vec![
                "hexident", "callsign", "generated", "altitude", "speed", "track", "latitude",
                "longitude", "verticalrate", "alert", "emergency", "spi", "onground", "count",
            ]
        );
    }

    #[test]
    fn when_source_values_are_absent_then_fields_are_omitted() {
        let now = chrono::Utc::now();
        let line = "MSG,1,1,1,ABCDEF,1,2021/01/01,12:00:00.000,2021/01/01,12:00:00.000,TEST123,,,,,,,1200,,,,";
        let cache = cache_with(line, now);

        let batch = build_export_batch(&cache, now, interval());

        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch[0].fields.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            vec!["hexident", "callsign", "generated", "count"]
        );
    }

    #[test]
    fn when_squawk_is_missing_then_aircraft_is_never_exported() {
        let now = chrono::Utc::now();
        let line = "MSG,1,1,1,ABCDEF,1,2021/01/01,12:00:00.000,2021/01/01,12:00:00.000,TEST123,,,,,,,,,,,";
        let cache = cache_with(line, now);

        assert!(build_export_batch(&cache, now, interval()).is_empty());
    }

    #[test]
    fn when_generation_time_is_unreadable_then_aircraft_is_skipped() {
        let now = chrono::Utc::now();
        let line = "MSG,3,1,1,ABCDEF,0,2021/13/01,12:00:00.000,2021/01/01,12:00:00.000,TEST123,10000,250,90,40.0,-73.0,0,1200,0,0,0,0";
        let cache = cache_with(line, now);

        assert!(build_export_batch(&cache, now, interval()).is_empty());
    }

    #[test]
    fn when_cache_is_empty_then_unknown_addresses_are_stale() {
        let cache = AircraftCache::new();
        let now = chrono::Utc::now();
        let unknown = Hexident::new("FFFFFF").unwrap();

        assert!(cache.age(&unknown, now) > interval() * super::RETENTION_FACTOR);
        assert!(build_export_batch(&cache, now, interval()).is_empty());
    }

    #[test]
    fn when_aircraft_is_older_than_interval_but_within_retention_then_skipped_and_kept() {
        let (mut exporter, client, sender) = exporter_with_status(204);
        let start = chrono::Utc::now();
        sender.send(received(EXAMPLE_LINE, start)).unwrap();
        assert_eq!(exporter.merge_pending(), 1);

        let report = exporter.run_cycle(start + chrono::TimeDelta::seconds(2 * INTERVAL_SECONDS));

        assert_eq!(report.exported, 0);
        assert_eq!(report.evicted, 0);
        assert!(client.requests().is_empty());
        assert_eq!(exporter.cache().len(), 1);

        let report = exporter.run_cycle(start + chrono::TimeDelta::seconds(3 * INTERVAL_SECONDS + 1));

        assert_eq!(report.evicted, 1);
        assert!(exporter.cache().is_empty());
    }

    #[test]
    fn when_aircraft_is_fresh_then_batch_is_written_once() {
        let (mut exporter, client, sender) = exporter_with_status(204);
        let now = chrono::Utc::now();
        sender.send(received(EXAMPLE_LINE, now)).unwrap();
        sender.send(received(EXAMPLE_LINE, now)).unwrap();
        exporter.merge_pending();

        let report = exporter.run_cycle(now);

        assert_eq!(report.exported, 1);
        assert!(report.written);
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].0,
            "http://localhost:8086/write?precision=s&db=adsb"
        );
        assert!(requests[0]
            .1
            .starts_with("aircraft,hexident=ABCDEF,callsign=TEST123,squawk=1200 hexident=\"ABCDEF\""));
        assert!(requests[0].1.contains("count=2i"));
        assert!(requests[0].1.ends_with(&format!(" {}", now.timestamp())));
    }

    #[test]
    fn when_sink_rejects_batch_then_cycle_continues_and_still_evicts() {
        let (mut exporter, client, _sender) = exporter_with_status(500);
        let start = chrono::Utc::now();
        exporter.cache.merge(
            Hexident::new("000001").unwrap(),
            MessageFields::new(),
            start - chrono::TimeDelta::seconds(4 * INTERVAL_SECONDS),
        );
        let fresh = build_message_from_string(EXAMPLE_LINE).unwrap();
        exporter.cache.merge(fresh.hexident, fresh.fields, start);

        let report = exporter.run_cycle(start);

        assert_eq!(report.exported, 1);
        assert!(!report.written);
        assert_eq!(report.evicted, 1);
        assert_eq!(client.requests().len(), 1);
        assert!(exporter.cache().get(&Hexident::new("ABCDEF").unwrap()).is_some());
    }

    #[test]
    fn when_stepping_before_interval_elapsed_then_messages_merge_without_export() {
        let (mut exporter, client, sender) = exporter_with_status(204);
        sender.send(received(EXAMPLE_LINE, chrono::Utc::now())).unwrap();

        assert!(exporter.step());

        assert_eq!(exporter.cache().len(), 1);
        let record = exporter
            .cache()
            .get(&Hexident::new("ABCDEF").unwrap())
            .unwrap();
        assert_eq!(record.text(Field::Callsign), Some("TEST123"));
        assert!(client.requests().is_empty());
    }

    #[test]
    fn when_pipeline_runs_then_feed_lines_reach_the_sink() {
        use crate::ingestor::{FeedReader, Ingestor};
        use crate::parser::AircraftParser;
        use crate::thread_manager::ThreadManager;
        use std::io::Write;

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        // The line lands mid-interval so the first cycle sees it within the
        // export window.
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            std::thread::sleep(std::time::Duration::from_millis(700));
            stream
                .write_all(format!("garbage\r\n{EXAMPLE_LINE}\r\n").as_bytes())
                .unwrap();
            std::thread::sleep(std::time::Duration::from_secs(4));
        });

        let client = RecordingClient::with_status(204);
        let writer = InfluxWriter::new(client.clone(), "http://localhost:8086", "adsb").unwrap();
        let (lines_sender, lines_receiver) = crossbeam_channel::bounded(64);
        let (messages_sender, messages_receiver) = crossbeam_channel::bounded(64);

        let mut manager = ThreadManager::new();
        let short = std::time::Duration::from_millis(50);
        let reader = FeedReader::new("127.0.0.1", port).with_timings(short, short);
        manager.add_task(
            Ingestor::new(reader, lines_sender, manager.stop_signal()),
            std::time::Duration::ZERO,
        );
        manager.add_task(
            AircraftParser::new(lines_receiver, messages_sender),
            std::time::Duration::ZERO,
        );
        manager.add_task(
            Exporter::new(writer, messages_receiver, std::time::Duration::from_secs(2)),
            short,
        );

        for _ in 0..120 {
            if !client.requests().is_empty() {
                break;
            }
            std::thread::sleep(short);
        }
        manager.stop_all_tasks();
        manager.wait_on_all_tasks();
        server.join().unwrap();

        let requests = client.requests();
        assert!(!requests.is_empty());
        assert!(requests[0]
            .1
            .starts_with("aircraft,hexident=ABCDEF,callsign=TEST123,squawk=1200 "));
    }
}
