use crate::parser::types::{Field, Hexident, MessageFields, Value};

/// Latest known state of one aircraft, merged from every message seen for it.
#[derive(Debug, PartialEq, Clone)]
pub struct AircraftRecord {
    fields: MessageFields,
    count: u64,
    last_seen: chrono::DateTime<chrono::Utc>,
}

impl AircraftRecord {
    fn new(fields: MessageFields, now: chrono::DateTime<chrono::Utc>) -> Self {
        AircraftRecord {
            fields,
            count: 1,
            last_seen: now,
        }
    }

    fn merge(&mut self, fields: MessageFields, now: chrono::DateTime<chrono::Utc>) {
        self.fields.extend(fields);
        self.count += 1;
        self.last_seen = self.last_seen.max(now);
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&Value> {
        self.fields.get(&field)
    }

    #[must_use]
    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(Value::as_text)
    }

    #[must_use]
    pub fn fields(&self) -> &MessageFields {
        &self.fields
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn last_seen(&self) -> chrono::DateTime<chrono::Utc> {
        self.last_seen
    }
}

#[derive(Debug, Default)]
pub struct AircraftCache {
    records: std::collections::HashMap<Hexident, AircraftRecord>,
}

impl AircraftCache {
    #[must_use]
    pub fn new() -> Self {
        AircraftCache::default()
    }

    /// Merges `fields` onto the record for `hexident`, creating it on first
    /// sight. Only fields present in `fields` are overwritten.
    pub fn merge(
        &mut self,
        hexident: Hexident,
        fields: MessageFields,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        match self.records.entry(hexident) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                entry.get_mut().merge(fields, now);
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(AircraftRecord::new(fields, now));
            }
        }
    }

    /// Time since `hexident` was last merged.
    ///
    /// An address that was never merged (or has been evicted) is reported as
    /// [`chrono::TimeDelta::MAX`], so it is older than any staleness threshold.
    #[must_use]
    pub fn age(&self, hexident: &Hexident, now: chrono::DateTime<chrono::Utc>) -> chrono::TimeDelta {
        self.records
            .get(hexident)
            .map_or(chrono::TimeDelta::MAX, |record| now - record.last_seen)
    }

    pub fn snapshot(&self) -> impl Iterator<Item = (&Hexident, &AircraftRecord)> {
        self.records.iter()
    }

    /// Removes every record older than `max_age`, returning how many went.
    pub fn evict(&mut self, now: chrono::DateTime<chrono::Utc>, max_age: chrono::TimeDelta) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, record| now - record.last_seen <= max_age);
        before - self.records.len()
    }

    #[must_use]
    pub fn get(&self, hexident: &Hexident) -> Option<&AircraftRecord> {
        self.records.get(hexident)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
