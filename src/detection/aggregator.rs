//! Per-address timeline aggregation

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::AuthEvent;

/// Sorted attempt timestamps for one source address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTimeline {
    pub source_address: String,
    pub attempts: Vec<DateTime<Utc>>,
}

impl AddressTimeline {
    fn new(source_address: String) -> Self {
        AddressTimeline {
            source_address,
            attempts: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

/// Group events by source address and sort each timeline ascending.
///
/// Timelines come back in order of each address's first appearance in the
/// input. Equal timestamps have no defined relative order.
pub fn aggregate<I>(events: I) -> Vec<AddressTimeline>
where
    I: IntoIterator<Item = AuthEvent>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut timelines: Vec<AddressTimeline> = Vec::new();

    for event in events {
        let slot = match index.get(&event.source_address) {
            Some(&slot) => slot,
            None => {
                index.insert(event.source_address.clone(), timelines.len());
                timelines.push(AddressTimeline::new(event.source_address));
                timelines.len() - 1
            }
        };
        timelines[slot].attempts.push(event.occurred_at);
    }

    for timeline in &mut timelines {
        timeline.attempts.sort_unstable();
    }

    timelines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;
    use chrono::TimeZone;

    fn event(address: &str, secs: i64) -> AuthEvent {
        AuthEvent {
            source_address: address.to_string(),
            occurred_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            kind: FailureKind::PasswordFailure,
        }
    }

    #[test]
    fn test_groups_by_address() {
        let timelines = aggregate(vec![
            event("10.0.0.1", 0),
            event("10.0.0.2", 5),
            event("10.0.0.1", 10),
        ]);

        assert_eq!(timelines.len(), 2);
        assert_eq!(timelines[0].source_address, "10.0.0.1");
        assert_eq!(timelines[0].len(), 2);
        assert_eq!(timelines[1].source_address, "10.0.0.2");
        assert_eq!(timelines[1].len(), 1);
    }

    #[test]
    fn test_sorts_each_timeline() {
        let timelines = aggregate(vec![
            event("10.0.0.1", 30),
            event("10.0.0.1", 10),
            event("10.0.0.1", 20),
        ]);

        let secs: Vec<i64> = timelines[0]
            .attempts
            .iter()
            .map(|t| t.timestamp() - 1_700_000_000)
            .collect();
        assert_eq!(secs, vec![10, 20, 30]);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(Vec::new()).is_empty());
    }

    #[test]
    fn test_no_address_invented() {
        let timelines = aggregate(vec![event("1.1.1.1", 0), event("2.2.2.2", 0)]);
        let mut addresses: Vec<_> = timelines.iter().map(|t| t.source_address.as_str()).collect();
        addresses.sort();
        assert_eq!(addresses, vec!["1.1.1.1", "2.2.2.2"]);
        assert!(timelines.iter().all(|t| !t.is_empty()));
    }
}
