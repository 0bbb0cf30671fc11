//! Canonical record and change-set model.
//!
//! Records are plain values: a fully-qualified name, a type, a TTL, and one
//! or more value strings. They never outlive the listing or change set that
//! produced them; the backend is always the source of truth.
//!
//! Names are stored in fully-qualified (trailing-dot) form so that
//! `example.com` and `example.com.` never compare unequal by accident.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The record types dnsctl can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
    Ns,
    Ptr,
    Mx,
    Srv,
    Soa,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Txt => "TXT",
            Self::Ns => "NS",
            Self::Ptr => "PTR",
            Self::Mx => "MX",
            Self::Srv => "SRV",
            Self::Soa => "SOA",
        };
        f.write_str(s)
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            "PTR" => Ok(Self::Ptr),
            "MX" => Ok(Self::Mx),
            "SRV" => Ok(Self::Srv),
            "SOA" => Ok(Self::Soa),
            other => Err(Error::invalid_record(format!(
                "unknown record type '{other}'"
            ))),
        }
    }
}

/// Append the root label if `name` does not already carry it.
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Strip the trailing root label, if present.
pub fn unfqdn(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Case-insensitive comparison of two names in fully-qualified form.
pub fn names_equal(a: &str, b: &str) -> bool {
    fqdn(a).eq_ignore_ascii_case(&fqdn(b))
}

/// One DNS resource record as dnsctl sees it.
///
/// `values` holds one string per RDATA; multiple entries are only
/// meaningful for multi-value types such as TXT. Value string formats per
/// type: A/AAAA the address text, CNAME/NS/PTR the target name, MX
/// `"<preference> <exchange>"`, SRV `"<priority> <weight> <port> <target>"`,
/// SOA the seven fields space-separated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Fully-qualified record name
    pub name: String,
    /// Record type
    pub rtype: RecordType,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// RDATA value strings
    pub values: Vec<String>,
}

impl Record {
    /// Create a record, normalizing the name to fully-qualified form.
    pub fn new(
        name: impl Into<String>,
        rtype: RecordType,
        ttl: u32,
        values: Vec<String>,
    ) -> Self {
        Self {
            name: fqdn(&name.into()),
            rtype,
            ttl,
            values,
        }
    }

    /// Order two records by their name read label-by-label from the root,
    /// so listings group by zone instead of by first character.
    pub fn cmp_by_zone(a: &Record, b: &Record) -> Ordering {
        reversed_labels(&a.name).cmp(&reversed_labels(&b.name))
    }
}

fn reversed_labels(name: &str) -> String {
    let mut labels: Vec<&str> = unfqdn(name).split('.').collect();
    labels.reverse();
    labels.join(".").to_ascii_lowercase()
}

/// Stable sort by reversed-label order; ties keep their relative order.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(Record::cmp_by_zone);
}

/// The additions and deletions one mutating operation performed.
///
/// Transient: produced by every `present`/`absent` call and by the update
/// engine, never persisted. Empty on both sides is a valid no-op result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Records created by the operation
    pub additions: Vec<Record>,
    /// Records deleted by the operation
    pub deletions: Vec<Record>,
}

impl ChangeSet {
    /// True if the operation changed nothing.
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    /// Fold another change set into this one, keeping order.
    pub fn merge(&mut self, other: ChangeSet) {
        self.additions.extend(other.additions);
        self.deletions.extend(other.deletions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> Record {
        Record::new(name, RecordType::A, 300, vec!["192.0.2.1".to_string()])
    }

    #[test]
    fn fqdn_normalization() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
        assert_eq!(unfqdn("example.com."), "example.com");
        assert!(names_equal("Example.COM", "example.com."));
    }

    #[test]
    fn ordering_groups_by_zone_suffix() {
        let mut records = vec![
            record("z.example.com."),
            record("a.example.com."),
            record("m.other.com."),
        ];
        sort_records(&mut records);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["a.example.com.", "z.example.com.", "m.other.com."]
        );
    }

    #[test]
    fn ordering_is_deterministic() {
        let www = record("www.example.com.");
        let api = record("api.example.com.");
        assert_eq!(Record::cmp_by_zone(&api, &www), Ordering::Less);
        assert_eq!(Record::cmp_by_zone(&www, &api), Ordering::Greater);

        let b = record("mail.b.com.");
        let a = record("mail.a.com.");
        assert_eq!(Record::cmp_by_zone(&a, &b), Ordering::Less);
    }

    #[test]
    fn record_type_round_trips_through_strings() {
        for s in ["A", "AAAA", "CNAME", "TXT", "NS", "PTR", "MX", "SRV", "SOA"] {
            let rtype: RecordType = s.parse().unwrap();
            assert_eq!(rtype.to_string(), s);
        }
        assert_eq!("cname".parse::<RecordType>().unwrap(), RecordType::Cname);
        assert!("SPF".parse::<RecordType>().is_err());
    }

    #[test]
    fn change_set_merge_keeps_order() {
        let mut changes = ChangeSet::default();
        assert!(changes.is_empty());
        changes.merge(ChangeSet {
            additions: vec![record("a.example.com.")],
            deletions: vec![],
        });
        changes.merge(ChangeSet {
            additions: vec![record("b.example.com.")],
            deletions: vec![record("c.example.com.")],
        });
        assert_eq!(changes.additions.len(), 2);
        assert_eq!(changes.additions[0].name, "a.example.com.");
        assert_eq!(changes.deletions.len(), 1);
    }
}
