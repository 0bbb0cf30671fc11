//! Prerequisite checking and update application.
//!
//! The engine is protocol-free: it consumes already-decoded update
//! requests and produces an outcome code plus the change set that was
//! applied. Wire encoding and signature checking live elsewhere.

use crate::record::{names_equal, ChangeSet, Record, RecordType};
use crate::router::DomainRouter;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Resource record class as it appears in an update message.
///
/// Class carries the update semantics: `In` adds, `Any` and `None` assert
/// or delete depending on the section the record sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RrClass {
    /// Internet class: "this record should exist"
    In,
    /// ANY class: "something exists" / "delete everything matching"
    Any,
    /// NONE class: "nothing exists" / "delete this record"
    None,
    /// Any other class value
    Other(u16),
}

/// What a prerequisite or query selects by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSelector {
    /// Match any record type
    Any,
    /// Match exactly one supported type
    Exact(RecordType),
    /// A wire type the record model does not represent; matches nothing
    Unsupported(u16),
}

/// Outcome codes, mirroring DNS response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rcode {
    NoError,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    YxDomain,
    YxRrset,
    NxRrset,
    NotAuth,
}

/// One prerequisite from the answer section of an update.
#[derive(Debug, Clone)]
pub struct Prerequisite {
    /// Fully-qualified name the assertion is about
    pub name: String,
    /// Class carrying the assertion semantics
    pub class: RrClass,
    /// Which types the assertion covers
    pub rtype: TypeSelector,
}

/// One update directive from the authority section of an update.
#[derive(Debug, Clone)]
pub struct Directive {
    /// Fully-qualified name to change
    pub name: String,
    /// `In` adds; `Any`/`None` delete
    pub class: RrClass,
    /// Record type being added or deleted
    pub rtype: TypeSelector,
    /// TTL for additions
    pub ttl: u32,
    /// Value strings for additions; empty for deletes
    pub values: Vec<String>,
}

/// A decoded dynamic update: target zone, prerequisites, directives.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// Zone name from the message's zone section
    pub zone_name: String,
    /// Assertions checked before anything is applied
    pub prerequisites: Vec<Prerequisite>,
    /// Changes applied in order once prerequisites hold
    pub directives: Vec<Directive>,
}

/// Result of processing an update: the outcome code and what changed.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub rcode: Rcode,
    /// Changes applied, including those before a mid-update failure
    pub changes: ChangeSet,
}

impl UpdateOutcome {
    fn failed(rcode: Rcode) -> Self {
        Self {
            rcode,
            changes: ChangeSet::default(),
        }
    }
}

/// Result of a query: the outcome code and matching records.
#[derive(Debug)]
pub struct LookupOutcome {
    pub rcode: Rcode,
    pub records: Vec<Record>,
}

impl LookupOutcome {
    fn failed(rcode: Rcode) -> Self {
        Self {
            rcode,
            records: Vec::new(),
        }
    }
}

/// Applies decoded updates and queries against the routed providers.
pub struct UpdateEngine {
    router: Arc<DomainRouter>,
}

impl UpdateEngine {
    pub fn new(router: Arc<DomainRouter>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &DomainRouter {
        &self.router
    }

    /// Process one decoded update request.
    ///
    /// Prerequisites are checked against a single listing taken before any
    /// directive runs; the first failing prerequisite decides the outcome.
    /// Directives then apply in order with no rollback: a mid-sequence
    /// failure returns `ServFail` together with everything applied so far.
    pub async fn update(&self, request: &UpdateRequest) -> UpdateOutcome {
        let Some(binding) = self.router.resolve(&request.zone_name) else {
            debug!(zone = %request.zone_name, "update for unconfigured zone");
            return UpdateOutcome::failed(Rcode::NxDomain);
        };

        if !request.prerequisites.is_empty() {
            let existing = match binding.provider.list(&binding.zone).await {
                Ok(records) => records,
                Err(err) => {
                    error!(zone = %binding.zone, %err, "listing zone for prerequisite check failed");
                    return UpdateOutcome::failed(Rcode::ServFail);
                }
            };
            for prereq in &request.prerequisites {
                let rcode = check_prerequisite(prereq, &existing);
                if rcode != Rcode::NoError {
                    debug!(
                        name = %prereq.name,
                        ?rcode,
                        "prerequisite not satisfied"
                    );
                    return UpdateOutcome::failed(rcode);
                }
            }
        }

        let mut changes = ChangeSet::default();
        for directive in &request.directives {
            match directive.class {
                RrClass::Any | RrClass::None => {
                    // Value-level deletes (class NONE with RDATA) are folded
                    // into whole-RRset removal; backends do not expose a
                    // narrower delete.
                    let TypeSelector::Exact(rtype) = directive.rtype else {
                        return UpdateOutcome {
                            rcode: Rcode::NotImp,
                            changes,
                        };
                    };
                    match binding
                        .provider
                        .absent(&binding.zone, &directive.name, rtype)
                        .await
                    {
                        Ok(applied) => changes.merge(applied),
                        Err(err) => {
                            if let Some(partial) = err.partial_changes() {
                                changes.merge(partial.clone());
                            }
                            error!(name = %directive.name, %rtype, %err, "delete directive failed");
                            return UpdateOutcome {
                                rcode: Rcode::ServFail,
                                changes,
                            };
                        }
                    }
                }
                RrClass::In => {
                    let TypeSelector::Exact(rtype) = directive.rtype else {
                        return UpdateOutcome {
                            rcode: Rcode::NotImp,
                            changes,
                        };
                    };
                    let value = directive.values.join(" ");
                    match binding
                        .provider
                        .present(&binding.zone, &directive.name, rtype, &value, directive.ttl)
                        .await
                    {
                        Ok(applied) => changes.merge(applied),
                        Err(err) => {
                            if let Some(partial) = err.partial_changes() {
                                changes.merge(partial.clone());
                            }
                            error!(name = %directive.name, %rtype, %err, "add directive failed");
                            return UpdateOutcome {
                                rcode: Rcode::ServFail,
                                changes,
                            };
                        }
                    }
                }
                RrClass::Other(class) => {
                    debug!(class, "directive with unhandled class");
                    return UpdateOutcome {
                        rcode: Rcode::NotImp,
                        changes,
                    };
                }
            }
        }

        if !changes.is_empty() {
            info!(
                zone = %binding.zone,
                added = changes.additions.len(),
                deleted = changes.deletions.len(),
                "update applied"
            );
        }
        UpdateOutcome {
            rcode: Rcode::NoError,
            changes,
        }
    }

    /// Look up records for a query name and type selector.
    ///
    /// An ANY-type query is answered from a conservative subset (TXT,
    /// CNAME, A, AAAA) rather than the full record set.
    pub async fn lookup(&self, name: &str, selector: TypeSelector) -> LookupOutcome {
        let Some(binding) = self.router.resolve(name) else {
            debug!(%name, "query for unconfigured zone");
            return LookupOutcome::failed(Rcode::NxDomain);
        };

        let existing = match binding.provider.list(&binding.zone).await {
            Ok(records) => records,
            Err(err) => {
                error!(zone = %binding.zone, %err, "listing zone for query failed");
                return LookupOutcome::failed(Rcode::ServFail);
            }
        };

        let records = existing
            .into_iter()
            .filter(|record| {
                names_equal(&record.name, name)
                    && match selector {
                        TypeSelector::Any => matches!(
                            record.rtype,
                            RecordType::Txt
                                | RecordType::Cname
                                | RecordType::A
                                | RecordType::Aaaa
                        ),
                        TypeSelector::Exact(rtype) => record.rtype == rtype,
                        TypeSelector::Unsupported(_) => false,
                    }
            })
            .collect();

        LookupOutcome {
            rcode: Rcode::NoError,
            records,
        }
    }
}

fn check_prerequisite(prereq: &Prerequisite, existing: &[Record]) -> Rcode {
    let name_exists = existing
        .iter()
        .any(|record| names_equal(&record.name, &prereq.name));
    let rrset_exists = |rtype: RecordType| {
        existing
            .iter()
            .any(|record| record.rtype == rtype && names_equal(&record.name, &prereq.name))
    };

    match prereq.class {
        RrClass::Any => match prereq.rtype {
            TypeSelector::Any => {
                if name_exists {
                    Rcode::NoError
                } else {
                    Rcode::NxRrset
                }
            }
            TypeSelector::Exact(rtype) => {
                if rrset_exists(rtype) {
                    Rcode::NoError
                } else {
                    Rcode::NxRrset
                }
            }
            TypeSelector::Unsupported(_) => Rcode::NxRrset,
        },
        RrClass::None => match prereq.rtype {
            TypeSelector::Any => {
                if name_exists {
                    Rcode::YxDomain
                } else {
                    Rcode::NoError
                }
            }
            TypeSelector::Exact(rtype) => {
                if rrset_exists(rtype) {
                    Rcode::YxRrset
                } else {
                    Rcode::NoError
                }
            }
            TypeSelector::Unsupported(_) => Rcode::NoError,
        },
        RrClass::In | RrClass::Other(_) => Rcode::NotImp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prerequisite_classification() {
        let existing = vec![Record::new(
            "foo.example.com.",
            RecordType::A,
            300,
            vec!["192.0.2.1".to_string()],
        )];

        let check = |class, rtype| {
            check_prerequisite(
                &Prerequisite {
                    name: "foo.example.com.".to_string(),
                    class,
                    rtype,
                },
                &existing,
            )
        };

        assert_eq!(check(RrClass::Any, TypeSelector::Any), Rcode::NoError);
        assert_eq!(
            check(RrClass::Any, TypeSelector::Exact(RecordType::A)),
            Rcode::NoError
        );
        assert_eq!(
            check(RrClass::Any, TypeSelector::Exact(RecordType::Txt)),
            Rcode::NxRrset
        );
        assert_eq!(check(RrClass::None, TypeSelector::Any), Rcode::YxDomain);
        assert_eq!(
            check(RrClass::None, TypeSelector::Exact(RecordType::A)),
            Rcode::YxRrset
        );
        assert_eq!(
            check(RrClass::None, TypeSelector::Exact(RecordType::Txt)),
            Rcode::NoError
        );
        assert_eq!(check(RrClass::In, TypeSelector::Any), Rcode::NotImp);
        assert_eq!(check(RrClass::Other(3), TypeSelector::Any), Rcode::NotImp);
    }

    #[test]
    fn prerequisite_on_missing_name() {
        let missing = Prerequisite {
            name: "bar.example.com.".to_string(),
            class: RrClass::Any,
            rtype: TypeSelector::Any,
        };
        assert_eq!(check_prerequisite(&missing, &[]), Rcode::NxRrset);

        let absent = Prerequisite {
            name: "bar.example.com.".to_string(),
            class: RrClass::None,
            rtype: TypeSelector::Any,
        };
        assert_eq!(check_prerequisite(&absent, &[]), Rcode::NoError);
    }

    #[test]
    fn unsupported_type_matches_nothing() {
        let existing = vec![Record::new(
            "foo.example.com.",
            RecordType::A,
            300,
            vec!["192.0.2.1".to_string()],
        )];
        let prereq = Prerequisite {
            name: "foo.example.com.".to_string(),
            class: RrClass::Any,
            rtype: TypeSelector::Unsupported(99),
        };
        assert_eq!(check_prerequisite(&prereq, &existing), Rcode::NxRrset);

        let prereq = Prerequisite {
            name: "foo.example.com.".to_string(),
            class: RrClass::None,
            rtype: TypeSelector::Unsupported(99),
        };
        assert_eq!(check_prerequisite(&prereq, &existing), Rcode::NoError);
    }
}
