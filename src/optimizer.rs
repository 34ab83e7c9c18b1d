// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Trace optimizer: groups `Resource`/`InstrumentationScope` occurrences by
//! content fingerprint, computes the shared-attribute sets that get lifted
//! out of per-row attribute records and into their parent group's attrs
//! record, and (optionally) stable-sorts spans by `(trace_id, start_time)`
//! before they are handed to [`crate::related::RelatedDataManager`].
//!
//! Grouping by fingerprint rather than by raw position exists because the
//! same `Resource` or `InstrumentationScope` value commonly repeats,
//! verbatim, across many entries of one `Traces` payload (a batching
//! artifact of the collector pipeline upstream); fingerprinting lets every
//! repeat collapse onto the same `resource_id`/`scope_id` group, so its
//! attributes are only ever appended once per distinct group -- duplicate
//! appends of the same group are harmless, since [`crate::attributes::AttributeAccumulator`]
//! dedups exact `(parent_id, key, value)` repeats at build time anyway.

use crate::model::{AttributeMap, InstrumentationScope, Resource, Span, Traces};
use ahash::AHashMap;
use std::hash::{Hash, Hasher};

/// Assigns stable, order-of-first-appearance `u16` group ids to content
/// fingerprints.
#[derive(Debug, Default)]
struct GroupAssigner {
    ids: AHashMap<u64, u16>,
    next: u32,
}

impl GroupAssigner {
    fn id_for(&mut self, fingerprint: u64) -> u16 {
        if let Some(&id) = self.ids.get(&fingerprint) {
            return id;
        }
        // `next` saturates rather than panics: exceeding 65536 distinct
        // resource/scope groups in one batch collapses extra groups onto
        // the last id, which only degrades shared-attribute lifting
        // quality for that pathological input, it does not corrupt output.
        let id = self.next.min(u32::from(u16::MAX)) as u16;
        self.next += 1;
        let _ = self.ids.insert(fingerprint, id);
        id
    }
}

fn hash_attrs(hasher: &mut impl Hasher, attrs: &AttributeMap) {
    for (k, v) in attrs {
        k.hash(hasher);
        hash_value(hasher, v);
    }
}

fn hash_value(hasher: &mut impl Hasher, value: &crate::model::AttributeValue) {
    use crate::model::AttributeValue;
    match value {
        AttributeValue::Str(s) => {
            0u8.hash(hasher);
            s.hash(hasher);
        }
        AttributeValue::Int(i) => {
            1u8.hash(hasher);
            i.hash(hasher);
        }
        AttributeValue::Double(d) => {
            2u8.hash(hasher);
            d.to_bits().hash(hasher);
        }
        AttributeValue::Bool(b) => {
            3u8.hash(hasher);
            b.hash(hasher);
        }
        AttributeValue::Bytes(b) => {
            4u8.hash(hasher);
            b.hash(hasher);
        }
        AttributeValue::List(items) => {
            5u8.hash(hasher);
            for item in items {
                hash_value(hasher, item);
            }
        }
        AttributeValue::Map(map) => {
            6u8.hash(hasher);
            hash_attrs(hasher, map);
        }
    }
}

fn resource_fingerprint(resource: &Resource, schema_url: &str) -> u64 {
    let mut hasher = ahash::AHasher::default();
    hash_attrs(&mut hasher, &resource.attributes);
    schema_url.hash(&mut hasher);
    hasher.finish()
}

fn scope_fingerprint(resource_id: u16, scope: &InstrumentationScope, schema_url: &str) -> u64 {
    let mut hasher = ahash::AHasher::default();
    resource_id.hash(&mut hasher);
    scope.name.hash(&mut hasher);
    scope.version.hash(&mut hasher);
    hash_attrs(&mut hasher, &scope.attributes);
    schema_url.hash(&mut hasher);
    hasher.finish()
}

/// The intersection of every map in `maps`; empty if there are fewer than
/// two maps (a lone span/event/link has nothing to share with).
fn shared_attrs<'a>(maps: impl ExactSizeIterator<Item = &'a AttributeMap>) -> AttributeMap {
    if maps.len() < 2 {
        return AttributeMap::new();
    }
    let mut iter = maps;
    let first = iter.next().expect("len >= 2 checked above");
    let mut shared = first.clone();
    for map in iter {
        shared.retain(|k, v| map.get(k) == Some(v));
        if shared.is_empty() {
            break;
        }
    }
    shared
}

/// One span plus the group ids and lifted shared-attribute sets it needs
/// when handed to [`crate::related::RelatedDataManager`].
pub struct PreparedSpan<'a> {
    /// Group id of this span's resource.
    pub resource_id: u16,
    /// Group id of this span's instrumentation scope.
    pub scope_id: u16,
    /// The span itself.
    pub span: &'a Span,
    /// Attributes shared by every span in this span's `ScopeSpans` entry;
    /// excluded from this span's own `SPAN_ATTRS` row and instead lifted
    /// into `SCOPE_ATTRS` under `scope_id`.
    pub shared_span_attrs: AttributeMap,
    /// Attributes shared by every event on this span (only computed when
    /// the span has more than one event); lifted into `SPAN_ATTRS` under
    /// this span's own id and excluded from each event's own attrs.
    pub shared_event_attrs: AttributeMap,
    /// Attributes shared by every link on this span (only computed when
    /// the span has more than one link); lifted analogously to events.
    pub shared_link_attrs: AttributeMap,
}

/// One resource group: its id and a representative `Resource` (all members
/// of a group share identical attributes by construction).
pub struct ResourceGroup<'a> {
    /// Group id.
    pub id: u16,
    /// The resource.
    pub resource: &'a Resource,
}

/// One scope group: its id, owning resource group id, and a representative scope.
pub struct ScopeGroup<'a> {
    /// Group id.
    pub id: u16,
    /// Owning resource group id.
    pub resource_id: u16,
    /// The instrumentation scope.
    pub scope: &'a InstrumentationScope,
}

/// The result of running the optimizer over one `Traces` payload.
pub struct OptimizedTraces<'a> {
    /// Spans, flattened and annotated, in emission order.
    pub spans: Vec<PreparedSpan<'a>>,
    /// Distinct resource groups encountered, first-seen order.
    pub resource_groups: Vec<ResourceGroup<'a>>,
    /// Distinct scope groups encountered, first-seen order.
    pub scope_groups: Vec<ScopeGroup<'a>>,
}

/// Groups `traces` by resource/scope fingerprint, computes shared-attribute
/// lifts, and (if `sort`) stable-sorts the flattened spans by
/// `(trace_id, start_time_unix_nano)`.
#[must_use]
pub fn optimize(traces: &Traces, sort: bool) -> OptimizedTraces<'_> {
    let mut resource_assigner = GroupAssigner::default();
    let mut scope_assigner = GroupAssigner::default();
    let mut resource_groups: Vec<ResourceGroup<'_>> = Vec::new();
    let mut scope_groups: Vec<ScopeGroup<'_>> = Vec::new();
    let mut seen_resources = AHashMap::new();
    let mut seen_scopes = AHashMap::new();
    let mut spans: Vec<PreparedSpan<'_>> = Vec::new();

    for resource_spans in &traces.resource_spans {
        let resource_fp =
            resource_fingerprint(&resource_spans.resource, &resource_spans.schema_url);
        let resource_id = resource_assigner.id_for(resource_fp);
        seen_resources.entry(resource_id).or_insert_with(|| {
            resource_groups.push(ResourceGroup {
                id: resource_id,
                resource: &resource_spans.resource,
            });
        });

        for scope_spans in &resource_spans.scope_spans {
            let scope_fp =
                scope_fingerprint(resource_id, &scope_spans.scope, &scope_spans.schema_url);
            let scope_id = scope_assigner.id_for(scope_fp);
            seen_scopes.entry(scope_id).or_insert_with(|| {
                scope_groups.push(ScopeGroup {
                    id: scope_id,
                    resource_id,
                    scope: &scope_spans.scope,
                });
            });

            let shared_span_attrs =
                shared_attrs(scope_spans.spans.iter().map(|s| &s.attributes));

            for span in &scope_spans.spans {
                let shared_event_attrs =
                    shared_attrs(span.events.iter().map(|e| &e.attributes));
                let shared_link_attrs =
                    shared_attrs(span.links.iter().map(|l| &l.attributes));
                spans.push(PreparedSpan {
                    resource_id,
                    scope_id,
                    span,
                    shared_span_attrs: shared_span_attrs.clone(),
                    shared_event_attrs,
                    shared_link_attrs,
                });
            }
        }
    }

    if sort {
        spans.sort_by(|a, b| {
            a.span
                .trace_id
                .cmp(&b.span.trace_id)
                .then_with(|| a.span.start_time_unix_nano.cmp(&b.span.start_time_unix_nano))
        });
    }

    OptimizedTraces {
        spans,
        resource_groups,
        scope_groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeValue, ResourceSpans, ScopeSpans};

    fn span_with(name: &str, trace_id: [u8; 16], start: u64) -> Span {
        Span {
            start_time_unix_nano: start,
            end_time_unix_nano: start + 1,
            trace_id,
            span_id: [0; 8],
            trace_state: None,
            parent_span_id: None,
            name: name.to_string(),
            kind: crate::model::SpanKind::Internal,
            attributes: AttributeMap::new(),
            dropped_attributes_count: 0,
            events: Vec::new(),
            dropped_events_count: 0,
            links: Vec::new(),
            dropped_links_count: 0,
            status: None,
        }
    }

    #[test]
    fn identical_resources_collapse_into_one_group() {
        let mut attrs = AttributeMap::new();
        let _ = attrs.insert("service.name".into(), AttributeValue::Str("svc".into()));
        let resource = Resource {
            attributes: attrs,
            dropped_attributes_count: 0,
        };
        let traces = Traces {
            resource_spans: vec![
                ResourceSpans {
                    resource: resource.clone(),
                    schema_url: String::new(),
                    scope_spans: vec![ScopeSpans {
                        scope: InstrumentationScope::default(),
                        schema_url: String::new(),
                        spans: vec![span_with("a", [1; 16], 1)],
                    }],
                },
                ResourceSpans {
                    resource,
                    schema_url: String::new(),
                    scope_spans: vec![ScopeSpans {
                        scope: InstrumentationScope::default(),
                        schema_url: String::new(),
                        spans: vec![span_with("b", [2; 16], 2)],
                    }],
                },
            ],
        };
        let optimized = optimize(&traces, false);
        assert_eq!(optimized.resource_groups.len(), 1);
        assert_eq!(optimized.spans[0].resource_id, optimized.spans[1].resource_id);
    }

    #[test]
    fn sort_orders_by_trace_id_then_start_time() {
        let traces = Traces {
            resource_spans: vec![ResourceSpans {
                resource: Resource::default(),
                schema_url: String::new(),
                scope_spans: vec![ScopeSpans {
                    scope: InstrumentationScope::default(),
                    schema_url: String::new(),
                    spans: vec![
                        span_with("later", [2; 16], 5),
                        span_with("earlier", [1; 16], 10),
                    ],
                }],
            }],
        };
        let optimized = optimize(&traces, true);
        assert_eq!(optimized.spans[0].span.name, "earlier");
        assert_eq!(optimized.spans[1].span.name, "later");
    }

    #[test]
    fn differing_schema_url_splits_otherwise_identical_resources() {
        let traces = Traces {
            resource_spans: vec![
                ResourceSpans {
                    resource: Resource::default(),
                    schema_url: "https://a.example/schema".into(),
                    scope_spans: vec![ScopeSpans {
                        scope: InstrumentationScope::default(),
                        schema_url: String::new(),
                        spans: vec![span_with("a", [1; 16], 1)],
                    }],
                },
                ResourceSpans {
                    resource: Resource::default(),
                    schema_url: "https://b.example/schema".into(),
                    scope_spans: vec![ScopeSpans {
                        scope: InstrumentationScope::default(),
                        schema_url: String::new(),
                        spans: vec![span_with("b", [2; 16], 2)],
                    }],
                },
            ],
        };
        let optimized = optimize(&traces, false);
        assert_eq!(optimized.resource_groups.len(), 2);
        assert_ne!(optimized.spans[0].resource_id, optimized.spans[1].resource_id);
    }

    #[test]
    fn differing_schema_url_splits_otherwise_identical_scopes() {
        let traces = Traces {
            resource_spans: vec![ResourceSpans {
                resource: Resource::default(),
                schema_url: String::new(),
                scope_spans: vec![
                    ScopeSpans {
                        scope: InstrumentationScope::default(),
                        schema_url: "https://a.example/schema".into(),
                        spans: vec![span_with("a", [1; 16], 1)],
                    },
                    ScopeSpans {
                        scope: InstrumentationScope::default(),
                        schema_url: "https://b.example/schema".into(),
                        spans: vec![span_with("b", [2; 16], 2)],
                    },
                ],
            }],
        };
        let optimized = optimize(&traces, false);
        assert_eq!(optimized.scope_groups.len(), 2);
        assert_ne!(optimized.spans[0].scope_id, optimized.spans[1].scope_id);
    }

    #[test]
    fn shared_attrs_require_at_least_two_entries() {
        let mut one = AttributeMap::new();
        let _ = one.insert("k".into(), AttributeValue::Str("v".into()));
        let maps = vec![one];
        assert!(shared_attrs(maps.iter()).is_empty());
    }
}
