use std::fmt::Write;

use crate::model::*;

/// Inputs of the conflict query, in the order their terms are emitted.
#[derive(Debug, Clone, Copy)]
pub struct ConflictTerms<'a> {
    /// Record being edited; `None` or empty for a new record.
    pub identity: Option<&'a str>,
    pub extra: Option<&'a TrustedFragment>,
    pub filter: Option<&'a CompiledPredicate>,
    /// Resource column and the candidate's resource value.
    pub resource: Option<(&'a Column, &'a str)>,
    pub start_column: &'a Column,
    pub end_column: &'a Column,
    pub start: &'a str,
    pub end: &'a str,
}

/// Assemble the conflict predicate and its parameters.
///
/// Parameters come out as `[identity, filter.., resource, end, start]`,
/// with the filter and resource parts present only when configured. The
/// overlap term is strict: an existing row ending exactly at `start`, or
/// starting exactly at `end`, does not conflict.
pub fn build_conflict_query(terms: &ConflictTerms<'_>) -> ConflictQuery {
    let mut predicate = String::new();
    let mut params = Vec::with_capacity(
        3 + usize::from(terms.resource.is_some())
            + terms.filter.map_or(0, |f| f.params.len()),
    );

    match terms.identity.filter(|id| !id.is_empty()) {
        Some(id) => {
            predicate.push_str("id != ?");
            params.push(id.to_string());
        }
        None => {
            predicate.push_str("'1' = ?");
            params.push(NEW_RECORD_SENTINEL.to_string());
        }
    }

    if let Some(extra) = terms.extra {
        let extra = extra.as_str().trim();
        if !extra.is_empty() {
            predicate.push(' ');
            predicate.push_str(extra);
        }
    }

    if let Some(filter) = terms.filter {
        predicate.push_str(" AND ");
        predicate.push_str(&filter.fragment);
        params.extend(filter.params.iter().cloned());
    }

    if let Some((column, value)) = terms.resource {
        let _ = write!(predicate, " AND ({column} = ?)");
        params.push(value.to_string());
    }

    let _ = write!(
        predicate,
        " AND ({} < ? AND ? < {})",
        terms.start_column, terms.end_column
    );
    params.push(terms.end.to_string());
    params.push(terms.start.to_string());

    let query = ConflictQuery { predicate, params };
    debug_assert_eq!(query.placeholder_count(), query.params.len());
    query
}
