use crate::model::*;

/// Separator of packed multi-value columns (`a;b;c`).
pub const MULTI_VALUE_SEPARATOR: char = ';';

/// Compile filter clauses into one predicate fragment.
///
/// Every contributing clause is kept and joined to the previous ones by its
/// own join operator (the first clause's join is ignored); the result is
/// wrapped in parentheses, so AND/OR precedence inside it is plain SQL
/// precedence. Returns `None` when no clause contributes a term.
pub fn compile_filters(clauses: &[FilterClause]) -> Option<CompiledPredicate> {
    let mut fragment = String::new();
    let mut params = Vec::new();

    for clause in clauses {
        let Some(term) = compile_clause(clause) else {
            continue;
        };
        if !fragment.is_empty() {
            fragment.push(' ');
            fragment.push_str(clause.join.as_sql());
            fragment.push(' ');
        }
        fragment.push_str(&term.fragment);
        params.extend(term.params);
    }

    if fragment.is_empty() {
        return None;
    }
    Some(CompiledPredicate {
        fragment: format!("({fragment})"),
        params,
    })
}

/// Compile a single clause. `None` means the clause contributes nothing.
pub fn compile_clause(clause: &FilterClause) -> Option<CompiledPredicate> {
    let column = clause.column();
    let op = clause.operator;
    match op {
        FilterOperator::IsTrue
        | FilterOperator::IsFalse
        | FilterOperator::IsNull
        | FilterOperator::IsNotNull => Some(CompiledPredicate {
            fragment: format!("{column} {op}"),
            params: Vec::new(),
        }),
        FilterOperator::In | FilterOperator::NotIn => {
            compile_membership(&column, &clause.value, op == FilterOperator::NotIn)
        }
        FilterOperator::Eq | FilterOperator::NotEq => Some(CompiledPredicate {
            fragment: format!("{column} {op} ?"),
            params: vec![clause.value.clone()],
        }),
        _ if clause.value.is_empty() => None,
        _ => Some(CompiledPredicate {
            fragment: format!("{column} {op} ?"),
            params: vec![clause.value.clone()],
        }),
    }
}

/// Non-empty candidates of a `;`-separated value.
pub fn split_candidates(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(MULTI_VALUE_SEPARATOR).filter(|v| !v.is_empty())
}

/// Membership over a packed multi-value column: each candidate matches the
/// whole value, the first element, a middle element or the last element.
fn compile_membership(column: &Column, raw: &str, negated: bool) -> Option<CompiledPredicate> {
    let mut groups = Vec::new();
    let mut params = Vec::new();
    for v in split_candidates(raw) {
        groups.push(format!(
            "({column} = ? OR {column} LIKE ? OR {column} LIKE ? OR {column} LIKE ?)"
        ));
        let escaped = escape_like(v);
        params.push(v.to_string());
        params.push(format!("{escaped};%"));
        params.push(format!("%;{escaped};%"));
        params.push(format!("%;{escaped}"));
    }
    if groups.is_empty() {
        return None;
    }

    let group = format!("({})", groups.join(" OR "));
    Some(CompiledPredicate {
        fragment: if negated { format!("NOT {group}") } else { group },
        params,
    })
}

/// Escape LIKE wildcards so candidate text matches literally.
fn escape_like(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{Predicate, Row};

    fn stored(column: &str, value: &str) -> Row {
        Row::from([(column.to_string(), value.to_string())])
    }

    fn matches(p: &CompiledPredicate, row: &Row) -> bool {
        Predicate::parse(&p.fragment, &p.params).unwrap().matches(row).unwrap()
    }

    #[test]
    fn unary_operators_take_no_params() {
        for op in [
            FilterOperator::IsTrue,
            FilterOperator::IsFalse,
            FilterOperator::IsNull,
            FilterOperator::IsNotNull,
        ] {
            let p = compile_clause(&FilterClause::new("active", op, "ignored")).unwrap();
            assert_eq!(p.fragment, format!("c_active {op}"));
            assert!(p.params.is_empty());
        }
    }

    #[test]
    fn equality_binds_raw_value_even_if_empty() {
        let p = compile_clause(&FilterClause::new("status", FilterOperator::Eq, "")).unwrap();
        assert_eq!(p.fragment, "c_status = ?");
        assert_eq!(p.params, vec![String::new()]);

        let p = compile_clause(&FilterClause::new("createdBy", FilterOperator::NotEq, "admin")).unwrap();
        assert_eq!(p.fragment, "createdBy <> ?");
        assert_eq!(p.params, vec!["admin".to_string()]);
    }

    #[test]
    fn generic_comparison_needs_a_value() {
        assert!(compile_clause(&FilterClause::new("seats", FilterOperator::Gt, "")).is_none());
        let p = compile_clause(&FilterClause::new("seats", FilterOperator::GtEq, "4")).unwrap();
        assert_eq!(p.fragment, "c_seats >= ?");
        assert_eq!(p.params, vec!["4".to_string()]);
        let p = compile_clause(&FilterClause::new("title", FilterOperator::NotLike, "%draft%")).unwrap();
        assert_eq!(p.fragment, "c_title NOT LIKE ?");
    }

    #[test]
    fn in_expands_four_way_per_candidate() {
        let p = compile_clause(&FilterClause::new("tags", FilterOperator::In, "a;b")).unwrap();
        assert_eq!(
            p.fragment,
            "((c_tags = ? OR c_tags LIKE ? OR c_tags LIKE ? OR c_tags LIKE ?) OR \
             (c_tags = ? OR c_tags LIKE ? OR c_tags LIKE ? OR c_tags LIKE ?))"
        );
        assert_eq!(
            p.params,
            vec!["a", "a;%", "%;a;%", "%;a", "b", "b;%", "%;b;%", "%;b"]
        );
    }

    #[test]
    fn in_matches_packed_positions() {
        let p = compile_clause(&FilterClause::new("tags", FilterOperator::In, "a;b")).unwrap();
        for hit in ["a", "a;x", "x;a;y", "x;a", "b", "b;x", "x;b;y", "x;b"] {
            assert!(matches(&p, &stored("c_tags", hit)), "{hit} should match");
        }
        for miss in ["x", "ab", "xa;y", "x;ba", "x;y"] {
            assert!(!matches(&p, &stored("c_tags", miss)), "{miss} should not match");
        }
    }

    #[test]
    fn not_in_negates_the_whole_group() {
        let clause = FilterClause::new("tags", FilterOperator::NotIn, "a;b");
        let p = compile_clause(&clause).unwrap();
        assert!(p.fragment.starts_with("NOT (("));
        let positive = compile_clause(&FilterClause::new("tags", FilterOperator::In, "a;b")).unwrap();
        for value in ["a", "x;b", "x", "ab", "y;z"] {
            let row = stored("c_tags", value);
            assert_eq!(matches(&p, &row), !matches(&positive, &row), "{value}");
        }
    }

    #[test]
    fn in_wildcards_are_literal() {
        let p = compile_clause(&FilterClause::new("code", FilterOperator::In, "a_b")).unwrap();
        assert!(matches(&p, &stored("c_code", "x;a_b")));
        assert!(!matches(&p, &stored("c_code", "x;axb")));
    }

    #[test]
    fn empty_membership_contributes_nothing() {
        assert!(compile_clause(&FilterClause::new("tags", FilterOperator::In, "")).is_none());
        assert!(compile_clause(&FilterClause::new("tags", FilterOperator::NotIn, ";;")).is_none());
        let p = compile_clause(&FilterClause::new("tags", FilterOperator::In, "a;;b;")).unwrap();
        assert_eq!(p.params.len(), 8);
    }

    #[test]
    fn every_clause_contributes_not_just_the_last() {
        let clauses = vec![
            FilterClause::new("status", FilterOperator::Eq, "confirmed"),
            FilterClause::new("archived", FilterOperator::IsNull, ""),
            FilterClause::new("seats", FilterOperator::Gt, "2"),
        ];
        let p = compile_filters(&clauses).unwrap();
        assert_eq!(p.fragment, "(c_status = ? AND c_archived IS NULL AND c_seats > ?)");
        assert_eq!(p.params, vec!["confirmed".to_string(), "2".to_string()]);
    }

    #[test]
    fn joins_use_each_clauses_own_operator() {
        let clauses = vec![
            // first join is ignored
            FilterClause::new("room", FilterOperator::Eq, "A").with_join(JoinOperator::Or),
            FilterClause::new("room", FilterOperator::Eq, "B").with_join(JoinOperator::Or),
            FilterClause::new("status", FilterOperator::Eq, "open").with_join(JoinOperator::And),
        ];
        let p = compile_filters(&clauses).unwrap();
        assert_eq!(p.fragment, "(c_room = ? OR c_room = ? AND c_status = ?)");
        assert_eq!(p.params, vec!["A", "B", "open"]);

        // SQL precedence: A OR (B AND open)
        let row = |room: &str, status: &str| {
            Row::from([
                ("c_room".to_string(), room.to_string()),
                ("c_status".to_string(), status.to_string()),
            ])
        };
        assert!(matches(&p, &row("A", "closed")));
        assert!(matches(&p, &row("B", "open")));
        assert!(!matches(&p, &row("B", "closed")));
    }

    #[test]
    fn skipped_clauses_do_not_leave_dangling_joins() {
        let clauses = vec![
            FilterClause::new("seats", FilterOperator::Lt, ""),
            FilterClause::new("tags", FilterOperator::In, "x").with_join(JoinOperator::Or),
            FilterClause::new("tags", FilterOperator::NotIn, "").with_join(JoinOperator::And),
        ];
        let p = compile_filters(&clauses).unwrap();
        assert_eq!(
            p.fragment,
            "(((c_tags = ? OR c_tags LIKE ? OR c_tags LIKE ? OR c_tags LIKE ?)))"
        );
        assert_eq!(p.params.len(), 4);
    }

    #[test]
    fn no_contributing_clause_means_no_predicate() {
        assert!(compile_filters(&[]).is_none());
        let clauses = vec![FilterClause::new("seats", FilterOperator::Lt, "")];
        assert!(compile_filters(&clauses).is_none());
    }

    #[test]
    fn placeholders_match_params() {
        let clauses = vec![
            FilterClause::new("tags", FilterOperator::NotIn, "a;b;c"),
            FilterClause::new("owner", FilterOperator::Eq, "me").with_join(JoinOperator::Or),
            FilterClause::new("active", FilterOperator::IsTrue, ""),
        ];
        let p = compile_filters(&clauses).unwrap();
        assert_eq!(crate::sql::count_placeholders(&p.fragment), p.params.len());
        assert_eq!(p.params.len(), 13);
    }
}
