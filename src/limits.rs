/// Maximum number of filter clauses in one validator configuration.
pub const MAX_FILTER_CLAUSES: usize = 64;

/// Maximum number of `;`-separated candidates in one IN / NOT IN clause.
pub const MAX_IN_CANDIDATES: usize = 256;

/// Maximum length of a field id (it ends up inside the predicate text).
pub const MAX_FIELD_ID_LEN: usize = 128;

/// Maximum length of the raw extra condition fragment.
pub const MAX_EXTRA_CONDITION_LEN: usize = 4096;

/// Maximum length of a date pattern.
pub const MAX_DATE_PATTERN_LEN: usize = 64;
