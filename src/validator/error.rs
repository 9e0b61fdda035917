use crate::model::DateField;
use crate::sql::SqlError;

/// Field-level validation failures. These never abort the hosting pipeline;
/// each becomes an error message on the validated field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MandatoryMissing,
    DateParseFailure(DateField),
    DuplicateConflict(u64),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MandatoryMissing => write!(f, "mandatory value missing"),
            ValidationError::DateParseFailure(field) => {
                write!(f, "could not parse {field} date")
            }
            ValidationError::DuplicateConflict(count) => {
                write!(f, "{count} overlapping record(s)")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug)]
pub enum RegistryError {
    UnknownForm(String),
    Unavailable(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::UnknownForm(id) => write!(f, "no table registered for form: {id}"),
            RegistryError::Unavailable(e) => write!(f, "schema registry unavailable: {e}"),
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Debug)]
pub enum StoreError {
    Sql(SqlError),
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sql(e) => write!(f, "count query failed: {e}"),
            StoreError::Unavailable(e) => write!(f, "store unavailable: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sql(e) => Some(e),
            StoreError::Unavailable(_) => None,
        }
    }
}

impl From<SqlError> for StoreError {
    fn from(e: SqlError) -> Self {
        StoreError::Sql(e)
    }
}

/// Hard failures from collaborators. Propagated to the caller as-is.
#[derive(Debug)]
pub enum ValidatorError {
    Registry(RegistryError),
    Store(StoreError),
}

impl std::fmt::Display for ValidatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidatorError::Registry(e) => write!(f, "table resolution failed: {e}"),
            ValidatorError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ValidatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidatorError::Registry(e) => Some(e),
            ValidatorError::Store(e) => Some(e),
        }
    }
}

impl From<RegistryError> for ValidatorError {
    fn from(e: RegistryError) -> Self {
        ValidatorError::Registry(e)
    }
}

impl From<StoreError> for ValidatorError {
    fn from(e: StoreError) -> Self {
        ValidatorError::Store(e)
    }
}
