use std::io::Read;
use std::sync::Arc;

use tracing::info;

use overlapguard::ValidatorConfig;
use overlapguard::record::FormRecord;
use overlapguard::registry::{CachedRegistry, DEFAULT_TABLE_PREFIX, StaticRegistry};
use overlapguard::store::{InMemoryStore, TableSnapshot};
use overlapguard::validator::{OverlapValidator, RecordReader};

/// Dry run: validate one record against a snapshot of existing rows.
///
/// Exits with status 1 when the record fails validation.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("OVERLAPGUARD_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    overlapguard::observability::init(metrics_port)?;

    let config_path = std::env::var("OVERLAPGUARD_CONFIG")
        .map_err(|_| "OVERLAPGUARD_CONFIG must point at a validator config file")?;
    let prefix =
        std::env::var("OVERLAPGUARD_TABLE_PREFIX").unwrap_or_else(|_| DEFAULT_TABLE_PREFIX.into());

    let config = ValidatorConfig::from_file(&config_path)?;
    let field = std::env::var("OVERLAPGUARD_FIELD").unwrap_or_else(|_| config.start_date.clone());

    let store = Arc::new(InMemoryStore::new());
    if let Ok(rows_path) = std::env::var("OVERLAPGUARD_ROWS") {
        let snapshots: Vec<TableSnapshot> =
            serde_json::from_str(&std::fs::read_to_string(&rows_path)?)?;
        for snapshot in snapshots {
            let table = snapshot.table.clone();
            let n = store.load_snapshot(snapshot);
            info!("loaded {n} rows into {table}");
        }
    }

    let record_json = match std::env::var("OVERLAPGUARD_RECORD") {
        Ok(path) => std::fs::read_to_string(path)?,
        Err(_) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let mut record: FormRecord = serde_json::from_str(&record_json)?;

    let registry = CachedRegistry::new(StaticRegistry::new().with_fallback_prefix(prefix));
    let validator = OverlapValidator::new(config, Arc::new(registry), store);

    // The element's submitted values are the two interval bounds.
    let cfg = validator.config();
    let values: Vec<String> = [&cfg.start_date, &cfg.end_date]
        .into_iter()
        .map(|f| record.value(f).unwrap_or_default().to_string())
        .collect();
    let values: Vec<&str> = values.iter().map(String::as_str).collect();

    info!("validating form {} ({config_path})", record.form_id);
    if validator.validate(&field, &mut record, &values).await? {
        println!("pass");
        return Ok(());
    }
    for message in record.errors(&field) {
        println!("fail: {message}");
    }
    std::process::exit(1);
}
