use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};
use rustic_db::engine::Engine;
use rustic_db::error::DbResult;
use rustic_db::operator::Operator;
use rustic_db::seq_scan::SeqScan;
use rustic_db::transaction::TransactionId;

/// Loads a catalog file and dumps every row of the named table (or every
/// table, if none is named) through a plain `SeqScan`.
fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let catalog_path = match args.next() {
        Some(p) => PathBuf::from(p),
        None => {
            eprintln!("usage: rustic_db <catalog-file> [table-name]");
            return ExitCode::FAILURE;
        }
    };
    let table_filter = args.next();

    match run(&catalog_path, table_filter.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(catalog_path: &std::path::Path, table_filter: Option<&str>) -> DbResult<()> {
    let engine = Engine::new();
    engine.load_schema(catalog_path)?;
    info!("loaded catalog from {}", catalog_path.display());

    let tid = TransactionId::new();
    for table_id in engine.catalog().table_ids() {
        let name = engine.catalog().get_table_name(table_id)?;
        if let Some(filter) = table_filter {
            if name != filter {
                continue;
            }
        }

        println!("== {name} ==");
        let mut scan = SeqScan::new(tid, table_id, &name, engine.catalog().clone(), engine.buffer_pool())?;
        scan.open()?;
        while scan.has_next()? {
            let tuple = scan.next()?;
            println!("{tuple}");
        }
        scan.close();
    }
    Ok(())
}
