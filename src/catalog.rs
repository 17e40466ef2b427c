// Table id -> (DbFile, name, primary key) directory. The one place that
// knows how a table name on disk maps to the heap file backing it;
// everything downstream only ever sees a table_id.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::{DbError, DbResult};
use crate::heap_file::{DbFile, HeapFile};
use crate::tuple::TupleDesc;
use crate::types::Type;

struct TableEntry {
    file: Arc<dyn DbFile + Send + Sync>,
    name: String,
    primary_key: Option<String>,
}

// Table id -> (file, schema, primary key), plus a name -> id index.
// Inserting a table under a name that's already taken evicts the prior
// table's id-keyed entry too: last write wins on a name conflict.
pub struct Catalog {
    by_id: RwLock<HashMap<usize, TableEntry>>,
    name_to_id: RwLock<HashMap<String, usize>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            by_id: RwLock::new(HashMap::new()),
            name_to_id: RwLock::new(HashMap::new()),
        }
    }

    // Installs file under name. If name was already mapped to a different
    // table id, that id's entry is dropped from the id map too.
    pub fn add_table(
        &self,
        file: Arc<dyn DbFile + Send + Sync>,
        name: String,
        primary_key: Option<String>,
    ) {
        let id = file.get_id();
        let mut by_id = self.by_id.write().unwrap();
        let mut name_to_id = self.name_to_id.write().unwrap();
        if let Some(old_id) = name_to_id.insert(name.clone(), id) {
            if old_id != id {
                by_id.remove(&old_id);
            }
        }
        by_id.insert(
            id,
            TableEntry {
                file,
                name,
                primary_key,
            },
        );
    }

    pub fn get_file(&self, table_id: usize) -> DbResult<Arc<dyn DbFile + Send + Sync>> {
        self.by_id
            .read()
            .unwrap()
            .get(&table_id)
            .map(|e| Arc::clone(&e.file))
            .ok_or(DbError::NoSuchTable(table_id.to_string()))
    }

    pub fn get_file_id_by_name(&self, name: &str) -> Option<usize> {
        self.name_to_id.read().unwrap().get(name).copied()
    }

    pub fn get_table_name(&self, table_id: usize) -> DbResult<String> {
        self.by_id
            .read()
            .unwrap()
            .get(&table_id)
            .map(|e| e.name.clone())
            .ok_or(DbError::NoSuchTable(table_id.to_string()))
    }

    pub fn get_primary_key(&self, table_id: usize) -> DbResult<Option<String>> {
        self.by_id
            .read()
            .unwrap()
            .get(&table_id)
            .map(|e| e.primary_key.clone())
            .ok_or(DbError::NoSuchTable(table_id.to_string()))
    }

    pub fn get_tuple_desc(&self, table_id: usize) -> DbResult<TupleDesc> {
        Ok(self.get_file(table_id)?.get_tuple_desc().clone())
    }

    // Every currently-registered table id, in no particular order.
    pub fn table_ids(&self) -> Vec<usize> {
        self.by_id.read().unwrap().keys().copied().collect()
    }

    // Drops every table. Used by tests that want a clean catalog between
    // cases without tearing down the whole Engine.
    pub fn clear(&self) {
        self.by_id.write().unwrap().clear();
        self.name_to_id.write().unwrap().clear();
    }

    // Parses a catalog file and opens/installs every table it names.
    // Grammar, one table per line:
    // name (field_name field_type[ pk], field_name field_type[ pk], ...)
    // field_type is int or string, case-insensitive; a trailing pk
    // annotation marks that field as the table's primary key. Each table's
    // heap file is <name>.dat in the same directory as the catalog file.
    pub fn load_schema(&self, catalog_path: &Path) -> DbResult<()> {
        let dir = catalog_path.parent().unwrap_or_else(|| Path::new("."));
        let file = File::open(catalog_path)?;
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.load_schema_line(dir, line)?;
        }
        Ok(())
    }

    fn load_schema_line(&self, dir: &Path, line: &str) -> DbResult<()> {
        let open_paren = line
            .find('(')
            .ok_or_else(|| DbError::SchemaMismatch(format!("malformed catalog line: {line}")))?;
        let close_paren = line
            .rfind(')')
            .ok_or_else(|| DbError::SchemaMismatch(format!("malformed catalog line: {line}")))?;
        let name = line[..open_paren].trim().to_string();
        let body = &line[open_paren + 1..close_paren];

        let mut types = Vec::new();
        let mut names = Vec::new();
        let mut primary_key = None;
        for field in body.split(',') {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            let tokens: Vec<&str> = field.split_whitespace().collect();
            let (field_name, type_token) = match tokens.as_slice() {
                [n, t] | [n, t, _] => (*n, *t),
                _ => {
                    return Err(DbError::SchemaMismatch(format!(
                        "malformed field spec: {field}"
                    )))
                }
            };
            let ty = match type_token.to_ascii_lowercase().as_str() {
                "int" => Type::IntType,
                "string" => Type::StringType,
                other => {
                    return Err(DbError::SchemaMismatch(format!(
                        "unknown field type: {other}"
                    )))
                }
            };
            if tokens.len() == 3 && tokens[2].eq_ignore_ascii_case("pk") {
                primary_key = Some(field_name.to_string());
            }
            names.push(field_name.to_string());
            types.push(ty);
        }

        let td = TupleDesc::new(types, names);
        let path = dir.join(format!("{name}.dat"));
        let heap_file = HeapFile::open(&path, td)?;
        self.add_table(Arc::new(heap_file), name, primary_key);
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
