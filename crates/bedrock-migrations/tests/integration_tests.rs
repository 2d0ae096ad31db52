//! End-to-end tests for the migration engine over in-memory fakes.
//!
//! `FakeSchema` plays the live database schema: it implements the
//! introspector trait and can replay an operation list the way DDL would
//! change a real schema (a created `SERIAL PRIMARY KEY` column reads back
//! as `INTEGER UNIQUE NOT NULL`). `FakeBackend` records every executed
//! statement and enforces the ledger's unique constraint.

use std::collections::BTreeMap;
use std::sync::Mutex;

use bedrock_core::{BedrockError, BedrockResult};
use bedrock_db::{
    DatabaseBackend, FieldDef, FieldKind, ManyToMany, ModelMeta, ModelRegistry, Row, Value,
};
use bedrock_migrations::{
    Autodetector, Executor, Migration, MigrationRegistry, MigrationWriter, Operation,
    SchemaIntrospector, TableSnapshot, LEDGER_TABLE,
};

// ── Fakes ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeSchema {
    tables: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
    fail: Mutex<bool>,
}

impl FakeSchema {
    fn new() -> Self {
        Self::default()
    }

    fn with_table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        self.tables.lock().unwrap().insert(
            name.to_string(),
            columns
                .iter()
                .map(|(c, d)| ((*c).to_string(), (*d).to_string()))
                .collect(),
        );
        self
    }

    fn set_failing(&self) {
        *self.fail.lock().unwrap() = true;
    }

    /// Replays operations the way the live schema would register them.
    fn apply(&self, operations: &[Operation]) {
        let mut tables = self.tables.lock().unwrap();
        for op in operations {
            match op {
                Operation::CreateTable { name, columns } => {
                    tables.insert(
                        name.clone(),
                        columns
                            .iter()
                            .map(|c| (c.name.clone(), introspected(&c.definition)))
                            .collect(),
                    );
                }
                Operation::AddField {
                    table,
                    column,
                    definition,
                } => {
                    if let Some(cols) = tables.get_mut(table) {
                        cols.insert(column.clone(), introspected(definition));
                    }
                }
                Operation::AlterField {
                    table,
                    column,
                    definition,
                } => {
                    if let Some(cols) = tables.get_mut(table) {
                        cols.insert(column.clone(), introspected(definition));
                    }
                }
                Operation::RemoveField { table, column } => {
                    if let Some(cols) = tables.get_mut(table) {
                        cols.remove(column);
                    }
                }
                Operation::RunSql { .. } => {}
            }
        }
    }
}

/// What a declared definition reads back as after introspection.
fn introspected(definition: &str) -> String {
    if definition == "SERIAL PRIMARY KEY" {
        "INTEGER UNIQUE NOT NULL".to_string()
    } else {
        definition.to_string()
    }
}

#[async_trait::async_trait]
impl SchemaIntrospector for FakeSchema {
    async fn list_tables(&self) -> BedrockResult<Vec<String>> {
        if *self.fail.lock().unwrap() {
            return Err(BedrockError::Introspection("connection refused".into()));
        }
        Ok(self.tables.lock().unwrap().keys().cloned().collect())
    }

    async fn table_snapshot(&self, name: &str) -> BedrockResult<Option<TableSnapshot>> {
        if *self.fail.lock().unwrap() {
            return Err(BedrockError::Introspection("connection refused".into()));
        }
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(name)
            .map(|columns| TableSnapshot::new(name, columns.clone())))
    }
}

#[derive(Default)]
struct FakeBackend {
    executed: Mutex<Vec<String>>,
    ledger: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
}

impl FakeBackend {
    fn new() -> Self {
        Self::default()
    }

    fn fail_on(&self, fragment: &str) {
        *self.fail_on.lock().unwrap() = Some(fragment.to_string());
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Executed statements that are not ledger bookkeeping.
    fn ddl_count(&self) -> usize {
        self.executed()
            .iter()
            .filter(|sql| !sql.contains(LEDGER_TABLE))
            .count()
    }

    fn ledger(&self) -> Vec<String> {
        self.ledger.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DatabaseBackend for FakeBackend {
    fn vendor(&self) -> &str {
        "fake"
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, BedrockError> {
        if let Some(fragment) = self.fail_on.lock().unwrap().as_deref() {
            if sql.contains(fragment) {
                return Err(BedrockError::Database(format!("forced failure: {sql}")));
            }
        }
        self.executed.lock().unwrap().push(sql.to_string());

        if sql.starts_with(&format!("INSERT INTO {LEDGER_TABLE}")) {
            let name = params
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| BedrockError::Database("missing name parameter".into()))?
                .to_string();
            let mut ledger = self.ledger.lock().unwrap();
            if ledger.contains(&name) {
                return Err(BedrockError::Database(
                    "duplicate key value violates unique constraint".into(),
                ));
            }
            ledger.push(name);
        }
        Ok(0)
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>, BedrockError> {
        if sql.contains(LEDGER_TABLE) {
            return Ok(self
                .ledger
                .lock()
                .unwrap()
                .iter()
                .map(|name| {
                    Row::new(vec!["name".to_string()], vec![Value::String(name.clone())])
                })
                .collect());
        }
        Ok(Vec::new())
    }

    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Row, BedrockError> {
        let mut rows = self.query(sql, params).await?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            n => Err(BedrockError::Database(format!("Expected 1 row, got {n}"))),
        }
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────

fn user_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::new("id", FieldKind::Int).primary_key(),
        FieldDef::new("name", FieldKind::Text).max_length(150),
        FieldDef::new("active", FieldKind::Bool),
    ]
}

fn registry_with(models: Vec<ModelMeta>) -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    for model in models {
        registry.register(model);
    }
    registry
}

// ── Change detection ────────────────────────────────────────────────────

#[tokio::test]
async fn new_table_yields_single_create_table() {
    let registry = registry_with(vec![ModelMeta::new("users", user_fields())]);
    let schema = FakeSchema::new();
    let detector = Autodetector::new(&registry, &schema);

    let ops = detector.changes().await.unwrap();
    assert_eq!(ops.len(), 1);
    let Operation::CreateTable { name, columns } = &ops[0] else {
        panic!("Expected CreateTable, got {ops:?}");
    };
    assert_eq!(name, "users");
    assert_eq!(columns.len(), 3);
    let id = columns.iter().find(|c| c.name == "id").unwrap();
    assert_eq!(id.definition, "SERIAL PRIMARY KEY");
}

#[tokio::test]
async fn converged_schema_yields_no_operations() {
    let registry = registry_with(vec![ModelMeta::new("users", user_fields())]);
    let schema = FakeSchema::new().with_table(
        "users",
        &[
            ("id", "INTEGER UNIQUE NOT NULL"),
            ("name", "VARCHAR(150) NOT NULL"),
            ("active", "BOOLEAN NOT NULL"),
        ],
    );
    let detector = Autodetector::new(&registry, &schema);
    assert!(detector.changes().await.unwrap().is_empty());
}

#[tokio::test]
async fn additive_field_yields_single_add_field() {
    let mut fields = user_fields();
    fields.push(FieldDef::new("bio", FieldKind::Text).nullable());
    let registry = registry_with(vec![ModelMeta::new("users", fields)]);
    let schema = FakeSchema::new().with_table(
        "users",
        &[
            ("id", "INTEGER UNIQUE NOT NULL"),
            ("name", "VARCHAR(150) NOT NULL"),
            ("active", "BOOLEAN NOT NULL"),
        ],
    );
    let detector = Autodetector::new(&registry, &schema);

    let ops = detector.changes().await.unwrap();
    assert_eq!(
        ops,
        vec![Operation::AddField {
            table: "users".into(),
            column: "bio".into(),
            definition: "TEXT".into(),
        }]
    );
}

#[tokio::test]
async fn widened_column_yields_single_alter_field() {
    let fields = vec![
        FieldDef::new("id", FieldKind::Int).primary_key(),
        FieldDef::new("name", FieldKind::Text).max_length(254),
    ];
    let registry = registry_with(vec![ModelMeta::new("users", fields)]);
    let schema = FakeSchema::new().with_table(
        "users",
        &[
            ("id", "INTEGER UNIQUE NOT NULL"),
            ("name", "VARCHAR(150) NOT NULL"),
        ],
    );
    let detector = Autodetector::new(&registry, &schema);

    let ops = detector.changes().await.unwrap();
    assert_eq!(
        ops,
        vec![Operation::AlterField {
            table: "users".into(),
            column: "name".into(),
            definition: "VARCHAR(254) NOT NULL".into(),
        }]
    );
}

#[tokio::test]
async fn dropped_field_yields_single_remove_field() {
    let registry = registry_with(vec![ModelMeta::new("users", user_fields())]);
    let schema = FakeSchema::new().with_table(
        "users",
        &[
            ("id", "INTEGER UNIQUE NOT NULL"),
            ("name", "VARCHAR(150) NOT NULL"),
            ("active", "BOOLEAN NOT NULL"),
            ("legacy", "TEXT"),
        ],
    );
    let detector = Autodetector::new(&registry, &schema);

    let ops = detector.changes().await.unwrap();
    assert_eq!(
        ops,
        vec![Operation::RemoveField {
            table: "users".into(),
            column: "legacy".into(),
        }]
    );
}

#[tokio::test]
async fn default_value_drift_yields_alter_field() {
    let fields = vec![FieldDef::new("age", FieldKind::Int).default("20")];
    let registry = registry_with(vec![ModelMeta::new("people", fields)]);
    let schema = FakeSchema::new()
        .with_table("people", &[("age", "INTEGER NOT NULL DEFAULT 18")]);
    let detector = Autodetector::new(&registry, &schema);

    let ops = detector.changes().await.unwrap();
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], Operation::AlterField { column, .. } if column == "age"));
}

#[tokio::test]
async fn default_cast_is_not_drift() {
    let fields = vec![FieldDef::new("status", FieldKind::Text)
        .max_length(20)
        .default("'draft'")];
    let registry = registry_with(vec![ModelMeta::new("posts", fields)]);
    let schema = FakeSchema::new().with_table(
        "posts",
        &[(
            "status",
            "VARCHAR(20) NOT NULL DEFAULT 'draft'::character varying",
        )],
    );
    let detector = Autodetector::new(&registry, &schema);
    assert!(detector.changes().await.unwrap().is_empty());
}

#[tokio::test]
async fn junction_table_planned_once_across_models() {
    let posts = ModelMeta::new(
        "posts",
        vec![
            FieldDef::new("id", FieldKind::Int).primary_key(),
            FieldDef::new("tags", FieldKind::Int).many_to_many(
                ManyToMany::through("taggings")
                    .from_column("post_id")
                    .to_column("tag_id"),
            ),
        ],
    );
    let tags = ModelMeta::new(
        "tags",
        vec![
            FieldDef::new("id", FieldKind::Int).primary_key(),
            FieldDef::new("posts", FieldKind::Int).many_to_many(ManyToMany::through("taggings")),
        ],
    );
    let registry = registry_with(vec![posts, tags]);
    let schema = FakeSchema::new();
    let detector = Autodetector::new(&registry, &schema);

    let ops = detector.changes().await.unwrap();
    let junctions: Vec<_> = ops
        .iter()
        .filter(|op| matches!(op, Operation::CreateTable { name, .. } if name == "taggings"))
        .collect();
    assert_eq!(junctions.len(), 1);
    // posts sorts before tags, so its column overrides win
    let Operation::CreateTable { columns, .. } = junctions[0] else {
        unreachable!();
    };
    assert_eq!(columns[1].name, "post_id");
    assert_eq!(columns[2].name, "tag_id");
}

#[tokio::test]
async fn existing_junction_table_is_not_recreated() {
    let posts = ModelMeta::new(
        "posts",
        vec![
            FieldDef::new("id", FieldKind::Int).primary_key(),
            FieldDef::new("tags", FieldKind::Int).many_to_many(ManyToMany::through("taggings")),
        ],
    );
    let registry = registry_with(vec![posts]);
    let schema = FakeSchema::new()
        .with_table("posts", &[("id", "INTEGER UNIQUE NOT NULL")])
        .with_table(
            "taggings",
            &[
                ("id", "INTEGER UNIQUE NOT NULL"),
                ("from_id", "INTEGER NOT NULL"),
                ("to_id", "INTEGER NOT NULL"),
            ],
        );
    let detector = Autodetector::new(&registry, &schema);
    // The junction table exists but is not a registered model, so only the
    // models' own drift would surface; here there is none.
    assert!(detector.changes().await.unwrap().is_empty());
}

#[tokio::test]
async fn introspection_failure_aborts_detection() {
    let registry = registry_with(vec![ModelMeta::new("users", user_fields())]);
    let schema = FakeSchema::new();
    schema.set_failing();
    let detector = Autodetector::new(&registry, &schema);

    let err = detector.changes().await.unwrap_err();
    assert!(err.is_introspection());
}

#[tokio::test]
async fn applying_detected_changes_converges() {
    let posts = ModelMeta::new(
        "posts",
        vec![
            FieldDef::new("id", FieldKind::Int).primary_key(),
            FieldDef::new("title", FieldKind::Text).max_length(200),
            FieldDef::new("tags", FieldKind::Int).many_to_many(ManyToMany::through("taggings")),
        ],
    );
    let users = ModelMeta::new("users", user_fields());
    let registry = registry_with(vec![posts, users]);
    // Start from a partially drifted schema.
    let schema = FakeSchema::new().with_table(
        "users",
        &[
            ("id", "INTEGER UNIQUE NOT NULL"),
            ("name", "VARCHAR(100) NOT NULL"),
            ("stale", "TEXT"),
        ],
    );

    let detector = Autodetector::new(&registry, &schema);
    let ops = detector.changes().await.unwrap();
    assert!(!ops.is_empty());

    schema.apply(&ops);
    assert!(detector.changes().await.unwrap().is_empty());
}

// ── Execution and the ledger ────────────────────────────────────────────

#[tokio::test]
async fn migrate_applies_in_id_order_and_records() {
    let backend = FakeBackend::new();
    let executor = Executor::new(&backend);

    let later = Migration::new(
        "20240202000000_app",
        "app",
        vec![Operation::RunSql {
            statement: "second".into(),
        }],
    );
    let earlier = Migration::new(
        "20240101000000_app",
        "app",
        vec![Operation::RunSql {
            statement: "first".into(),
        }],
    );

    executor.migrate(vec![later, earlier]).await.unwrap();

    let executed = backend.executed();
    let first = executed.iter().position(|s| s == "first").unwrap();
    let second = executed.iter().position(|s| s == "second").unwrap();
    assert!(first < second);
    assert_eq!(
        backend.ledger(),
        vec!["20240101000000_app", "20240202000000_app"]
    );
}

#[tokio::test]
async fn migrate_twice_is_idempotent() {
    let backend = FakeBackend::new();
    let executor = Executor::new(&backend);
    let migration = Migration::new(
        "20240101000000_app",
        "app",
        vec![Operation::RunSql {
            statement: "CREATE TABLE widgets (id INT)".into(),
        }],
    );

    executor.migrate(vec![migration.clone()]).await.unwrap();
    let ddl_after_first = backend.ddl_count();

    executor.migrate(vec![migration]).await.unwrap();
    assert_eq!(backend.ddl_count(), ddl_after_first);
    assert_eq!(backend.ledger().len(), 1);
}

#[tokio::test]
async fn first_failure_halts_batch_without_recording() {
    let backend = FakeBackend::new();
    backend.fail_on("boom");
    let executor = Executor::new(&backend);

    let ok = Migration::new(
        "20240101000000_app",
        "app",
        vec![Operation::RunSql {
            statement: "fine".into(),
        }],
    );
    let failing = Migration::new(
        "20240102000000_app",
        "app",
        vec![
            Operation::RunSql {
                statement: "also fine".into(),
            },
            Operation::RunSql {
                statement: "boom".into(),
            },
        ],
    );
    let never_reached = Migration::new(
        "20240103000000_app",
        "app",
        vec![Operation::RunSql {
            statement: "unreached".into(),
        }],
    );

    let err = executor
        .migrate(vec![ok, failing, never_reached])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("boom"));

    // The first migration stays recorded; the failing one is not; the
    // statement before the failure stays applied.
    assert_eq!(backend.ledger(), vec!["20240101000000_app"]);
    let executed = backend.executed();
    assert!(executed.iter().any(|s| s == "also fine"));
    assert!(!executed.iter().any(|s| s == "unreached"));
}

#[tokio::test]
async fn setup_is_idempotent() {
    let backend = FakeBackend::new();
    let executor = Executor::new(&backend);
    executor.setup().await.unwrap();
    executor.setup().await.unwrap();
    assert!(backend
        .executed()
        .iter()
        .all(|sql| sql.starts_with("CREATE TABLE IF NOT EXISTS")));
}

// ── Detect, write, replay ───────────────────────────────────────────────

#[tokio::test]
async fn detect_write_and_replay_round_trip() {
    let registry = registry_with(vec![ModelMeta::new("users", user_fields())]);
    let schema = FakeSchema::new();
    let detector = Autodetector::new(&registry, &schema);
    let ops = detector.changes().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut migrations = MigrationRegistry::new();
    let mut writer = MigrationWriter::new(&mut migrations).with_dir(dir.path());
    let id = writer
        .write_with_id("app", "20240101000000_app", ops)
        .unwrap();

    // Reload from disk into a fresh registry and apply.
    let mut reloaded = MigrationRegistry::new();
    reloaded.load_dir(dir.path()).unwrap();
    let backend = FakeBackend::new();
    let executor = Executor::new(&backend);
    executor.migrate(reloaded.all()).await.unwrap();

    assert_eq!(backend.ledger(), vec![id]);
    assert!(backend
        .executed()
        .iter()
        .any(|sql| sql.starts_with("CREATE TABLE IF NOT EXISTS users")));
}
