use sqlite_editor_core::{
    ApplyWarning, ColumnType, EditorError, FieldDescriptor, ForeignKeyRef, MigrationPath,
    RetryPolicy, SchemaEditSession, SchemaMigrator, Session, SessionSettings, TableDescriptor,
    TypeKind, ValidationError,
};

fn session() -> Session {
    let mut session = Session::new(SessionSettings::default());
    session.open_in_memory().unwrap();
    session
}

fn employees() -> TableDescriptor {
    TableDescriptor::from_fields(vec![
        FieldDescriptor::new("EmpID", TypeKind::Integer).auto_increment(),
        FieldDescriptor::new("Name", TypeKind::Text).not_null(),
    ])
}

fn seed_employees(session: &Session) {
    SchemaMigrator::new(session)
        .unwrap()
        .apply_changes("Employees", &employees())
        .unwrap();
    session
        .connection()
        .unwrap()
        .execute_batch(
            "INSERT INTO Employees (Name) VALUES ('Ada');
             INSERT INTO Employees (Name) VALUES ('Grace');
             INSERT INTO Employees (Name) VALUES ('Linus');",
        )
        .unwrap();
}

fn names(session: &Session, table: &str) -> Vec<(i64, Option<String>)> {
    let conn = session.connection().unwrap();
    let mut stmt = conn
        .prepare(&format!("SELECT rowid, Name FROM \"{table}\" ORDER BY rowid;"))
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap();
    rows.collect::<Result<Vec<_>, _>>().unwrap()
}

fn expected_names() -> Vec<(i64, Option<String>)> {
    vec![
        (1, Some("Ada".to_string())),
        (2, Some("Grace".to_string())),
        (3, Some("Linus".to_string())),
    ]
}

fn foreign_keys_enabled(session: &Session) -> bool {
    session
        .connection()
        .unwrap()
        .query_row("PRAGMA foreign_keys;", [], |row| row.get::<_, i64>(0))
        .unwrap()
        == 1
}

#[test]
fn absent_table_is_created() {
    let session = session();
    let outcome = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &employees())
        .unwrap();

    assert_eq!(outcome.path, MigrationPath::Created);
    assert_eq!(outcome.added, vec!["EmpID", "Name"]);
    assert!(session
        .catalog()
        .unwrap()
        .table_exists("Employees")
        .unwrap());
}

#[test]
fn applying_the_loaded_descriptor_is_a_no_op() {
    let session = session();
    seed_employees(&session);

    let loaded = session
        .catalog()
        .unwrap()
        .load_table_descriptor("Employees")
        .unwrap();
    let outcome = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &loaded)
        .unwrap();
    assert_eq!(outcome.path, MigrationPath::Unchanged);
}

#[test]
fn type_change_rebuilds_and_keeps_rows() {
    let session = session();
    seed_employees(&session);

    let mut desired = employees();
    desired
        .modify_field(
            "Name",
            FieldDescriptor::new("Name", ColumnType::with_length(TypeKind::Varchar, 50)).not_null(),
        )
        .unwrap();
    let outcome = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();

    assert_eq!(outcome.path, MigrationPath::Rebuilt);
    assert_eq!(outcome.modified, vec!["Name"]);
    assert_eq!(outcome.rows_copied, 3);
    assert!(outcome.warnings.is_empty());
    assert_eq!(names(&session, "Employees"), expected_names());

    let catalog = session.catalog().unwrap();
    let info = catalog.table_info("Employees").unwrap();
    assert_eq!(info.column("Name").unwrap().declared_type, "VARCHAR(50)");
    assert!(!catalog.table_exists("Employees_temp").unwrap());
    assert!(foreign_keys_enabled(&session));

    let reloaded = catalog.load_table_descriptor("Employees").unwrap();
    assert!(reloaded.field("EmpID").unwrap().auto_increment);
}

#[test]
fn added_column_without_default_relaxes_not_null() {
    let session = session();
    seed_employees(&session);

    let mut desired = employees();
    desired
        .add_field(FieldDescriptor::new("Age", TypeKind::Integer).not_null())
        .unwrap();
    let outcome = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();

    assert_eq!(outcome.path, MigrationPath::Additive);
    assert_eq!(
        outcome.warnings,
        vec![ApplyWarning::NotNullRelaxed {
            field: "Age".to_string()
        }]
    );
    assert_eq!(names(&session, "Employees"), expected_names());

    let info = session.catalog().unwrap().table_info("Employees").unwrap();
    let age = info.column("Age").unwrap();
    assert!(!age.not_null);
    assert_eq!(age.declared_type, "INTEGER");
}

#[test]
fn added_column_with_default_keeps_not_null() {
    let session = session();
    seed_employees(&session);

    let mut desired = employees();
    desired
        .add_field(
            FieldDescriptor::new("Active", TypeKind::Boolean)
                .not_null()
                .default_value("1"),
        )
        .unwrap();
    let outcome = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();

    assert_eq!(outcome.path, MigrationPath::Additive);
    assert!(outcome.warnings.is_empty());

    let active: Vec<i64> = {
        let conn = session.connection().unwrap();
        let mut stmt = conn.prepare("SELECT Active FROM Employees;").unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap();
        rows.collect::<Result<Vec<_>, _>>().unwrap()
    };
    assert_eq!(active, vec![1, 1, 1]);
}

#[test]
fn added_unique_column_goes_through_rebuild() {
    let session = session();
    seed_employees(&session);

    let mut desired = employees();
    desired
        .add_field(FieldDescriptor::new("Email", TypeKind::Text).unique())
        .unwrap();
    let outcome = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();

    assert_eq!(outcome.path, MigrationPath::Rebuilt);
    assert_eq!(outcome.added, vec!["Email"]);
    assert_eq!(
        session
            .catalog()
            .unwrap()
            .unique_columns("Employees")
            .unwrap(),
        vec!["Email"]
    );
}

#[test]
fn removed_column_is_dropped_and_other_data_kept() {
    let session = session();
    seed_employees(&session);

    let mut desired = employees();
    desired
        .add_field(FieldDescriptor::new("Nick", TypeKind::Text))
        .unwrap();
    SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();

    desired.remove_field("Nick").unwrap();
    let outcome = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();

    assert_eq!(outcome.path, MigrationPath::Rebuilt);
    assert_eq!(outcome.removed, vec!["Nick"]);
    assert_eq!(names(&session, "Employees"), expected_names());
    assert_eq!(
        session
            .catalog()
            .unwrap()
            .table_info("Employees")
            .unwrap()
            .column_names(),
        vec!["EmpID", "Name"]
    );
}

#[test]
fn rebuild_leaves_new_defaulted_columns_null() {
    let session = session();
    seed_employees(&session);

    let mut desired = employees();
    desired
        .modify_field(
            "Name",
            FieldDescriptor::new("Name", ColumnType::with_length(TypeKind::Varchar, 20)).not_null(),
        )
        .unwrap();
    desired
        .add_field(FieldDescriptor::new("Status", TypeKind::Text).default_value("'new'"))
        .unwrap();
    let outcome = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();
    assert_eq!(outcome.path, MigrationPath::Rebuilt);
    assert_eq!(names(&session, "Employees"), expected_names());

    let conn = session.connection().unwrap();
    let statuses: Vec<Option<String>> = {
        let mut stmt = conn
            .prepare("SELECT Status FROM Employees ORDER BY rowid;")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap();
        rows.collect::<Result<Vec<_>, _>>().unwrap()
    };
    assert_eq!(statuses, vec![None, None, None]);

    // The default still applies to rows inserted afterwards.
    conn.execute("INSERT INTO Employees (Name) VALUES ('Barbara');", [])
        .unwrap();
    let fresh: String = conn
        .query_row(
            "SELECT Status FROM Employees WHERE Name = 'Barbara';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(fresh, "new");
}

#[test]
fn constraint_violation_rolls_back_the_rebuild() {
    let session = session();
    seed_employees(&session);
    let mut desired = employees();
    desired
        .add_field(FieldDescriptor::new("Email", TypeKind::Text))
        .unwrap();
    SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();
    let before = session.catalog().unwrap().table_sql("Employees").unwrap();

    desired
        .modify_field(
            "Email",
            FieldDescriptor::new("Email", TypeKind::Text).not_null(),
        )
        .unwrap();
    let err = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap_err();

    assert_eq!(err.code(), "constraint");
    assert!(err.to_string().contains("Employees"));
    let catalog = session.catalog().unwrap();
    assert_eq!(catalog.table_sql("Employees").unwrap(), before);
    assert_eq!(catalog.row_count("Employees").unwrap(), 3);
    assert_eq!(names(&session, "Employees"), expected_names());
    assert!(!catalog.table_exists("Employees_temp").unwrap());
    assert!(foreign_keys_enabled(&session));
}

#[test]
fn rebuild_rejects_dangling_foreign_keys() {
    let session = session();
    session
        .connection()
        .unwrap()
        .execute_batch(
            "CREATE TABLE Departments (DeptID INTEGER PRIMARY KEY, Title TEXT);
             INSERT INTO Departments (DeptID, Title) VALUES (1, 'Ops');
             CREATE TABLE Staff (ID INTEGER PRIMARY KEY, Dept INTEGER);
             INSERT INTO Staff (ID, Dept) VALUES (1, 1);
             INSERT INTO Staff (ID, Dept) VALUES (2, 99);",
        )
        .unwrap();

    let mut desired = session
        .catalog()
        .unwrap()
        .load_table_descriptor("Staff")
        .unwrap();
    desired
        .modify_field(
            "Dept",
            FieldDescriptor::new("Dept", TypeKind::Integer)
                .references(ForeignKeyRef::new("Departments", "DeptID")),
        )
        .unwrap();
    let err = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Staff", &desired)
        .unwrap_err();

    assert_eq!(err.code(), "constraint");
    let info = session.catalog().unwrap().table_info("Staff").unwrap();
    assert!(info.foreign_keys.is_empty());
    assert!(foreign_keys_enabled(&session));
}

#[test]
fn no_shared_columns_keeps_row_count_only() {
    let session = session();
    seed_employees(&session);

    let desired = TableDescriptor::from_fields(vec![
        FieldDescriptor::new("Key", TypeKind::Integer).auto_increment(),
        FieldDescriptor::new("Label", TypeKind::Text).default_value("'unset'"),
    ]);
    let outcome = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();

    assert_eq!(outcome.path, MigrationPath::Rebuilt);
    assert_eq!(outcome.removed, vec!["EmpID", "Name"]);
    assert_eq!(
        outcome.warnings,
        vec![ApplyWarning::RowsReplacedWithNulls { rows: 3 }]
    );
    assert_eq!(
        session
            .catalog()
            .unwrap()
            .row_count("Employees")
            .unwrap(),
        3
    );
    let labels: Vec<Option<String>> = {
        let conn = session.connection().unwrap();
        let mut stmt = conn.prepare("SELECT Label FROM Employees;").unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap();
        rows.collect::<Result<Vec<_>, _>>().unwrap()
    };
    assert_eq!(labels, vec![None, None, None]);
}

#[test]
fn leftover_temp_table_blocks_rebuild() {
    let session = session();
    seed_employees(&session);
    session
        .connection()
        .unwrap()
        .execute_batch("CREATE TABLE Employees_temp (x INTEGER);")
        .unwrap();

    let mut desired = employees();
    desired.remove_field("Name").unwrap();
    let err = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap_err();

    assert!(matches!(
        err,
        EditorError::Validation(ValidationError::TempTableExists { .. })
    ));
    assert_eq!(names(&session, "Employees"), expected_names());
}

#[test]
fn invalid_descriptors_never_reach_the_engine() {
    let session = session();
    let migrator = SchemaMigrator::new(&session).unwrap();

    let empty_name = migrator.apply_changes("", &employees()).unwrap_err();
    assert!(matches!(
        empty_name,
        EditorError::Validation(ValidationError::EmptyTableName)
    ));

    let duplicate = TableDescriptor::from_fields(vec![
        FieldDescriptor::new("a", TypeKind::Integer),
        FieldDescriptor::new("a", TypeKind::Text),
    ]);
    let err = migrator.apply_changes("t", &duplicate).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Validation(ValidationError::DuplicateFieldName(_))
    ));

    let no_fields = migrator.apply_changes("t", &TableDescriptor::new()).unwrap_err();
    assert!(matches!(
        no_fields,
        EditorError::Validation(ValidationError::NoFields(_))
    ));

    assert!(session.catalog().unwrap().tables().unwrap().is_empty());
}

#[test]
fn edit_session_applies_and_resets_dirty_state() {
    let session = session();
    seed_employees(&session);

    let mut edit = SchemaEditSession::load(&session.catalog().unwrap(), "Employees").unwrap();
    assert!(!edit.has_unsaved_changes());
    edit.add_field(FieldDescriptor::new("Title", TypeKind::Text))
        .unwrap();
    assert!(edit.has_unsaved_changes());
    assert_eq!(edit.plan(&session).unwrap().path, MigrationPath::Additive);

    let outcome = edit.apply(&session).unwrap();
    assert_eq!(outcome.added, vec!["Title"]);
    assert!(!edit.has_unsaved_changes());
}

#[test]
fn locked_database_surfaces_busy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");

    let mut holder = Session::new(SessionSettings::default());
    holder.open(&path).unwrap();
    seed_employees(&holder);

    let mut settings = SessionSettings::default();
    settings.busy_timeout_ms = 50;
    settings.retry = RetryPolicy::never();
    let mut contender = Session::new(settings);
    contender.open(&path).unwrap();

    holder
        .connection()
        .unwrap()
        .execute_batch("BEGIN IMMEDIATE;")
        .unwrap();

    let mut desired = employees();
    desired
        .add_field(FieldDescriptor::new("Age", TypeKind::Integer))
        .unwrap();
    let err = SchemaMigrator::new(&contender)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("Employees"));

    holder
        .connection()
        .unwrap()
        .execute_batch("ROLLBACK;")
        .unwrap();
    let outcome = SchemaMigrator::new(&contender)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();
    assert_eq!(outcome.path, MigrationPath::Additive);
}

#[test]
fn json_descriptor_applies_like_a_built_one() {
    let session = session();
    let desired: TableDescriptor = serde_json::from_value(serde_json::json!([
        {"name": "EmpID", "type": "INTEGER", "primary_key": true, "auto_increment": true},
        {"name": "Name", "type": "varchar(50)", "not_null": true},
        {"name": "Dept", "type": "INTEGER",
         "foreign_key": {"target_table": "Departments", "target_column": "DeptID",
                         "on_delete": "SET NULL"}}
    ]))
    .unwrap();

    assert_eq!(
        desired.field("Name").unwrap().field_type,
        ColumnType::with_length(TypeKind::Varchar, 50)
    );
    let sql = SchemaMigrator::new(&session)
        .unwrap()
        .plan("Employees", &desired)
        .unwrap()
        .create_sql;
    assert!(sql.contains("\t\"Name\"\tVARCHAR(50) NOT NULL"));
    assert!(sql.contains(
        "FOREIGN KEY(\"Dept\") REFERENCES \"Departments\"(\"DeptID\") ON DELETE SET NULL"
    ));

    let outcome = SchemaMigrator::new(&session)
        .unwrap()
        .apply_changes("Employees", &desired)
        .unwrap();
    assert_eq!(outcome.path, MigrationPath::Created);
    assert_eq!(
        serde_json::to_value(&outcome.path).unwrap(),
        serde_json::json!("created")
    );
}
