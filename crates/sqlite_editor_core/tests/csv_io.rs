use sqlite_editor_core::{
    export_csv, import_csv, EditorError, Session, SessionSettings, ValidationError,
};

fn session() -> Session {
    let mut session = Session::new(SessionSettings::default());
    session.open_in_memory().unwrap();
    session
        .connection()
        .unwrap()
        .execute_batch(
            "CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT NOT NULL, year INTEGER);
             INSERT INTO books VALUES (1, 'Dune', 1965);
             INSERT INTO books VALUES (2, 'Solaris, revised', NULL);",
        )
        .unwrap();
    session
}

fn rows(session: &Session) -> Vec<(i64, String, Option<i64>)> {
    let conn = session.connection().unwrap();
    let mut stmt = conn
        .prepare("SELECT id, title, year FROM books ORDER BY id;")
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap();
    rows.collect::<Result<Vec<_>, _>>().unwrap()
}

#[test]
fn export_writes_header_then_rows() {
    let session = session();
    let mut out = Vec::new();
    let written = export_csv(&session, "books", &mut out).unwrap();

    assert_eq!(written, 2);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "id,title,year\n1,Dune,1965\n2,\"Solaris, revised\",\n"
    );
}

#[test]
fn export_then_import_restores_rows() {
    let session = session();
    let before = rows(&session);
    let mut out = Vec::new();
    export_csv(&session, "books", &mut out).unwrap();

    session
        .connection()
        .unwrap()
        .execute("DELETE FROM books;", [])
        .unwrap();
    let imported = import_csv(&session, "books", out.as_slice()).unwrap();

    assert_eq!(imported, 2);
    assert_eq!(rows(&session), before);
}

#[test]
fn header_prefix_is_enough_and_missing_cells_are_null() {
    let session = session();
    let input = "\u{feff} id , title\n3,Hyperion\n4\n";
    let error = import_csv(&session, "books", input.as_bytes()).unwrap_err();

    // Row 4 has no title, which violates NOT NULL; the whole import is undone.
    assert_eq!(error.code(), "constraint");
    assert_eq!(rows(&session).len(), 2);

    let imported = import_csv(&session, "books", "id,title\n3,Hyperion\n".as_bytes()).unwrap();
    assert_eq!(imported, 1);
    assert_eq!(rows(&session)[2], (3, "Hyperion".to_string(), None));
}

#[test]
fn mismatched_header_inserts_nothing() {
    let session = session();
    let err = import_csv(&session, "books", "title,id\nX,9\n".as_bytes()).unwrap_err();

    match err {
        EditorError::Validation(ValidationError::CsvHeaderMismatch { header, columns, .. }) => {
            assert_eq!(header, vec!["title", "id"]);
            assert_eq!(columns, vec!["id", "title", "year"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(rows(&session).len(), 2);
}

#[test]
fn overlong_row_is_rejected() {
    let session = session();
    let err = import_csv(&session, "books", "id,title\n5,Ubik,1969\n".as_bytes()).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Validation(ValidationError::ValueCountMismatch {
            expected: 2,
            actual: 3,
            ..
        })
    ));
    assert_eq!(rows(&session).len(), 2);
}
