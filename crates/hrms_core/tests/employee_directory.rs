use hrms_core::db::migrations::latest_version;
use hrms_core::db::open_db_in_memory;
use hrms_core::{
    EmployeeChanges, EmployeeField, EmployeeListQuery, EmployeeOrderField, EmployeeRepository,
    EmployeeService, EmployeeServiceError, EmployeeValidationError, IdentifierKind, NewEmployee,
    RepoError, SortDirection, SqliteEmployeeRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn service(conn: &Connection) -> EmployeeService<SqliteEmployeeRepository<'_>> {
    EmployeeService::new(SqliteEmployeeRepository::try_new(conn).unwrap())
}

fn new_employee(code: &str, name: &str, email: &str) -> NewEmployee {
    NewEmployee::new(code, name, email, "Engineering")
}

#[test]
fn register_trims_fields_and_lowercases_email() {
    let conn = open_db_in_memory().unwrap();
    let directory = service(&conn);

    let created = directory
        .register(&NewEmployee::new(
            "  EMP-001 ",
            " Grace Hopper ",
            "  Grace.Hopper@Navy.MIL ",
            " Compilers ",
        ))
        .unwrap();

    assert_eq!(created.employee_code, "EMP-001");
    assert_eq!(created.full_name, "Grace Hopper");
    assert_eq!(created.email, "grace.hopper@navy.mil");
    assert_eq!(created.department, "Compilers");
    assert!(created.created_at > 0);

    let loaded = directory.lookup(created.id).unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn register_rejects_duplicate_code_after_trimming() {
    let conn = open_db_in_memory().unwrap();
    let directory = service(&conn);
    directory
        .register(&new_employee("EMP-001", "Ada", "ada@example.com"))
        .unwrap();

    let err = directory
        .register(&new_employee(" EMP-001  ", "Other", "other@example.com"))
        .unwrap_err();
    assert!(matches!(
        err,
        EmployeeServiceError::DuplicateIdentifier(IdentifierKind::Code)
    ));
}

#[test]
fn register_rejects_duplicate_email_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let directory = service(&conn);
    directory
        .register(&new_employee("EMP-001", "Ada", "ada@example.com"))
        .unwrap();

    let err = directory
        .register(&new_employee("EMP-002", "Ada Two", "  ADA@Example.com"))
        .unwrap_err();
    assert!(matches!(
        err,
        EmployeeServiceError::DuplicateIdentifier(IdentifierKind::Email)
    ));
}

#[test]
fn register_rejects_blank_and_malformed_fields_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let directory = service(&conn);

    let blank = directory
        .register(&NewEmployee::new("EMP-001", "Ada", "ada@example.com", "   "))
        .unwrap_err();
    assert!(matches!(
        blank,
        EmployeeServiceError::Validation(EmployeeValidationError::EmptyField(
            EmployeeField::Department
        ))
    ));

    let malformed = directory
        .register(&new_employee("EMP-001", "Ada", "ada-at-example"))
        .unwrap_err();
    assert!(matches!(
        malformed,
        EmployeeServiceError::Validation(EmployeeValidationError::InvalidEmail(_))
    ));

    assert!(directory
        .list(&EmployeeListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn storage_uniqueness_backstops_repository_writes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEmployeeRepository::try_new(&conn).unwrap();
    repo.create_employee(&new_employee("EMP-001", "Ada", "ada@example.com"))
        .unwrap();

    let code_err = repo
        .create_employee(&new_employee("EMP-001", "Bob", "bob@example.com"))
        .unwrap_err();
    assert!(matches!(
        code_err,
        RepoError::DuplicateIdentifier(IdentifierKind::Code)
    ));

    let email_err = repo
        .create_employee(&new_employee("EMP-002", "Bob", "ADA@example.com"))
        .unwrap_err();
    assert!(matches!(
        email_err,
        RepoError::DuplicateIdentifier(IdentifierKind::Email)
    ));
}

#[test]
fn lookup_unknown_employee_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let missing = Uuid::new_v4();

    let err = service(&conn).lookup(missing).unwrap_err();
    assert!(matches!(err, EmployeeServiceError::NotFound(id) if id == missing));
}

#[test]
fn list_orders_by_requested_field_and_direction() {
    let conn = open_db_in_memory().unwrap();
    let directory = service(&conn);
    let charlie = directory
        .register(&new_employee("EMP-003", "Charlie", "charlie@example.com"))
        .unwrap();
    let alice = directory
        .register(&new_employee("EMP-002", "Alice", "alice@example.com"))
        .unwrap();
    let bob = directory
        .register(&new_employee("EMP-001", "Bob", "bob@example.com"))
        .unwrap();

    let by_name = directory
        .list(&EmployeeListQuery::from_params("full_name", "asc"))
        .unwrap();
    let names: Vec<_> = by_name.iter().map(|e| e.full_name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);

    let by_code_desc = directory
        .list(&EmployeeListQuery {
            order_by: EmployeeOrderField::EmployeeCode,
            direction: SortDirection::Desc,
        })
        .unwrap();
    let ids: Vec<_> = by_code_desc.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![charlie.id, alice.id, bob.id]);
}

#[test]
fn default_list_is_newest_first_for_back_to_back_registrations() {
    let conn = open_db_in_memory().unwrap();
    let directory = service(&conn);
    let registered: Vec<_> = (1..=10)
        .map(|n| {
            directory
                .register(&new_employee(
                    &format!("EMP-{n:03}"),
                    &format!("Employee {n}"),
                    &format!("employee{n}@example.com"),
                ))
                .unwrap()
        })
        .collect();
    assert!(registered
        .windows(2)
        .all(|pair| pair[0].created_at <= pair[1].created_at));

    let oldest_first: Vec<_> = registered.iter().map(|e| e.id).collect();
    let newest_first: Vec<_> = oldest_first.iter().rev().copied().collect();

    let default_ids: Vec<_> = directory
        .list(&EmployeeListQuery::default())
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(default_ids, newest_first);

    let ascending_ids: Vec<_> = directory
        .list(&EmployeeListQuery::from_params("created_at", "asc"))
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ascending_ids, oldest_first);
}

#[test]
fn list_with_unknown_field_falls_back_to_created_at() {
    let conn = open_db_in_memory().unwrap();
    let directory = service(&conn);
    let first = directory
        .register(&new_employee("EMP-001", "Zed", "zed@example.com"))
        .unwrap();
    let second = directory
        .register(&new_employee("EMP-002", "Amy", "amy@example.com"))
        .unwrap();

    let fallback = directory
        .list(&EmployeeListQuery::from_params("salary", "desc"))
        .unwrap();
    assert_eq!(fallback[0].id, second.id);
    assert_eq!(fallback[1].id, first.id);

    let ascending = directory
        .list(&EmployeeListQuery::from_params("not_a_column", "ASC"))
        .unwrap();
    assert_eq!(ascending[0].id, first.id);
    assert_eq!(ascending[1].id, second.id);
}

#[test]
fn update_applies_normalized_changes_and_checks_conflicts() {
    let conn = open_db_in_memory().unwrap();
    let directory = service(&conn);
    let ada = directory
        .register(&new_employee("EMP-001", "Ada", "ada@example.com"))
        .unwrap();
    directory
        .register(&new_employee("EMP-002", "Bob", "bob@example.com"))
        .unwrap();

    let updated = directory
        .update(
            ada.id,
            &EmployeeChanges {
                full_name: Some(" Ada Lovelace ".to_string()),
                email: Some("ADA@example.com".to_string()),
                ..EmployeeChanges::default()
            },
        )
        .unwrap();
    assert_eq!(updated.full_name, "Ada Lovelace");
    assert_eq!(updated.email, "ada@example.com");
    assert_eq!(updated.employee_code, "EMP-001");
    assert_eq!(updated.created_at, ada.created_at);
    assert!(updated.updated_at > ada.updated_at);

    let err = directory
        .update(
            ada.id,
            &EmployeeChanges {
                employee_code: Some("EMP-002".to_string()),
                ..EmployeeChanges::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EmployeeServiceError::DuplicateIdentifier(IdentifierKind::Code)
    ));

    let missing = directory
        .update(Uuid::new_v4(), &EmployeeChanges::default())
        .unwrap_err();
    assert!(matches!(missing, EmployeeServiceError::NotFound(_)));
}

#[test]
fn remove_unknown_employee_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let err = service(&conn).remove(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, EmployeeServiceError::NotFound(_)));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteEmployeeRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_employees_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteEmployeeRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("employees"))
    ));
}
