#![cfg(feature = "test-utils")]

use catalog_db::prelude::*;
use catalog_db::test_utils::FakeCatalogServer;

fn catalog(server: &FakeCatalogServer) -> CatalogDb {
    CatalogDb::new(ConnectionHandle::from_driver(server.clone()))
}

fn titles(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.get("titulo").and_then(RowValues::as_text).map(str::to_owned))
        .collect()
}

#[tokio::test]
async fn insert_list_delete_round_trip() -> Result<(), CatalogDbError> {
    let server = FakeCatalogServer::new();
    let db = catalog(&server);

    let inserted = db.insert_book(&NewBook::new("Foo", "Bar").stock(5)).await?;
    assert!(inserted.success);
    assert_eq!(inserted.message, "Book inserted successfully");
    assert_eq!(inserted.rows_affected, 1);

    let books = db.list_books_typed().await?;
    let foo = books
        .iter()
        .find(|b| b.title == "Foo" && b.author == "Bar")
        .ok_or_else(|| CatalogDbError::NotFound("Foo".into()))?;
    assert_eq!(foo.stock, Some(5));
    assert_eq!(foo.publisher, None);

    let deleted = db.delete_book(i32::try_from(foo.id).unwrap_or(i32::MAX)).await?;
    assert_eq!(deleted.rows_affected, 1);
    assert_eq!(deleted.message, "Book deleted successfully");

    let rows = db.list_books().await?;
    assert!(!titles(&rows).contains(&"Foo".to_string()));
    // Soft delete keeps the row.
    assert_eq!(server.state().lock().map(|s| s.book_count()).unwrap_or(0), 1);
    Ok(())
}

#[tokio::test]
async fn listing_is_sorted_by_title() -> Result<(), CatalogDbError> {
    let server = FakeCatalogServer::new();
    let db = catalog(&server);
    for title in ["Moby Dick", "Dune", "Emma"] {
        db.insert_book(&NewBook::new(title, "Someone")).await?;
    }

    let rows = db.list_books().await?;
    assert_eq!(titles(&rows), ["Dune", "Emma", "Moby Dick"]);
    assert_eq!(rows[0].len(), 9);
    Ok(())
}

#[tokio::test]
async fn empty_catalog_lists_nothing() -> Result<(), CatalogDbError> {
    let db = catalog(&FakeCatalogServer::new());
    assert!(db.list_books().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_constraint_violation() -> Result<(), CatalogDbError> {
    let db = catalog(&FakeCatalogServer::new());
    let user = NewUser {
        names: "Ana".into(),
        surname: "Lopez".into(),
        phone: 18_095_551_234,
        email: "ana@example.com".into(),
        password: "pw".into(),
    };

    let created = db.insert_user(&user).await?;
    assert_eq!(created.rows_affected, 1);
    assert_eq!(created.message, "User created successfully");

    let err = db.insert_user(&user).await.unwrap_err();
    assert!(err.is_constraint_violation());
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert!(err.to_string().contains("UNIQUE KEY"));
    Ok(())
}

#[tokio::test]
async fn duplicate_isbn_is_rejected_on_insert_and_update() -> Result<(), CatalogDbError> {
    let db = catalog(&FakeCatalogServer::new());
    db.insert_book(&NewBook::new("One", "A").isbn("978-1")).await?;
    db.insert_book(&NewBook::new("Two", "B").isbn("978-2")).await?;

    let err = db
        .insert_book(&NewBook::new("Three", "C").isbn("978-1"))
        .await
        .unwrap_err();
    assert!(err.is_constraint_violation());

    let err = db
        .update_book(2, &NewBook::new("Two", "B").isbn("978-1"))
        .await
        .unwrap_err();
    assert!(err.is_constraint_violation());

    // Keeping its own ISBN is fine.
    let updated = db
        .update_book(2, &NewBook::new("Two, revised", "B").isbn("978-2"))
        .await?;
    assert_eq!(updated.rows_affected, 1);
    Ok(())
}

#[tokio::test]
async fn login_matches_credentials_and_active_flag() -> Result<(), CatalogDbError> {
    let server = FakeCatalogServer::new();
    server.add_user("ana@example.com", "pw", true);
    server.add_user("old@example.com", "pw", false);
    let db = catalog(&server);

    let row = db
        .login_user("ana@example.com", "pw", true)
        .await?
        .ok_or_else(|| CatalogDbError::NotFound("ana".into()))?;
    assert_eq!(
        row.get("correoelectronico").and_then(RowValues::as_text),
        Some("ana@example.com")
    );

    assert!(db.login_user("ana@example.com", "wrong", true).await?.is_none());
    assert!(db.login_user("nobody@example.com", "pw", true).await?.is_none());
    assert!(db.login_user("old@example.com", "pw", true).await?.is_none());
    assert!(db.login_user("old@example.com", "pw", false).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn missing_book_affects_no_rows() -> Result<(), CatalogDbError> {
    let db = catalog(&FakeCatalogServer::new());

    let updated = db.update_book(999, &NewBook::new("X", "Y")).await?;
    assert_eq!(updated.rows_affected, 0);
    let deleted = db.delete_book(999).await?;
    assert_eq!(deleted.rows_affected, 0);
    assert!(matches!(
        deleted.expect_found("book 999"),
        Err(CatalogDbError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn deleted_book_cannot_be_deleted_or_updated_again() -> Result<(), CatalogDbError> {
    let db = catalog(&FakeCatalogServer::new());
    db.insert_book(&NewBook::new("Foo", "Bar")).await?;

    assert_eq!(db.delete_book(1).await?.rows_affected, 1);
    assert_eq!(db.delete_book(1).await?.rows_affected, 0);
    assert_eq!(db.update_book(1, &NewBook::new("Foo", "Bar")).await?.rows_affected, 0);
    Ok(())
}

#[tokio::test]
async fn failed_connection_fails_every_operation() {
    let db = CatalogDb::new(ConnectionHandle::failed("Login failed for user 'app'."));

    let err = db.list_books().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    let err = db.delete_book(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("Login failed"));
}

#[tokio::test]
async fn closed_connection_rejects_requests() -> Result<(), CatalogDbError> {
    let db = catalog(&FakeCatalogServer::new());
    db.connection().close().await?;

    assert_eq!(db.connection().state(), ConnectionState::Closed);
    let err = db.list_books().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    Ok(())
}
