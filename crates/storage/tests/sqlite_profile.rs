use skilltwin_core::model::{Identity, StudentId, StudentProfile, Theme};
use storage::repository::{ProfileRepository, StoredProfile};
use storage::sqlite::SqliteRepository;

fn identity() -> Identity {
    Identity::new(
        StudentProfile {
            id: StudentId::new("12"),
            email: "ada@skilltwin.test".into(),
            name: "Ada".into(),
            class_level: Some("10th Grade".into()),
            student_id: Some("STU012".into()),
        },
        "bearer-12",
    )
}

#[tokio::test]
async fn sqlite_profile_roundtrips_identity_and_theme() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_profile_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.load_profile().await.unwrap(), StoredProfile::default());

    repo.save_identity(Some(&identity())).await.unwrap();
    repo.save_theme(Theme::Dark).await.unwrap();

    let stored = repo.load_profile().await.unwrap();
    assert_eq!(stored.identity, Some(identity()));
    assert_eq!(stored.theme, Theme::Dark);
}

#[tokio::test]
async fn sqlite_sign_out_keeps_theme() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_profile_signout?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.save_theme(Theme::Dark).await.unwrap();
    repo.save_identity(Some(&identity())).await.unwrap();
    repo.save_identity(None).await.unwrap();

    let stored = repo.load_profile().await.unwrap();
    assert_eq!(stored.identity, None);
    assert_eq!(stored.theme, Theme::Dark);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_profile_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");
    repo.save_theme(Theme::Light).await.unwrap();
    assert_eq!(repo.load_profile().await.unwrap().theme, Theme::Light);
}
