//! Upload pipeline against a real record store

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use waste_sorter::classifier::MaterialClassifier;
use waste_sorter::db::Database;
use waste_sorter::models::{ClassificationSource, NewUser};
use waste_sorter::repository::RecordStore;
use waste_sorter::service::{UploadOutcome, UploadPolicy, UploadService, UploadedFile};
use waste_sorter::validation::UploadRejection;

struct Fixture {
    _dir: TempDir,
    db: Database,
    uploads_dir: std::path::PathBuf,
    service: UploadService,
    user_id: i64,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("test.db")).unwrap();
    let user_id = db
        .upsert_user(&NewUser {
            external_id: "auth0|uploader".to_string(),
            name: "Uploader".to_string(),
            email: None,
        })
        .unwrap();

    let uploads_dir = dir.path().join("static").join("uploads");
    let policy = UploadPolicy {
        directory: uploads_dir.clone(),
        allowed_extensions: ["png", "jpg", "jpeg", "gif"].map(String::from).to_vec(),
        max_bytes: 10 * 1024 * 1024,
    };
    let service = UploadService::new(
        Arc::new(db.clone()),
        Arc::new(MaterialClassifier::degraded(32)),
        policy,
    )
    .unwrap();

    Fixture {
        _dir: dir,
        db,
        uploads_dir,
        service,
        user_id,
    }
}

fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_pixel(12, 12, Rgb([20, 200, 40]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn file(name: &str, bytes: Vec<u8>) -> Option<UploadedFile> {
    Some(UploadedFile {
        filename: name.to_string(),
        bytes,
    })
}

fn stored_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_upload_directory_is_created() {
    let f = fixture();
    assert!(f.uploads_dir.is_dir());
}

#[test]
fn test_disallowed_types_leave_no_trace() {
    let f = fixture();

    for name in ["notes.txt", "scan.bmp", "README"] {
        let outcome = f.service.handle_upload(f.user_id, file(name, png_bytes())).unwrap();
        assert!(matches!(
            outcome,
            UploadOutcome::Rejected(UploadRejection::DisallowedExtension(_))
        ));
    }

    assert!(stored_files(&f.uploads_dir).is_empty());
    assert_eq!(f.db.store_stats().unwrap().classifications, 0);
}

#[test]
fn test_missing_file_is_rejected() {
    let f = fixture();
    let outcome = f.service.handle_upload(f.user_id, None).unwrap();
    assert!(matches!(outcome, UploadOutcome::Rejected(UploadRejection::MissingFile)));
}

#[test]
fn test_successful_upload_records_once() {
    let f = fixture();

    let outcome = f
        .service
        .handle_upload(f.user_id, file("../../My Bottle.PNG", png_bytes()))
        .unwrap();
    let UploadOutcome::Classified(record) = outcome else {
        panic!("expected a classification, got {}", outcome.label());
    };

    assert_eq!(record.user_id, f.user_id);
    assert_eq!(record.source, ClassificationSource::Stub);
    assert!((70.0..=95.0).contains(&record.confidence));

    let files = stored_files(&f.uploads_dir);
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("_My_Bottle.PNG"), "unexpected name {}", files[0]);
    assert!(Path::new(&record.image_path).starts_with(&f.uploads_dir));

    let counts = f.db.aggregate_by_category(f.user_id).unwrap();
    assert_eq!(counts.total(), 1);
    assert_eq!(counts.get(record.category), 1);
}

#[test]
fn test_undecodable_image_is_stored_not_recorded() {
    let f = fixture();

    let outcome = f
        .service
        .handle_upload(f.user_id, file("garbage.png", b"\x89PNG but not really".to_vec()))
        .unwrap();
    let UploadOutcome::Failed { image_path, .. } = outcome else {
        panic!("expected a failure, got {}", outcome.label());
    };

    assert!(image_path.exists());
    assert_eq!(stored_files(&f.uploads_dir).len(), 1);
    assert_eq!(f.db.store_stats().unwrap().classifications, 0);
}

#[test]
fn test_unknown_user_is_a_storage_error() {
    let f = fixture();
    assert!(f.service.handle_upload(f.user_id + 100, file("can.jpg", png_bytes())).is_err());
}
