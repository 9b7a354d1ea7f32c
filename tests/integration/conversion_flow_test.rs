//! End-to-end tests for the folder conversion flow.

mod helpers;

use librarian_core::types::id::DocumentId;
use librarian_database::{ConversionRequestStore, FileVersionStore, JobStore, LibraryStore};
use librarian_entity::conversion::ConversionStatus;
use librarian_entity::file::VersionContent;
use librarian_entity::folder::FolderAccess;
use librarian_entity::job::{JobPayload, JobPriority, JobStatus};

use helpers::{TestApp, binary_document, shared_folder, url_document};

#[tokio::test]
async fn test_prepare_provision_migrate() {
    let (acme, acme_sharing) = shared_folder("00lA", "Acme", FolderAccess::ReadWrite, &["P1", "P2"]);
    let app = TestApp::new(vec![acme_sharing]);

    // Prepare
    let results = app
        .registry
        .prepare_for_conversion(std::slice::from_ref(&acme), &app.credential(), &app.tiers)
        .await;
    assert_eq!(results[0].status, ConversionStatus::Queued);

    let requests = app.stores.requests.list().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].permission_tier_id, app.tiers.read_write);
    assert_eq!(requests[0].sharing_principals, "P1,P2");

    // Provision through the worker
    app.queue
        .enqueue(
            &JobPayload::ProvisionLibraries {
                request_ids: vec![requests[0].id],
            },
            JobPriority::Normal,
        )
        .await
        .unwrap();
    assert_eq!(app.runner.drain_once().await, 2);

    let request = &app.stores.requests.find_by_ids(&[requests[0].id]).await.unwrap()[0];
    let library_id = request.library_id.unwrap();
    let group_id = request.group_id.unwrap();

    let libraries = app
        .stores
        .libraries
        .find_libraries_by_names(&["doclib_Acme".to_string()])
        .await
        .unwrap();
    assert_eq!(libraries[0].id, library_id);
    assert_eq!(
        app.stores.libraries.find_group_members(group_id).await.unwrap().len(),
        2
    );

    // Migrate
    let docs = vec![
        url_document("D1", "00lA", "https://intranet/handbook"),
        binary_document("D2", "00lA", b"%PDF-1.4"),
    ];
    let results = app.migrator.migrate_documents(&docs).await.unwrap();
    assert!(results.iter().all(|r| r.status == ConversionStatus::Converted));

    let versions = app.stores.file_versions.find_by_library(library_id).await.unwrap();
    assert_eq!(versions.len(), 2);
    let link = versions
        .iter()
        .find(|v| v.origin_document_id == DocumentId::from("D1"))
        .unwrap();
    assert_eq!(link.content(), VersionContent::Url("https://intranet/handbook"));
    assert_eq!(link.owner_id.as_str(), "author");
    assert_eq!(link.last_modified_by.as_str(), "editor");
    assert_eq!(link.origin_folder_id.as_str(), "00lA");

    // Rerun adds nothing
    let rerun = app.migrator.migrate_documents(&docs).await.unwrap();
    assert!(rerun.iter().all(|r| r.status == ConversionStatus::Skipped));
    assert_eq!(
        app.stores.file_versions.find_by_library(library_id).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_documents_wait_for_provisioning() {
    let (acme, acme_sharing) = shared_folder("00lA", "Acme", FolderAccess::ReadOnly, &["P1"]);
    let app = TestApp::new(vec![acme_sharing]);

    app.registry
        .prepare_for_conversion(std::slice::from_ref(&acme), &app.credential(), &app.tiers)
        .await;

    let doc = url_document("D1", "00lA", "https://intranet/a");
    let early = app
        .migrator
        .migrate_documents(std::slice::from_ref(&doc))
        .await
        .unwrap();
    assert_eq!(early[0].status, ConversionStatus::Error);

    let requests = app.stores.requests.find_unprovisioned(10).await.unwrap();
    app.provisioner.provision_libraries(&requests).await.unwrap();

    // The library exists before the completion job has run.
    let late = app
        .migrator
        .migrate_documents(std::slice::from_ref(&doc))
        .await
        .unwrap();
    assert_eq!(late[0].status, ConversionStatus::Converted);

    assert_eq!(app.stores.jobs.count_by_status(JobStatus::Pending).await.unwrap(), 1);
    app.runner.drain_once().await;
    assert!(app.stores.requests.find_unprovisioned(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_completion_delivered_twice_is_harmless() {
    let (acme, acme_sharing) = shared_folder("00lA", "Acme", FolderAccess::ReadOnly, &["P1"]);
    let app = TestApp::new(vec![acme_sharing]);

    app.registry
        .prepare_for_conversion(std::slice::from_ref(&acme), &app.credential(), &app.tiers)
        .await;
    let requests = app.stores.requests.list().await.unwrap();

    let first = app.provisioner.provision_libraries(&requests).await.unwrap();
    let second = app.provisioner.provision_libraries(&requests).await.unwrap();
    assert_eq!(first, second);

    // Two completion jobs carrying the same ids.
    assert_eq!(app.runner.drain_once().await, 2);

    let stored = app.stores.requests.list().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].library_id, Some(first[0].library_id));
    assert_eq!(
        app.stores
            .libraries
            .find_library_members(first[0].library_id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_reset_allows_reconversion() {
    let (acme, acme_sharing) = shared_folder("00lA", "Acme", FolderAccess::ReadOnly, &[]);
    let app = TestApp::new(vec![acme_sharing]);
    let folders = std::slice::from_ref(&acme);

    let first = app
        .registry
        .prepare_for_conversion(folders, &app.credential(), &app.tiers)
        .await;
    let second = app
        .registry
        .prepare_for_conversion(folders, &app.credential(), &app.tiers)
        .await;
    assert_eq!(first[0].status, ConversionStatus::Queued);
    assert_eq!(second[0].status, ConversionStatus::Skipped);

    app.stores.requests.delete_by_folder(&acme.id).await.unwrap();

    let third = app
        .registry
        .prepare_for_conversion(folders, &app.credential(), &app.tiers)
        .await;
    assert_eq!(third[0].status, ConversionStatus::Queued);
}
