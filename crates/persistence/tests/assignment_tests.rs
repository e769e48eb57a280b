//! Integration tests for assigning children to a parent.
//!
//! Run with: `cargo test -p cdnops-persistence --test assignment_tests`

mod common;

use cdnops_persistence::assignment::{
    AssignmentRequest, FederationResolverAssignment, RequiredCapabilityAssignment,
};
use cdnops_persistence::backends::sqlite::SqliteBackend;
use cdnops_persistence::core::{AssignmentStorage, ResourceStorage};
use cdnops_persistence::error::{ErrorClass, ResourceError, StorageError};
use cdnops_persistence::resources::{FederationResolver, ResolverId, RESOLVE6};

use common::*;

async fn resolver_ids(backend: &SqliteBackend, federation: i64) -> Vec<i64> {
    backend
        .assigned::<FederationResolverAssignment>(&admin(), federation)
        .await
        .expect("Failed to list assigned resolvers")
        .iter()
        .filter_map(|r| r.id)
        .collect()
}

// ============================================================================
// Federation Resolvers
// ============================================================================

#[tokio::test]
async fn test_assign_resolvers() {
    let backend = create_backend();

    let summary = backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![10, 11, 12], false),
        )
        .await
        .unwrap();
    assert_eq!(summary.message, "3 resolver(s) were assigned to the foo federation");
    assert_eq!(summary.parent_name, "foo");
    assert_eq!(summary.requested, 3);
    assert_eq!(summary.newly_assigned, 3);
    assert_eq!(summary.removed, 0);

    assert_eq!(resolver_ids(&backend, FED_FOO).await, vec![10, 11, 12]);
    assert!(resolver_ids(&backend, FED_BAR).await.is_empty());
}

#[tokio::test]
async fn test_assign_with_replace() {
    let backend = create_backend();
    backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![10, 11, 12], false),
        )
        .await
        .unwrap();

    let summary = backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![20], true),
        )
        .await
        .unwrap();
    assert_eq!(summary.message, "1 resolver(s) were assigned to the foo federation");
    assert_eq!(summary.removed, 3);
    assert!(summary.replace);

    assert_eq!(resolver_ids(&backend, FED_FOO).await, vec![20]);
}

#[tokio::test]
async fn test_replace_with_empty_list_clears() {
    let backend = create_backend();
    backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![10, 11], false),
        )
        .await
        .unwrap();

    let summary = backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![], true),
        )
        .await
        .unwrap();
    assert_eq!(summary.message, "0 resolver(s) were assigned to the foo federation");
    assert_eq!(summary.removed, 2);

    assert!(resolver_ids(&backend, FED_FOO).await.is_empty());
}

#[tokio::test]
async fn test_empty_list_without_replace_changes_nothing() {
    let backend = create_backend();
    backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![10], false),
        )
        .await
        .unwrap();

    let summary = backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![], false),
        )
        .await
        .unwrap();
    assert_eq!(summary.newly_assigned, 0);
    assert_eq!(summary.removed, 0);

    assert_eq!(resolver_ids(&backend, FED_FOO).await, vec![10]);
}

#[tokio::test]
async fn test_assign_is_idempotent() {
    let backend = create_backend();
    backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![10, 11], false),
        )
        .await
        .unwrap();

    let summary = backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![11, 12, 12, 11], false),
        )
        .await
        .unwrap();
    assert_eq!(summary.requested, 2);
    assert_eq!(summary.newly_assigned, 1);
    assert_eq!(summary.message, "2 resolver(s) were assigned to the foo federation");

    assert_eq!(resolver_ids(&backend, FED_FOO).await, vec![10, 11, 12]);
}

#[tokio::test]
async fn test_assign_unknown_resolver_rolls_back() {
    let backend = create_backend();
    backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![10], false),
        )
        .await
        .unwrap();

    let err = backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![11, 999], true),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::NotFound { .. })
    ));
    assert!(err.to_string().contains("999"));

    assert_eq!(resolver_ids(&backend, FED_FOO).await, vec![10]);
}

#[tokio::test]
async fn test_assign_unknown_federation() {
    let backend = create_backend();

    let err = backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            99,
            AssignmentRequest::new(vec![10], false),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);

    let err = backend
        .assigned::<FederationResolverAssignment>(&admin(), 99)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn test_assignment_is_logged() {
    let backend = create_backend();
    backend
        .assign::<FederationResolverAssignment>(
            &user(CDN_B),
            FED_FOO,
            AssignmentRequest::new(vec![10, 20], true),
        )
        .await
        .unwrap();

    let log = backend.change_log(5).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].user, format!("user-{CDN_B}"));
    assert_eq!(
        log[0].message,
        "FEDERATION: foo, ACTION: Assigned, keys: id=5, resolvers=[10, 20], replace=true"
    );
}

#[tokio::test]
async fn test_deleting_resolver_removes_assignment() {
    let backend = create_backend();
    backend
        .assign::<FederationResolverAssignment>(
            &admin(),
            FED_FOO,
            AssignmentRequest::new(vec![10, 11], false),
        )
        .await
        .unwrap();

    backend
        .delete::<FederationResolver>(&admin(), &ResolverId(10))
        .await
        .unwrap();

    assert_eq!(resolver_ids(&backend, FED_FOO).await, vec![11]);
}

// ============================================================================
// Federation Resolver Resource
// ============================================================================

#[tokio::test]
async fn test_create_resolver() {
    let backend = create_backend();

    let created = backend
        .create(&admin(), FederationResolver::new("2001:db8::53"))
        .await
        .unwrap();
    assert!(created.id.is_some());
    assert_eq!(created.resolver_type.as_deref(), Some(RESOLVE6));

    let rows: Vec<FederationResolver> = backend
        .read(&admin(), params(&[("type", "RESOLVE6")]))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_create_resolver_duplicate_address() {
    let backend = create_backend();

    let err = backend
        .create(&admin(), FederationResolver::new("192.0.2.10"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 409);
}

#[tokio::test]
async fn test_create_resolver_invalid_address() {
    let backend = create_backend();

    let err = backend
        .create(&admin(), FederationResolver::new("not-an-address"))
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);

    let mut mismatched = FederationResolver::new("192.0.2.99");
    mismatched.resolver_type = Some(RESOLVE6.to_string());
    let err = backend.create(&admin(), mismatched).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);
}

// ============================================================================
// Required Capabilities
// ============================================================================

#[tokio::test]
async fn test_assign_required_capabilities() {
    let backend = create_backend();

    let summary = backend
        .assign::<RequiredCapabilityAssignment>(
            &user(CDN_A),
            DS_DEMO1,
            AssignmentRequest::new(vec!["ram".to_string(), "disk".to_string()], false),
        )
        .await
        .unwrap();
    assert_eq!(
        summary.message,
        "2 capability(s) were assigned to the demo1 delivery service"
    );

    let assigned = backend
        .assigned::<RequiredCapabilityAssignment>(&user(CDN_A), DS_DEMO1)
        .await
        .unwrap();
    let names: Vec<_> = assigned
        .iter()
        .filter_map(|c| c.required_capability.as_deref())
        .collect();
    assert_eq!(names, vec!["disk", "ram"]);
    assert!(assigned.iter().all(|c| c.xml_id.as_deref() == Some("demo1")));
}

#[tokio::test]
async fn test_assign_required_capabilities_on_foreign_tenant() {
    let backend = create_backend();

    let err = backend
        .assign::<RequiredCapabilityAssignment>(
            &user(CDN_B),
            DS_DEMO1,
            AssignmentRequest::new(vec!["ram".to_string()], true),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    let err = backend
        .assigned::<RequiredCapabilityAssignment>(&user(CDN_B), DS_DEMO1)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[tokio::test]
async fn test_assign_unknown_capability() {
    let backend = create_backend();

    let err = backend
        .assign::<RequiredCapabilityAssignment>(
            &admin(),
            DS_DEMO1,
            AssignmentRequest::new(vec!["ram".to_string(), "gpu".to_string()], false),
        )
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);

    assert!(backend
        .assigned::<RequiredCapabilityAssignment>(&admin(), DS_DEMO1)
        .await
        .unwrap()
        .is_empty());
}
