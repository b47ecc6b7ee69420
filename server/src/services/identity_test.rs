use super::*;

#[tokio::test]
async fn dev_identity_parses_full_triple() {
    let identity = DevIdentity.resolve("u-1:owner:Ms Frizzle").await.unwrap();
    assert_eq!(identity.user_id, "u-1");
    assert_eq!(identity.role, Role::Owner);
    assert_eq!(identity.username, "Ms Frizzle");
}

#[tokio::test]
async fn dev_identity_name_defaults_to_user_id() {
    let identity = DevIdentity.resolve("u-2:participant").await.unwrap();
    assert_eq!(identity.username, "u-2");
    assert_eq!(identity.role, Role::Participant);
}

#[tokio::test]
async fn dev_identity_name_may_contain_colons() {
    let identity = DevIdentity.resolve("u-3:student:Arnold: the cautious").await.unwrap();
    assert_eq!(identity.username, "Arnold: the cautious");
}

#[tokio::test]
async fn dev_identity_rejects_missing_parts() {
    assert!(matches!(DevIdentity.resolve("").await, Err(IdentityError::Missing)));
    assert!(matches!(DevIdentity.resolve("u-4").await, Err(IdentityError::Invalid)));
}

#[test]
fn legacy_role_names_are_accepted() {
    assert_eq!(parse_role("Teacher"), Role::Owner);
    assert_eq!(parse_role("student"), Role::Participant);
    assert_eq!(parse_role("anything"), Role::Participant);
}

#[test]
fn identity_errors_map_to_codes() {
    assert_eq!(IdentityError::Missing.error_code(), "E_UNAUTHORIZED");
    assert_eq!(IdentityError::Invalid.error_code(), "E_UNAUTHORIZED");
    assert!(!IdentityError::Invalid.retryable());
}
