mod common;

use std::sync::Arc;

use bbab_portal::{
    access::{AccessGate, GateDecision, RequestKind, is_allowed, is_portal_page},
    auth::Viewer,
    models::User,
};
use common::*;

fn gate() -> AccessGate {
    AccessGate::new(Arc::new(site_repo()))
}

fn viewer(user: Option<User>) -> Viewer {
    Viewer { user }
}

// --- Classifier ---

#[test]
fn test_classifier_truth_table() {
    let portal = page(1, "brads-portal", 0, "");
    let other_parent = page(9, "blog", 0, "");

    // No item, or not a page.
    assert!(!is_portal_page(None, None));
    assert!(!is_portal_page(Some(&item(5, "post", "brads-portal", 0)), None));
    assert!(!is_portal_page(Some(&item(6, "post", "child", 1)), Some(&portal)));

    // The portal page itself.
    assert!(is_portal_page(Some(&portal), None));

    // Direct children only when the parent carries the portal slug.
    assert!(is_portal_page(Some(&page(2, "child", 1, "")), Some(&portal)));
    assert!(!is_portal_page(Some(&page(2, "child", 9, "")), Some(&other_parent)));
    assert!(!is_portal_page(Some(&page(2, "child", 1, "")), None));

    // parent_id 0 never counts as a parent, whatever is passed in.
    assert!(!is_portal_page(Some(&page(3, "top", 0, "")), Some(&portal)));
}

#[tokio::test]
async fn test_classifier_looks_up_parent_one_level() {
    let gate = gate();

    let portal = page(PORTAL_ID, "brads-portal", 0, "");
    let child = page(CHILD_ID, "add-portfolio", PORTAL_ID, "");
    let grandchild = page(GRANDCHILD_ID, "archive", CHILD_ID, "");
    let orphan = page(40, "lost", 999, "");

    assert!(gate.is_protected_page(Some(&portal)).await);
    assert!(gate.is_protected_page(Some(&child)).await);
    assert!(!gate.is_protected_page(Some(&grandchild)).await);
    assert!(!gate.is_protected_page(Some(&orphan)).await);
    assert!(!gate.is_protected_page(None).await);
}

// --- Authorization ---

#[test]
fn test_only_authenticated_administrators_are_allowed() {
    assert!(is_allowed(&viewer(Some(admin()))));
    assert!(!is_allowed(&viewer(Some(subscriber()))));
    assert!(!is_allowed(&Viewer::anonymous()));
}

#[tokio::test]
async fn test_gate_decisions_for_every_auth_combination() {
    let gate = gate();
    let portal = page(PORTAL_ID, "brads-portal", 0, "");

    // (isAuthenticated, isAdmin) → expected decision.
    let cases = [
        (Viewer::anonymous(), GateDecision::Blocked),
        (viewer(Some(subscriber())), GateDecision::Blocked),
        (viewer(Some(admin())), GateDecision::Passthrough),
    ];
    for (viewer, expected) in cases {
        assert_eq!(
            gate.decide(RequestKind::Frontend, Some(&portal), &viewer).await,
            expected,
            "viewer {:?}",
            viewer.user.as_ref().map(|u| &u.role)
        );
    }

    // An administrator role without an authenticated session cannot exist:
    // the role is only known through a resolved user.
    assert!(!Viewer::anonymous().has_administrator_role());
}

#[tokio::test]
async fn test_unprotected_and_admin_requests_pass_through() {
    let gate = gate();
    let about = page(ABOUT_ID, "about", 0, "");
    let portal = page(PORTAL_ID, "brads-portal", 0, "");

    assert_eq!(
        gate.decide(RequestKind::Frontend, Some(&about), &Viewer::anonymous()).await,
        GateDecision::Passthrough
    );
    assert_eq!(
        gate.decide(RequestKind::Frontend, None, &Viewer::anonymous()).await,
        GateDecision::Passthrough
    );
    assert_eq!(
        gate.decide(RequestKind::Admin, Some(&portal), &Viewer::anonymous()).await,
        GateDecision::Passthrough
    );
}
