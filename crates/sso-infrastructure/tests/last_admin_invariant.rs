//! Whatever sequence of role changes, deactivations and deletions is applied,
//! a tenant keeps at least one active administrator.

mod common;

use std::sync::Arc;

use common::Harness;
use proptest::prelude::*;
use sso_core::domain::{NewUser, Role, TenantScope, UserUpdate};
use sso_core::error::DomainError;
use sso_shared::Pagination;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum Op {
    Create(Role),
    SetRole(usize, Role),
    SetActive(usize, bool),
    Delete { target: usize, actor: usize },
}

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Owner), Just(Role::Admin), Just(Role::Agent), Just(Role::Viewer)]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        role().prop_map(Op::Create),
        (0..6usize, role()).prop_map(|(i, r)| Op::SetRole(i, r)),
        (0..6usize, any::<bool>()).prop_map(|(i, a)| Op::SetActive(i, a)),
        (0..6usize, 0..6usize).prop_map(|(target, actor)| Op::Delete { target, actor }),
    ]
}

async fn active_admins(h: &Harness, scope: &TenantScope) -> usize {
    h.core
        .users
        .list(scope, Pagination::new(100, 0))
        .await
        .unwrap()
        .iter()
        .filter(|u| u.is_active_admin())
        .count()
}

async fn apply(h: &Harness, scope: &TenantScope, ids: &mut Vec<Uuid>, op: Op) -> Result<(), DomainError> {
    let pick = |ids: &Vec<Uuid>, i: usize| ids[i % ids.len()];
    match op {
        Op::Create(role) => {
            let user = h
                .core
                .users
                .create(
                    scope,
                    NewUser {
                        email: format!("{}@acme.test", Uuid::new_v4().simple()),
                        password: "password123".into(),
                        name: "Member".into(),
                        role: role.as_str().into(),
                    },
                )
                .await?;
            ids.push(user.id);
        }
        Op::SetRole(i, role) => {
            let update = UserUpdate { role: Some(role.as_str().into()), ..Default::default() };
            h.core.users.update(scope, pick(ids, i), update).await?;
        }
        Op::SetActive(i, active) => {
            let update = UserUpdate { is_active: Some(active), ..Default::default() };
            h.core.users.update(scope, pick(ids, i), update).await?;
        }
        Op::Delete { target, actor } => {
            let target = pick(ids, target);
            h.core.users.delete(scope, target, pick(ids, actor)).await?;
            ids.retain(|id| *id != target);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn tenant_never_loses_its_last_admin(ops in prop::collection::vec(op(), 1..20)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let h = Harness::new();
            let reg = h.register("acme", "founder@acme.test", "password123").await;
            let scope = reg.tenant.scope();
            let mut ids = vec![reg.session.user.id];

            for op in ops {
                match apply(&h, &scope, &mut ids, op).await {
                    Ok(())
                    | Err(DomainError::LastAdmin)
                    | Err(DomainError::CannotDeleteSelf)
                    | Err(DomainError::TenantMaxUsersReached)
                    | Err(DomainError::UserNotFound) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
                assert!(active_admins(&h, &scope).await >= 1);
            }
        });
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_demotions_keep_one_admin() {
    let h = Arc::new(Harness::new());
    let reg = h.register("acme", "bob@acme.test", "password123").await;
    let scope = reg.tenant.scope();
    let carol = h
        .core
        .users
        .create(
            &scope,
            NewUser {
                email: "carol@acme.test".into(),
                password: "password123".into(),
                name: "Carol".into(),
                role: "admin".into(),
            },
        )
        .await
        .unwrap();

    let demote = |id: Uuid| {
        let h = h.clone();
        let scope = reg.tenant.scope();
        tokio::spawn(async move {
            let update = UserUpdate { role: Some("viewer".into()), ..Default::default() };
            h.core.users.update(&scope, id, update).await
        })
    };
    let (a, b) = tokio::join!(demote(reg.session.user.id), demote(carol.id));
    let results = [a.unwrap(), b.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(r, Err(DomainError::LastAdmin))));
    assert_eq!(active_admins(&h, &scope).await, 1);
}
