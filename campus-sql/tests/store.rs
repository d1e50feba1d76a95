use campus_auth::{AuthGateOptions, PasswordHasher};
use campus_core::errors::CampusError;
use campus_core::{ErrorKind, LoginRequest, ResourceService, Role, TenantContext, TenantService};
use campus_sql::SqlStore;
use serde_json::{json, Value};

fn hasher() -> PasswordHasher {
    PasswordHasher::with_cost(4)
}

async fn store_with_schools(schools: Value) -> SqlStore {
    let store = SqlStore::in_memory().await.unwrap();
    let records = schools.as_array().cloned().unwrap();
    store.tenants().sync(records).await.unwrap();
    store
}

async fn two_schools() -> SqlStore {
    store_with_schools(json!([
        {"id": "s1", "name": "Escola Um", "code": "ABC", "status": "Ativo",
         "subscription": {"plan": "pro", "seats": 30}},
        {"id": "s2", "name": "Escola Dois", "code": "DEF", "status": "Ativo"},
    ]))
    .await
}

fn s1() -> TenantContext {
    TenantContext::new("s1")
}

fn s2() -> TenantContext {
    TenantContext::new("s2")
}

#[tokio::test]
async fn unknown_fields_are_dropped_not_rejected() {
    let store = two_schools().await;
    let router = store.router(hasher());

    router
        .write(&s1(), "students", json!([{"id": "st1", "name": "Ana", "nickname": "Aninha"}]))
        .await
        .unwrap();

    let rows = router.read(&s1(), "students").await.unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["name"], "Ana");
    assert!(rows[0].get("nickname").is_none());
}

#[tokio::test]
async fn repeated_upsert_is_idempotent() {
    let store = two_schools().await;
    let router = store.router(hasher());
    let batch = json!([{"id": "t1", "name": "1º A", "subjects": ["mat", "port"]}]);

    router.write(&s1(), "turmas", batch.clone()).await.unwrap();
    router.write(&s1(), "turmas", batch).await.unwrap();

    let rows = router.read(&s1(), "turmas").await.unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["subjects"], json!(["mat", "port"]));
}

#[tokio::test]
async fn last_write_wins_per_column() {
    let store = two_schools().await;
    let router = store.router(hasher());

    router
        .write(&s1(), "students", json!({"id": "st1", "name": "Ana", "status": "Ativo"}))
        .await
        .unwrap();
    router
        .write(&s1(), "students", json!({"id": "st1", "name": "Ana Maria"}))
        .await
        .unwrap();

    let rows = router.read(&s1(), "students").await.unwrap();
    assert_eq!(rows[0]["name"], "Ana Maria");
    assert_eq!(rows[0]["status"], "Ativo");
}

#[tokio::test]
async fn tenant_column_is_overwritten_with_caller_tenant() {
    let store = two_schools().await;
    let router = store.router(hasher());

    router
        .write(&s1(), "expenses", json!([{"id": "e1", "schoolId": "s2", "description": "Luz"}]))
        .await
        .unwrap();

    let mine = router.read(&s1(), "expenses").await.unwrap();
    assert_eq!(mine[0]["schoolId"], "s1");
    let theirs = router.read(&s2(), "expenses").await.unwrap();
    assert_eq!(theirs, json!([]));
}

#[tokio::test]
async fn colliding_id_from_another_tenant_is_refused() {
    let store = two_schools().await;
    let router = store.router(hasher());

    router.write(&s1(), "students", json!({"id": "st1", "name": "Ana"})).await.unwrap();
    let err = router
        .write(&s2(), "students", json!([{"id": "st2", "name": "Rui"}, {"id": "st1", "name": "Intruso"}]))
        .await
        .unwrap_err();

    let campus = CampusError::from_anyhow(&err).unwrap();
    assert_eq!(campus.kind, ErrorKind::ConstraintViolation);
    assert!(campus.message.contains("belongs to another school"));
    let data = campus.data.clone().unwrap();
    assert_eq!(data["failedAt"], 1);
    assert_eq!(data["committed"], 1);

    let mine = router.read(&s1(), "students").await.unwrap();
    assert_eq!(mine[0]["name"], "Ana");
    let theirs = router.read(&s2(), "students").await.unwrap();
    assert_eq!(theirs.as_array().unwrap().len(), 1);
    assert_eq!(theirs[0]["id"], "st2");
}

#[tokio::test]
async fn aliases_resolve_to_the_same_table() {
    let store = two_schools().await;
    let router = store.router(hasher());

    router.write(&s1(), "classes", json!({"id": "t1", "name": "2º B"})).await.unwrap();
    let rows = router.read(&s1(), "turmas").await.unwrap();
    assert_eq!(rows[0]["name"], "2º B");
}

#[tokio::test]
async fn opaque_documents_round_trip() {
    let store = two_schools().await;
    let router = store.router(hasher());
    let doc = json!({"events": [{"day": "2024-03-01", "label": "Início"}], "meta": {"v": 2, "ok": true}});

    router.write(&s1(), "calendar", doc.clone()).await.unwrap();

    assert_eq!(router.read(&s1(), "calendar").await.unwrap(), doc);
    assert_eq!(router.read(&s2(), "calendar").await.unwrap(), Value::Null);
    assert_eq!(router.read(&s1(), "nothing-here").await.unwrap(), Value::Null);
}

#[tokio::test]
async fn documents_cannot_take_the_school_section() {
    let store = two_schools().await;
    let router = store.router(hasher());

    let err = router.write(&s1(), "school", json!({"name": "Outra"})).await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::UnroutableResource);

    let snap = store.tenants().snapshot(&s1()).await.unwrap();
    assert_eq!(snap["school"]["name"], "Escola Um");
}

#[tokio::test]
async fn schools_cannot_create_super_admins() {
    let store = two_schools().await;
    let router = store.router(hasher());

    let err = router
        .write(&s1(), "users", json!({"id": "u1", "email": "x@um.ao", "password": "pw", "role": "SuperAdmin"}))
        .await
        .unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::BadRequest);
    assert_eq!(router.read(&s1(), "users").await.unwrap(), json!([]));
}

#[tokio::test]
async fn settings_partitions_are_replaced_independently() {
    let store = two_schools().await;
    let router = store.router(hasher());

    router.write(&s1(), "settings", json!({"theme": "dark"})).await.unwrap();
    router.write(&s1(), "financial", json!({"currency": "AOA"})).await.unwrap();
    router.write(&s1(), "settings", json!({"theme": "light"})).await.unwrap();

    assert_eq!(router.read(&s1(), "settings").await.unwrap(), json!({"theme": "light"}));
    assert_eq!(router.read(&s1(), "financial").await.unwrap(), json!({"currency": "AOA"}));
    assert_eq!(router.read(&s2(), "settings").await.unwrap(), Value::Null);
}

#[tokio::test]
async fn remove_is_scoped_and_reports_missing_rows() {
    let store = two_schools().await;
    let router = store.router(hasher());
    router.write(&s1(), "notifications", json!({"id": "n1", "title": "Aviso"})).await.unwrap();

    let err = router.remove(&s2(), "notifications", "n1").await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::NotFound);

    router.remove(&s1(), "notifications", "n1").await.unwrap();
    let err = router.remove(&s1(), "notifications", "n1").await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::NotFound);

    let err = router.remove(&s1(), "settings", "x").await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::UnroutableResource);
    let err = router.remove(&s1(), "calendar", "x").await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::UnroutableResource);
}

#[tokio::test]
async fn failed_record_leaves_earlier_records_committed() {
    let store = two_schools().await;
    let router = store.router(hasher());

    // users.email is NOT NULL
    let err = router
        .write(
            &s1(),
            "users",
            json!([
                {"id": "u1", "email": "a@x.com", "role": "Professor"},
                {"id": "u2", "role": "Professor"},
                {"id": "u3", "email": "c@x.com", "role": "Professor"},
            ]),
        )
        .await
        .unwrap_err();

    let campus = CampusError::from_anyhow(&err).unwrap();
    assert_eq!(campus.kind, ErrorKind::ConstraintViolation);
    let data = campus.data.clone().unwrap();
    assert_eq!(data["table"], "users");
    assert_eq!(data["failedAt"], 1);
    assert_eq!(data["committed"], 1);

    let users = router.read(&s1(), "users").await.unwrap();
    let ids: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["u1"]);
}

#[tokio::test]
async fn non_object_entries_are_rejected() {
    let store = two_schools().await;
    let router = store.router(hasher());

    let err = router.write(&s1(), "students", json!([1, 2])).await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::BadRequest);
}

#[tokio::test]
async fn passwords_are_hashed_and_never_read_back() {
    let store = two_schools().await;
    let router = store.router(hasher());

    router
        .write(&s1(), "users", json!({"id": "u1", "email": "a@x.com", "password": "pw1", "role": "Diretor"}))
        .await
        .unwrap();

    let users = router.read(&s1(), "users").await.unwrap();
    assert!(users[0].get("password").is_none());

    let stored: (String,) = sqlx::query_as(r#"SELECT "password" FROM "users" WHERE "id" = 'u1'"#)
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert!(PasswordHasher::is_hashed(&stored.0));
}

#[tokio::test]
async fn discussion_messages_are_scoped_through_their_topic() {
    let store = two_schools().await;
    let router = store.router(hasher());

    router.write(&s1(), "discussionTopics", json!({"id": "tp1", "title": "Provas"})).await.unwrap();
    router.write(&s2(), "discussionTopics", json!({"id": "tp2", "title": "Festa"})).await.unwrap();
    router
        .write(&s1(), "discussionMessages", json!({"id": "m1", "topicId": "tp1", "content": "Quando?"}))
        .await
        .unwrap();
    router
        .write(&s2(), "discussionMessages", json!({"id": "m2", "topicId": "tp2", "content": "Sábado"}))
        .await
        .unwrap();

    let mine = router.read(&s1(), "discussionMessages").await.unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["id"], "m1");
}

#[tokio::test]
async fn messages_cannot_be_posted_into_another_schools_topic() {
    let store = two_schools().await;
    let router = store.router(hasher());
    router.write(&s2(), "discussionTopics", json!({"id": "tp2", "title": "Festa"})).await.unwrap();

    let err = router
        .write(&s1(), "discussionMessages", json!({"id": "m9", "topicId": "tp2", "content": "Olá"}))
        .await
        .unwrap_err();
    let campus = CampusError::from_anyhow(&err).unwrap();
    assert_eq!(campus.kind, ErrorKind::NotFound);
    assert_eq!(campus.data.clone().unwrap()["failedAt"], 0);

    let err = router
        .write(&s1(), "discussionMessages", json!({"id": "m9", "content": "Sem tópico"}))
        .await
        .unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::BadRequest);

    assert_eq!(router.read(&s2(), "discussionMessages").await.unwrap(), json!([]));
}

#[tokio::test]
async fn messages_of_another_school_cannot_be_overwritten() {
    let store = two_schools().await;
    let router = store.router(hasher());
    router.write(&s1(), "discussionTopics", json!({"id": "tp1", "title": "Provas"})).await.unwrap();
    router.write(&s2(), "discussionTopics", json!({"id": "tp2", "title": "Festa"})).await.unwrap();
    router
        .write(&s2(), "discussionMessages", json!({"id": "m1", "topicId": "tp2", "content": "Sábado"}))
        .await
        .unwrap();

    let err = router
        .write(&s1(), "discussionMessages", json!({"id": "m1", "topicId": "tp2", "content": "Alterado"}))
        .await
        .unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::NotFound);

    // Moving the message under one's own topic is refused as well.
    let err = router
        .write(&s1(), "discussionMessages", json!({"id": "m1", "topicId": "tp1", "content": "Alterado"}))
        .await
        .unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::ConstraintViolation);

    let theirs = router.read(&s2(), "discussionMessages").await.unwrap();
    assert_eq!(theirs[0]["content"], "Sábado");
    assert_eq!(theirs[0]["topicId"], "tp2");
    assert_eq!(router.read(&s1(), "discussionMessages").await.unwrap(), json!([]));
}

#[tokio::test]
async fn snapshot_is_complete_and_tenant_local() {
    let store = two_schools().await;
    let router = store.router(hasher());

    router.write(&s1(), "students", json!([{"id": "st1", "name": "Ana"}, {"id": "st2", "name": "Rui"}])).await.unwrap();
    router.write(&s2(), "students", json!({"id": "st9", "name": "Outro"})).await.unwrap();
    router
        .write(&s1(), "payments", json!([
            {"id": "p1", "studentId": "st1", "items": [{"desc": "Propina"}]},
            {"id": "p2", "studentId": "st1"},
        ]))
        .await
        .unwrap();
    router.write(&s1(), "academicYears", json!({"id": "y1", "name": "2024", "current": true})).await.unwrap();
    router.write(&s1(), "discussionTopics", json!({"id": "tp1", "title": "Provas"})).await.unwrap();
    router.write(&s1(), "discussionMessages", json!({"id": "m1", "topicId": "tp1", "content": "Oi"})).await.unwrap();
    router.write(&s1(), "financial", json!({"currency": "AOA"})).await.unwrap();
    router.write(&s1(), "calendar", json!({"days": 200})).await.unwrap();

    let snap = store.tenants().snapshot(&s1()).await.unwrap();

    assert_eq!(snap["school"]["id"], "s1");
    assert_eq!(snap["school"]["subscription"], json!({"plan": "pro", "seats": 30}));
    for key in [
        "users",
        "students",
        "turmas",
        "academicYears",
        "expenses",
        "payments",
        "notifications",
        "discussionTopics",
        "discussionMessages",
    ] {
        assert!(snap[key].is_array(), "missing section {key}");
    }

    let students = snap["students"].as_array().unwrap();
    assert_eq!(students.len(), 2);
    assert_eq!(students[0]["payments"].as_array().unwrap().len(), 2);
    assert_eq!(students[0]["payments"][0]["items"], json!([{"desc": "Propina"}]));
    assert_eq!(students[1]["payments"], json!([]));
    assert!(students.iter().all(|s| s["schoolId"] == "s1"));

    assert_eq!(snap["academicYears"][0]["current"], true);
    assert_eq!(snap["discussionTopics"][0]["messages"][0]["id"], "m1");
    assert_eq!(snap["settings"], Value::Null);
    assert_eq!(snap["financial"], json!({"currency": "AOA"}));
    assert_eq!(snap["calendar"], json!({"days": 200}));
}

#[tokio::test]
async fn snapshot_of_unknown_school_is_not_found() {
    let store = two_schools().await;
    let err = store.tenants().snapshot(&TenantContext::new("ghost")).await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::NotFound);
}

#[tokio::test]
async fn deleting_a_school_cascades() {
    let store = two_schools().await;
    let router = store.router(hasher());
    router.write(&s1(), "students", json!({"id": "st1", "name": "Ana"})).await.unwrap();
    router.write(&s1(), "calendar", json!([1, 2, 3])).await.unwrap();

    store.tenants().remove("s1").await.unwrap();

    assert_eq!(router.read(&s1(), "students").await.unwrap(), json!([]));
    assert_eq!(router.read(&s1(), "calendar").await.unwrap(), Value::Null);
    let schools = store.tenants().list().await.unwrap();
    assert_eq!(schools.len(), 1);
    assert_eq!(schools[0]["id"], "s2");

    let err = store.tenants().remove("s1").await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::NotFound);
}

#[tokio::test]
async fn listed_schools_have_structured_subscription() {
    let store = two_schools().await;
    let schools = store.tenants().list().await.unwrap();
    assert_eq!(schools[0]["subscription"]["plan"], "pro");
    assert_eq!(schools[1]["status"], "Ativo");
}

#[tokio::test]
async fn login_against_stored_users() {
    let store = store_with_schools(json!([
        {"id": "s1", "name": "Escola Um", "code": "ABC", "status": "Ativo"},
        {"id": "s2", "name": "Escola Dois", "code": "DEF", "status": "Bloqueado"},
    ]))
    .await;
    let router = store.router(hasher());
    router
        .write(&s1(), "users", json!({"id": "u1", "email": "Prof@X.com", "password": "pw1", "role": "Professor", "name": "Ana"}))
        .await
        .unwrap();
    router
        .write(&s2(), "users", json!({"id": "u2", "email": "b@x.com", "password": "pw2", "role": "Diretor"}))
        .await
        .unwrap();

    let services = store.services(hasher(), AuthGateOptions::default());
    let login = |code: &str, email: &str, password: &str| LoginRequest {
        tenant_code: Some(code.to_string()),
        email: email.to_string(),
        password: password.to_string(),
    };

    let principal = services.auth.authenticate(&login(" abc ", "prof@x.COM", "pw1")).await.unwrap();
    assert_eq!(principal.id, "u1");
    assert_eq!(principal.school_id.as_deref(), Some("s1"));
    assert_eq!(principal.profile["name"], "Ana");
    assert!(principal.profile.get("password").is_none());

    let err = services.auth.authenticate(&login("abc", "prof@x.com", "bad")).await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::InvalidCredentials);

    let err = services.auth.authenticate(&login("def", "b@x.com", "pw2")).await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::AccessBlocked);
}

#[tokio::test]
async fn super_admin_is_provisioned_once() {
    let store = two_schools().await;

    assert!(store.ensure_super_admin(&hasher(), "Root@Campus.io", "secret").await.unwrap());
    assert!(!store.ensure_super_admin(&hasher(), "root@campus.io", "other").await.unwrap());

    let services = store.services(hasher(), AuthGateOptions::default());
    let principal = services
        .auth
        .authenticate(&LoginRequest {
            tenant_code: None,
            email: "root@campus.io".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(principal.role, Role::SuperAdmin);
    assert_eq!(principal.school_id, None);
}

#[tokio::test]
async fn inspector_reads_the_live_catalog() {
    let store = SqlStore::in_memory().await.unwrap();
    let inspector = store.inspector();

    assert!(inspector.is_cached("students").await);
    let columns = inspector.columns_of("students").await.unwrap();
    assert_eq!(columns.iter().next(), Some("id"));
    assert!(columns.contains("schoolId"));

    let err = inspector.columns_of("no_such_table").await.unwrap_err();
    assert_eq!(CampusError::kind_of(&err), ErrorKind::SchemaUnavailable);
}
