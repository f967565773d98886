use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use orbit_learn::auth::{AuthEvent, ConsentStatus, NewChildProfile, TokenUpdate};
use orbit_learn::config::ClientOptions;
use orbit_learn::error::Error;
use orbit_learn::guards::{protected_route, RouteTarget};
use orbit_learn::mode::{Mode, ModeOptions};
use orbit_learn::onboarding::OnboardingStep;
use orbit_learn::storage::{
    keys, EncryptedFileCredentials, FileStore, KeyValueStore, MemoryCredentials, MemoryStore,
    StorageManager,
};
use orbit_learn::OrbitLearn;
use serde_json::{json, Value};
use tokio_test::assert_ok;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn child(id: &str, name: &str) -> Value {
    json!({ "id": id, "displayName": name, "age": 8 })
}

fn parent(tier: &str) -> Value {
    json!({
        "id": "p1",
        "email": "bob@x.com",
        "firstName": "Bob",
        "emailVerified": true,
        "consentStatus": "verified",
        "subscriptionTier": tier
    })
}

async fn mount_sign_in(server: &MockServer, user: Value, children: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "parent": user,
                "children": children,
                "token": "at1",
                "refreshToken": "rt1"
            }
        })))
        .mount(server)
        .await;
}

async fn signed_in(server: &MockServer, children: Vec<Value>) -> OrbitLearn {
    mount_sign_in(server, parent("family_plus"), children).await;
    let client = OrbitLearn::new(&server.uri()).unwrap();
    client.auth().sign_in("bob@x.com", "rocket42").await.unwrap();
    client
}

#[tokio::test]
async fn test_concurrent_401s_share_a_single_refresh() {
    let _ = pretty_env_logger::try_init();
    let server = MockServer::start().await;
    let client = signed_in(&server, vec![child("c1", "Ada")]).await;

    Mock::given(method("GET"))
        .and(path("/progress"))
        .and(header("authorization", "Bearer at1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": "Token expired"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/progress"))
        .and(header("authorization", "Bearer at2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "lessons": 3 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "rt1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(json!({
                    "success": true,
                    "data": { "token": "at2", "refreshToken": "rt2" }
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = client.api();
    let results = join_all((0..5).map(|_| api.get::<Value>("/progress"))).await;

    for result in results {
        assert_eq!(result.unwrap(), json!({ "lessons": 3 }));
    }
    let tokens = client.auth().tokens();
    assert_eq!(tokens.access_token().as_deref(), Some("at2"));
    assert_eq!(tokens.refresh_token().as_deref(), Some("rt2"));
    assert!(!api.refresher().is_refreshing());
}

#[tokio::test]
async fn test_concurrent_child_token_401s_fall_back_to_one_parent_refresh() {
    let _ = pretty_env_logger::try_init();
    let server = MockServer::start().await;
    let client = signed_in(&server, vec![child("c1", "Ada")]).await;
    client
        .auth()
        .tokens()
        .set_tokens(TokenUpdate::child("child-token"));

    Mock::given(method("GET"))
        .and(path("/progress"))
        .and(header("authorization", "Bearer child-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": "Child token expired"
        })))
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/progress"))
        .and(header("authorization", "Bearer at1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/progress"))
        .and(header("authorization", "Bearer at2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "lessons": 3 })))
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "rt1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(json!({
                    "success": true,
                    "data": { "token": "at2", "refreshToken": "rt2" }
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = client.api();
    let results = join_all((0..5).map(|_| api.get::<Value>("/progress"))).await;

    for result in results {
        assert_eq!(result.unwrap(), json!({ "lessons": 3 }));
    }
    let tokens = client.auth().tokens();
    assert_eq!(tokens.child_token(), None);
    assert_eq!(tokens.active_token().as_deref(), Some("at2"));
    assert_eq!(tokens.refresh_token().as_deref(), Some("rt2"));
    server.verify().await;
}

#[tokio::test]
async fn test_second_401_expires_the_session() {
    let server = MockServer::start().await;
    let client = signed_in(&server, vec![child("c1", "Ada")]).await;

    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "token": "at2", "refreshToken": "rt2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.api().get::<Value>("/reports").await;
    assert!(matches!(result, Err(Error::SessionExpired)));
    assert!(!client.auth().tokens().has_session());
    assert!(!client.auth().is_authenticated());
}

#[tokio::test]
async fn test_failed_refresh_signs_out() {
    let server = MockServer::start().await;
    let client = signed_in(&server, vec![child("c1", "Ada")]).await;
    let mut events = client.auth().subscribe();

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": "Refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.auth().refresh_user().await;
    assert!(matches!(result, Err(Error::SessionExpired)));
    assert_eq!(client.auth().user(), None);
    assert!(client.auth().children().is_empty());
    assert_eq!(events.try_recv().unwrap(), AuthEvent::SessionExpired);
}

#[tokio::test]
async fn test_child_token_401_falls_back_to_parent_scope() {
    let server = MockServer::start().await;
    let client = signed_in(&server, vec![child("c1", "Ada")]).await;
    client.auth().tokens().set_tokens(TokenUpdate::child("child-token"));

    Mock::given(method("GET"))
        .and(path("/lessons"))
        .and(header("authorization", "Bearer child-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lessons"))
        .and(header("authorization", "Bearer at2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "token": "at2", "refreshToken": "rt2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lessons: Value = client.api().get("/lessons").await.unwrap();
    assert_eq!(lessons, json!([]));
    assert!(!client.auth().tokens().is_child_mode());
}

#[tokio::test]
async fn test_sign_up_awaits_email_verification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/signup"))
        .and(body_json(json!({
            "email": "bob@x.com",
            "password": "rocket42",
            "firstName": "Bob",
            "lastName": "Builder",
            "country": "US"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "userId": "p9", "requiresEmailVerification": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OrbitLearn::new(&server.uri()).unwrap();
    let outcome = client
        .auth()
        .sign_up(" Bob@X.com ", "rocket42", "Bob", "Builder")
        .await
        .unwrap();

    assert!(outcome.requires_email_verification);
    let auth = client.auth();
    assert!(auth.needs_email_verification());
    assert!(!auth.is_authenticated());
    assert_eq!(auth.pending_verification_email().as_deref(), Some("bob@x.com"));
    assert!(!auth.tokens().has_session());
}

#[tokio::test]
async fn test_sign_up_validation_never_reaches_server() {
    let server = MockServer::start().await;
    let client = OrbitLearn::new(&server.uri()).unwrap();

    let err = client
        .auth()
        .sign_up("bob@x.com", "short", "Bob", "Builder")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { field: "password", .. }));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_verify_email_with_session_signs_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/verify-email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "user": {
                    "id": "p1",
                    "email": "bob@x.com",
                    "emailVerified": true,
                    "consentStatus": "unverified"
                },
                "children": [],
                "token": "at1",
                "refreshToken": "rt1"
            }
        })))
        .mount(&server)
        .await;

    let client = OrbitLearn::new(&server.uri()).unwrap();
    let outcome = client.auth().verify_email("bob@x.com", "123456").await.unwrap();
    assert!(outcome.signed_in);

    let auth = client.auth();
    assert!(auth.is_authenticated());
    assert!(auth.needs_consent());
    assert!(!auth.needs_email_verification());
    assert_eq!(auth.pending_verification_email(), None);

    let decision = protected_route(&client.guard_context(), "/dashboard");
    assert_eq!(
        decision.redirect_target(),
        Some(&RouteTarget::Onboarding(Some(OnboardingStep::ConsentMethod)))
    );
}

#[tokio::test]
async fn test_rejected_credentials_keep_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": "Invalid email or password"
        })))
        .mount(&server)
        .await;

    let client = OrbitLearn::new(&server.uri()).unwrap();
    let err = client.auth().sign_in("bob@x.com", "wrong-pass1").await.unwrap_err();
    assert!(matches!(err, Error::Auth(ref m) if m == "Invalid email or password"));
    assert!(!client.auth().is_loading());
    assert!(!client.auth().is_authenticated());
}

#[tokio::test]
async fn test_sign_in_restores_selected_profile() {
    let server = MockServer::start().await;
    mount_sign_in(
        &server,
        parent("family"),
        vec![child("c1", "Ada"), child("c2", "Grace")],
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    store.set("current_profile_id", "c2").unwrap();
    let storage = StorageManager::new(store, Arc::new(MemoryCredentials::new()));
    let client =
        OrbitLearn::new_with_storage(&server.uri(), storage, ClientOptions::default()).unwrap();

    let outcome = client.auth().sign_in("bob@x.com", "rocket42").await.unwrap();
    assert_eq!(outcome.children.len(), 2);
    assert_eq!(client.auth().current_profile().unwrap().id, "c2");
    assert!(client.auth().flags().is_fully_onboarded());
    assert!(client.auth().is_ready());
}

#[tokio::test]
async fn test_sign_out_clears_tokens_and_user_storage() {
    let server = MockServer::start().await;
    let client = signed_in(&server, vec![child("c1", "Ada")]).await;

    Mock::given(method("POST"))
        .and(path("/profiles/children/c1/select"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "token": "child-token" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/signout"))
        .and(body_json(json!({ "refreshToken": "rt1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client.profiles().select("c1").await.unwrap();
    assert_eq!(
        client.auth().tokens().active_token().as_deref(),
        Some("child-token")
    );

    let storage = client.storage();
    storage.for_user("p1").set("theme", "dark").unwrap();
    storage.for_child("c1").set("streak", "4").unwrap();
    let mode = client.mode_session(ModeOptions::default()).unwrap();
    assert!(mode.switch_to_parent_mode("2468"));

    client.auth().sign_out().await;

    let tokens = client.auth().tokens();
    assert_eq!(tokens.child_token(), None);
    assert_eq!(tokens.access_token(), None);
    assert_eq!(tokens.refresh_token(), None);
    assert_eq!(client.auth().user(), None);
    assert_eq!(client.auth().current_profile(), None);
    assert_eq!(storage.keys(), vec!["parent_pin_p1".to_string()]);
    assert!(storage.secret(keys::REFRESH_TOKEN).is_none());
    assert!(storage.secret(keys::CHILD_TOKEN).is_none());

    // The mode session does not outlive the parent's auth session.
    assert_eq!(mode.current_mode(), Mode::Child);
    assert!(!mode.is_watching());
    assert!(client.auth().mode_session().is_none());
    assert_eq!(client.guard_context().current_mode, Mode::Child);
}

#[tokio::test]
async fn test_mode_session_is_shared_and_ended_on_session_expiry() {
    let server = MockServer::start().await;
    let client = signed_in(&server, vec![child("c1", "Ada")]).await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mode = client.mode_session(ModeOptions::default()).unwrap();
    assert!(mode.switch_to_parent_mode("2468"));
    mode.start_inactivity_watcher();
    let again = client.mode_session(ModeOptions::default()).unwrap();
    assert!(Arc::ptr_eq(&mode, &again));
    assert_eq!(client.guard_context().current_mode, Mode::Parent);

    let result = client.auth().refresh_user().await;
    assert!(matches!(result, Err(Error::SessionExpired)));
    assert_eq!(mode.current_mode(), Mode::Child);
    assert!(!mode.is_watching());
    assert!(matches!(
        client.mode_session(ModeOptions::default()),
        Err(Error::NotInitialized)
    ));
}

#[tokio::test]
async fn test_child_storage_follows_the_selected_profile() {
    let server = MockServer::start().await;
    let client = signed_in(&server, vec![child("a", "Ada"), child("b", "Bea")]).await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let auth = client.auth();
    assert_eq!(auth.user_storage().unwrap().prefix(), "user:p1:");
    assert_eq!(auth.child_storage().unwrap().prefix(), "child:a:");

    assert!(auth.switch_profile("b"));
    auth.child_storage().unwrap().set("streak", "2").unwrap();
    assert_eq!(client.storage().get("child:b:streak"), Some("2".to_string()));
    assert!(client.storage().for_child("a").keys().is_empty());

    client.profiles().delete("b").await.unwrap();
    assert_eq!(auth.child_storage().unwrap().prefix(), "child:a:");
    assert_eq!(client.storage().get("child:b:streak"), None);

    Mock::given(method("POST"))
        .and(path("/auth/signout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;
    auth.sign_out().await;
    assert!(auth.child_storage().is_none());
    assert!(auth.user_storage().is_none());
}

#[tokio::test]
async fn test_sign_out_survives_backend_failure() {
    let server = MockServer::start().await;
    let client = signed_in(&server, vec![child("c1", "Ada")]).await;
    Mock::given(method("POST"))
        .and(path("/auth/signout"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    client.auth().sign_out().await;
    assert!(!client.auth().is_authenticated());
    assert!(client.storage().keys().is_empty());
}

#[tokio::test]
async fn test_removing_current_profile_falls_back_to_first() {
    let server = MockServer::start().await;
    let client = signed_in(
        &server,
        vec![child("a", "Ada"), child("b", "Bea"), child("c", "Cy")],
    )
    .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    assert!(client.auth().switch_profile("b"));
    client.storage().for_child("b").set("streak", "2").unwrap();

    let profiles = client.profiles();
    profiles.delete("b").await.unwrap();
    assert_eq!(client.auth().current_profile().unwrap().id, "a");
    assert!(client.storage().for_child("b").keys().is_empty());

    profiles.delete("a").await.unwrap();
    assert_eq!(client.auth().current_profile().unwrap().id, "c");
    profiles.delete("c").await.unwrap();
    assert_eq!(client.auth().current_profile(), None);
    assert!(client.auth().needs_child_profile());
}

#[tokio::test]
async fn test_child_limit_is_enforced_locally() {
    let server = MockServer::start().await;
    mount_sign_in(&server, parent("free"), vec![child("c1", "Ada")]).await;
    let client = OrbitLearn::new(&server.uri()).unwrap();
    client.auth().sign_in("bob@x.com", "rocket42").await.unwrap();

    assert_eq!(client.auth().child_limit(), 1);
    assert!(!client.auth().can_add_child());

    let err = client
        .profiles()
        .create(&NewChildProfile {
            display_name: "Grace".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { field: "children", .. }));
    let posted = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/profiles/children")
        .count();
    assert_eq!(posted, 0);
}

#[tokio::test]
async fn test_created_profile_becomes_current() {
    let server = MockServer::start().await;
    mount_sign_in(&server, parent("family"), vec![]).await;
    Mock::given(method("POST"))
        .and(path("/profiles/children"))
        .and(body_json(json!({ "displayName": "Ada", "age": 7 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": { "child": child("c1", "Ada") }
        })))
        .mount(&server)
        .await;

    let client = OrbitLearn::new(&server.uri()).unwrap();
    client.auth().sign_in("bob@x.com", "rocket42").await.unwrap();
    assert!(client.auth().needs_child_profile());

    let created = client
        .profiles()
        .create(&NewChildProfile {
            display_name: " Ada ".to_string(),
            age: Some(7),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(created.id, "c1");
    assert_eq!(client.auth().current_profile().unwrap().id, "c1");
    assert!(client.auth().flags().is_fully_onboarded());
    assert_eq!(
        client.storage().get("current_profile_id").as_deref(),
        Some("c1")
    );
}

#[tokio::test]
async fn test_kbq_consent_marks_user_verified() {
    let server = MockServer::start().await;
    let mut user = parent("free");
    user["consentStatus"] = json!("pending");
    mount_sign_in(&server, user, vec![]).await;
    Mock::given(method("GET"))
        .and(path("/auth/consent/kbq/questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "questions": [
                    { "id": "q1", "question": "Which street?", "options": ["Elm", "Oak"] }
                ]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/consent/kbq/verify"))
        .and(body_json(json!({ "answers": [{ "questionId": "q1", "answer": "Oak" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "verified": true }
        })))
        .mount(&server)
        .await;

    let client = OrbitLearn::new(&server.uri()).unwrap();
    client.auth().sign_in("bob@x.com", "rocket42").await.unwrap();
    assert!(client.auth().needs_consent());

    let consent = client.consent();
    let questions = consent.kbq_questions().await.unwrap();
    assert_eq!(questions[0].options, vec!["Elm", "Oak"]);

    let answers = vec![orbit_learn::api::KbqAnswer::new("q1", "Oak")];
    assert!(consent.submit_kbq(&answers).await.unwrap().verified);
    assert_eq!(
        client.auth().user().unwrap().consent_status,
        ConsentStatus::Verified
    );
    assert!(client.auth().needs_child_profile());
}

#[tokio::test]
async fn test_initialize_restores_persisted_session() {
    let server = MockServer::start().await;
    mount_sign_in(&server, parent("family"), vec![child("c1", "Ada")]).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "rt1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "token": "at2", "refreshToken": "rt2" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer at2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "user": parent("family"), "children": [child("c1", "Ada")] }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("session.json");
    let open = || {
        let store = FileStore::open(&file).unwrap();
        let credentials =
            EncryptedFileCredentials::with_key(dir.path().join("credentials.enc"), [5u8; 32])
                .unwrap();
        StorageManager::new(Arc::new(store), Arc::new(credentials))
    };
    {
        let client =
            OrbitLearn::new_with_storage(&server.uri(), open(), ClientOptions::default()).unwrap();
        client.auth().sign_in("bob@x.com", "rocket42").await.unwrap();
    }

    // The rotating refresh token only ever hits the encrypted file.
    let plain = std::fs::read_to_string(&file).unwrap();
    assert!(!plain.contains("rt1"));
    assert!(!plain.contains(keys::REFRESH_TOKEN));

    let client =
        OrbitLearn::new_with_storage(&server.uri(), open(), ClientOptions::default()).unwrap();
    assert!(!client.auth().is_initialized());
    assert_eq!(client.auth().tokens().access_token(), None);

    assert_ok!(client.auth().initialize().await);
    let auth = client.auth();
    assert!(auth.is_ready());
    assert!(auth.is_authenticated());
    assert_eq!(auth.user().unwrap().id, "p1");
    assert_eq!(auth.current_profile().unwrap().id, "c1");

    let mode = client.mode_session(ModeOptions::default()).unwrap();
    assert_eq!(mode.current_mode(), Mode::Child);
}

#[tokio::test]
async fn test_initialize_without_session_is_ready_and_signed_out() {
    let server = MockServer::start().await;
    let client = OrbitLearn::new(&server.uri()).unwrap();
    assert_ok!(client.auth().initialize().await);
    assert!(client.auth().is_ready());
    assert!(!client.auth().is_authenticated());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
