// Integration tests for rbac-admin

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rbac_admin::backend::bridge::{OnError, OnSuccess};
use rbac_admin::backend::{Directory, HostError, HostRole, HostUser};
use rbac_admin::{
    BridgeBackend, BridgeSlot, Embedder, ErrorKind, HostBridge, IdStrategy, InMemoryBackend, ManagementService,
    NewRole, NewUser, RolePatch, ServiceError, Session, User, UserPatch, UserStatus,
};

#[derive(Clone, Copy)]
enum HostMode {
    Honest,
    Reject(&'static str),
    DropCallbacks,
    Deferred,
}

/// A host application answering through callbacks, backed by the sample directory.
struct FakeHost {
    dir: Mutex<Directory>,
    mode: HostMode,
}

impl FakeHost {
    fn new(mode: HostMode) -> Arc<Self> {
        Arc::new(Self { dir: Mutex::new(Directory::sample(IdStrategy::Sequential)), mode })
    }

    fn respond<T: Send + 'static>(&self, result: Result<T, String>, ok: OnSuccess<T>, err: OnError) {
        match self.mode {
            HostMode::Honest => deliver(result, ok, err),
            HostMode::Reject(msg) => err(HostError::from(msg)),
            HostMode::DropCallbacks => {}
            HostMode::Deferred => {
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(20));
                    deliver(result, ok, err);
                });
            }
        }
    }
}

fn deliver<T>(result: Result<T, String>, ok: OnSuccess<T>, err: OnError) {
    match result {
        Ok(v) => ok(v),
        Err(e) => err(HostError::from(e)),
    }
}

fn host_user(u: &User) -> HostUser {
    HostUser {
        id: Some(u.id.clone()),
        name: Some(u.name.clone()),
        email: Some(u.email.clone()),
        roles: Some(u.roles.clone()),
        status: Some(u.status.as_str().to_string()),
    }
}

fn parse_status(raw: Option<String>) -> Option<UserStatus> {
    raw.and_then(|s| s.parse().ok())
}

impl HostBridge for FakeHost {
    fn get_all_users(&self, ok: OnSuccess<Vec<HostUser>>, err: OnError) {
        let users = self.dir.lock().unwrap().users().iter().map(host_user).collect();
        self.respond(Ok(users), ok, err);
    }

    fn add_user(&self, user: HostUser, ok: OnSuccess<HostUser>, err: OnError) {
        let new = NewUser { name: user.name, email: user.email, roles: user.roles, status: parse_status(user.status) };
        let res = self.dir.lock().unwrap().add_user(new).map(|u| host_user(&u)).map_err(|e| e.to_string());
        self.respond(res, ok, err);
    }

    fn remove_user(&self, user_id: &str, ok: OnSuccess<bool>, err: OnError) {
        let removed = self.dir.lock().unwrap().remove_user(user_id).is_ok();
        self.respond(Ok(removed), ok, err);
    }

    fn modify_user(&self, user_id: &str, data: HostUser, ok: OnSuccess<HostUser>, err: OnError) {
        let patch = UserPatch {
            id: user_id.to_string(),
            name: data.name,
            email: data.email,
            roles: data.roles,
            status: parse_status(data.status),
        };
        // Echo the record without its id, like some hosts do.
        let res = self
            .dir
            .lock()
            .unwrap()
            .update_user(patch)
            .map(|u| HostUser { id: None, ..host_user(&u) })
            .map_err(|e| e.to_string());
        self.respond(res, ok, err);
    }

    fn get_all_roles(&self, ok: OnSuccess<Vec<HostRole>>, err: OnError) {
        let roles = self
            .dir
            .lock()
            .unwrap()
            .roles()
            .iter()
            .map(|r| HostRole {
                id: Some(r.id.clone()),
                name: Some(r.name.clone()),
                description: Some(r.description.clone()),
                permissions: Some(r.permissions.clone()),
            })
            .collect();
        self.respond(Ok(roles), ok, err);
    }

    fn add_role(&self, role: HostRole, ok: OnSuccess<HostRole>, err: OnError) {
        let new = NewRole { name: role.name, description: role.description, permissions: role.permissions };
        let res = self
            .dir
            .lock()
            .unwrap()
            .add_role(new)
            .map(|r| HostRole {
                id: Some(r.id),
                name: Some(r.name),
                description: Some(r.description),
                permissions: Some(r.permissions),
            })
            .map_err(|e| e.to_string());
        self.respond(res, ok, err);
    }

    fn remove_role(&self, role_id: &str, ok: OnSuccess<bool>, err: OnError) {
        let res = match self.dir.lock().unwrap().remove_role(role_id) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.to_string()),
        };
        self.respond(res, ok, err);
    }

    fn modify_role(&self, role_id: &str, data: HostRole, ok: OnSuccess<HostRole>, err: OnError) {
        let patch = RolePatch {
            id: role_id.to_string(),
            name: data.name,
            description: data.description,
            permissions: data.permissions,
        };
        let res = self
            .dir
            .lock()
            .unwrap()
            .update_role(patch)
            .map(|r| HostRole {
                id: Some(r.id),
                name: Some(r.name),
                description: Some(r.description),
                permissions: Some(r.permissions),
            })
            .map_err(|e| e.to_string());
        self.respond(res, ok, err);
    }
}

fn live_backend(mode: HostMode) -> BridgeBackend {
    let slot = BridgeSlot::new();
    slot.install(FakeHost::new(mode));
    BridgeBackend::live(slot)
}

// 1) Ids stay unique across adds and removals
#[tokio::test]
async fn memory_ids_are_unique_across_removals() {
    let svc = InMemoryBackend::new();
    let a = svc.add_user(NewUser::new("A", "a@x.com")).await.unwrap();
    let b = svc.add_user(NewUser::new("B", "b@x.com")).await.unwrap();
    svc.remove_user(&b.id).await.unwrap();
    let c = svc.add_user(NewUser::new("C", "c@x.com")).await.unwrap();
    let ids: Vec<String> = svc.list_users().await.unwrap().into_iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![a.id, c.id.clone()]);
    assert_eq!(c.id, "3");
}

// 2) Add then list round trip, with defaults applied
#[tokio::test]
async fn added_user_is_listed_exactly_once() {
    let svc = InMemoryBackend::seeded(IdStrategy::Sequential);
    let added = svc
        .add_user(NewUser::new("Dana", "dana@example.com").with_roles(["3"]))
        .await
        .unwrap();
    assert_eq!(added.status, UserStatus::Active);
    let users = svc.list_users().await.unwrap();
    assert_eq!(users.iter().filter(|u| u.id == added.id).count(), 1);
    assert_eq!(users.len(), 6);
}

// 3) Partial update merges; unknown id is NotFound and changes nothing
#[tokio::test]
async fn partial_update_and_unknown_id() {
    let svc = InMemoryBackend::seeded(IdStrategy::Sequential);
    let updated = svc.update_user(UserPatch::new("2").email("jane@new.example")).await.unwrap();
    assert_eq!(updated.name, "Jane Smith");
    assert_eq!(updated.email, "jane@new.example");
    assert_eq!(updated.roles, vec!["2"]);

    let before = svc.list_users().await.unwrap();
    let err = svc.update_user(UserPatch::new("999").name("Ghost")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(svc.list_users().await.unwrap(), before);

    let err = svc.update_role(RolePatch::new("999").name("Ghost")).await.unwrap_err();
    assert_eq!(err.to_string(), "Role with ID 999 not found");
}

// 4) A role held by users cannot be removed until nobody holds it
#[tokio::test]
async fn role_removal_respects_assignments() {
    let svc = InMemoryBackend::seeded(IdStrategy::Sequential);
    let err = svc.remove_role("3").await.unwrap_err();
    assert_eq!(err, ServiceError::ReferentialIntegrity { role_id: "3".into(), users: 2 });
    assert_eq!(svc.list_roles().await.unwrap().len(), 3);

    svc.remove_user("3").await.unwrap();
    svc.update_user(UserPatch::new("4").roles(vec!["2".into()])).await.unwrap();
    svc.remove_role("3").await.unwrap();
    assert!(svc.list_roles().await.unwrap().iter().all(|r| r.id != "3"));

    let err = svc.remove_user("3").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// 5) Mock bridge serves the same sample data as the seeded memory store
#[tokio::test]
async fn mock_bridge_matches_seeded_memory() {
    let mock = BridgeBackend::mock();
    let mem = InMemoryBackend::seeded(IdStrategy::Sequential);
    assert!(mock.is_mock());
    assert_eq!(mock.list_users().await.unwrap(), mem.list_users().await.unwrap());
    assert_eq!(mock.list_roles().await.unwrap(), mem.list_roles().await.unwrap());
}

// 6) Live bridge without a host fails every call the same way
#[tokio::test]
async fn live_bridge_without_host_is_unavailable() {
    let svc = BridgeBackend::live(BridgeSlot::new());
    let errors = vec![
        svc.list_users().await.unwrap_err(),
        svc.add_user(NewUser::new("A", "a@x")).await.unwrap_err(),
        svc.update_user(UserPatch::new("1").name("B")).await.unwrap_err(),
        svc.remove_user("1").await.unwrap_err(),
        svc.list_roles().await.unwrap_err(),
        svc.add_role(NewRole::new("R")).await.unwrap_err(),
        svc.update_role(RolePatch::new("1").name("S")).await.unwrap_err(),
        svc.remove_role("1").await.unwrap_err(),
    ];
    for e in errors {
        assert_eq!(e.kind(), ErrorKind::BackendUnavailable);
        assert_eq!(e.to_string(), "Bridge not available");
    }
}

// 7) Live bridge forwards to the installed host and reconciles its replies
#[tokio::test]
async fn live_bridge_round_trip() {
    let svc = live_backend(HostMode::Honest);
    assert_eq!(svc.list_users().await.unwrap().len(), 5);

    let added = svc.add_user(NewUser::new("Eve", "eve@example.com")).await.unwrap();
    assert_eq!(added.id, "6");

    let updated = svc.update_user(UserPatch::new("6").status(UserStatus::Locked)).await.unwrap();
    assert_eq!(updated.id, "6");
    assert_eq!(updated.name, "Eve");
    assert_eq!(updated.status, UserStatus::Locked);

    let err = svc.remove_user("nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = svc.remove_role("1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("assigned to 2 user(s)"));

    let role = svc.add_role(NewRole::new("Auditor").with_permissions(["read"])).await.unwrap();
    svc.remove_role(&role.id).await.unwrap();
}

// 8) Host failures map to transport errors
#[tokio::test]
async fn live_bridge_host_failures() {
    let rejecting = live_backend(HostMode::Reject("quota exceeded"));
    let err = rejecting.add_role(NewRole::new("R")).await.unwrap_err();
    assert_eq!(err, ServiceError::Transport("quota exceeded".into()));

    let silent = live_backend(HostMode::DropCallbacks);
    let err = silent.list_roles().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("dropped"));
}

// 9) Callbacks may arrive later from another thread
#[tokio::test]
async fn live_bridge_deferred_callbacks() {
    let svc = live_backend(HostMode::Deferred);
    let roles = svc.list_roles().await.unwrap();
    assert_eq!(roles.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["Admin", "Editor", "Viewer"]);
}

// 10) Installing a host after construction takes effect on the next call
#[tokio::test]
async fn bridge_slot_is_read_at_call_time() {
    let slot = BridgeSlot::new();
    let svc = BridgeBackend::live(slot.clone());
    assert_eq!(svc.list_users().await.unwrap_err().kind(), ErrorKind::BackendUnavailable);
    slot.install(FakeHost::new(HostMode::Honest));
    assert_eq!(svc.list_users().await.unwrap().len(), 5);
    slot.clear();
    assert_eq!(svc.list_roles().await.unwrap_err().kind(), ErrorKind::BackendUnavailable);
}

// 11) Session reconciles only after the backend confirms
#[tokio::test]
async fn session_reconciles_after_success_only() {
    let session = Session::new(Arc::new(InMemoryBackend::seeded(IdStrategy::Sequential)));
    assert!(session.snapshot().loading);
    session.load().await.unwrap();
    let snap = session.snapshot();
    assert!(!snap.loading);
    assert_eq!((snap.users.len(), snap.roles.len()), (5, 3));

    let role = session.add_role(NewRole::new("Auditor")).await.unwrap();
    assert_eq!(session.snapshot().role(&role.id).map(|r| r.name.as_str()), Some("Auditor"));

    let before = session.snapshot().users;
    let err = session.remove_user("404").await.unwrap_err();
    let snap = session.snapshot();
    assert_eq!(snap.users, before);
    assert_eq!(snap.error.as_deref(), Some(err.to_string().as_str()));

    session.clear_error();
    assert!(session.snapshot().error.is_none());
}

// 12) Loading through an absent bridge records the error and stops loading
#[tokio::test]
async fn session_load_without_bridge() {
    let session = Session::new(Arc::new(BridgeBackend::live(BridgeSlot::new())));
    let mut rx = session.subscribe();
    let err = session.load().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    rx.changed().await.unwrap();
    let snap = rx.borrow().clone();
    assert!(!snap.loading);
    assert_eq!(snap.error.as_deref(), Some("Bridge not available"));
    assert!(snap.users.is_empty());
}

// 13) Mounting is idempotent per container and unmounting twice is harmless
#[tokio::test]
async fn embedder_mount_lifecycle() {
    let embed = Embedder::new(Arc::new(InMemoryBackend::seeded(IdStrategy::Sequential)));
    let s = embed.render("admin-root").await.unwrap();
    assert_eq!(s.snapshot().users.len(), 5);
    assert!(embed.is_mounted("admin-root"));
    assert!(embed.render("   ").await.is_none());

    assert!(embed.unmount("admin-root"));
    assert!(!embed.unmount("admin-root"));
    assert!(!embed.is_mounted("admin-root"));
    assert!(embed.session("admin-root").is_none());
}

// 14) Deleting from the TUI goes through the session and updates the view
#[tokio::test]
async fn tui_delete_flow_updates_view() {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use rbac_admin::app::keymap::Keymap;
    use rbac_admin::app::update::{handle_key, perform, Step};
    use rbac_admin::app::{AppState, ModalState, Theme};

    let session = Session::new(Arc::new(InMemoryBackend::seeded(IdStrategy::Sequential)));
    let mut app = AppState::new(Theme::dark(), Keymap::default());
    session.load().await.unwrap();
    app.sync_from(&session.snapshot());
    assert_eq!(app.users.len(), 5);

    let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
    assert_eq!(handle_key(&mut app, key(KeyCode::Char('d'))), Step::Continue);
    assert!(matches!(app.modal, Some(ModalState::DeleteConfirm { selected: 1 })));
    handle_key(&mut app, key(KeyCode::Left));
    let Step::Run(pending) = handle_key(&mut app, key(KeyCode::Enter)) else {
        panic!("expected a pending delete");
    };
    perform(&mut app, &session, pending).await;

    assert_eq!(app.users.len(), 4);
    assert!(app.users.iter().all(|u| u.name != "John Doe"));
    assert!(matches!(&app.modal, Some(ModalState::Info { message }) if message.contains("John Doe")));
}

// 15) A refused role deletion surfaces the backend message
#[tokio::test]
async fn tui_refused_role_delete_shows_error() {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use rbac_admin::app::keymap::Keymap;
    use rbac_admin::app::update::{handle_key, perform, Step};
    use rbac_admin::app::{ActiveTab, AppState, ModalState, Theme};

    let session = Session::new(Arc::new(InMemoryBackend::seeded(IdStrategy::Sequential)));
    let mut app = AppState::new(Theme::dark(), Keymap::default());
    perform(&mut app, &session, rbac_admin::app::PendingAction::Reload).await;
    assert!(!app.data.loading);

    let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
    handle_key(&mut app, key(KeyCode::Tab));
    assert_eq!(app.active_tab, ActiveTab::Roles);
    handle_key(&mut app, key(KeyCode::Delete));
    handle_key(&mut app, key(KeyCode::Left));
    let Step::Run(pending) = handle_key(&mut app, key(KeyCode::Enter)) else {
        panic!("expected a pending delete");
    };
    perform(&mut app, &session, pending).await;

    assert_eq!(app.roles.len(), 3);
    assert_eq!(app.data.error.as_deref(), Some("Cannot delete role '1': assigned to 2 user(s)"));
    assert!(matches!(&app.modal, Some(ModalState::Info { message }) if message.starts_with("Error:")));

    // Closing the dialog acknowledges the error.
    let step = handle_key(&mut app, key(KeyCode::Enter));
    assert_eq!(step, Step::Run(rbac_admin::app::PendingAction::ClearError));
    let Step::Run(pending) = step else { unreachable!() };
    perform(&mut app, &session, pending).await;
    assert!(app.data.error.is_none());
}

// 16) Theme config roundtrip and init
#[test]
fn theme_roundtrip_and_init() {
    use rbac_admin::app::Theme;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    let mut path = std::env::temp_dir();
    let nonce = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    path.push(format!("rbac_theme_{}_{}.conf", std::process::id(), nonce));
    let path_str = path.to_string_lossy().to_string();

    let t = Theme::mocha();
    t.write_file(&path_str).expect("write theme");
    let t2 = Theme::from_file(&path_str).expect("read theme");
    assert_eq!(t.text, t2.text);
    assert_eq!(t.error_fg, t2.error_fg);
    assert_eq!(t.header_bg, t2.header_bg);

    let mut p2 = PathBuf::from(&path_str);
    p2.set_file_name(format!("{}_init.conf", p2.file_stem().unwrap().to_string_lossy()));
    let p2_str = p2.to_string_lossy().to_string();
    let _ = std::fs::remove_file(&p2_str);
    let _created = Theme::load_or_init(&p2_str);

    let _ = std::fs::remove_file(&path_str);
    let _ = std::fs::remove_file(&p2_str);
}
