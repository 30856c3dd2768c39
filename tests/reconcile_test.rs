//! Reconciliation and dispatch integration tests
//! Run with: cargo test --test reconcile_test

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use galactic_bot::application::errors::{
    BotError, DispatchError, HandlerError, RegistrationError, ValidationError,
};
use galactic_bot::application::messaging::InteractionRouter;
use galactic_bot::application::services::{
    DuplicatePolicy, HandlerRegistry, ReconcileOptions, ReconcileState, Reconciler, SharedRegistry, Stage,
};
use galactic_bot::domain::entities::payload::{COMMAND_CHAT_INPUT, COMMAND_USER};
use galactic_bot::domain::entities::{
    CommandCategory, CommandDefinition, CommandPayload, CommandSchema, ContextCommandDefinition,
    Interaction, OptionDefinition, Privilege, PrivilegePayload, SubCommand, SubCommandGroup,
};
use galactic_bot::domain::traits::{CommandRegistry, InteractionHandler, RemoteCommand, RemoteId};
use galactic_bot::infrastructure::adapters::InMemoryRegistry;

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn schema() -> CommandSchema {
    CommandSchema::new()
        .with_moderator(
            CommandDefinition::new("ban", "Ban a member")
                .with_handler("mod.ban")
                .with_option(OptionDefinition::new("member", "user", "Member").required()),
        )
        .with_moderator(
            CommandDefinition::new("punish", "Punishments").with_handler("mod.punish").with_group(
                SubCommandGroup::new("member", "Member actions")
                    .with_sub_command(SubCommand::new("kick", "Kick"))
                    .with_sub_command(SubCommand::new("mute", "Mute")),
            ),
        )
        .with_user(CommandDefinition::new("ping", "Ping").with_handler("user.ping"))
        .with_context(ContextCommandDefinition::new("User Info", "user").with_handler("ctx.info"))
}

fn reconciler(registry: Arc<dyn CommandRegistry>, options: ReconcileOptions) -> (Reconciler, Arc<SharedRegistry>) {
    let shared = Arc::new(SharedRegistry::new());
    (Reconciler::new(registry, shared.clone(), options), shared)
}

/// Wraps the in-memory registry; fails upserts of one command type, every
/// privilege update or every delete, and can delay every call.
#[derive(Clone, Default)]
struct TestRegistry {
    inner: InMemoryRegistry,
    fail_kind: Option<u8>,
    fail_privileges: bool,
    panic_on_delete: bool,
    delay_ms: Arc<AtomicU64>,
}

impl TestRegistry {
    fn failing(kind: u8) -> Self {
        Self {
            fail_kind: Some(kind),
            ..Default::default()
        }
    }

    fn set_delay(&self, millis: u64) {
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    async fn pause(&self) {
        let millis = self.delay_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

#[async_trait]
impl CommandRegistry for TestRegistry {
    async fn upsert(&self, payload: &CommandPayload) -> Result<RemoteId, RegistrationError> {
        self.pause().await;
        if self.fail_kind == Some(payload.kind) {
            return Err(RegistrationError::Remote("HTTP 500".to_string()));
        }
        self.inner.upsert(payload).await
    }

    async fn list_all(&self) -> Result<Vec<RemoteCommand>, RegistrationError> {
        self.inner.list_all().await
    }

    async fn delete(&self, id: &RemoteId) -> Result<(), RegistrationError> {
        self.pause().await;
        if self.panic_on_delete {
            panic!("connection reset while deleting {}", id);
        }
        self.inner.delete(id).await
    }

    async fn set_privileges(
        &self,
        id: &RemoteId,
        guild_id: &str,
        privileges: &[PrivilegePayload],
    ) -> Result<(), RegistrationError> {
        if self.fail_privileges {
            return Err(RegistrationError::Remote("HTTP 401".to_string()));
        }
        self.inner.set_privileges(id, guild_id, privileges).await
    }

    fn name(&self) -> &str {
        "test"
    }
}

#[tokio::test]
async fn test_reconciliation_is_idempotent() {
    ensure_init();
    let registry = InMemoryRegistry::new();
    let (reconciler, shared) = reconciler(Arc::new(registry.clone()), ReconcileOptions::default());

    let first = reconciler.reconcile(&schema()).await.unwrap();
    let gen1 = shared.current();
    let payload1 = registry.get("ban", COMMAND_CHAT_INPUT).await.unwrap();

    let second = reconciler.reconcile(&schema()).await.unwrap();
    let gen2 = shared.current();
    let payload2 = registry.get("ban", COMMAND_CHAT_INPUT).await.unwrap();

    assert!(first.is_clean() && second.is_clean());
    assert_eq!((gen1.number, gen2.number), (1, 2));
    for category in [CommandCategory::Moderator, CommandCategory::User, CommandCategory::Context] {
        assert_eq!(gen1.names(category), gen2.names(category));
    }
    assert_eq!(payload1, payload2);
    assert_eq!(gen1.moderator[0].remote_id, gen2.moderator[0].remote_id);
    assert_eq!(registry.len().await, 4);
}

#[tokio::test]
async fn test_teardown_leaves_exactly_declared_names() {
    ensure_init();
    let registry = InMemoryRegistry::new();
    for stale in ["stale", "ban"] {
        registry
            .upsert(&CommandPayload {
                name: stale.to_string(),
                kind: COMMAND_CHAT_INPUT,
                description: "old".to_string(),
                options: Vec::new(),
                default_permission: None,
            })
            .await
            .unwrap();
    }

    let options = ReconcileOptions {
        delete_on_reload: true,
        ..Default::default()
    };
    let (reconciler, _) = reconciler(Arc::new(registry.clone()), options);
    let report = reconciler.reconcile(&schema()).await.unwrap();

    assert_eq!(report.deleted, 2);
    assert!(report.is_clean());
    assert_eq!(registry.names().await, vec!["User Info", "ban", "ping", "punish"]);
    assert_eq!(registry.get("ban", COMMAND_CHAT_INPUT).await.unwrap().description, "Ban a member");
}

#[tokio::test]
async fn test_aborted_deletion_is_reported() {
    ensure_init();
    let registry = TestRegistry {
        panic_on_delete: true,
        ..Default::default()
    };
    registry
        .inner
        .upsert(&CommandPayload {
            name: "stale".to_string(),
            kind: COMMAND_CHAT_INPUT,
            description: "old".to_string(),
            options: Vec::new(),
            default_permission: None,
        })
        .await
        .unwrap();

    let options = ReconcileOptions {
        delete_on_reload: true,
        ..Default::default()
    };
    let (reconciler, shared) = reconciler(Arc::new(registry), options);
    let report = reconciler.reconcile(&schema()).await.unwrap();

    assert_eq!(report.deleted, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Teardown);
    // Registration still runs after the failed teardown
    assert_eq!(shared.current().len(), 4);
}

#[tokio::test]
async fn test_unknown_option_type_is_excluded() {
    ensure_init();
    let registry = InMemoryRegistry::new();
    let schema = schema().with_moderator(
        CommandDefinition::new("warn", "Warn")
            .with_handler("mod.warn")
            .with_option(OptionDefinition::new("level", "not_a_type", "Level")),
    );

    let (reconciler, shared) = reconciler(Arc::new(registry.clone()), ReconcileOptions::default());
    let report = reconciler.reconcile(&schema).await.unwrap();

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.stage, Stage::Validate);
    assert_eq!(failure.category, Some(CommandCategory::Moderator));
    assert!(matches!(
        failure.error,
        RegistrationError::Invalid(ValidationError::UnknownOptionType { .. })
    ));

    assert!(registry.get("warn", COMMAND_CHAT_INPUT).await.is_none());
    assert!(shared.current().find_slash("warn").is_none());
    // Siblings are unaffected
    assert!(shared.current().find_slash("ban").is_some());
}

#[tokio::test]
async fn test_context_batch_failure_does_not_block_slash_batches() {
    ensure_init();
    let registry = TestRegistry::failing(COMMAND_USER);
    let (reconciler, shared) = reconciler(Arc::new(registry.clone()), ReconcileOptions::default());

    let report = reconciler.reconcile(&schema()).await.unwrap();
    let generation = shared.current();

    assert_eq!(generation.names(CommandCategory::Moderator), vec!["ban", "punish"]);
    assert_eq!(generation.names(CommandCategory::User), vec!["ping"]);
    assert!(generation.names(CommandCategory::Context).is_empty());

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].category, Some(CommandCategory::Context));
    assert_eq!(report.failures[0].name.as_deref(), Some("User Info"));
    assert_eq!(report.registered_in(CommandCategory::User), vec!["ping"]);
}

#[tokio::test]
async fn test_duplicate_names_allowed_by_default() {
    ensure_init();
    let registry = InMemoryRegistry::new();
    let schema = CommandSchema::new()
        .with_moderator(CommandDefinition::new("info", "Moderator info").with_handler("mod.info"))
        .with_user(CommandDefinition::new("info", "User info").with_handler("user.info"));

    let (reconciler, shared) = reconciler(Arc::new(registry.clone()), ReconcileOptions::default());
    let report = reconciler.reconcile(&schema).await.unwrap();
    let generation = shared.current();

    assert!(report.is_clean());
    assert_eq!(generation.names(CommandCategory::Moderator), vec!["info"]);
    assert_eq!(generation.names(CommandCategory::User), vec!["info"]);
    // Same name and type: one remote command, both entries point at it
    assert_eq!(registry.len().await, 1);
    assert_eq!(generation.moderator[0].remote_id, generation.user[0].remote_id);
    assert_eq!(generation.find_slash("info").unwrap().definition.handler, "mod.info");
}

#[tokio::test]
async fn test_duplicate_names_rejected_when_configured() {
    ensure_init();
    let registry = InMemoryRegistry::new();
    let schema = CommandSchema::new()
        .with_moderator(CommandDefinition::new("info", "Moderator info").with_handler("mod.info"))
        .with_user(CommandDefinition::new("info", "User info").with_handler("user.info"))
        .with_context(ContextCommandDefinition::new("info", "user").with_handler("ctx.info"));

    let options = ReconcileOptions {
        duplicate_policy: DuplicatePolicy::Reject,
        ..Default::default()
    };
    let (reconciler, shared) = reconciler(Arc::new(registry.clone()), options);
    let report = reconciler.reconcile(&schema).await.unwrap();
    let generation = shared.current();

    assert_eq!(generation.names(CommandCategory::Moderator), vec!["info"]);
    assert!(generation.names(CommandCategory::User).is_empty());
    // A context command is a different command type and may share the name
    assert_eq!(generation.names(CommandCategory::Context), vec!["info"]);

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0].error,
        RegistrationError::Invalid(ValidationError::DuplicateName { first: CommandCategory::Moderator, .. })
    ));
}

#[tokio::test]
async fn test_privileges_applied_to_configured_guild() {
    ensure_init();
    let registry = InMemoryRegistry::new();
    let schema = CommandSchema::new().with_moderator(
        CommandDefinition::new("ban", "Ban")
            .enabled_by_default(false)
            .with_handler("mod.ban")
            .with_privilege(Privilege::role("111", true))
            .with_privilege(Privilege::user("222", false)),
    );

    let options = ReconcileOptions {
        guild_id: Some("42".to_string()),
        ..Default::default()
    };
    let (reconciler, shared) = reconciler(Arc::new(registry.clone()), options);
    reconciler.reconcile(&schema).await.unwrap();

    let id = shared.current().moderator[0].remote_id.clone();
    let privileges = registry.privileges_of(&id, "42").await;
    assert_eq!(privileges.len(), 2);
    assert!(privileges[0].permission);
    assert!(!privileges[1].permission);
    assert_eq!(registry.get("ban", COMMAND_CHAT_INPUT).await.unwrap().default_permission, Some(false));
}

#[tokio::test]
async fn test_privilege_failure_keeps_command_routable() {
    ensure_init();
    let registry = TestRegistry {
        fail_privileges: true,
        ..Default::default()
    };
    let schema = CommandSchema::new().with_moderator(
        CommandDefinition::new("ban", "Ban")
            .with_handler("mod.ban")
            .with_privilege(Privilege::role("111", true)),
    );
    let options = ReconcileOptions {
        guild_id: Some("42".to_string()),
        ..Default::default()
    };
    let (reconciler, shared) = reconciler(Arc::new(registry.clone()), options);
    let report = reconciler.reconcile(&schema).await.unwrap();

    assert!(registry.inner.get("ban", COMMAND_CHAT_INPUT).await.is_some());
    assert_eq!(report.registered_in(CommandCategory::Moderator), vec!["ban"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Privileges);
    assert_eq!(report.failures[0].name.as_deref(), Some("ban"));
    assert_eq!(report.failures[0].error, RegistrationError::Remote("HTTP 401".to_string()));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handlers = HandlerRegistry::new().with("mod.ban", move || Counting(counter.clone()));
    let router = InteractionRouter::new(shared, Arc::new(handlers));
    router.route(&Interaction::slash("ban")).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_privileges_without_guild_still_register() {
    ensure_init();
    let registry = InMemoryRegistry::new();
    let schema = CommandSchema::new().with_moderator(
        CommandDefinition::new("ban", "Ban")
            .with_handler("mod.ban")
            .with_privilege(Privilege::user("222", true)),
    );
    let (reconciler, shared) = reconciler(Arc::new(registry.clone()), ReconcileOptions::default());
    let report = reconciler.reconcile(&schema).await.unwrap();

    assert!(report.is_clean());
    let id = shared.current().moderator[0].remote_id.clone();
    assert!(registry.privileges_of(&id, "42").await.is_empty());
    assert!(registry.get("ban", COMMAND_CHAT_INPUT).await.is_some());
}

#[tokio::test]
async fn test_reconcile_with_replaces_options() {
    ensure_init();
    let schema = CommandSchema::new()
        .with_moderator(CommandDefinition::new("info", "Moderator info").with_handler("mod.info"))
        .with_user(CommandDefinition::new("info", "User info").with_handler("user.info"));
    let (reconciler, shared) = reconciler(Arc::new(InMemoryRegistry::new()), ReconcileOptions::default());

    reconciler.reconcile(&schema).await.unwrap();
    assert_eq!(shared.current().names(CommandCategory::User), vec!["info"]);

    let reloaded = ReconcileOptions {
        duplicate_policy: DuplicatePolicy::Reject,
        ..Default::default()
    };
    let report = reconciler.reconcile_with(&schema, reloaded).await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(shared.current().names(CommandCategory::User).is_empty());

    // Later passes keep the reloaded options
    assert_eq!(reconciler.options().duplicate_policy, DuplicatePolicy::Reject);
    reconciler.reconcile(&schema).await.unwrap();
    assert!(shared.current().names(CommandCategory::User).is_empty());
}

#[tokio::test]
async fn test_slow_registry_times_out() {
    ensure_init();
    let registry = TestRegistry::default();
    registry.set_delay(500);
    let options = ReconcileOptions {
        timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let (reconciler, shared) = reconciler(Arc::new(registry), options);

    let report = reconciler.reconcile(&schema()).await.unwrap();
    assert_eq!(report.failures.len(), 4);
    assert!(report.failures.iter().all(|f| f.error == RegistrationError::Timeout));
    assert!(shared.current().is_empty());
    assert_eq!(shared.current().number, 1);
}

#[tokio::test]
async fn test_newer_pass_supersedes_and_old_generation_stays_visible() {
    ensure_init();
    let registry = TestRegistry::default();
    let shared = Arc::new(SharedRegistry::new());
    let reconciler = Arc::new(Reconciler::new(
        Arc::new(registry.clone()),
        shared.clone(),
        ReconcileOptions::default(),
    ));

    reconciler.reconcile(&schema()).await.unwrap();
    assert_eq!(shared.current().number, 1);

    registry.set_delay(300);
    let pending = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.reconcile(&schema()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Pass 2 is in flight; readers still see generation 1 in full
    assert_eq!(shared.current().number, 1);
    assert_eq!(shared.current().len(), 4);
    assert_eq!(reconciler.state(), ReconcileState::Registering);

    let latest = reconciler.reconcile(&schema()).await.unwrap();
    assert_eq!(latest.generation, 3);

    let superseded = pending.await.unwrap();
    assert!(matches!(superseded, Err(BotError::Superseded(2))));
    assert_eq!(shared.current().number, 3);
    assert_eq!(reconciler.state(), ReconcileState::Idle);
}

struct Counting(Arc<AtomicUsize>);

impl InteractionHandler for Counting {
    fn handle(&self, _interaction: &Interaction) -> Result<(), HandlerError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_reconcile_then_dispatch() {
    ensure_init();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handlers = HandlerRegistry::new().with("mod.ban", move || Counting(counter.clone()));

    let (reconciler, shared) = reconciler(Arc::new(InMemoryRegistry::new()), ReconcileOptions::default());
    reconciler.reconcile(&schema()).await.unwrap();
    let router = InteractionRouter::new(shared, Arc::new(handlers));

    router.route(&Interaction::slash("ban").with_guild("42")).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    match router.route(&Interaction::slash("unknown_cmd")) {
        Err(DispatchError::UnknownCommand(name)) => assert_eq!(name, "unknown_cmd"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Declared but without a registered handler
    assert!(matches!(
        router.route(&Interaction::slash("ping")),
        Err(DispatchError::HandlerUnavailable(_))
    ));
}
