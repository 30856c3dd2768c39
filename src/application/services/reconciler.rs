//! Registration reconciler - Brings the remote registry in line with the
//! declared command schema

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::generation::{RegistryEntry, RegistryGeneration, SharedRegistry};
use super::payload_builder::PayloadBuilder;
use crate::application::errors::{BotError, RegistrationError, ValidationError};
use crate::domain::entities::{
    CommandCategory, CommandDefinition, CommandPayload, CommandSchema, ContextCommandDefinition,
    PrivilegePayload,
};
use crate::domain::traits::{CommandRegistry, RemoteId};

/// What to do when two categories declare the same command name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Register both; the registry keeps whichever upsert lands last
    #[default]
    Allow,
    /// Keep the first declaration and report the rest
    Reject,
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Delete every remote command before registering
    pub delete_on_reload: bool,
    pub duplicate_policy: DuplicatePolicy,
    /// Upper bound for each remote call
    pub timeout: Duration,
    /// Guild that privileges apply to
    pub guild_id: Option<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            delete_on_reload: false,
            duplicate_policy: DuplicatePolicy::Allow,
            timeout: Duration::from_secs(30),
            guild_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Idle,
    Clearing,
    Registering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Teardown,
    Validate,
    Register,
    /// Upsert succeeded but the guild privileges were not applied
    Privileges,
}

/// One definition (or teardown call) that did not make it
#[derive(Debug, Clone)]
pub struct ReconcileFailure {
    pub stage: Stage,
    pub category: Option<CommandCategory>,
    pub name: Option<String>,
    pub error: RegistrationError,
}

/// Outcome of a completed pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub generation: u64,
    pub deleted: usize,
    pub registered: Vec<(CommandCategory, String)>,
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    pub fn registered_in(&self, category: CommandCategory) -> Vec<&str> {
        self.registered
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, n)| n.as_str())
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct PassState {
    counter: u64,
    token: CancellationToken,
    state: ReconcileState,
    options: ReconcileOptions,
}

enum Job {
    Slash {
        category: CommandCategory,
        definition: Arc<CommandDefinition>,
        payload: CommandPayload,
        privileges: Vec<PrivilegePayload>,
    },
    Context {
        definition: Arc<ContextCommandDefinition>,
        payload: CommandPayload,
    },
}

impl Job {
    fn category(&self) -> CommandCategory {
        match self {
            Job::Slash { category, .. } => *category,
            Job::Context { .. } => CommandCategory::Context,
        }
    }

    fn name(&self) -> &str {
        match self {
            Job::Slash { definition, .. } => &definition.name,
            Job::Context { definition, .. } => &definition.name,
        }
    }

    fn payload(&self) -> &CommandPayload {
        match self {
            Job::Slash { payload, .. } | Job::Context { payload, .. } => payload,
        }
    }
}

/// Drives the remote registry. One instance per bot; every call to
/// [`Reconciler::reconcile`] is a new pass that supersedes any pass still in
/// flight.
pub struct Reconciler {
    registry: Arc<dyn CommandRegistry>,
    shared: Arc<SharedRegistry>,
    builder: PayloadBuilder,
    pass: Mutex<PassState>,
}

impl Reconciler {
    pub fn new(
        registry: Arc<dyn CommandRegistry>,
        shared: Arc<SharedRegistry>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            registry,
            shared,
            builder: PayloadBuilder::new(),
            pass: Mutex::new(PassState {
                counter: 0,
                token: CancellationToken::new(),
                state: ReconcileState::Idle,
                options,
            }),
        }
    }

    /// Options the next [`Reconciler::reconcile`] pass runs with
    pub fn options(&self) -> ReconcileOptions {
        self.lock_pass().options.clone()
    }

    pub fn shared(&self) -> &Arc<SharedRegistry> {
        &self.shared
    }

    /// State of the most recent pass
    pub fn state(&self) -> ReconcileState {
        self.lock_pass().state
    }

    /// Run one reconciliation pass and publish its generation.
    ///
    /// Failures of individual definitions are collected in the report; the
    /// pass only fails as a whole when a newer pass supersedes it.
    pub async fn reconcile(&self, schema: &CommandSchema) -> Result<ReconcileReport, BotError> {
        self.run_pass(schema, None).await
    }

    /// Same as [`Reconciler::reconcile`], with options replacing the current
    /// ones for this and every later pass
    pub async fn reconcile_with(
        &self,
        schema: &CommandSchema,
        options: ReconcileOptions,
    ) -> Result<ReconcileReport, BotError> {
        self.run_pass(schema, Some(options)).await
    }

    async fn run_pass(
        &self,
        schema: &CommandSchema,
        options: Option<ReconcileOptions>,
    ) -> Result<ReconcileReport, BotError> {
        let (number, token, options) = self.begin_pass(options);
        info!(
            "Reconciliation pass {} started against {} registry ({} commands)",
            number,
            self.registry.name(),
            schema.len()
        );

        let mut report = ReconcileReport {
            generation: number,
            ..Default::default()
        };

        if options.delete_on_reload {
            self.set_state(number, ReconcileState::Clearing);
            report.deleted = self.teardown(&token, options.timeout, &mut report.failures).await;
            info!("Deleted {} remote commands, now registering", report.deleted);
        }
        if token.is_cancelled() {
            return Err(self.superseded(number));
        }

        self.set_state(number, ReconcileState::Registering);
        let jobs = self.plan(schema, options.duplicate_policy, &mut report.failures);
        let mut generation = RegistryGeneration::new(number);
        let mut slash: HashMap<CommandCategory, Vec<(usize, RegistryEntry<CommandDefinition>)>> =
            HashMap::new();
        let mut context: Vec<(usize, RegistryEntry<ContextCommandDefinition>)> = Vec::new();

        let mut tasks = JoinSet::new();
        for (index, job) in jobs.into_iter().enumerate() {
            let registry = self.registry.clone();
            let token = token.clone();
            let timeout = options.timeout;
            let guild_id = options.guild_id.clone();
            tasks.spawn(async move {
                let result = register_one(registry.as_ref(), &job, &token, timeout, guild_id.as_deref()).await;
                (index, job, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, job, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Registration task aborted: {}", e);
                    report.failures.push(ReconcileFailure {
                        stage: Stage::Register,
                        category: None,
                        name: None,
                        error: RegistrationError::Remote(format!("task aborted: {}", e)),
                    });
                    continue;
                }
            };

            let category = job.category();
            match result {
                Ok((remote_id, privileges)) => {
                    debug!("Registered {} command '{}' as {}", category, job.name(), remote_id);
                    report.registered.push((category, job.name().to_string()));
                    if let Err(error) = privileges {
                        warn!("Failed to apply privileges of '{}': {}", job.name(), error);
                        report.failures.push(ReconcileFailure {
                            stage: Stage::Privileges,
                            category: Some(category),
                            name: Some(job.name().to_string()),
                            error,
                        });
                    }
                    match job {
                        Job::Slash { category, definition, .. } => slash
                            .entry(category)
                            .or_default()
                            .push((index, RegistryEntry::new(remote_id, definition))),
                        Job::Context { definition, .. } => {
                            context.push((index, RegistryEntry::new(remote_id, definition)))
                        }
                    }
                }
                Err(error) => {
                    warn!("Failed to register {} command '{}': {}", category, job.name(), error);
                    report.failures.push(ReconcileFailure {
                        stage: Stage::Register,
                        category: Some(category),
                        name: Some(job.name().to_string()),
                        error,
                    });
                }
            }
        }

        if token.is_cancelled() {
            return Err(self.superseded(number));
        }

        generation.moderator = in_declared_order(slash.remove(&CommandCategory::Moderator).unwrap_or_default());
        generation.user = in_declared_order(slash.remove(&CommandCategory::User).unwrap_or_default());
        generation.context = in_declared_order(context);
        report.registered.sort_by_key(|(c, _)| match c {
            CommandCategory::Moderator => 0,
            CommandCategory::User => 1,
            CommandCategory::Context => 2,
        });

        for category in [CommandCategory::Moderator, CommandCategory::User, CommandCategory::Context] {
            info!("Registered {} {} commands", generation.names(category).len(), category);
        }

        {
            // begin_pass cancels under this lock, so no newer pass can start
            // between the check and the swap
            let mut pass = self.lock_pass();
            if token.is_cancelled() || !self.shared.publish_if_newer(generation) {
                drop(pass);
                return Err(self.superseded(number));
            }
            pass.state = ReconcileState::Idle;
        }

        if report.is_clean() {
            info!("Reconciliation pass {} complete", number);
        } else {
            warn!(
                "Reconciliation pass {} complete with {} failures",
                number,
                report.failures.len()
            );
        }
        Ok(report)
    }

    /// Cancel the pass in flight, if any, without starting a new one
    pub fn cancel(&self) {
        let mut pass = self.lock_pass();
        pass.token.cancel();
        pass.state = ReconcileState::Idle;
    }

    fn begin_pass(&self, options: Option<ReconcileOptions>) -> (u64, CancellationToken, ReconcileOptions) {
        let mut pass = self.lock_pass();
        pass.token.cancel();
        pass.counter += 1;
        pass.token = CancellationToken::new();
        if let Some(options) = options {
            pass.options = options;
        }
        (pass.counter, pass.token.clone(), pass.options.clone())
    }

    fn set_state(&self, number: u64, state: ReconcileState) {
        let mut pass = self.lock_pass();
        if pass.counter == number {
            pass.state = state;
        }
    }

    fn superseded(&self, number: u64) -> BotError {
        info!("Reconciliation pass {} superseded, discarding its results", number);
        BotError::Superseded(number)
    }

    fn lock_pass(&self) -> std::sync::MutexGuard<'_, PassState> {
        match self.pass.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Delete everything on the remote side. All deletions settle before
    /// this returns so no creation can race a stale delete.
    async fn teardown(
        &self,
        token: &CancellationToken,
        timeout: Duration,
        failures: &mut Vec<ReconcileFailure>,
    ) -> usize {
        let remote = match guarded(token, timeout, self.registry.list_all()).await {
            Ok(remote) => remote,
            Err(error) => {
                warn!("Failed to list remote commands: {}", error);
                failures.push(ReconcileFailure {
                    stage: Stage::Teardown,
                    category: None,
                    name: None,
                    error,
                });
                return 0;
            }
        };

        let mut tasks = JoinSet::new();
        for command in remote {
            let registry = self.registry.clone();
            let token = token.clone();
            tasks.spawn(async move {
                let result = guarded(&token, timeout, registry.delete(&command.id)).await;
                (command, result)
            });
        }

        let mut deleted = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => deleted += 1,
                Ok((command, Err(error))) => {
                    warn!("Failed to delete remote command '{}' ({}): {}", command.name, command.id, error);
                    failures.push(ReconcileFailure {
                        stage: Stage::Teardown,
                        category: None,
                        name: Some(command.name),
                        error,
                    });
                }
                Err(e) => {
                    warn!("Deletion task aborted: {}", e);
                    failures.push(ReconcileFailure {
                        stage: Stage::Teardown,
                        category: None,
                        name: None,
                        error: RegistrationError::Remote(format!("task aborted: {}", e)),
                    });
                }
            }
        }
        deleted
    }

    /// Build every payload up front. Invalid or rejected definitions are
    /// reported and left out; the rest become jobs.
    fn plan(
        &self,
        schema: &CommandSchema,
        policy: DuplicatePolicy,
        failures: &mut Vec<ReconcileFailure>,
    ) -> Vec<Job> {
        let mut jobs = Vec::with_capacity(schema.len());
        let mut seen: HashMap<(u8, String), CommandCategory> = HashMap::new();

        let mut reject = |category: CommandCategory, name: &str, error: ValidationError| {
            warn!("Skipping {} command '{}': {}", category, name, error);
            failures.push(ReconcileFailure {
                stage: Stage::Validate,
                category: Some(category),
                name: Some(name.to_string()),
                error: error.into(),
            });
        };

        for category in [CommandCategory::Moderator, CommandCategory::User] {
            for command in schema.slash(category) {
                let built = self
                    .builder
                    .build(command)
                    .and_then(|payload| Ok((payload, self.builder.build_privileges(command)?)));
                let (payload, privileges) = match built {
                    Ok(built) => built,
                    Err(error) => {
                        reject(category, &command.name, error);
                        continue;
                    }
                };
                if let Err(error) = claim_name(&mut seen, policy, category, &payload) {
                    reject(category, &command.name, error);
                    continue;
                }
                jobs.push(Job::Slash {
                    category,
                    definition: Arc::new(command.clone()),
                    payload,
                    privileges,
                });
            }
        }

        for command in &schema.context {
            let payload = match self.builder.build_context(command) {
                Ok(payload) => payload,
                Err(error) => {
                    reject(CommandCategory::Context, &command.name, error);
                    continue;
                }
            };
            if let Err(error) = claim_name(&mut seen, policy, CommandCategory::Context, &payload) {
                reject(CommandCategory::Context, &command.name, error);
                continue;
            }
            jobs.push(Job::Context {
                definition: Arc::new(command.clone()),
                payload,
            });
        }

        jobs
    }
}

/// Names are keyed by command type: a slash command and a context
/// command may share a name on the platform.
fn claim_name(
    seen: &mut HashMap<(u8, String), CommandCategory>,
    policy: DuplicatePolicy,
    category: CommandCategory,
    payload: &CommandPayload,
) -> Result<(), ValidationError> {
    let key = (payload.kind, payload.name.clone());
    match seen.get(&key) {
        Some(first) => match policy {
            DuplicatePolicy::Allow => {
                warn!(
                    "Command '{}' declared in both {} and {} categories",
                    payload.name, first, category
                );
                Ok(())
            }
            DuplicatePolicy::Reject => Err(ValidationError::DuplicateName {
                name: payload.name.clone(),
                first: *first,
            }),
        },
        None => {
            seen.insert(key, category);
            Ok(())
        }
    }
}

/// Upsert one definition, then apply its privileges. The outer error is the
/// upsert failing; a privilege failure comes back alongside the id so the
/// command still lands in the generation.
async fn register_one(
    registry: &dyn CommandRegistry,
    job: &Job,
    token: &CancellationToken,
    timeout: Duration,
    guild_id: Option<&str>,
) -> Result<(RemoteId, Result<(), RegistrationError>), RegistrationError> {
    let remote_id = guarded(token, timeout, registry.upsert(job.payload())).await?;

    let mut privileges_applied = Ok(());
    if let Job::Slash { privileges, .. } = job {
        if !privileges.is_empty() {
            match guild_id {
                Some(guild) => {
                    privileges_applied =
                        guarded(token, timeout, registry.set_privileges(&remote_id, guild, privileges)).await
                }
                None => warn!(
                    "Command '{}' declares privileges but no guild is configured",
                    job.name()
                ),
            }
        }
    }
    Ok((remote_id, privileges_applied))
}

/// Run a remote call bounded by the pass's token and the per-call timeout
async fn guarded<T, F>(token: &CancellationToken, timeout: Duration, call: F) -> Result<T, RegistrationError>
where
    F: Future<Output = Result<T, RegistrationError>>,
{
    tokio::select! {
        _ = token.cancelled() => Err(RegistrationError::Cancelled),
        result = tokio::time::timeout(timeout, call) => match result {
            Ok(result) => result,
            Err(_) => Err(RegistrationError::Timeout),
        },
    }
}

fn in_declared_order<D>(mut entries: Vec<(usize, RegistryEntry<D>)>) -> Vec<RegistryEntry<D>> {
    entries.sort_by_key(|(index, _)| *index);
    entries.into_iter().map(|(_, entry)| entry).collect()
}
