use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use galactic_bot::application::errors::BotError;
use galactic_bot::application::handlers::{self, register_builtins};
use galactic_bot::application::messaging::{DispatchOutcome, InteractionRouter};
use galactic_bot::application::services::{HandlerRegistry, PayloadBuilder, Reconciler, SharedRegistry};
use galactic_bot::domain::entities::{
    Choice, CommandDefinition, CommandSchema, ContextCommandDefinition, OptionDefinition, SubCommand,
    SubCommandGroup,
};
use galactic_bot::domain::traits::CommandRegistry;
use galactic_bot::infrastructure::adapters::{ConsoleAdapter, ConsoleCommand, DiscordRegistry, InMemoryRegistry};
use galactic_bot::infrastructure::config::Config;

#[derive(Parser)]
#[command(name = "galactic-bot")]
#[command(about = "Declarative slash command registration and dispatch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the commands and start the console
    Run,
    /// Build every payload and report problems without contacting the registry
    Validate,
    /// Print the payloads that would be registered
    Dump,
    /// Show version
    Version,
    /// Write a default config and sample command files
    InitConfig {
        /// Directory to write into
        #[arg(default_value = ".")]
        directory: PathBuf,
    },
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run => run_bot(&cli.config, cli.token),
        Commands::Validate => validate(&cli.config),
        Commands::Dump => dump(&cli.config),
        Commands::Version => {
            println!("galactic-bot v{}", env!("CARGO_PKG_VERSION"));
            0
        }
        Commands::InitConfig { directory } => init_config(&directory),
    };
    std::process::exit(code);
}

fn load_config(config_path: &str, token_override: Option<String>) -> Config {
    let mut config = if Path::new(config_path).exists() {
        match Config::load(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    config.apply_env();
    if let Some(token) = token_override {
        config.discord.token = Some(token);
    }
    config
}

fn builtin_handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    register_builtins(&mut registry);
    registry
}

/// Load the command files and pick the registry backend
fn prepare(config: &Config) -> Result<(Arc<dyn CommandRegistry>, CommandSchema), BotError> {
    let schema = config.load_schema()?;

    let registry: Arc<dyn CommandRegistry> = if config.discord.token.is_some() {
        Arc::new(DiscordRegistry::from_config(config)?)
    } else {
        tracing::warn!("No bot token configured, registering against the in-memory registry");
        Arc::new(InMemoryRegistry::new())
    };
    Ok((registry, schema))
}

fn run_bot(config_path: &str, token_override: Option<String>) -> i32 {
    let config = load_config(config_path, token_override.clone());
    tracing::info!("Starting {}", config.bot.name);

    let (registry, schema) = match prepare(&config) {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            return 1;
        }
    };

    let handlers = Arc::new(builtin_handlers());
    for locator in handlers.unresolved(&schema) {
        tracing::warn!("No handler registered for locator '{}'", locator);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let shared = Arc::new(SharedRegistry::new());
        let reconciler = Arc::new(Reconciler::new(registry.clone(), shared.clone(), config.reconcile_options()));
        let router = InteractionRouter::new(shared.clone(), handlers.clone());

        if let Err(e) = reconciler.reconcile(&schema).await {
            tracing::error!("Initial registration failed: {}", e);
        }
        let console = ConsoleContext {
            config_path,
            token_override,
            registry: registry.as_ref(),
            reconciler,
            router: &router,
            shared: &shared,
        };
        console.run(config).await;
    });
    0
}

struct ConsoleContext<'a> {
    config_path: &'a str,
    token_override: Option<String>,
    registry: &'a dyn CommandRegistry,
    reconciler: Arc<Reconciler>,
    router: &'a InteractionRouter,
    shared: &'a SharedRegistry,
}

impl ConsoleContext<'_> {
    async fn run(&self, mut config: Config) {
        let mut console = ConsoleAdapter::new();
        tracing::info!("Type 'help' for the list of console commands");

        while let Some(command) = console.next_command().await {
            match command {
                ConsoleCommand::Reload => {
                    tracing::warn!("Reloading configuration and command files...");
                    let fresh = load_config(self.config_path, self.token_override.clone());
                    let schema = match fresh.load_schema() {
                        Ok(schema) => schema,
                        Err(e) => {
                            tracing::error!("Reload aborted: {}", e);
                            continue;
                        }
                    };
                    if fresh.guild_id() != config.guild_id() || fresh.discord.token != config.discord.token {
                        tracing::warn!(
                            "Registry target changes take effect after a restart; privileges use guild {:?}",
                            fresh.registration.guild_id
                        );
                    }
                    let options = fresh.reconcile_options();
                    config = fresh;

                    // Runs in the background; a later reload supersedes it
                    let reconciler = self.reconciler.clone();
                    tokio::spawn(async move {
                        match reconciler.reconcile_with(&schema, options).await {
                            Ok(report) => tracing::warn!(
                                "Reloaded generation {} ({} registered, {} failed)",
                                report.generation,
                                report.registered.len(),
                                report.failures.len()
                            ),
                            Err(e) => tracing::warn!("Reload did not complete: {}", e),
                        }
                    });
                }
                ConsoleCommand::Info => {
                    let generation = self.shared.current();
                    tracing::info!(
                        "{} v{} | registry: {} ({:?}) | generation {} published {} | {} moderator, {} user, {} context commands",
                        config.bot.name,
                        env!("CARGO_PKG_VERSION"),
                        self.registry.name(),
                        self.reconciler.state(),
                        generation.number,
                        generation.published_at.format("%Y-%m-%d %H:%M:%S"),
                        generation.moderator.len(),
                        generation.user.len(),
                        generation.context.len()
                    );
                }
                ConsoleCommand::Help => console.print_help(),
                ConsoleCommand::Stop => break,
                ConsoleCommand::Invoke(interaction) => {
                    if let DispatchOutcome::Handled = self.router.dispatch(&interaction) {
                        tracing::debug!("[{}] handled", interaction.id);
                    }
                }
                ConsoleCommand::Unknown(line) => {
                    tracing::warn!("Unknown console command: {} (try 'help')", line)
                }
                ConsoleCommand::Empty => {}
            }
        }

        self.reconciler.cancel();
        tracing::warn!("Shut down {}", config.bot.name);
    }
}

fn validate(config_path: &str) -> i32 {
    let config = load_config(config_path, None);
    let schema = match config.load_schema() {
        Ok(schema) => schema,
        Err(e) => {
            tracing::error!("Failed to load command files: {}", e);
            return 1;
        }
    };

    let builder = PayloadBuilder::new();
    let mut problems = 0;
    for (category, commands) in [("moderator", &schema.moderator), ("user", &schema.user)] {
        for command in commands {
            if let Err(e) = builder.build(command).and_then(|_| builder.build_privileges(command)) {
                tracing::error!("{} command '{}': {}", category, command.name, e);
                problems += 1;
            }
        }
    }
    for command in &schema.context {
        if let Err(e) = builder.build_context(command) {
            tracing::error!("context command '{}': {}", command.name, e);
            problems += 1;
        }
    }
    for locator in builtin_handlers().unresolved(&schema) {
        tracing::warn!("No handler registered for locator '{}'", locator);
    }

    if problems == 0 {
        tracing::info!("All {} commands are valid", schema.len());
        0
    } else {
        tracing::error!("{} of {} commands are invalid", problems, schema.len());
        1
    }
}

fn dump(config_path: &str) -> i32 {
    let config = load_config(config_path, None);
    let schema = match config.load_schema() {
        Ok(schema) => schema,
        Err(e) => {
            tracing::error!("Failed to load command files: {}", e);
            return 1;
        }
    };

    let builder = PayloadBuilder::new();
    let mut payloads = Vec::new();
    for command in schema.moderator.iter().chain(schema.user.iter()) {
        match builder.build(command) {
            Ok(payload) => payloads.push(payload),
            Err(e) => tracing::warn!("Skipping '{}': {}", command.name, e),
        }
    }
    for command in &schema.context {
        match builder.build_context(command) {
            Ok(payload) => payloads.push(payload),
            Err(e) => tracing::warn!("Skipping '{}': {}", command.name, e),
        }
    }

    match serde_json::to_string_pretty(&payloads) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            tracing::error!("Failed to serialize payloads: {}", e);
            1
        }
    }
}

fn sample_schema() -> CommandSchema {
    CommandSchema::new()
        .with_moderator(
            CommandDefinition::new("ban", "Ban a member from the server")
                .enabled_by_default(false)
                .with_handler(handlers::ECHO)
                .with_option(OptionDefinition::new("member", "user", "Member to ban").required())
                .with_option(
                    OptionDefinition::new("reason", "string", "Reason for the ban")
                        .with_choice(Choice::new("Spam", "spam"))
                        .with_choice(Choice::new("Harassment", "harassment")),
                ),
        )
        .with_moderator(
            CommandDefinition::new("punish", "Apply a punishment")
                .enabled_by_default(false)
                .with_handler(handlers::ECHO)
                .with_group(
                    SubCommandGroup::new("member", "Punish a member")
                        .with_sub_command(
                            SubCommand::new("kick", "Kick a member")
                                .with_option(OptionDefinition::new("member", "user", "Member").required()),
                        )
                        .with_sub_command(
                            SubCommand::new("mute", "Mute a member")
                                .with_option(OptionDefinition::new("member", "user", "Member").required())
                                .with_option(OptionDefinition::new("minutes", "integer", "Duration")),
                        ),
                ),
        )
        .with_user(CommandDefinition::new("ping", "Check that the bot is alive").with_handler(handlers::PING))
        .with_context(ContextCommandDefinition::new("User Info", "user").with_handler(handlers::ECHO))
}

fn init_config(directory: &Path) -> i32 {
    let config = Config::default();
    let schema = sample_schema();
    let commands_dir = directory.join(&config.commands.directory);

    let files = [
        (commands_dir.join(&config.commands.moderator), serde_yaml::to_string(&schema.moderator)),
        (commands_dir.join(&config.commands.user), serde_yaml::to_string(&schema.user)),
        (commands_dir.join(&config.commands.context), serde_yaml::to_string(&schema.context)),
        (directory.join("config.yaml"), serde_yaml::to_string(&config)),
    ];

    if let Err(e) = std::fs::create_dir_all(&commands_dir) {
        tracing::error!("Failed to create {}: {}", commands_dir.display(), e);
        return 1;
    }
    for (path, content) in files {
        if path.exists() {
            tracing::warn!("{} already exists, leaving it alone", path.display());
            continue;
        }
        let written = content
            .map_err(|e| e.to_string())
            .and_then(|yaml| std::fs::write(&path, yaml).map_err(|e| e.to_string()));
        match written {
            Ok(()) => tracing::info!("Wrote {}", path.display()),
            Err(e) => {
                tracing::error!("Failed to write {}: {}", path.display(), e);
                return 1;
            }
        }
    }
    0
}
