// Deckbind CLI
// Feeds button events from stdin through the activation engine

use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use deckbind_core::profile::ResolvedAction;
use deckbind_core::{
    parse_binding, ActivationMode, Engine, EngineSettings, ExecutionRequest, InputSink, LogSink,
    Profile,
};

/// Game keybinding activation engine
#[derive(Parser, Debug)]
#[command(name = "deckbind")]
#[command(version)]
#[command(about = "Replays game keybindings as synthetic input", long_about = None)]
struct Args {
    /// Engine settings file (defaults to ~/.config/deckbind/settings.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Bindings profile (TOML)
    #[arg(short, long, value_name = "PROFILE")]
    profile: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output instead of sending it to a virtual device
    #[arg(long)]
    dry_run: bool,

    /// Validate settings and profile, then exit
    #[arg(long)]
    check_config: bool,

    /// Print the profile's executable actions and exit
    #[arg(long)]
    list_actions: bool,

    /// Parse a binding string, print the result and exit
    #[arg(long, value_name = "BINDING")]
    parse: Option<String>,
}

/// One stdin line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Down(Target),
    Up(Target),
    Tap(Target),
    Sync,
    Quit,
}

/// An action from the profile, or an ad-hoc binding and mode
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    action: String,
    binding: Option<String>,
    mode: Option<String>,
}

impl Command {
    fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        if verb.starts_with('#') {
            return Ok(None);
        }
        let mut target = || -> Result<Target> {
            let action = words
                .next()
                .with_context(|| format!("'{}' needs an action name", verb))?;
            Ok(Target {
                action: action.to_string(),
                binding: words.next().map(str::to_string),
                mode: words.next().map(str::to_string),
            })
        };
        let command = match verb.to_ascii_lowercase().as_str() {
            "down" => Command::Down(target()?),
            "up" => Command::Up(target()?),
            "tap" => Command::Tap(target()?),
            "sync" => Command::Sync,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command '{}'", other),
        };
        Ok(Some(command))
    }
}

struct Application {
    args: Args,
    settings: EngineSettings,
    profile: Profile,
    actions: HashMap<String, ResolvedAction>,
    running: Arc<AtomicBool>,
}

impl Application {
    fn new(args: Args) -> Result<Self> {
        let settings = match &args.config {
            Some(path) => EngineSettings::from_file(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => EngineSettings::load_default().context("failed to load default settings")?,
        };
        let profile = match &args.profile {
            Some(path) => Profile::from_file(path)
                .with_context(|| format!("failed to load profile from {}", path.display()))?,
            None => Profile::default(),
        };
        let actions = profile
            .resolve()
            .into_iter()
            .map(|action| (action.name.clone(), action))
            .collect();

        Ok(Self {
            args,
            settings,
            profile,
            actions,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    fn check_config(&self) -> Result<()> {
        let mut invalid = 0;
        for action in self.actions.values() {
            if let Err(e) = parse_binding(&action.binding) {
                log::error!("'{}': {}", action.name, e);
                invalid += 1;
            }
        }
        if invalid > 0 {
            bail!("{} action(s) have invalid bindings", invalid);
        }
        println!(
            "Configuration is valid: {} actions, {} executable, {} activation modes",
            self.profile.actions.len(),
            self.actions.len(),
            self.profile.modes().len()
        );
        Ok(())
    }

    fn list_actions(&self) {
        let mut actions: Vec<&ResolvedAction> = self.actions.values().collect();
        actions.sort_by(|a, b| (&a.map, &a.name).cmp(&(&b.map, &b.name)));
        for action in actions {
            println!(
                "{:<28} {:<36} {:<24} {}",
                action.map, action.name, action.binding, action.mode
            );
        }
    }

    fn sink(&self) -> Result<Arc<dyn InputSink>> {
        if self.args.dry_run {
            return Ok(Arc::new(LogSink));
        }
        device_sink()
    }

    fn request(&self, target: &Target, is_button_down: bool) -> Result<ExecutionRequest> {
        let known = self.actions.get(&target.action);
        let binding = target
            .binding
            .clone()
            .or_else(|| known.map(|a| a.binding.clone()))
            .with_context(|| format!("unknown action '{}' and no binding given", target.action))?;
        let request = match (&target.mode, known) {
            (Some(mode), _) => {
                ExecutionRequest::from_names(&target.action, &binding, mode, is_button_down)
            }
            (None, Some(action)) => {
                ExecutionRequest::new(&target.action, binding, action.mode, is_button_down)
            }
            (None, None) => ExecutionRequest::new(
                &target.action,
                binding,
                ActivationMode::Press,
                is_button_down,
            ),
        };
        Ok(request)
    }

    fn spawn_signal_handler(&self, engine: Arc<Engine>) -> Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals =
            Signals::new([SIGINT, SIGTERM]).context("failed to install signal handler")?;
        let running = Arc::clone(&self.running);
        std::thread::Builder::new()
            .name("deckbind-signals".to_string())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    log::info!("Received signal {}, shutting down", signal);
                    running.store(false, Ordering::SeqCst);
                    engine.shutdown();
                    std::process::exit(0);
                }
            })
            .context("failed to spawn signal thread")?;
        Ok(())
    }

    fn run(&self) -> Result<()> {
        let engine = Arc::new(
            Engine::new(self.sink()?, self.settings.clone(), self.profile.modes())
                .context("failed to start engine")?,
        );
        self.spawn_signal_handler(Arc::clone(&engine))?;
        log::info!(
            "deckbind running with {} actions on {} workers",
            self.actions.len(),
            engine.worker_count()
        );

        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            let line = line.context("failed to read stdin")?;
            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("{}", e);
                    continue;
                }
            };
            if let Err(e) = self.handle(&engine, &command) {
                log::warn!("{}", e);
            }
            if command == Command::Quit {
                break;
            }
        }

        engine.shutdown();
        Ok(())
    }

    fn handle(&self, engine: &Engine, command: &Command) -> Result<()> {
        match command {
            Command::Down(target) => {
                engine.try_execute(&self.request(target, true)?)?;
            }
            Command::Up(target) => {
                engine.try_execute(&self.request(target, false)?)?;
            }
            Command::Tap(target) => {
                engine.try_execute(&self.request(target, true)?)?;
                engine.try_execute(&self.request(target, false)?)?;
            }
            Command::Sync => {
                engine.sync();
                println!("ok");
            }
            Command::Quit => {}
        }
        Ok(())
    }
}

#[cfg(feature = "uinput")]
fn device_sink() -> Result<Arc<dyn InputSink>> {
    let sink = deckbind_core::UinputSink::new().context("failed to create uinput device")?;
    Ok(Arc::new(sink))
}

#[cfg(not(feature = "uinput"))]
fn device_sink() -> Result<Arc<dyn InputSink>> {
    log::warn!("built without the 'uinput' feature, output is only logged");
    Ok(Arc::new(LogSink))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Some(binding) = &args.parse {
        let parsed = parse_binding(binding).with_context(|| format!("'{}'", binding))?;
        println!("{}", parsed);
        println!("{:#?}", parsed);
        return Ok(());
    }

    let app = Application::new(args)?;

    if app.args.check_config {
        return app.check_config();
    }
    if app.args.list_actions {
        app.list_actions();
        return Ok(());
    }

    app.run()
}
