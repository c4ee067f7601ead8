use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flyme_frame_tools::list_operations_queue::{ListOperation, ListOperationsQueue, OperationStatus};
use flyme_frame_tools::onboarding::{OnboardingFlow, OnboardingStep};
use flyme_frame_tools::{
    adb, log_capture, ChannelKind, ChannelState, Config, ListKey, PackageListStore, Settings,
};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

const PERMISSION_POLL_ATTEMPTS: u32 = 20;
const PERMISSION_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(
    name = "flyme-frame-tools",
    version,
    about = "Edit the Flyme frame interpolation and super resolution app lists"
)]
struct Cli {
    /// Privileged channel: adb, shizuku or local (defaults to settings)
    #[arg(long, global = true)]
    channel: Option<ChannelKind>,

    /// adb device serial (defaults to settings, then the first device)
    #[arg(long, short = 's', global = true)]
    device: Option<String>,

    /// Log filter, e.g. "info" or "flyme_frame_tools=debug"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show channel state and both lists
    Status,
    /// Print the packages of one list
    List { list: ListKey },
    /// Add packages to a list
    Add {
        list: ListKey,
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Remove packages from a list
    Remove {
        list: ListKey,
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Empty a list
    Clear { list: ListKey },
    /// Run the first-run permission check
    Onboard,
    /// List attached adb devices
    Devices,
}

fn init_tracing(cli_level: Option<&str>) -> bool {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::reload;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let (env_filter, explicit) = match cli_level {
        Some(level) => (EnvFilter::new(level), true),
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => (filter, true),
            Err(_) => (EnvFilter::new("warn"), false),
        },
    };
    let (filter, reload_handle) = reload::Layer::new(env_filter);

    log_capture::set_reload_fn(move |level: &str| {
        let new_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        if let Err(e) = reload_handle.reload(new_filter) {
            eprintln!("Failed to reload log filter: {}", e);
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(log_capture::LogCaptureLayer)
        .init();

    explicit
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level_is_explicit = init_tracing(cli.log_level.as_deref());

    match run(cli, level_is_explicit) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, level_is_explicit: bool) -> Result<ExitCode> {
    let config = Config::new()?;
    let settings = config.load_settings().unwrap_or_else(|e| {
        tracing::warn!("Using default settings: {:#}", e);
        Settings::default()
    });
    if !level_is_explicit {
        log_capture::update_tracing_level(&settings.log_level);
    }

    let kind = match cli.channel {
        Some(kind) => kind,
        None => settings.channel_kind()?,
    };
    let device = cli.device.or_else(|| settings.device.clone());
    let store = PackageListStore::new(kind.open(device));
    tracing::debug!("Using {} channel", kind);

    let needs_onboarding = !matches!(cli.command, Command::Onboard | Command::Devices);
    if needs_onboarding && !config.is_onboarding_complete() {
        tracing::warn!("Onboarding not completed, run `flyme-frame-tools onboard` first");
    }

    match cli.command {
        Command::Status => status(&store, kind),
        Command::List { list } => {
            let packages = store.fetch(list).context("Failed to read list")?;
            for package in packages {
                println!("{}", package);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Add { list, packages } => apply(
            &store,
            packages
                .into_iter()
                .map(|package_name| ListOperation::Add { list, package_name })
                .collect(),
        ),
        Command::Remove { list, packages } => apply(
            &store,
            packages
                .into_iter()
                .map(|package_name| ListOperation::Remove { list, package_name })
                .collect(),
        ),
        Command::Clear { list } => {
            ensure_ready(&store)?;
            store.save(list, &[]).context("Failed to clear list")?;
            println!("{} list cleared", list.label());
            Ok(ExitCode::SUCCESS)
        }
        Command::Onboard => onboard(&config, &store),
        Command::Devices => print_devices(),
    }
}

fn ensure_ready(store: &PackageListStore) -> Result<()> {
    match store.probe() {
        ChannelState::Ready => Ok(()),
        ChannelState::Unavailable => bail!("Privileged channel is not available"),
        ChannelState::Denied => bail!("Permission not granted, run `flyme-frame-tools onboard`"),
    }
}

fn status(store: &PackageListStore, kind: ChannelKind) -> Result<ExitCode> {
    let state = store.probe();
    println!("channel: {} ({:?})", kind, state);

    for key in ListKey::ALL {
        let packages = store.load(key);
        println!(
            "\n{} [{}] ({})",
            key.label(),
            key.settings_key(),
            packages.len()
        );
        for package in &packages {
            println!("  {}", package);
        }
    }

    let errors = log_capture::recent_logs(tracing::Level::WARN);
    if !errors.is_empty() {
        println!("\nrecent problems:");
        for line in errors {
            println!("  {}", line);
        }
    }

    Ok(if state == ChannelState::Ready {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn apply(store: &PackageListStore, operations: Vec<ListOperation>) -> Result<ExitCode> {
    ensure_ready(store)?;

    let queue = ListOperationsQueue::new();
    queue.enqueue_batch(operations.clone());
    if let Some(handle) = queue.start_worker(store.clone()) {
        if handle.join().is_err() {
            bail!("List operations worker panicked");
        }
    }

    let mut failed = false;
    let mut last_list = None;
    for operation in &operations {
        match queue.status_of(operation) {
            Some(OperationStatus::Success(list)) => last_list = Some((operation.list(), list)),
            Some(OperationStatus::Error(e)) => {
                failed = true;
                eprintln!("{}: {}", operation.package_name(), e);
            }
            other => {
                failed = true;
                eprintln!("{}: not processed ({:?})", operation.package_name(), other);
            }
        }
    }

    if let Some((key, list)) = last_list {
        println!("{} ({}):", key.label(), list.len());
        for package in list {
            println!("  {}", package);
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_devices() -> Result<ExitCode> {
    let devices = adb::list_devices().context("Failed to run adb devices")?;
    if devices.is_empty() {
        println!("no devices attached");
    }
    for device in devices {
        println!(
            "{}\t{}",
            device.serial,
            device.model.as_deref().unwrap_or("-")
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn onboard(config: &Config, store: &PackageListStore) -> Result<ExitCode> {
    let mut flow = OnboardingFlow::new();

    println!(
        "[{}/{}] Flyme frame tools edits the frame interpolation and super resolution app lists.",
        flow.step().index(),
        OnboardingStep::COUNT
    );
    println!("      It needs a privileged channel (Shizuku or adb) to change global settings.");
    flow.advance();

    println!(
        "[{}/{}] Checking permission...",
        flow.step().index(),
        OnboardingStep::COUNT
    );
    let mut state = store.probe();
    if state == ChannelState::Denied {
        // The consent answer arrives asynchronously.
        store.request_permission();
        for _ in 0..PERMISSION_POLL_ATTEMPTS {
            thread::sleep(PERMISSION_POLL_INTERVAL);
            state = store.probe();
            if state != ChannelState::Denied {
                break;
            }
        }
    }
    flow.on_permission_result(state == ChannelState::Ready);

    if flow.step() == OnboardingStep::PermissionRequest {
        match state {
            ChannelState::Unavailable => {
                println!("      Privileged channel not reachable. Start Shizuku or connect a device, then run onboard again.")
            }
            _ => println!("      Permission not granted. Allow access in Shizuku, then run onboard again."),
        }
        return Ok(ExitCode::FAILURE);
    }

    println!(
        "[{}/{}] Ready. Use `add`, `remove` and `list` to edit the app lists.",
        flow.step().index(),
        OnboardingStep::COUNT
    );
    if flow.advance() {
        config
            .mark_onboarding_complete()
            .context("Failed to save onboarding state")?;
    }
    Ok(ExitCode::SUCCESS)
}
