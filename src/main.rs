use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use deeplink_dispatch::persistence::{now_epoch_millis, STORE_PATH};
use deeplink_dispatch::{
    classify, AddressBuilder, AppManifest, AttemptStatus, BannerEligibility, DeepLinkConfig,
    DeepLinkType, Dispatcher, DismissalStore, DispatchPolicy, EnvironmentProbe, FileSlot,
    MockHost, OpenCallbacks, OpenInAppTrigger, PlatformInfo, ReentryPolicy, TriggerOptions,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Reentry {
    Join,
    Supersede,
}

impl From<Reentry> for ReentryPolicy {
    fn from(r: Reentry) -> Self {
        match r {
            Reentry::Join => ReentryPolicy::JoinInFlight,
            Reentry::Supersede => ReentryPolicy::Supersede,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BannerAction {
    Status,
    Dismiss,
    Clear,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the addresses a link resolves to.
    Link(LinkArgs),
    /// Run one open attempt against a simulated page.
    Open(OpenArgs),
    /// Inspect or change the banner dismissal state.
    Banner(BannerArgs),
}

#[derive(Args)]
struct ProbeArgs {
    /// User agent of the simulated browser. Absent means desktop.
    #[arg(long)]
    user_agent: Option<String>,

    #[arg(long, default_value_t = 0)]
    max_touch_points: u32,
}

impl ProbeArgs {
    fn platform(&self) -> PlatformInfo {
        classify(&EnvironmentProbe {
            user_agent: self.user_agent.clone(),
            max_touch_points: self.max_touch_points,
        })
    }
}

#[derive(Args)]
struct LinkArgs {
    #[command(flatten)]
    probe: ProbeArgs,

    /// home, discover, category, tag or article
    #[arg(long = "type", default_value = "home")]
    link_type: String,

    #[arg(long, default_value = "")]
    path: String,

    /// Extra query parameter, repeatable.
    #[arg(long = "param", value_parser = parse_key_val)]
    params: Vec<(String, String)>,

    /// JSON app manifest overriding the built-in identifiers.
    #[arg(long)]
    manifest: Option<PathBuf>,
}

impl LinkArgs {
    fn config(&self) -> DeepLinkConfig {
        self.params.iter().fold(
            DeepLinkConfig::new(DeepLinkType::parse_lossy(&self.link_type), self.path.clone()),
            |cfg, (k, v)| cfg.param(k.clone(), v.clone()),
        )
    }

    fn builder(&self) -> Result<AddressBuilder> {
        let manifest = match &self.manifest {
            Some(path) => AppManifest::load(path)?,
            None => AppManifest::default(),
        };
        Ok(AddressBuilder::new(manifest))
    }
}

#[derive(Args)]
struct OpenArgs {
    #[command(flatten)]
    link: LinkArgs,

    /// Simulate an installed app that backgrounds the page after N ms.
    #[arg(long)]
    installed_after_ms: Option<u64>,

    #[arg(long, default_value_t = DispatchPolicy::DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    #[arg(long)]
    go_to_store: bool,

    #[arg(long, value_enum, default_value_t = Reentry::Join)]
    reentry: Reentry,

    /// Render the trigger on desktop too.
    #[arg(long)]
    show_on_desktop: bool,
}

#[derive(Args)]
struct BannerArgs {
    #[command(flatten)]
    probe: ProbeArgs,

    #[arg(value_enum, default_value_t = BannerAction::Status)]
    action: BannerAction,

    #[arg(long, default_value = STORE_PATH)]
    store_path: PathBuf,

    #[arg(long)]
    force_show: bool,
}

fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got {:?}", s))?;
    Ok((k.to_string(), v.to_string()))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Link(args) => run_link(&args),
        Command::Open(args) => run_open(&args),
        Command::Banner(args) => run_banner(&args),
    }
}

fn run_link(args: &LinkArgs) -> Result<()> {
    let platform = args.probe.platform();
    let address = args.builder()?.build(&args.config(), &platform);

    println!("Platform:       {:?}", platform.kind());
    println!("Primary URI:    {}", address.primary_uri);
    println!("Native URI:     {}", address.native_uri);
    println!("Universal URI:  {}", address.universal_uri);
    println!("Store URI:      {}", address.store_uri);
    Ok(())
}

fn run_open(args: &OpenArgs) -> Result<()> {
    let platform = args.link.probe.platform();
    println!("[OPEN] Platform: {:?}", platform.kind());

    let mut host = MockHost::new();
    if let Some(ms) = args.installed_after_ms {
        host = host.with_installed_app(Duration::from_millis(ms));
    }

    let policy = DispatchPolicy {
        timeout: Duration::from_millis(args.timeout_ms),
        go_to_store_on_not_installed: args.go_to_store,
        reentry: args.reentry.into(),
    };

    let builder = args.link.builder()?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;

    let status = rt.block_on(async {
        let dispatcher = Dispatcher::new(host.clone(), platform, builder, policy);
        let mut trigger = OpenInAppTrigger::new(
            dispatcher,
            args.link.config(),
            TriggerOptions {
                show_on_desktop: args.show_on_desktop,
                ..TriggerOptions::default()
            },
        );

        let Some(view) = trigger.render() else {
            println!("[OPEN] Trigger not rendered on this platform (try --show-on-desktop)");
            return Ok::<_, anyhow::Error>(None);
        };
        println!("[OPEN] Trigger: {:?} -> {}", view.label, view.href);

        let callbacks = OpenCallbacks::new()
            .on_app_opened(|| println!("[OPEN] onAppOpened"))
            .on_app_not_installed(|| println!("[OPEN] onAppNotInstalled"));

        let t0 = Instant::now();
        let Some(opening) = trigger.activate(callbacks) else {
            return Ok(None);
        };
        let mut handle = opening.into_handle();
        let status = handle.outcome().await;
        // Let the store redirect, if any, run before reporting.
        tokio::task::yield_now().await;

        Ok(Some((status, t0.elapsed())))
    })?;

    let Some((status, elapsed)) = status else {
        return Ok(());
    };

    println!("-----------------------------------");
    println!("Outcome:          {:?}", status);
    println!("Resolved after:   {:?}", elapsed);
    for (i, nav) in host.navigations().iter().enumerate() {
        println!("Navigation #{}:    {}", i + 1, nav);
    }
    println!("-----------------------------------");

    if status == AttemptStatus::NotInstalled && !args.go_to_store {
        println!("(pass --go-to-store to redirect to the store listing)");
    }
    Ok(())
}

fn run_banner(args: &BannerArgs) -> Result<()> {
    let platform = args.probe.platform();
    let store = DismissalStore::new(FileSlot::new(&args.store_path));
    let mut banner = BannerEligibility::new(platform, store).force_show(args.force_show);
    let now = now_epoch_millis();

    match args.action {
        BannerAction::Status => {}
        BannerAction::Dismiss => banner.dismiss(now),
        BannerAction::Clear => banner.store_mut().clear(),
    }

    println!("Platform:   {:?}", banner.platform().kind());
    match banner.store().record() {
        Some(r) => {
            let remaining = r.remaining_millis(now, banner.store().ttl_millis());
            println!(
                "Dismissed:  at {} ({} ms of suppression left)",
                r.dismissed_at_epoch_millis, remaining
            );
        }
        None => println!("Dismissed:  no"),
    }
    println!("Visible:    {}", banner.is_visible(now));
    Ok(())
}
