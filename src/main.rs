/// Headless runner: builds a scenario from a TOML file, runs it and logs telemetry.
///
/// gas_properties [init_config.toml] [--frames N] [--save PATH] [--load PATH]
use gas_properties::diagnostics::Telemetry;
use gas_properties::init_config::InitConfig;
use gas_properties::io::{load_state, save_state};
use gas_properties::{Notification, Result, Simulation};
use std::env;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FRAMES: usize = 600;
/// Frame rate the runner pretends to render at
const FRAMES_PER_SECOND: f64 = 60.0;
const LOG_EVERY: usize = 60;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    frames: Option<usize>,
    save: Option<PathBuf>,
    load: Option<PathBuf>,
}

fn parse_args() -> std::result::Result<Args, String> {
    let mut args = Args::default();
    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--frames" => {
                let v = it.next().ok_or("--frames needs a value")?;
                args.frames = Some(v.parse().map_err(|_| format!("bad frame count: {v}"))?);
            }
            "--save" => args.save = Some(it.next().ok_or("--save needs a path")?.into()),
            "--load" => args.load = Some(it.next().ok_or("--load needs a path")?.into()),
            _ if arg.starts_with("--") => return Err(format!("unknown option: {arg}")),
            _ => args.config = Some(arg.into()),
        }
    }
    Ok(args)
}

fn build_simulation(args: &Args) -> Result<Simulation> {
    let init = match &args.config {
        Some(path) => Some(InitConfig::load_from_file(path)?),
        None => match InitConfig::load_default() {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                warn!("no usable init_config.toml ({e}), starting empty");
                None
            }
        },
    };
    let config = init.as_ref().map(|c| c.sim_config()).unwrap_or_default();
    let mut sim = Simulation::with_config(config)?;
    if let Some(init) = &init {
        init.apply_to(&mut sim)?;
    }
    if let Some(path) = &args.load {
        load_state(path)?.apply_to(&mut sim)?;
    }
    Ok(sim)
}

fn log_notification(n: &Notification) {
    match n {
        Notification::TemperatureCeiling { temperature } => {
            warn!(temperature, "temperature ceiling reached, container emptied")
        }
        Notification::LidBlownOff { pressure } => warn!(pressure, "lid blown off"),
        other => info!(?other, "notification"),
    }
}

fn run(args: Args) -> Result<()> {
    let mut sim = build_simulation(&args)?;
    let frames = args.frames.unwrap_or(DEFAULT_FRAMES);
    info!(frames, particles = sim.particles.total_inside(), width = sim.container.width, "starting run");

    for frame in 0..frames {
        sim.advance(1.0 / FRAMES_PER_SECOND);
        for n in sim.drain_notifications() {
            log_notification(&n);
        }
        if frame % LOG_EVERY == 0 || frame + 1 == frames {
            let t = Telemetry::capture(&sim);
            info!(
                time = t.time,
                inside = t.total_inside,
                temperature = ?t.temperature,
                pressure = t.gauge_pressure,
                width = t.width,
                hold = %t.hold_constant,
                wall_hits = t.total_wall_collisions,
                "telemetry"
            );
        }
    }

    if let Some(path) = &args.save {
        save_state(path, &sim)?;
    }

    #[cfg(feature = "profiling")]
    gas_properties::PROFILER.lock().log_and_clear();

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("usage: gas_properties [init_config.toml] [--frames N] [--save PATH] [--load PATH]");
            std::process::exit(2);
        }
    };
    if let Err(e) = run(args) {
        error!("{e}");
        std::process::exit(1);
    }
}
