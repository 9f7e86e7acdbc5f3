use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mbgate_channel::DatagramChannel;
use mbgate_session::DeviceEmulator;

use crate::cmd::SimulateArgs;
use crate::exit::{channel_error, session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

const POLL: Duration = Duration::from_millis(50);

pub fn run(args: SimulateArgs, _format: OutputFormat) -> CliResult<i32> {
    let profile = args.link.to_profile()?;
    let channel = DatagramChannel::bind_with_mtu(&args.path, &args.peer, args.link.mtu)
        .map_err(|err| channel_error("bind failed", err))?;
    let (sink, source) = channel
        .split()
        .map_err(|err| channel_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    tracing::info!(
        path = %args.path.display(),
        peer = %args.peer.display(),
        profile = profile.name(),
        "device emulator listening"
    );

    let mut emulator = DeviceEmulator::new();
    let served = emulator
        .serve(sink, source, &profile, &running, POLL)
        .map_err(|err| session_error("emulator failed", err))?;

    tracing::info!(served, devices = emulator.device_names().len(), "device emulator stopped");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
