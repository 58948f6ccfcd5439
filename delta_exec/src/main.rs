//! Main delta robot executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Open the CAN transport and the robot controller
//!     - Main loop:
//!         - Operator input acquisition (console lines, keyboard stand-ins for the panel and
//!           pointer)
//!         - Mode manager processing, which commands the robot
//!         - Cycle management
//!
//! Encoder feedback is processed on the CAN link's own receive thread, independently of the main
//! loop.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::{
    io::BufRead,
    sync::mpsc::{channel, Sender, TryRecvError},
    thread,
    time::Instant,
};
use structopt::StructOpt;

use comms_if::can::{CanId, CanTransport, Loopback};
use delta_lib::{
    geom::DeltaGeometry,
    mode_mgr::{ModeKind, ModeMgr, ModeMgrParams, ModeMgrPersistentData},
    panel::{NullPanel, Panel},
    path::Path,
    pointer::SharedPointer,
    robot_ctrl::{RobotCtrl, RobotCtrlParams},
};
use params::DeltaExecParams;
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const CONSOLE_PROMPT: &str = "delta $ ";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "delta_exec", about = "Delta robot game controller")]
struct Args {
    /// Start in the operator test console
    #[structopt(long)]
    console: bool,

    /// Run against a simulated bus whose encoders echo the motor commands
    #[structopt(long = "virtual")]
    virtual_bus: bool,

    /// Restart the first mode rather than moving on to the next one
    #[structopt(long)]
    stay_in_first_mode: bool,

    /// Mode to start in (idle, robot-follows, user-follows or test-console)
    #[structopt(long, default_value = "idle")]
    first_mode: ModeKind,

    /// Minimum log level, at least info
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Input from the operator's terminal.
enum OperatorInput {
    Line(String),
    Quit,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("delta_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(args.log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Delta Robot Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", args);

    // ---- LOAD PARAMETERS ----

    let exec_params: DeltaExecParams =
        util::params::load("delta_exec.toml").wrap_err("Could not load exec params")?;
    let cycle_period = exec_params.cycle_period().ok_or_else(|| {
        eyre!(
            "cycle_period_s must be a positive number of seconds, got {}",
            exec_params.cycle_period_s
        )
    })?;
    let geom: DeltaGeometry =
        util::params::load("geom.toml").wrap_err("Could not load geometry params")?;
    let robot_params: RobotCtrlParams =
        util::params::load("robot_ctrl.toml").wrap_err("Could not load RobotCtrl params")?;
    let mode_params: ModeMgrParams =
        util::params::load("mode_mgr.toml").wrap_err("Could not load ModeMgr params")?;

    info!("Parameters loaded");

    let path_file = host::get_sw_root()
        .wrap_err("Failed to get the software root")?
        .join(&exec_params.path_file);
    let path = Path::load(&path_file)
        .wrap_err_with(|| format!("Failed to load the path from {:?}", path_file))?;
    info!("Loaded a {} point path from {:?}", path.len(), path_file);

    // ---- INITIALISE ROBOT ----

    let robot = if args.virtual_bus {
        info!("Using a virtual CAN bus");
        let bus = virtual_bus(&axis_ids(&robot_params)?);
        open_robot(robot_params, geom, bus)?
    } else {
        open_robot(robot_params, geom, open_socket(&exec_params.can_iface)?)?
    };
    info!("RobotCtrl init complete");

    // ---- INITIALISE OPERATOR INPUTS ----

    let pointer = SharedPointer::new(mode_params.pointer_kind, mode_params.screen);
    let null_panel = NullPanel::new();
    let panel = open_panel(&exec_params, &null_panel)?;

    let first_mode = if args.console {
        ModeKind::TestConsole
    } else {
        args.first_mode
    };

    let (input_tx, input_rx) = channel();
    let mut input_open = true;
    if first_mode == ModeKind::TestConsole {
        spawn_console(input_tx)?;
    } else {
        spawn_keyboard(input_tx, null_panel, pointer.clone())?;
    }

    // ---- INITIALISE MODE MANAGER ----

    let persistent =
        ModeMgrPersistentData::new(&mode_params, robot, panel, Box::new(pointer), path)
            .wrap_err("Failed to initialise the ModeMgr")?;
    let mut mode_mgr = ModeMgr::init(
        mode_params,
        persistent,
        first_mode,
        args.stay_in_first_mode,
        Instant::now(),
    );
    info!("ModeMgr init complete\n");

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let result = loop {
        let cycle_start_instant = Instant::now();

        // ---- OPERATOR INPUT ----

        let console_line = match input_rx.try_recv() {
            Ok(OperatorInput::Line(l)) => Some(l),
            Ok(OperatorInput::Quit) => {
                info!("Quit requested");
                break Ok(());
            }
            Err(TryRecvError::Empty) => None,
            // Running without a terminal, carry on
            Err(TryRecvError::Disconnected) => {
                if input_open {
                    warn!("Operator input closed");
                    input_open = false;
                }
                None
            }
        };

        // ---- MODE PROCESSING ----

        mode_mgr.step(cycle_start_instant, console_line.as_deref());

        if mode_mgr.persistent.robot.is_link_closed() {
            error!("CAN link closed, stopping");
            break Err(eyre!("The CAN link was closed by a fatal transport error"));
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }
    };

    // ---- SHUTDOWN ----

    info!("End of execution");
    session.exit();

    result
}

fn open_robot<T>(
    params: RobotCtrlParams,
    geom: DeltaGeometry,
    transport: T,
) -> Result<RobotCtrl, Report>
where
    T: CanTransport + 'static,
{
    RobotCtrl::new(params, geom, transport).wrap_err("Failed to initialise RobotCtrl")
}

/// Motor and encoder ids of each axis.
fn axis_ids(params: &RobotCtrlParams) -> Result<Vec<(CanId, CanId)>, Report> {
    params
        .motor_ids
        .iter()
        .zip(params.encoder_ids.iter())
        .map(|(m, e)| {
            Ok((
                CanId::new(*m, params.id_profile)?,
                CanId::new(*e, params.id_profile)?,
            ))
        })
        .collect::<Result<Vec<_>, comms_if::can::InvalidCanId>>()
        .wrap_err("Invalid CAN ID in RobotCtrl params")
}

/// A loopback bus whose encoders report every position command straight back.
fn virtual_bus(ids: &[(CanId, CanId)]) -> Loopback {
    let bus = Loopback::new();

    for (motor, encoder) in ids.iter() {
        bus.echo_positions(*motor, *encoder);
    }

    bus
}

#[cfg(target_os = "linux")]
fn open_socket(iface: &str) -> Result<comms_if::can::socket::SocketCanTransport, Report> {
    info!("Opening CAN interface {}", iface);

    comms_if::can::socket::SocketCanTransport::open(iface)
        .wrap_err_with(|| format!("Failed to open CAN interface {}", iface))
}

#[cfg(not(target_os = "linux"))]
fn open_socket(_iface: &str) -> Result<Loopback, Report> {
    Err(eyre!("SocketCAN is only available on Linux, use --virtual"))
}

#[cfg(all(target_arch = "arm", target_os = "linux"))]
fn open_panel(params: &DeltaExecParams, null_panel: &NullPanel) -> Result<Box<dyn Panel>, Report> {
    match params.gpio_panel {
        Some(ref p) => {
            info!("Using the GPIO panel");
            let panel = delta_lib::panel::GpioPanel::new(p)
                .wrap_err("Failed to initialise the GPIO panel")?;
            Ok(Box::new(panel))
        }
        None => Ok(Box::new(null_panel.clone())),
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "linux")))]
fn open_panel(params: &DeltaExecParams, null_panel: &NullPanel) -> Result<Box<dyn Panel>, Report> {
    if params.gpio_panel.is_some() {
        warn!("GPIO panel configured but not supported on this platform, using the keyboard");
    }

    Ok(Box::new(null_panel.clone()))
}

/// Read operator console lines into the channel.
fn spawn_console(tx: Sender<OperatorInput>) -> Result<(), Report> {
    let mut editor = DefaultEditor::new().wrap_err("Failed to open the console")?;

    thread::Builder::new()
        .name("console".into())
        .spawn(move || loop {
            let input = match editor.readline(CONSOLE_PROMPT) {
                Ok(line) => {
                    if let Err(e) = editor.add_history_entry(line.as_str()) {
                        debug!("Console history not updated: {}", e);
                    }
                    OperatorInput::Line(line)
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => OperatorInput::Quit,
                Err(e) => {
                    error!("Console error: {}", e);
                    OperatorInput::Quit
                }
            };

            let quit = matches!(input, OperatorInput::Quit);
            if tx.send(input).is_err() || quit {
                break;
            }
        })
        .wrap_err("Failed to start the console thread")?;

    Ok(())
}

/// Keyboard stand-ins for the panel and pointer.
///
/// An empty line presses the button, `x,y` puts the pointer at those screen pixels, `r` releases
/// it and `q` quits.
fn spawn_keyboard(
    tx: Sender<OperatorInput>,
    panel: NullPanel,
    pointer: SharedPointer,
) -> Result<(), Report> {
    info!("Press enter to push the button, type x,y to move the pointer, r to release it, q to quit");

    thread::Builder::new()
        .name("keyboard".into())
        .spawn(move || {
            let stdin = std::io::stdin();

            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        error!("Keyboard read error: {}", e);
                        break;
                    }
                };

                match line.trim() {
                    "" => panel.press(),
                    "q" => {
                        tx.send(OperatorInput::Quit).ok();
                        break;
                    }
                    "r" => pointer.release(),
                    l => match parse_point(l) {
                        Some(p) => pointer.push(p),
                        None => warn!("Expected x,y in pixels, found \"{}\"", l),
                    },
                }
            }
        })
        .wrap_err("Failed to start the keyboard thread")?;

    Ok(())
}

fn parse_point(line: &str) -> Option<(f64, f64)> {
    let mut values = line.split(',').map(|v| v.trim().parse::<f64>());

    match (values.next(), values.next(), values.next()) {
        (Some(Ok(x)), Some(Ok(y)), None) => Some((x, y)),
        _ => None,
    }
}
