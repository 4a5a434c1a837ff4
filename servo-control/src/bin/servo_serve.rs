//! Servo control web server.
//!
//! Serves a slider page for commanding a calibrated hobby servo and two GET
//! endpoints the page drives: `/set?angle=N` and `/setMax?mode=N`.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use hardware::{MockServo, ServoInterface};
use servo_control::engine::ActuationEngine;
use servo_control::server;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "servo_serve")]
#[command(
    about = "Web slider control for a calibrated hobby servo",
    long_about = "Serves a browser slider bounded by the active calibration mode's command \
        range, plus three mode buttons.\n\n\
        Modes remap the slider's command angle onto a measured physical range (90°→87°, \
        120°→117°, 180°→180°); the 180° mode additionally widens the servo's pulse range \
        and compensates mechanical lag at full travel.\n\n\
        On a Raspberry Pi the servo is driven through hardware PWM (channel 0 = GPIO18, \
        channel 1 = GPIO19). Elsewhere, run with --mock to exercise the control surface \
        without hardware."
)]
struct Args {
    #[arg(short = 'p', long, default_value = "8080", help = "HTTP listen port")]
    port: u16,

    #[arg(short = 'b', long, default_value = "0.0.0.0", help = "Bind address")]
    bind_address: String,

    #[arg(
        long,
        default_value = "0",
        help = "Hardware PWM channel (0 = GPIO18, 1 = GPIO19)"
    )]
    pwm_channel: u8,

    #[arg(long, help = "Use a recording mock driver instead of hardware PWM")]
    mock: bool,
}

fn build_servo(args: &Args) -> Result<Box<dyn ServoInterface + Send>> {
    if args.mock {
        info!("using mock servo driver");
        return Ok(Box::new(MockServo::new()));
    }

    #[cfg(target_os = "linux")]
    {
        use servo_control::calibration::{MAX_PULSE_US, MIN_PULSE_US};

        let servo = hardware::PwmServo::bind(args.pwm_channel, MIN_PULSE_US, MAX_PULSE_US)
            .context("failed to bind hardware PWM channel")?;
        Ok(Box::new(servo))
    }

    #[cfg(not(target_os = "linux"))]
    {
        anyhow::bail!("hardware PWM is only supported on Linux; run with --mock")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let servo = build_servo(&args)?;
    let engine = ActuationEngine::new(servo).context("servo initialization failed")?;
    info!(
        "servo ready: mode {}°, angle 0°",
        engine.mode().command_max()
    );

    server::serve(Arc::new(Mutex::new(engine)), &args.bind_address, args.port).await
}
