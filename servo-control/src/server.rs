//! Web control surface: a slider page and two GET endpoints.
//!
//! Handlers are thin wrappers around the engine. Because the engine blocks
//! for its settle times, each mutating request runs on a blocking task while
//! holding the engine mutex; the lock spans the mode read through actuation
//! completion, so a concurrent mode switch can never slip between another
//! request's clamp and its servo write.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use hardware::ServoInterface;
use serde::Deserialize;
use tracing::{error, info};

use crate::calibration::CalibrationMode;
use crate::engine::{ActuationEngine, ActuationError};

/// Engine shared between handlers. Boxed so the bin can pick a driver at
/// runtime.
pub type SharedEngine = Arc<Mutex<ActuationEngine<Box<dyn ServoInterface + Send>>>>;

pub fn router(engine: SharedEngine) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/set", get(set_angle))
        .route("/setMax", get(set_max))
        .with_state(engine)
}

/// Bind the listener and serve until the process exits.
pub async fn serve(engine: SharedEngine, bind_address: &str, port: u16) -> Result<()> {
    let app = router(engine);
    let listener = tokio::net::TcpListener::bind(format!("{bind_address}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind_address}:{port}"))?;
    info!("servo control server listening on http://{bind_address}:{port}");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// Query parameters for the `/set` endpoint.
#[derive(Debug, Default, Deserialize)]
struct SetAngleParams {
    /// Requested command angle in degrees.
    angle: Option<String>,
}

/// Query parameters for the `/setMax` endpoint.
#[derive(Debug, Default, Deserialize)]
struct SetModeParams {
    /// Calibration mode index (0, 1, or 2).
    mode: Option<String>,
}

/// Parse a numeric query parameter, treating absent or malformed values as 0.
/// 0 is a valid low-range command, so sloppy clients degrade gracefully
/// instead of erroring.
fn param_or_zero(value: Option<&str>) -> i32 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn lock_engine(
    engine: &SharedEngine,
) -> std::sync::MutexGuard<'_, ActuationEngine<Box<dyn ServoInterface + Send>>> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run a blocking engine operation off the async executor, holding the engine
/// lock for the whole actuation.
async fn run_blocking<F>(engine: SharedEngine, op: F) -> Response
where
    F: FnOnce(
            &mut ActuationEngine<Box<dyn ServoInterface + Send>>,
        ) -> Result<String, ActuationError>
        + Send
        + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let mut guard = lock_engine(&engine);
        op(&mut *guard)
    })
    .await;
    match result {
        Ok(Ok(body)) => (StatusCode::OK, body).into_response(),
        Ok(Err(e)) => {
            error!("actuation failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}")).into_response()
        }
        Err(e) => {
            error!("actuation task failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error: actuation task failed".to_string(),
            )
                .into_response()
        }
    }
}

async fn index(State(engine): State<SharedEngine>) -> Response {
    // A concurrent actuation holds the engine lock for its full settle time,
    // so the mode read goes through a blocking task like the mutating
    // handlers instead of stalling an executor thread.
    match tokio::task::spawn_blocking(move || lock_engine(&engine).mode()).await {
        Ok(mode) => Html(render_index(mode)).into_response(),
        Err(e) => {
            error!("render task failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error: render task failed".to_string(),
            )
                .into_response()
        }
    }
}

async fn set_angle(
    State(engine): State<SharedEngine>,
    Query(params): Query<SetAngleParams>,
) -> Response {
    let requested = param_or_zero(params.angle.as_deref());
    run_blocking(engine, move |eng| {
        eng.set_angle(requested).map(|committed| committed.to_string())
    })
    .await
}

async fn set_max(
    State(engine): State<SharedEngine>,
    Query(params): Query<SetModeParams>,
) -> Response {
    let requested = param_or_zero(params.mode.as_deref());
    run_blocking(engine, move |eng| {
        eng.select_mode(requested)
            .map(|mode| format!("Mode set to {}°", mode.command_max()))
    })
    .await
}

/// Render the slider page. The slider is bounded by the active mode's command
/// range and the active mode's button is highlighted.
fn render_index(mode: CalibrationMode) -> String {
    let buttons = CalibrationMode::ALL
        .iter()
        .map(|m| {
            format!(
                r#"    <button class="max-btn{active}" onclick="setMaxAngle({index})">{max}&deg; Mode</button>"#,
                active = if *m == mode { " active" } else { "" },
                index = m.index(),
                max = m.command_max(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    body {{ font-family: Arial; text-align: center; margin-top: 20px; }}
    input {{ width: 80%; margin: 15px 0; }}
    button {{ padding: 10px 20px; margin: 5px; background: #4CAF50; color: white; border: none; }}
    .active {{ background: #f44336; }}
  </style>
  <script>
    function updateAngle(val) {{
      document.getElementById("angle").innerHTML = val;
      fetch("/set?angle=" + val);
    }}
    function setMaxAngle(mode) {{
      fetch("/setMax?mode=" + mode).then(() => {{ location.reload(); }});
    }}
  </script>
</head>
<body>
  <h1>Servo Control</h1>
  <input type="range" min="0" max="{command_max}" value="0" oninput="updateAngle(this.value)">
  <p>Angle: <span id="angle">0</span>&deg;</p>
  <div>
{buttons}
  </div>
</body>
</html>"#,
        command_max = mode.command_max(),
        buttons = buttons,
    )
}
