//! Minimal smart bulb demo: one actor type with status state, a self-renewing
//! reminder, and a timer.
//!
//! Run with `cargo run --example smartbulb`.

use bytes::Bytes;
use filament_core::{init_telemetry, ActorId, Result, TelemetryConfig};
use filament_runtime::{ActorRuntime, ActorTypeDef};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_telemetry(TelemetryConfig::new("smartbulb-demo"))?;

    let runtime = ActorRuntime::builder()
        .register_actor_type(
            ActorTypeDef::builder("SmartBulb")
                .method("GetStatus", |ctx, _input| async move {
                    Ok(ctx
                        .state()
                        .try_get("status")
                        .await?
                        .unwrap_or_else(|| Bytes::from("off")))
                })
                .method("SetStatus", |ctx, input| async move {
                    ctx.state().set("status", input.clone())?;
                    ctx.publish("status_changed", input);
                    Ok(Bytes::new())
                })
                .on_reminder(|ctx, fire| async move {
                    info!(actor_id = %ctx.id(), reminder = %fire.name, "Reminder fired");
                    Ok(())
                })
                .build(),
        )
        .build()?;

    let bulb = ActorId::new("SmartBulb", "bulb1")?;

    runtime.invoke(&bulb, "SetStatus", Bytes::from("on")).await?;
    let status = runtime.invoke(&bulb, "GetStatus", Bytes::new()).await?;
    info!(status = %String::from_utf8_lossy(&status), "Bulb status");

    runtime
        .register_reminder(&bulb, "smartbulb_reminder", Bytes::new(), 1_000, 1_000, None)
        .await?;

    tokio::time::sleep(Duration::from_millis(3_500)).await;

    runtime.unregister_reminder(&bulb, "smartbulb_reminder").await?;
    runtime.shutdown().await;
    Ok(())
}
