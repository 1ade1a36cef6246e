//! The components wired into every car.

use std::sync::Arc;

use tokio::task::JoinHandle;

use carhub_app::component::{Component, PowerCommands};
use carhub_app::event_store::{EventStore, SessionStore};
use carhub_app::ports::{CommandSink, Persistence};
use carhub_domain::error::CarHubError;

const ANGEL_EYES: &str = "angel_eyes";
const USB_HUB: &str = "usb_hub";

/// Angel eyes glow while accessory power is on and it is dark outside.
fn angel_eyes_wanted(session: &SessionStore) -> (bool, String) {
    let has_power = session.get_bool("acc_power");
    let dark = session
        .get_string("light_sensor_on")
        .eq_ignore_ascii_case("FALSE");
    (
        dark && has_power,
        format!("light_sensor: {dark}, acc_power: {has_power}"),
    )
}

/// The USB hub follows unlock power.
fn usb_hub_wanted(session: &SessionStore) -> (bool, String) {
    let has_power = session.get_bool("unlock_power");
    (has_power, format!("unlock_power: {has_power}"))
}

/// Start `angel_eyes` and `usb_hub`, both driven by power commands to `sink`.
///
/// # Errors
///
/// Fails only if a component cannot be built.
pub fn start<P, C>(
    settings: &Arc<EventStore<P>>,
    session: &Arc<SessionStore>,
    sink: &Arc<C>,
) -> Result<Vec<JoinHandle<()>>, CarHubError>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    let angel_eyes = Component::new(
        ANGEL_EYES,
        Arc::clone(settings),
        Arc::clone(session),
        angel_eyes_wanted,
        PowerCommands::new(ANGEL_EYES, Arc::clone(sink)),
    )?;
    let usb_hub = Component::new(
        USB_HUB,
        Arc::clone(settings),
        Arc::clone(session),
        usb_hub_wanted,
        PowerCommands::new(USB_HUB, Arc::clone(sink)),
    )?;

    tracing::info!(components = 2, "starting components");
    Ok(vec![
        angel_eyes.start(["acc_power", "light_sensor_on"]),
        usb_hub.start(["unlock_power"]),
    ])
}
