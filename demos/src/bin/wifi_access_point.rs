// Demo driving the Wi-Fi access point settings of a simulated drone.
//
// The simulated drone applies every request after a short delay, except country changes that it silently
// ignores: that change rolls back once the setting timeout elapses.
//
// Run with RUST_LOG=debug to see the scheduling and rollbacks.

use futures::StreamExt;
use groundsdk_core::settings::wifi::{
    AccessPoint, AccessPointBackend, Band, Channel, Environment, SecurityMode, SelectionMode,
};
use groundsdk_core::settings::EnumSet;
use groundsdk_core::{Executor, SdkConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const LATENCY: Duration = Duration::from_millis(300);
const DEMO_DURATION: Duration = Duration::from_secs(7);

#[derive(Debug)]
enum Request {
    Environment(Environment),
    Country(String),
    Ssid(String),
    Channel(Channel),
    AutoChannel(Option<Band>),
    Security(SecurityMode),
}

/// Forwards setting changes to the simulated drone
struct SimulatedLink {
    requests: flume::Sender<Request>,
}

impl SimulatedLink {
    fn send(&self, request: Request) -> bool {
        self.requests.send(request).is_ok()
    }
}

impl AccessPointBackend for SimulatedLink {
    fn set_environment(&self, environment: Environment) -> bool {
        self.send(Request::Environment(environment))
    }

    fn set_country(&self, code: &str) -> bool {
        self.send(Request::Country(code.to_owned()))
    }

    fn set_ssid(&self, ssid: &str) -> bool {
        self.send(Request::Ssid(ssid.to_owned()))
    }

    fn select_channel(&self, channel: Channel) -> bool {
        self.send(Request::Channel(channel))
    }

    fn auto_select_channel(&self, band: Option<Band>) -> bool {
        self.send(Request::AutoChannel(band))
    }

    fn set_security(&self, mode: SecurityMode, _password: Option<&str>) -> bool {
        self.send(Request::Security(mode))
    }
}

/// Drone side: apply a request and report the resulting state
fn apply(access_point: &AccessPoint, request: Request) {
    match request {
        Request::Environment(environment) => {
            access_point.environment().update_value(environment);
        }
        Request::Ssid(ssid) => {
            access_point.ssid().update_value(ssid);
        }
        Request::Channel(channel) => {
            access_point.channel().update_channel(SelectionMode::Manual, channel);
        }
        Request::AutoChannel(band) => {
            let (mode, channel) = match band {
                Some(Band::B2_4Ghz) => (SelectionMode::Auto2_4GhzBand, Channel::Band2_4Channel6),
                Some(Band::B5Ghz) => (SelectionMode::Auto5GhzBand, Channel::Band5Channel36),
                None => (SelectionMode::AutoAnyBand, Channel::Band5Channel149),
            };
            access_point.channel().update_channel(mode, channel);
        }
        Request::Security(mode) => {
            access_point.security().update_mode(mode);
        }
        Request::Country(code) => {
            println!("Drone ignores country change to {}", code);
            return;
        }
    }
    access_point.notify_updated();
}

fn print_state(access_point: &AccessPoint, from_user: bool) {
    let channel = access_point.channel();
    println!(
        "[{}] ssid: {:?}, environment: {:?}, country: {:?}, channel: {:?} ({:?}), security: {:?}",
        if from_user { "user" } else { "drone" },
        access_point.ssid().value(),
        access_point.environment().value(),
        access_point.country().code(),
        channel.channel(),
        channel.selection_mode(),
        access_point.security().mode(),
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = SdkConfig::default();
    let (executor, main_loop) = Executor::start(&config)?;

    let (requests, device) = flume::unbounded();
    let access_point = AccessPoint::new(&executor, &config, Arc::new(SimulatedLink { requests }));
    let mut changes = access_point.watch();

    // Drone connects and reports its capabilities
    access_point
        .channel()
        .update_available_channels(EnumSet::of(&[
            Channel::Band2_4Channel1,
            Channel::Band2_4Channel6,
            Channel::Band2_4Channel11,
            Channel::Band5Channel36,
            Channel::Band5Channel149,
        ]))
        .update_channel(SelectionMode::Manual, Channel::Band2_4Channel1);
    access_point
        .country()
        .update_available_codes(["FR", "US", "DE"].iter().map(|code| code.to_string()).collect())
        .update_code("FR");
    access_point.security().update_supported_modes(EnumSet::all());
    access_point.ssid().update_value("Drone-0001");
    access_point.publish();

    // User changes
    access_point.ssid().set_value("my-drone");
    access_point.environment().set_value(Environment::Indoor);
    access_point.channel().auto_select_band(Band::B5Ghz);
    if !access_point.security().secure_with_wpa2("short") {
        println!("Password rejected, too short");
    }
    access_point.security().secure_with_wpa2("correct horse battery staple");
    access_point.country().select("US");

    let deadline = sleep(DEMO_DURATION);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            request = device.recv_async() => {
                sleep(LATENCY).await;
                apply(&access_point, request?);
            }
            Some(from_user) = changes.next() => print_state(&access_point, from_user),
            running = main_loop.turn() => if !running { break },
            _ = &mut deadline => break,
        }
    }

    let mut dump = String::new();
    executor.dump(&mut dump, &["--executor"]);
    print!("{}", dump);

    // Drone disconnects
    access_point.cancel_rollbacks().notify_updated();
    access_point.unpublish();
    executor.dispose();

    Ok(())
}
