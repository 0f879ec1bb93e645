//! rhome - RF home controller
//!
//! Command-line harness around the controller core: encode and transmit
//! tri-state telegrams, decode recorded pulse trains, and manage the
//! persisted lights, blinds and learned remote buttons.

mod devices;
mod protocols;
mod recording;
mod remote;
mod signal;
mod storage;
mod telegram;

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devices::{Blind, BlindOutput, BlindState, Light, LightKind};
use protocols::ProtocolKind;
use remote::{CodeLatch, RemoteEvent};
use signal::hal::sim::{RecordingPin, SimClock};
use signal::hal::{SystemClock, TracePin};
use signal::receiver::Receiver;
use signal::transmitter::Transmitter;
use signal::ReceiverGate;
use storage::Storage;
use telegram::{Telegram, CODE_MASK};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Frequency stamped into exported .sub files. The tri-state remotes all
/// live in the 433.92 MHz ISM band.
const SUB_FREQUENCY_HZ: u32 = 433_920_000;

fn usage() {
    eprintln!(
        "rhome {VERSION} - RF home controller

Usage:
  rhome devices                                 list persisted devices
  rhome buttons                                 list learned remote buttons
  rhome add-light <name> <protocol> <addr...>   persist a new light
      kaku <address A-P> <device 1-16>
      action <system 0-31> <device A-E>
      blokker <device 1-8>
      elro <system 0-31> <device A-D>
  rhome add-blind <name> <channel> <p1> <p2> <p3>
  rhome send <protocol> <addr...> <on|off> [--out FILE]
      protocols as above, plus:
      kaku-group <address A-P> <group 1-4> <device 1-4>
  rhome light <name> <on|off|toggle>            switch a persisted light
  rhome blind <name> [min|mid|max|step <n>]     move a persisted blind
  rhome decode <file.sub> [min_repeats]         decode a recorded pulse train
  rhome learn <event> <target> <file.sub>       bind a remote code
      events: light-on light-off light-toggle blind-toggle action
  rhome forget <index>                          remove a learned button
  rhome dispatch <file.sub>                     run decoded codes against devices

Logging is controlled with RUST_LOG (default rhome=info)."
    );
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rhome=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        usage();
        return Ok(());
    };

    match command.as_str() {
        "devices" => cmd_devices(),
        "buttons" => cmd_buttons(),
        "add-light" => cmd_add_light(&args[1..]),
        "add-blind" => cmd_add_blind(&args[1..]),
        "send" => cmd_send(&args[1..]),
        "light" => cmd_light(&args[1..]),
        "blind" => cmd_blind(&args[1..]),
        "decode" => cmd_decode(&args[1..]),
        "learn" => cmd_learn(&args[1..]),
        "forget" => cmd_forget(&args[1..]),
        "dispatch" => cmd_dispatch(&args[1..]),
        "help" | "--help" | "-h" => {
            usage();
            Ok(())
        }
        other => {
            usage();
            bail!("unknown command: {}", other);
        }
    }
}

// ─── Listing ─────────────────────────────────────────────────────────────────

fn cmd_devices() -> Result<()> {
    let storage = Storage::new()?;
    let doc = storage.load_devices()?;

    println!("Lights:");
    for light in &doc.lights {
        println!(
            "  {:<16} {:<8} hash {:#010x}  code {:#07x}",
            light.name,
            light.kind.protocol(),
            light.identity_hash(),
            light.telegram(true).pack() & CODE_MASK,
        );
    }
    println!("Blinds:");
    for blind in &doc.blinds {
        println!(
            "  {:<16} channel {}  range {}..{}..{}  hash {:#010x}",
            blind.name,
            blind.channel,
            blind.min_position,
            blind.mid_position,
            blind.max_position,
            blind.identity_hash(),
        );
    }
    Ok(())
}

fn cmd_buttons() -> Result<()> {
    let storage = Storage::new()?;
    let doc = storage.load_devices()?;

    for (i, button) in doc.buttons.buttons().iter().enumerate() {
        println!(
            "  [{}] code {:#07x}  {:?}  target {:#010x}",
            i,
            button.code & CODE_MASK,
            button.event,
            button.event_hash
        );
    }
    Ok(())
}

// ─── Device management ───────────────────────────────────────────────────────

fn cmd_add_light(args: &[String]) -> Result<()> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("add-light needs a name"))?;
    let (protocol, addr) = rest
        .split_first()
        .ok_or_else(|| anyhow!("add-light needs a protocol"))?;

    let kind = match protocol.as_str() {
        "kaku" => LightKind::KaKu {
            address: parse_letter(addr.first(), 'P')?,
            device: parse_number(addr.get(1), 1, 16)?,
        },
        "action" => LightKind::Action {
            system_code: parse_number(addr.first(), 0, 31)?,
            device: parse_letter(addr.get(1), 'E')?,
        },
        "blokker" => LightKind::Blokker {
            device: parse_number(addr.first(), 1, 8)?,
        },
        "elro" => LightKind::Elro {
            system_code: parse_number(addr.first(), 0, 31)?,
            device: parse_letter(addr.get(1), 'D')?,
        },
        other => bail!("unknown protocol: {}", other),
    };

    let storage = Storage::new()?;
    let mut doc = storage.load_devices()?;
    if doc.lights.iter().any(|l| l.name == *name) {
        bail!("a light named {:?} already exists", name);
    }
    doc.lights.push(Light::new(name.clone(), kind));
    storage.save_devices(&mut doc)?;
    println!("added light {}", name);
    Ok(())
}

fn cmd_add_blind(args: &[String]) -> Result<()> {
    let [name, channel, p1, p2, p3] = args else {
        bail!("usage: add-blind <name> <channel> <p1> <p2> <p3>");
    };
    let channel: u8 = channel.parse().context("channel must be 0-255")?;

    let storage = Storage::new()?;
    let mut doc = storage.load_devices()?;
    if doc.blinds.iter().any(|b| b.name == *name) {
        bail!("a blind named {:?} already exists", name);
    }

    let mut blind = Blind::new(name.clone(), channel);
    blind.set_bounds(
        p1.parse().context("positions must be integers")?,
        p2.parse().context("positions must be integers")?,
        p3.parse().context("positions must be integers")?,
    );
    blind.settle_ms = storage.config.blind_settle_seconds * 1000;
    doc.blinds.push(blind);
    storage.save_devices(&mut doc)?;
    println!("added blind {}", name);
    Ok(())
}

// ─── Transmit ────────────────────────────────────────────────────────────────

fn cmd_send(args: &[String]) -> Result<()> {
    let mut args: Vec<&String> = args.iter().collect();

    let out = match args.iter().position(|a| a.as_str() == "--out") {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("--out needs a file name");
            }
            let path = args.remove(i + 1).clone();
            args.remove(i);
            Some(path)
        }
        None => None,
    };

    let Some((&state, addr)) = args.split_last() else {
        bail!("send needs a protocol and on|off");
    };
    let on = parse_on_off(state)?;
    let Some((&protocol, addr)) = addr.split_first() else {
        bail!("send needs a protocol");
    };

    let storage = Storage::new()?;
    let telegram = build_telegram(protocol, addr, on, &storage.config)?;

    match out {
        Some(path) => {
            // Render against virtual time instead of waiting out the pulses.
            let clock = SimClock::starting_at(0);
            let pin = RecordingPin::new(clock.clone());
            let edges = pin.edges();
            let mut tx = Transmitter::new(pin, clock, 375, 0);
            tx.send(&telegram);

            let tail = 31 * telegram.period_us as u32;
            let pulses = recording::pulses_from_edges(&edges.borrow(), tail);
            recording::save(Path::new(&path), &pulses, SUB_FREQUENCY_HZ)?;
            println!("wrote {} pulses to {}", pulses.len(), path);
        }
        None => {
            let mut tx = Transmitter::new(TracePin::new(), SystemClock::new(), 375, 0);
            tracing::info!(
                code = telegram.pack() & CODE_MASK,
                period_us = telegram.period_us,
                "transmitting"
            );
            tx.send(&telegram);
        }
    }
    Ok(())
}

fn cmd_light(args: &[String]) -> Result<()> {
    let [name, state] = args else {
        bail!("usage: light <name> <on|off|toggle>");
    };

    let storage = Storage::new()?;
    let mut doc = storage.load_devices()?;
    let light = doc
        .lights
        .iter_mut()
        .find(|l| l.name == *name)
        .ok_or_else(|| anyhow!("no light named {:?}", name))?;

    let mut tx = Transmitter::new(TracePin::new(), SystemClock::new(), 375, 0);
    match state.as_str() {
        "toggle" => light.toggle(&mut tx),
        other => light.on_off(&mut tx, parse_on_off(other)?),
    }
    Ok(())
}

fn cmd_blind(args: &[String]) -> Result<()> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("usage: blind <name> [min|mid|max|step <n>]"))?;

    let storage = Storage::new()?;
    let mut doc = storage.load_devices()?;
    let blind = doc
        .blinds
        .iter_mut()
        .find(|b| b.name == *name)
        .ok_or_else(|| anyhow!("no blind named {:?}", name))?;

    let mut output = TraceBlindOutput;
    match rest.first().map(String::as_str) {
        None => blind.toggle_state(&mut output, None),
        Some("min") => blind.toggle_state(&mut output, Some(BlindState::Min)),
        Some("mid") => blind.toggle_state(&mut output, Some(BlindState::Mid)),
        Some("max") => blind.toggle_state(&mut output, Some(BlindState::Max)),
        Some("step") => {
            let steps: i32 = rest
                .get(1)
                .ok_or_else(|| anyhow!("step needs a count"))?
                .parse()
                .context("step count must be an integer")?;
            blind.step_by(&mut output, steps);
        }
        Some(other) => bail!("unknown blind position: {}", other),
    }
    println!(
        "{} is now at {:?} ({})",
        blind.name,
        blind.state(),
        blind.position()
    );
    Ok(())
}

fn cmd_forget(args: &[String]) -> Result<()> {
    let [index] = args else {
        bail!("usage: forget <index>");
    };
    let index: usize = index.parse().context("index must be a number")?;

    let storage = Storage::new()?;
    let mut doc = storage.load_devices()?;
    let button = doc
        .buttons
        .remove(index)
        .ok_or_else(|| anyhow!("no button at index {}", index))?;
    storage.save_devices(&mut doc)?;
    println!("forgot code {:#07x} ({:?})", button.code, button.event);
    Ok(())
}

/// Host stand-in for the PWM peripheral: logs what a real output would do.
struct TraceBlindOutput;

impl BlindOutput for TraceBlindOutput {
    fn enable(&mut self, channel: u8, enabled: bool) {
        tracing::debug!(channel, enabled, "blind output");
    }

    fn set_compare(&mut self, channel: u8, value: i32) {
        tracing::debug!(channel, value, "blind compare");
    }
}

// ─── Decode and dispatch ─────────────────────────────────────────────────────

fn cmd_decode(args: &[String]) -> Result<()> {
    let (file, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("usage: decode <file.sub> [min_repeats]"))?;
    let min_repeats: u8 = match rest.first() {
        Some(n) => n.parse().context("min_repeats must be 0-255")?,
        None => Storage::new()?.config.min_repeats,
    };

    let decoded = decode_file(Path::new(file), min_repeats)?;
    if decoded.is_empty() {
        println!("no telegrams decoded");
    }
    for (code, period) in decoded {
        println!("code {:#07x}  ({})  period {} µs", code, code, period);
    }
    Ok(())
}

fn cmd_learn(args: &[String]) -> Result<()> {
    let [event, target, file] = args else {
        bail!("usage: learn <event> <target> <file.sub>");
    };
    let event = match event.as_str() {
        "light-on" => RemoteEvent::LightOn,
        "light-off" => RemoteEvent::LightOff,
        "light-toggle" => RemoteEvent::LightToggle,
        "blind-toggle" => RemoteEvent::BlindToggle,
        "action" => RemoteEvent::Action,
        other => bail!("unknown event: {}", other),
    };

    let storage = Storage::new()?;
    let mut doc = storage.load_devices()?;

    let event_hash = match event {
        RemoteEvent::BlindToggle => doc
            .blinds
            .iter()
            .find(|b| b.name == *target)
            .map(|b| b.identity_hash())
            .ok_or_else(|| anyhow!("no blind named {:?}", target))?,
        RemoteEvent::Action => 0,
        _ => doc
            .lights
            .iter()
            .find(|l| l.name == *target)
            .map(|l| l.identity_hash())
            .ok_or_else(|| anyhow!("no light named {:?}", target))?,
    };

    let pulses = recording::load(Path::new(file))?;
    let latch = Arc::new(CodeLatch::new());

    // Replay the recording on a second thread while the learn window polls
    // the latch, the same shape the live controller has.
    let replay = {
        let latch = Arc::clone(&latch);
        let mut rx = Receiver::new(
            Arc::new(ReceiverGate::new()),
            storage.config.min_repeats,
            Box::new(move |code, _| {
                latch.post(code);
            }),
        );
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            for ts in recording::edge_timestamps(&pulses) {
                rx.handle_edge(ts);
            }
        })
    };

    let learned = doc
        .buttons
        .learn(&latch, event, event_hash, Duration::from_secs(2));
    replay.join().map_err(|_| anyhow!("replay thread panicked"))?;

    let button = learned.ok_or_else(|| anyhow!("no telegram decoded from {:?}", file))?;
    storage.save_devices(&mut doc)?;
    println!(
        "learned code {:#07x} -> {:?} {}",
        button.code, button.event, target
    );
    Ok(())
}

fn cmd_dispatch(args: &[String]) -> Result<()> {
    let [file] = args else {
        bail!("usage: dispatch <file.sub>");
    };

    let storage = Storage::new()?;
    let mut doc = storage.load_devices()?;

    let decoded = decode_file(Path::new(file), storage.config.min_repeats)?;
    let latch = CodeLatch::new();
    let mut tx = Transmitter::new(TracePin::new(), SystemClock::new(), 375, 0);
    let mut output = TraceBlindOutput;

    let mut handled = 0usize;
    for (code, _) in decoded {
        // Same hand-off as the live loop: post into the latch, then act on
        // what the latch holds.
        latch.post(code);
        if !latch.actions_enabled() {
            continue;
        }
        if let Some(code) = latch.take() {
            if doc
                .buttons
                .dispatch(code, &mut doc.lights, &mut doc.blinds, &mut tx, &mut output)
            {
                handled += 1;
            }
        }
    }

    println!("handled {} telegram(s)", handled);
    Ok(())
}

fn decode_file(path: &Path, min_repeats: u8) -> Result<Vec<(u32, u32)>> {
    let pulses = recording::load(path)?;

    let decoded = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&decoded);
    let mut rx = Receiver::new(
        Arc::new(ReceiverGate::new()),
        min_repeats,
        Box::new(move |code, period| {
            sink.lock().unwrap().push((code, period));
        }),
    );

    for ts in recording::edge_timestamps(&pulses) {
        rx.handle_edge(ts);
    }

    let decoded = decoded.lock().unwrap().clone();
    Ok(decoded)
}

// ─── Argument helpers ────────────────────────────────────────────────────────

fn build_telegram(
    protocol: &str,
    addr: &[&String],
    on: bool,
    config: &storage::Config,
) -> Result<Telegram> {
    let (kind, mut telegram) = match protocol {
        "kaku" => (
            ProtocolKind::KaKu,
            protocols::kaku::telegram(
                parse_letter(addr.first().copied(), 'P')?,
                parse_number(addr.get(1).copied(), 1, 16)?,
                on,
            ),
        ),
        "kaku-group" => (
            ProtocolKind::KaKu,
            protocols::kaku::group_telegram(
                parse_letter(addr.first().copied(), 'P')?,
                parse_number(addr.get(1).copied(), 1, 4)?,
                parse_number(addr.get(2).copied(), 1, 4)?,
                on,
            ),
        ),
        "action" => (
            ProtocolKind::Action,
            protocols::action::telegram(
                parse_number(addr.first().copied(), 0, 31)?,
                parse_letter(addr.get(1).copied(), 'E')?,
                on,
            ),
        ),
        "blokker" => (
            ProtocolKind::Blokker,
            protocols::blokker::telegram(parse_number(addr.first().copied(), 1, 8)?, on),
        ),
        "elro" => (
            ProtocolKind::Elro,
            protocols::elro::telegram(
                parse_number(addr.first().copied(), 0, 31)?,
                parse_letter(addr.get(1).copied(), 'D')?,
                on,
            ),
        ),
        other => bail!("unknown protocol: {}", other),
    };

    telegram.period_us = config.period_for(kind);
    Ok(telegram)
}

fn parse_on_off(s: &str) -> Result<bool> {
    match s {
        "on" => Ok(true),
        "off" => Ok(false),
        other => bail!("expected on or off, got {:?}", other),
    }
}

fn parse_letter(arg: Option<&String>, max: char) -> Result<char> {
    let arg = arg.ok_or_else(|| anyhow!("missing address letter"))?;
    let mut chars = arg.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() && c <= max => Ok(c),
        _ => bail!("expected a letter A-{}, got {:?}", max, arg),
    }
}

fn parse_number(arg: Option<&String>, min: u16, max: u16) -> Result<u16> {
    let arg = arg.ok_or_else(|| anyhow!("missing numeric argument"))?;
    let n: u16 = arg
        .parse()
        .with_context(|| format!("expected a number {}-{}, got {:?}", min, max, arg))?;
    if n < min || n > max {
        bail!("expected a number {}-{}, got {}", min, max, n);
    }
    Ok(n)
}
