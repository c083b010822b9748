//! Two threads standing in for two cores, exchanging framed messages
//! through a single shared region.
//!
//! Core A initializes the region and sends requests on the A→B channel;
//! core B attaches to the same region, consumes them, and acknowledges on
//! the B→A channel.

use shmring::{ChannelId, ChannelRegistry, EventKind, RegionConfig};
use std::thread;
use std::time::Instant;

/// Stand-in for a fixed shared-RAM window (e.g. a domain SRAM on a
/// dual-core MCU), over-aligned for control-block placement.
#[repr(align(128))]
struct SharedRam([u8; 16 * 1024]);

const MESSAGES: usize = 100_000;

fn main() {
    println!("shmring Dual-Core Example");
    println!("=========================\n");

    let mut ram = Box::new(SharedRam([0; 16 * 1024]));
    let config = RegionConfig::new(4096, 1024);

    println!("Configuration:");
    println!("  Region size: {} bytes", ram.0.len());
    println!("  Required:    {} bytes", config.required_len());
    println!("  A→B data:    {} bytes", config.a_to_b);
    println!("  B→A data:    {} bytes", config.b_to_a);
    println!("  Messages:    {}\n", MESSAGES);

    let base = ram.0.as_mut_ptr();
    // SAFETY: the region outlives both registries and both threads; init
    // runs once, before the peer attaches.
    let mut owner = unsafe { ChannelRegistry::init(base, ram.0.len(), config) }.unwrap();
    let peer = unsafe { ChannelRegistry::attach(base, ram.0.len(), config) }.unwrap();

    // Core A watches its outbound channel.
    owner
        .channel_mut(ChannelId::AToB)
        .set_listener(Box::new(|kind: EventKind, bytes: usize| {
            if kind == EventKind::Reset {
                println!("A→B channel was reset ({} bytes)", bytes);
            }
        }));

    let start = Instant::now();

    thread::scope(|s| {
        // Core A: produce requests, count acknowledgements.
        let a_tx = owner.channel(ChannelId::AToB);
        let a_rx = owner.channel(ChannelId::BToA);
        s.spawn(move || {
            let mut acks = [0u8; 16];
            let mut acked = 0usize;
            for seq in 0..MESSAGES {
                let payload = format!("req-{seq}");
                while a_tx.write_frame(payload.as_bytes()).is_none() {
                    if a_rx.read_frame_into(&mut acks).is_some() {
                        acked += 1;
                    }
                    std::hint::spin_loop();
                }
            }
            while acked < MESSAGES {
                if a_rx.read_frame_into(&mut acks).is_some() {
                    acked += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        });

        // Core B: consume requests, acknowledge each.
        let b_rx = peer.channel(ChannelId::AToB);
        let b_tx = peer.channel(ChannelId::BToA);
        s.spawn(move || {
            let mut buf = [0u8; 64];
            let mut seq = 0usize;
            while seq < MESSAGES {
                if let Some(n) = b_rx.read_frame_into(&mut buf) {
                    let expected = format!("req-{seq}");
                    assert_eq!(&buf[..n], expected.as_bytes());
                    while b_tx.write_frame(b"ok").is_none() {
                        std::hint::spin_loop();
                    }
                    seq += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        });
    });

    let duration = start.elapsed();
    let rate = MESSAGES as f64 / duration.as_secs_f64();

    println!("Results:");
    println!("  Round-trips: {}", MESSAGES);
    println!("  Duration:    {:.2?}", duration);
    println!("  Rate:        {:.2} million msg/sec", rate / 1_000_000.0);
}
