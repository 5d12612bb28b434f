//! Scenario S2: halving `rate` mid-stream halves the phase-event cadence
//! (spec §8 scenario S2, testable property 7).

use std::sync::{Arc, Mutex};

use cutloop::prelude::*;

#[test]
fn halving_rate_halves_event_cadence() {
    let _ = env_logger::try_init();

    const LOOP_SAMPLES: usize = 96_000;
    let config = EngineConfig { buffer_len: LOOP_SAMPLES, ..EngineConfig::default() };
    let (mut engine, control) = Engine::new(&config);
    let mut api = Api::new(control);

    api.buffer_load(1, 0.0, vec![0.0; LOOP_SAMPLES]).unwrap();
    api.buffer_select(1, 1).unwrap();
    api.loop_(1, true).unwrap();
    api.loop_start(1, 0.0).unwrap();
    api.loop_end(1, 2.0).unwrap();
    api.phase_quant(1, 0.01).unwrap();
    api.rate(1, 1.0).unwrap();
    api.enable(1, true).unwrap();
    api.play(1, true).unwrap();
    api.poll_start_phase().unwrap();

    let count = Arc::new(Mutex::new(0usize));
    let count2 = count.clone();
    api.on_phase(move |_voice, _pos| *count2.lock().unwrap() += 1);

    const BLOCK: usize = 4800;
    const BLOCKS: usize = 10; // 1.0 s at rate=1
    let input = vec![0.0; BLOCK];
    let mut l = vec![0.0; BLOCK];
    let mut r = vec![0.0; BLOCK];

    for _ in 0..BLOCKS {
        engine.process(&input, &mut l, &mut r);
    }
    api.poll_events();
    let full_rate_count = *count.lock().unwrap();

    api.rate(1, 0.5).unwrap();
    *count.lock().unwrap() = 0;

    for _ in 0..BLOCKS {
        engine.process(&input, &mut l, &mut r);
    }
    api.poll_events();
    let half_rate_count = *count.lock().unwrap();

    let ratio = half_rate_count as f64 / full_rate_count as f64;
    assert!((ratio - 0.5).abs() < 0.1, "full={full_rate_count} half={half_rate_count} ratio={ratio}");
}
