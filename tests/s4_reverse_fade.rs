//! Scenario S4: crossfade gain near loop boundaries during reverse playback
//! (spec §8 scenario S4).

use cutloop::prelude::*;

#[test]
fn reverse_fade_gain_matches_expected_curve() {
    let _ = env_logger::try_init();

    const LOOP_SAMPLES: usize = 48_000;
    let config = EngineConfig { buffer_len: LOOP_SAMPLES, ..EngineConfig::default() };
    let (mut engine, control) = Engine::new(&config);
    let api = Api::new(control);

    api.buffer_load(1, 0.0, vec![1.0; LOOP_SAMPLES]).unwrap();
    api.buffer_select(1, 1).unwrap();
    api.loop_(1, true).unwrap();
    api.loop_start(1, 0.0).unwrap();
    api.loop_end(1, 1.0).unwrap();
    api.fade_time(1, 0.01).unwrap();
    api.level(1, 1.0).unwrap();
    api.pan(1, 0.0).unwrap();
    api.rate(1, -1.0).unwrap();
    api.enable(1, true).unwrap();
    api.play(1, true).unwrap();

    let half = |l: f32, r: f32| (l * l + r * r).sqrt(); // gL²+gR²=1, so l²+r² = out² exactly

    // Mid-loop, far from either boundary, fade_gain should be ~1.
    api.position(1, 0.5).unwrap();
    let input = vec![0.0; 1];
    let mut l = vec![0.0; 1];
    let mut r = vec![0.0; 1];
    engine.process(&input, &mut l, &mut r);
    let out_mid_loop = half(l[0], r[0]);
    assert!((out_mid_loop - 1.0).abs() < 0.05, "out_mid_loop={out_mid_loop}");

    // At phase == loop_start + 0.005s, fade_gain should be ~0.5.
    api.position(1, 0.005).unwrap();
    engine.process(&input, &mut l, &mut r);
    let out_mid_start = half(l[0], r[0]);
    assert!((out_mid_start - 0.5).abs() < 0.05, "out_mid_start={out_mid_start}");

    // At phase == loop_end - 0.005s, fade_gain should also be ~0.5.
    api.position(1, 1.0 - 0.005).unwrap();
    engine.process(&input, &mut l, &mut r);
    let out_mid_end = half(l[0], r[0]);
    assert!((out_mid_end - 0.5).abs() < 0.05, "out_mid_end={out_mid_end}");
}
