// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Cycle-timing scenarios: overrun termination, recovery from sporadic
//! overruns, and graceful shutdown.

use std::time::{Duration, Instant};

use wisp_bin::engine::{CycleEngine, EngineOptions, EngineState};
use wisp_bin::error::{AppError, EX_TEMPFAIL};
use wisp_bin::shutdown::ShutdownFlag;
use wisp_image::MemFactory;
use wisp_modbus::ModbusClient;
use wisp_tests::common::{FakeCoupler, FakeCouplerConfig};

/// 4-channel digital input clamp: exactly one Modbus request per cycle.
const DI_4: u16 = 0x8401;

fn options(cycle_ms: u64) -> EngineOptions {
    EngineOptions {
        prefix: "test_".to_string(),
        force: false,
        cycle: Duration::from_millis(cycle_ms),
        cycle_time_fail: true,
        cycle_time_warn: false,
        read_start_image: false,
        quiet: true,
    }
}

async fn init_engine(fake: &FakeCoupler, options: EngineOptions) -> CycleEngine {
    let client = ModbusClient::with_endpoint(fake.host(), fake.service(), false)
        .expect("client config");
    let mut engine = CycleEngine::new(client, options);
    engine.init(&MemFactory).await.expect("init");
    engine
}

#[tokio::test]
async fn permanent_overrun_terminates_with_tempfail() {
    let fake = FakeCoupler::spawn(FakeCouplerConfig::with_clamps(&[DI_4])).await;
    let mut engine = init_engine(&fake, options(10)).await;

    // Every request now takes twice the cycle period.
    fake.set_stall(Duration::from_millis(20), None);

    let started = Instant::now();
    let err = engine.run(&ShutdownFlag::new()).await.unwrap_err();

    assert!(matches!(err, AppError::CycleOverrun));
    assert_eq!(err.exit_code(), EX_TEMPFAIL);
    assert_eq!(engine.state(), EngineState::Closed);

    // Eleven consecutive overruns at ~20 ms each; well under five seconds.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn sporadic_overruns_do_not_terminate() {
    let fake = FakeCoupler::spawn(FakeCouplerConfig::with_clamps(&[DI_4])).await;
    let engine = init_engine(&fake, options(10)).await;

    // Ten slow requests bring the fail counter to exactly 100, which is not
    // past the limit; everything after that is fast and decrements it.
    fake.set_stall(Duration::from_millis(20), Some(10));

    let flag = ShutdownFlag::new();
    let task_flag = flag.clone();
    let task = tokio::spawn(async move {
        let mut engine = engine;
        let result = engine.run(&task_flag).await;
        (result, engine)
    });

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!task.is_finished(), "ten overruns must not terminate the loop");

    flag.raise();
    let (result, engine) = task.await.unwrap();
    result.unwrap();
    assert_eq!(engine.state(), EngineState::Closed);
}

#[tokio::test]
async fn shutdown_flag_stops_a_free_running_loop() {
    let fake = FakeCoupler::spawn(FakeCouplerConfig::with_clamps(&[DI_4])).await;
    let engine = init_engine(&fake, options(0)).await;

    let flag = ShutdownFlag::new();
    let task_flag = flag.clone();
    let task = tokio::spawn(async move {
        let mut engine = engine;
        let result = engine.run(&task_flag).await;
        (result, engine)
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    flag.raise();

    let (result, engine) = task.await.unwrap();
    result.unwrap();
    assert_eq!(engine.state(), EngineState::Closed);

    // The free-running loop really cycled.
    let reads = fake
        .served()
        .iter()
        .filter(|(function, address)| *function == 0x02 && *address == 0x0000)
        .count();
    assert!(reads > 10, "expected many input fetches, saw {reads}");
}

#[tokio::test]
async fn read_start_image_primes_outputs_from_the_coupler() {
    let fake = FakeCoupler::spawn(FakeCouplerConfig::with_clamps(&[0x8102])).await;

    // The coupler already drives its single output high.
    let client = ModbusClient::with_endpoint(fake.host(), fake.service(), false).unwrap();
    let mut seed = client;
    seed.connect().await.unwrap();
    seed.write_coils(0x0200, &[true]).await.unwrap();
    seed.disconnect().await.unwrap();

    let mut options = options(0);
    options.read_start_image = true;
    let engine = init_engine(&fake, options).await;

    let flag = ShutdownFlag::new();
    let task_flag = flag.clone();
    let task = tokio::spawn(async move {
        let mut engine = engine;
        let result = engine.run(&task_flag).await;
        (result, engine)
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    flag.raise();
    let (result, _) = task.await.unwrap();
    result.unwrap();

    // The start image kept the output high instead of zeroing it.
    assert_eq!(fake.coils(0x0200, 1), [true]);
}
