// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Image exchange scenarios: window spanning, output round trips, and the
//! wire functions each segment kind uses.

use std::time::Duration;

use wisp_bin::engine::{CycleEngine, EngineOptions};
use wisp_image::MemFactory;
use wisp_modbus::{ModbusClient, ModbusError, RegisterKind};
use wisp_tests::common::{FakeCoupler, FakeCouplerConfig};

fn options() -> EngineOptions {
    EngineOptions {
        prefix: "test_".to_string(),
        force: false,
        cycle: Duration::ZERO,
        cycle_time_fail: true,
        cycle_time_warn: false,
        read_start_image: false,
        quiet: true,
    }
}

async fn init_engine(fake: &FakeCoupler) -> CycleEngine {
    let client = ModbusClient::with_endpoint(fake.host(), fake.service(), false)
        .expect("client config");
    let mut engine = CycleEngine::new(client, options());
    engine.init(&MemFactory).await.expect("init");
    engine
}

/// 75-channel digital input clamp.
const DI_75: u16 = 0x8000 | (75 << 8) | 0x01;
/// 8-channel digital output clamp.
const DO_8: u16 = 0x8000 | (8 << 8) | 0x02;
/// 1-channel digital output clamp.
const DO_1: u16 = 0x8000 | (1 << 8) | 0x02;

#[tokio::test]
async fn six_hundred_inputs_span_both_windows() {
    // Eight 75-channel DI clamps.
    let fake = FakeCoupler::spawn(FakeCouplerConfig::with_clamps(&[DI_75; 8])).await;
    let mut engine = init_engine(&fake).await;

    let segments = engine.layout().segments(RegisterKind::Di).to_vec();
    assert_eq!(segments.len(), 2);
    assert_eq!((segments[0].address, segments[0].length, segments[0].offset), (0x0000, 512, 0));
    assert_eq!((segments[1].address, segments[1].length, segments[1].offset), (0x8000, 88, 512));
    assert_eq!(engine.image().unwrap().count(RegisterKind::Di), 600);

    // Mark the edges of both windows and fetch.
    let mut first = vec![false; 512];
    first[0] = true;
    first[511] = true;
    fake.set_discrete_inputs(0x0000, &first);

    let mut second = vec![false; 88];
    second[0] = true;
    second[87] = true;
    fake.set_discrete_inputs(0x8000, &second);

    engine.fetch_image(false).await.unwrap();

    let image = engine.image().unwrap();
    assert!(image.read_bit(RegisterKind::Di, 0).unwrap());
    assert!(image.read_bit(RegisterKind::Di, 511).unwrap());
    assert!(image.read_bit(RegisterKind::Di, 512).unwrap());
    assert!(image.read_bit(RegisterKind::Di, 599).unwrap());
    assert!(!image.read_bit(RegisterKind::Di, 100).unwrap());
}

#[tokio::test]
async fn digital_output_round_trip_through_the_coupler() {
    // Two 8-channel DO clamps.
    let fake = FakeCoupler::spawn(FakeCouplerConfig::with_clamps(&[DO_8, DO_8])).await;
    let mut engine = init_engine(&fake).await;

    let pattern: Vec<bool> = (0..16).map(|i| i % 3 == 0).collect();
    engine
        .image_mut()
        .unwrap()
        .store_bits(RegisterKind::Do, 0, &pattern)
        .unwrap();

    engine.send_image().await.unwrap();
    assert_eq!(fake.coils(0x0200, 16), pattern);

    // Scramble the local image, then fetch it back including outputs.
    engine
        .image_mut()
        .unwrap()
        .store_bits(RegisterKind::Do, 0, &vec![false; 16])
        .unwrap();
    engine.fetch_image(true).await.unwrap();

    let image = engine.image().unwrap();
    let read_back: Vec<bool> = (0..16)
        .map(|i| image.read_bit(RegisterKind::Do, i).unwrap())
        .collect();
    assert_eq!(read_back, pattern);
}

#[tokio::test]
async fn single_output_bit_uses_write_single_coil() {
    let fake = FakeCoupler::spawn(FakeCouplerConfig::with_clamps(&[DO_1])).await;
    let mut engine = init_engine(&fake).await;

    engine.image_mut().unwrap().write_bit(0, true).unwrap();
    engine.send_image().await.unwrap();

    assert!(
        fake.served().contains(&(0x05, 0x0200)),
        "one-bit segment must go out as write-single-coil at the DO window"
    );
    assert_eq!(fake.coils(0x0200, 1), [true]);
}

#[tokio::test]
async fn analog_outputs_use_the_holding_register_path() {
    // One 4-channel AO clamp (product id 553).
    let fake = FakeCoupler::spawn(FakeCouplerConfig::with_clamps(&[553])).await;
    let mut engine = init_engine(&fake).await;

    let values = [0x0102u16, 0x0304, 0xFFFF, 0x0000];
    for (i, value) in values.iter().enumerate() {
        engine.image_mut().unwrap().write_word(i, *value).unwrap();
    }

    engine.send_image().await.unwrap();

    let served = fake.served();
    assert!(
        served.contains(&(0x10, 0x0200)),
        "AO segments must use write-multiple-registers: {served:?}"
    );
    assert!(
        !served.iter().any(|(function, _)| matches!(function, 0x05 | 0x0F)),
        "AO segments must never take the coil path: {served:?}"
    );
    assert_eq!(fake.holding_registers(0x0200, 4), values);

    // And they come back over the holding-register read.
    engine.fetch_image(true).await.unwrap();
    assert!(fake.served().contains(&(0x03, 0x0200)));
    assert_eq!(
        engine.image().unwrap().read_word(RegisterKind::Ao, 2).unwrap(),
        0xFFFF
    );
}

#[tokio::test]
async fn combined_read_write_pairs_and_leftovers() {
    let fake = FakeCoupler::spawn(FakeCouplerConfig::default()).await;
    let mut client = ModbusClient::with_endpoint(fake.host(), fake.service(), false).unwrap();
    client.connect().await.unwrap();

    client.write_registers(0x0100, &[1, 2, 3]).await.unwrap();

    // More reads than writes: the leftover read range is served plain.
    let result = client
        .read_write_registers_bulk(
            &[(0x0100, 3), (0x0140, 2)],
            &[(0x0300, 2)],
            &[vec![0xAA, 0xBB]],
        )
        .await
        .unwrap();
    assert_eq!(result, vec![vec![1, 2, 3], vec![0, 0]]);
    assert_eq!(fake.holding_registers(0x0300, 2), [0xAA, 0xBB]);

    let served = fake.served();
    assert!(served.contains(&(0x17, 0x0100)), "paired transaction: {served:?}");
    assert!(served.contains(&(0x03, 0x0140)), "leftover read: {served:?}");

    // More writes than reads: leftover writes start at the pairing point,
    // not past the end of the list.
    client
        .read_write_registers_bulk(
            &[(0x0100, 1)],
            &[(0x0310, 1), (0x0320, 2)],
            &[vec![7], vec![8, 9]],
        )
        .await
        .unwrap();
    assert_eq!(fake.holding_registers(0x0310, 1), [7]);
    assert_eq!(fake.holding_registers(0x0320, 2), [8, 9]);

    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn oversized_paired_write_fails_before_any_wire_io() {
    let fake = FakeCoupler::spawn(FakeCouplerConfig::default()).await;
    let mut client = ModbusClient::with_endpoint(fake.host(), fake.service(), false).unwrap();
    client.connect().await.unwrap();

    // 122 registers fit a plain FC 0x10 write but not a paired FC 0x17
    // transaction. The second pair is the offender; the first pair must not
    // have reached the wire when the call fails.
    let err = client
        .read_write_registers_bulk(
            &[(0x0000, 1), (0x0010, 1)],
            &[(0x0400, 5), (0x0500, 122)],
            &[vec![0; 5], vec![0; 122]],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ModbusError::TooManyItems { count: 122, max: 121 }));
    assert!(
        fake.served().is_empty(),
        "no transaction may go out: {:?}",
        fake.served()
    );

    // At 121 the same shape is legal end to end.
    client
        .read_write_registers_bulk(
            &[(0x0000, 1), (0x0010, 1)],
            &[(0x0400, 5), (0x0500, 121)],
            &[vec![1; 5], vec![2; 121]],
        )
        .await
        .unwrap();
    assert_eq!(fake.holding_registers(0x0500, 121), vec![2u16; 121]);
    assert_eq!(fake.holding_registers(0x0400, 5), vec![1u16; 5]);

    client.disconnect().await.unwrap();
}
