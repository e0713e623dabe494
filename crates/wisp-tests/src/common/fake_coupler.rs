// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! An in-process Modbus TCP server imitating a WAGO fieldbus coupler.
//!
//! The fake serves the four register banks over real TCP, publishes the
//! WAGO identity constants and a configurable clamp-configuration block,
//! records every served `(function, address)` pair for verification, and
//! can stall requests to provoke cycle overruns.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use wisp_coupler::probe::{CLAMP_CONFIG_ADDR, IDENTITY_ADDR, IDENTITY_CONSTANTS};

// =============================================================================
// Configuration
// =============================================================================

/// Initial state of the fake coupler.
#[derive(Debug, Clone)]
pub struct FakeCouplerConfig {
    /// The identity block published at `0x2000` (stored little-endian like
    /// the real coupler).
    pub identity: [u16; 9],
    /// Clamp configuration words, slot 0 (the coupler head) first.
    pub clamp_config: Vec<u16>,
}

impl Default for FakeCouplerConfig {
    fn default() -> Self {
        Self {
            identity: IDENTITY_CONSTANTS,
            clamp_config: vec![0; 65],
        }
    }
}

impl FakeCouplerConfig {
    /// A coupler carrying the given clamp words in slots 1..=n.
    pub fn with_clamps(words: &[u16]) -> Self {
        let mut clamp_config = vec![0u16; 65];
        clamp_config[1..1 + words.len()].copy_from_slice(words);
        Self {
            clamp_config,
            ..Self::default()
        }
    }

    /// Corrupts one identity word, making the probe reject the device.
    pub fn with_bad_identity(mut self, index: usize, word: u16) -> Self {
        self.identity[index] = word;
        self
    }
}

// =============================================================================
// Banks
// =============================================================================

struct Banks {
    coils: Vec<u8>,
    discrete: Vec<u8>,
    input_regs: Vec<u16>,
    holding: Vec<u16>,
    served: Vec<(u8, u16)>,
    stall: Duration,
    stall_budget: Option<usize>,
}

impl Banks {
    fn new(config: &FakeCouplerConfig) -> Self {
        let mut input_regs = vec![0u16; 0x10000];
        for (i, word) in config.identity.iter().enumerate() {
            input_regs[IDENTITY_ADDR as usize + i] = word.to_le();
        }

        let mut holding = vec![0u16; 0x10000];
        for (i, word) in config.clamp_config.iter().enumerate() {
            holding[CLAMP_CONFIG_ADDR as usize + i] = word.to_le();
        }

        Self {
            coils: vec![0; 0x10000],
            discrete: vec![0; 0x10000],
            input_regs,
            holding,
            served: Vec::new(),
            stall: Duration::ZERO,
            stall_budget: None,
        }
    }

    fn dispatch(&mut self, pdu: &[u8]) -> Vec<u8> {
        let function = pdu[0];
        let address = if pdu.len() >= 3 {
            u16::from_be_bytes([pdu[1], pdu[2]])
        } else {
            0
        };
        self.served.push((function, address));

        match function {
            0x01 | 0x02 => {
                let count = u16::from_be_bytes([pdu[3], pdu[4]]) as usize;
                let bank = if function == 0x01 { &self.coils } else { &self.discrete };
                let bits: Vec<bool> = bank[address as usize..address as usize + count]
                    .iter()
                    .map(|b| *b != 0)
                    .collect();

                let mut packed = vec![0u8; count.div_ceil(8)];
                for (i, bit) in bits.iter().enumerate() {
                    if *bit {
                        packed[i / 8] |= 1 << (i % 8);
                    }
                }

                let mut response = vec![function, packed.len() as u8];
                response.extend_from_slice(&packed);
                response
            }
            0x03 | 0x04 => {
                let count = u16::from_be_bytes([pdu[3], pdu[4]]) as usize;
                let bank = if function == 0x03 { &self.holding } else { &self.input_regs };

                let mut response = vec![function, (count * 2) as u8];
                for word in &bank[address as usize..address as usize + count] {
                    response.extend_from_slice(&word.to_be_bytes());
                }
                response
            }
            0x05 => {
                let value = u16::from_be_bytes([pdu[3], pdu[4]]);
                self.coils[address as usize] = u8::from(value == 0xFF00);
                pdu.to_vec()
            }
            0x06 => {
                let value = u16::from_be_bytes([pdu[3], pdu[4]]);
                self.holding[address as usize] = value;
                pdu.to_vec()
            }
            0x0F => {
                let count = u16::from_be_bytes([pdu[3], pdu[4]]) as usize;
                for i in 0..count {
                    let bit = (pdu[6 + i / 8] >> (i % 8)) & 1;
                    self.coils[address as usize + i] = bit;
                }
                let mut response = vec![function];
                response.extend_from_slice(&pdu[1..5]);
                response
            }
            0x10 => {
                let count = u16::from_be_bytes([pdu[3], pdu[4]]) as usize;
                for i in 0..count {
                    let word = u16::from_be_bytes([pdu[6 + i * 2], pdu[7 + i * 2]]);
                    self.holding[address as usize + i] = word;
                }
                let mut response = vec![function];
                response.extend_from_slice(&pdu[1..5]);
                response
            }
            0x17 => {
                let read_count = u16::from_be_bytes([pdu[3], pdu[4]]) as usize;
                let write_address = u16::from_be_bytes([pdu[5], pdu[6]]) as usize;
                let write_count = u16::from_be_bytes([pdu[7], pdu[8]]) as usize;

                for i in 0..write_count {
                    let word = u16::from_be_bytes([pdu[10 + i * 2], pdu[11 + i * 2]]);
                    self.holding[write_address + i] = word;
                }

                let mut response = vec![function, (read_count * 2) as u8];
                for word in &self.holding[address as usize..address as usize + read_count] {
                    response.extend_from_slice(&word.to_be_bytes());
                }
                response
            }
            _ => vec![function | 0x80, 0x01],
        }
    }

    fn take_stall(&mut self) -> Duration {
        if self.stall.is_zero() {
            return Duration::ZERO;
        }
        match &mut self.stall_budget {
            None => self.stall,
            Some(0) => Duration::ZERO,
            Some(budget) => {
                *budget -= 1;
                self.stall
            }
        }
    }
}

// =============================================================================
// FakeCoupler
// =============================================================================

/// Handle to a running fake coupler.
pub struct FakeCoupler {
    addr: std::net::SocketAddr,
    banks: Arc<Mutex<Banks>>,
    server: JoinHandle<()>,
}

impl FakeCoupler {
    /// Binds a listener and starts serving.
    pub async fn spawn(config: FakeCouplerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake coupler");
        let addr = listener.local_addr().expect("local addr");
        let banks = Arc::new(Mutex::new(Banks::new(&config)));

        let server_banks = banks.clone();
        let server = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                serve_connection(socket, server_banks.clone()).await;
            }
        });

        Self { addr, banks, server }
    }

    /// Host string for the client.
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Service string for the client.
    pub fn service(&self) -> String {
        self.addr.port().to_string()
    }

    /// Stalls every request by `stall`; `budget` limits how many requests
    /// stall before the server turns fast again.
    pub fn set_stall(&self, stall: Duration, budget: Option<usize>) {
        let mut banks = self.banks.lock().unwrap();
        banks.stall = stall;
        banks.stall_budget = budget;
    }

    /// Overwrites discrete inputs starting at `address`.
    pub fn set_discrete_inputs(&self, address: u16, bits: &[bool]) {
        let mut banks = self.banks.lock().unwrap();
        for (i, bit) in bits.iter().enumerate() {
            banks.discrete[address as usize + i] = u8::from(*bit);
        }
    }

    /// Overwrites input registers starting at `address`.
    pub fn set_input_registers(&self, address: u16, words: &[u16]) {
        let mut banks = self.banks.lock().unwrap();
        banks.input_regs[address as usize..address as usize + words.len()]
            .copy_from_slice(words);
    }

    /// Reads back coils starting at `address`.
    pub fn coils(&self, address: u16, len: usize) -> Vec<bool> {
        let banks = self.banks.lock().unwrap();
        banks.coils[address as usize..address as usize + len]
            .iter()
            .map(|b| *b != 0)
            .collect()
    }

    /// Reads back holding registers starting at `address`.
    pub fn holding_registers(&self, address: u16, len: usize) -> Vec<u16> {
        let banks = self.banks.lock().unwrap();
        banks.holding[address as usize..address as usize + len].to_vec()
    }

    /// Every `(function, address)` pair served so far.
    pub fn served(&self) -> Vec<(u8, u16)> {
        self.banks.lock().unwrap().served.clone()
    }
}

impl Drop for FakeCoupler {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn serve_connection(mut socket: TcpStream, banks: Arc<Mutex<Banks>>) {
    loop {
        let mut header = [0u8; 7];
        if socket.read_exact(&mut header).await.is_err() {
            return;
        }

        let pdu_len = u16::from_be_bytes([header[4], header[5]]) as usize - 1;
        let mut pdu = vec![0u8; pdu_len];
        if socket.read_exact(&mut pdu).await.is_err() {
            return;
        }

        // The stall is taken under the lock but slept outside it.
        let stall = banks.lock().unwrap().take_stall();
        if !stall.is_zero() {
            tokio::time::sleep(stall).await;
        }

        let response_pdu = banks.lock().unwrap().dispatch(&pdu);

        let mut response = Vec::with_capacity(7 + response_pdu.len());
        response.extend_from_slice(&header[0..2]);
        response.extend_from_slice(&[0, 0]);
        response.extend_from_slice(&((response_pdu.len() + 1) as u16).to_be_bytes());
        response.push(header[6]);
        response.extend_from_slice(&response_pdu);

        if socket.write_all(&response).await.is_err() {
            return;
        }
    }
}
