// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP client.
//!
//! [`ModbusClient`] owns one TCP connection to one remote server and issues
//! request/response transactions over it. Transaction identifiers increment
//! monotonically per session; every response is validated against the
//! request (transaction id, protocol id, unit id, function echo) before its
//! payload is decoded.
//!
//! All argument preconditions (16-bit address-space fit, per-PDU item
//! limits, bulk-write buffer shapes) are checked before any wire I/O, so a
//! precondition failure never leaves a transaction half-exchanged.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{ModbusError, ModbusResult};
use crate::frame::{self, MbapHeader};
use crate::types::{ModbusTcpConfig, RegisterKind};

/// One `(start_address, item_count)` register range.
pub type RegisterRange = (u16, usize);

/// FC 0x17 carries at most this many written registers.
const READ_WRITE_MAX_WRITE: u16 = 121;

// =============================================================================
// SessionState
// =============================================================================

/// Lifecycle state of a Modbus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No connection is established.
    Disconnected,
    /// Connected and ready for transactions.
    Connected,
    /// The session has been consumed and can never reconnect.
    Disposed,
}

impl SessionState {
    /// Returns `true` if transactions are possible.
    #[inline]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Disposed => "disposed",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// ModbusClient
// =============================================================================

/// A typed Modbus TCP client bound to a single remote endpoint.
#[derive(Debug)]
pub struct ModbusClient {
    config: ModbusTcpConfig,
    stream: Option<TcpStream>,
    state: SessionState,
    transaction_id: u16,
}

impl ModbusClient {
    /// Creates a client from a validated configuration.
    pub fn new(config: ModbusTcpConfig) -> ModbusResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stream: None,
            state: SessionState::Disconnected,
            transaction_id: 0,
        })
    }

    /// Creates a client for `host:service` with default timeouts.
    pub fn with_endpoint(
        host: impl Into<String>,
        service: impl Into<String>,
        debug: bool,
    ) -> ModbusResult<Self> {
        let config = ModbusTcpConfig::builder()
            .host(host)
            .service(service)
            .debug(debug)
            .build()?;
        Self::new(config)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ModbusTcpConfig {
        &self.config
    }

    /// Returns the current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    // =========================================================================
    // Connection management
    // =========================================================================

    /// Establishes the TCP connection.
    ///
    /// Fails with [`ModbusError::AlreadyConnected`] if a connection exists.
    pub async fn connect(&mut self) -> ModbusResult<()> {
        if self.state == SessionState::Connected {
            return Err(ModbusError::AlreadyConnected);
        }

        let endpoint = self.config.endpoint();
        let port = self.config.port()?;

        let connect = async {
            let mut last_error = None;
            let addrs = tokio::net::lookup_host((self.config.host.as_str(), port))
                .await
                .map_err(|e| ModbusError::connect(&endpoint, e))?;

            for addr in addrs {
                match TcpStream::connect(addr).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) => last_error = Some(e),
                }
            }

            Err(match last_error {
                Some(e) => ModbusError::connect(&endpoint, e),
                None => ModbusError::connect_msg(&endpoint, "host resolved to no addresses"),
            })
        };

        let stream = match timeout(self.config.connect_timeout, connect).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ModbusError::connect_msg(
                    &endpoint,
                    format!("timed out after {:?}", self.config.connect_timeout),
                ))
            }
        };

        stream.set_nodelay(self.config.tcp_nodelay).ok();

        self.stream = Some(stream);
        self.state = SessionState::Connected;

        tracing::info!(
            host = %self.config.host,
            service = %self.config.service,
            unit_id = self.config.unit_id,
            "connected to modbus server"
        );

        Ok(())
    }

    /// Closes the connection.
    ///
    /// Fails with [`ModbusError::NotConnected`] if no connection exists.
    pub async fn disconnect(&mut self) -> ModbusResult<()> {
        if self.state != SessionState::Connected {
            return Err(ModbusError::NotConnected);
        }

        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::warn!(error = %e, "error shutting down modbus connection");
            }
        }

        self.state = SessionState::Disconnected;
        tracing::debug!(endpoint = %self.config.endpoint(), "disconnected from modbus server");
        Ok(())
    }

    /// Consumes the client, closing any live connection.
    pub async fn dispose(mut self) {
        if self.state == SessionState::Connected {
            let _ = self.disconnect().await;
        }
        self.state = SessionState::Disposed;
    }

    // =========================================================================
    // Read operations
    // =========================================================================

    /// Reads `count` coils (FC 0x01).
    pub async fn read_coils(&mut self, address: u16, count: u16) -> ModbusResult<Vec<bool>> {
        self.read_bits_op(RegisterKind::Do, address, count).await
    }

    /// Reads `count` discrete inputs (FC 0x02).
    pub async fn read_discrete_inputs(
        &mut self,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<bool>> {
        self.read_bits_op(RegisterKind::Di, address, count).await
    }

    /// Reads `count` holding registers (FC 0x03).
    pub async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        self.read_words_op(RegisterKind::Ao, address, count).await
    }

    /// Reads `count` input registers (FC 0x04).
    pub async fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        self.read_words_op(RegisterKind::Ai, address, count).await
    }

    async fn read_bits_op(
        &mut self,
        kind: RegisterKind,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<bool>> {
        check_count(count as usize, kind.max_read_count())?;
        check_range(address, count as usize)?;

        let function = kind.read_function_code();
        let pdu = frame::read_request(function, address, count);
        let response = self.transaction(read_op_name(kind), &pdu).await?;
        frame::parse_bits(&response, function, count)
    }

    async fn read_words_op(
        &mut self,
        kind: RegisterKind,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        check_count(count as usize, kind.max_read_count())?;
        check_range(address, count as usize)?;

        let function = kind.read_function_code();
        let pdu = frame::read_request(function, address, count);
        let response = self.transaction(read_op_name(kind), &pdu).await?;
        let registers = frame::parse_registers(&response, function)?;

        if registers.len() != count as usize {
            return Err(ModbusError::protocol(format!(
                "requested {count} registers, server returned {}",
                registers.len()
            )));
        }
        Ok(registers)
    }

    // =========================================================================
    // Write operations
    // =========================================================================

    /// Writes coils starting at `address`.
    ///
    /// A single value uses FC 0x05, multiple values FC 0x0F.
    pub async fn write_coils(&mut self, address: u16, values: &[bool]) -> ModbusResult<()> {
        check_count(values.len(), RegisterKind::Do.max_write_count().unwrap_or(0))?;
        check_range(address, values.len())?;

        if let [value] = values {
            let word = if *value { 0xFF00 } else { 0x0000 };
            let pdu = frame::write_single_coil(address, *value);
            let response = self.transaction("write_single_coil", &pdu).await?;
            frame::check_write_echo(&response, 0x05, address, word)
        } else {
            let pdu = frame::write_multiple_coils(address, values);
            let response = self.transaction("write_multiple_coils", &pdu).await?;
            frame::check_write_echo(&response, 0x0F, address, values.len() as u16)
        }
    }

    /// Writes holding registers starting at `address`.
    ///
    /// A single value uses FC 0x06, multiple values FC 0x10.
    pub async fn write_registers(&mut self, address: u16, values: &[u16]) -> ModbusResult<()> {
        check_count(values.len(), RegisterKind::Ao.max_write_count().unwrap_or(0))?;
        check_range(address, values.len())?;

        if let [value] = values {
            let pdu = frame::write_single_register(address, *value);
            let response = self.transaction("write_single_register", &pdu).await?;
            frame::check_write_echo(&response, 0x06, address, *value)
        } else {
            let pdu = frame::write_multiple_registers(address, values);
            let response = self.transaction("write_multiple_registers", &pdu).await?;
            frame::check_write_echo(&response, 0x10, address, values.len() as u16)
        }
    }

    /// Writes then reads holding registers in one transaction (FC 0x17).
    pub async fn read_write_registers(
        &mut self,
        read_address: u16,
        read_count: u16,
        write_address: u16,
        write_values: &[u16],
    ) -> ModbusResult<Vec<u16>> {
        check_count(read_count as usize, RegisterKind::Ao.max_read_count())?;
        check_count(write_values.len(), READ_WRITE_MAX_WRITE)?;
        check_range(read_address, read_count as usize)?;
        check_range(write_address, write_values.len())?;

        let pdu = frame::read_write_registers(read_address, read_count, write_address, write_values);
        let response = self.transaction("read_write_registers", &pdu).await?;
        let registers = frame::parse_registers(&response, 0x17)?;

        if registers.len() != read_count as usize {
            return Err(ModbusError::protocol(format!(
                "requested {read_count} registers, server returned {}",
                registers.len()
            )));
        }
        Ok(registers)
    }

    // =========================================================================
    // Bulk operations
    // =========================================================================

    /// Reads every coil range, one transaction per range.
    pub async fn read_coils_bulk(
        &mut self,
        ranges: &[RegisterRange],
    ) -> ModbusResult<Vec<Vec<bool>>> {
        check_read_ranges(ranges, RegisterKind::Do)?;

        let mut result = Vec::with_capacity(ranges.len());
        for &(address, length) in ranges {
            result.push(self.read_coils(address, length as u16).await?);
        }
        Ok(result)
    }

    /// Reads every discrete-input range, one transaction per range.
    pub async fn read_discrete_inputs_bulk(
        &mut self,
        ranges: &[RegisterRange],
    ) -> ModbusResult<Vec<Vec<bool>>> {
        check_read_ranges(ranges, RegisterKind::Di)?;

        let mut result = Vec::with_capacity(ranges.len());
        for &(address, length) in ranges {
            result.push(self.read_discrete_inputs(address, length as u16).await?);
        }
        Ok(result)
    }

    /// Reads every holding-register range, one transaction per range.
    pub async fn read_holding_registers_bulk(
        &mut self,
        ranges: &[RegisterRange],
    ) -> ModbusResult<Vec<Vec<u16>>> {
        check_read_ranges(ranges, RegisterKind::Ao)?;

        let mut result = Vec::with_capacity(ranges.len());
        for &(address, length) in ranges {
            result.push(self.read_holding_registers(address, length as u16).await?);
        }
        Ok(result)
    }

    /// Reads every input-register range, one transaction per range.
    pub async fn read_input_registers_bulk(
        &mut self,
        ranges: &[RegisterRange],
    ) -> ModbusResult<Vec<Vec<u16>>> {
        check_read_ranges(ranges, RegisterKind::Ai)?;

        let mut result = Vec::with_capacity(ranges.len());
        for &(address, length) in ranges {
            result.push(self.read_input_registers(address, length as u16).await?);
        }
        Ok(result)
    }

    /// Writes every coil range from its parallel value buffer.
    pub async fn write_coils_bulk(
        &mut self,
        ranges: &[RegisterRange],
        values: &[Vec<bool>],
    ) -> ModbusResult<()> {
        check_write_shape(ranges, values.iter().map(Vec::len), RegisterKind::Do)?;

        for (&(address, _), buffer) in ranges.iter().zip(values) {
            self.write_coils(address, buffer).await?;
        }
        Ok(())
    }

    /// Writes every holding-register range from its parallel value buffer.
    pub async fn write_registers_bulk(
        &mut self,
        ranges: &[RegisterRange],
        values: &[Vec<u16>],
    ) -> ModbusResult<()> {
        check_write_shape(ranges, values.iter().map(Vec::len), RegisterKind::Ao)?;

        for (&(address, _), buffer) in ranges.iter().zip(values) {
            self.write_registers(address, buffer).await?;
        }
        Ok(())
    }

    /// Pairs read and write ranges into combined FC 0x17 transactions.
    ///
    /// With `K = min(|read_ranges|, |write_ranges|)`: the first `K` pairs go
    /// through one combined transaction each; leftover read ranges `K..` are
    /// issued as plain holding-register reads; leftover write ranges `K..`
    /// as plain register writes.
    pub async fn read_write_registers_bulk(
        &mut self,
        read_ranges: &[RegisterRange],
        write_ranges: &[RegisterRange],
        write_values: &[Vec<u16>],
    ) -> ModbusResult<Vec<Vec<u16>>> {
        check_read_ranges(read_ranges, RegisterKind::Ao)?;
        check_write_shape(write_ranges, write_values.iter().map(Vec::len), RegisterKind::Ao)?;

        let paired = read_ranges.len().min(write_ranges.len());

        // The paired prefix goes out as FC 0x17, which carries fewer written
        // registers than FC 0x10; reject before any transaction is issued.
        for &(_, length) in &write_ranges[..paired] {
            check_count(length, READ_WRITE_MAX_WRITE)?;
        }

        let mut result = Vec::with_capacity(read_ranges.len());

        for i in 0..paired {
            let (read_address, read_length) = read_ranges[i];
            let (write_address, _) = write_ranges[i];
            result.push(
                self.read_write_registers(
                    read_address,
                    read_length as u16,
                    write_address,
                    &write_values[i],
                )
                .await?,
            );
        }

        for &(address, length) in &read_ranges[paired..] {
            result.push(self.read_holding_registers(address, length as u16).await?);
        }

        for i in paired..write_ranges.len() {
            self.write_registers(write_ranges[i].0, &write_values[i]).await?;
        }

        Ok(result)
    }

    // =========================================================================
    // Transaction plumbing
    // =========================================================================

    /// Sends one request PDU and returns the validated response PDU.
    async fn transaction(&mut self, operation: &'static str, pdu: &[u8]) -> ModbusResult<Vec<u8>> {
        if self.state != SessionState::Connected {
            return Err(ModbusError::NotConnected);
        }

        self.transaction_id = self.transaction_id.wrapping_add(1);
        let transaction_id = self.transaction_id;
        let unit_id = self.config.unit_id;
        let debug = self.config.debug;
        let operation_timeout = self.config.operation_timeout;

        let header = MbapHeader::new(transaction_id, pdu.len(), unit_id);
        let mut request = Vec::with_capacity(MbapHeader::SIZE + pdu.len());
        request.extend_from_slice(&header.to_bytes());
        request.extend_from_slice(pdu);

        if debug {
            tracing::trace!(op = operation, tx = %frame::hex_dump(&request), "modbus request");
        }

        let stream = self.stream.as_mut().ok_or(ModbusError::NotConnected)?;

        let exchange = async {
            stream
                .write_all(&request)
                .await
                .map_err(ModbusError::transport)?;

            let mut header_buf = [0u8; MbapHeader::SIZE];
            stream
                .read_exact(&mut header_buf)
                .await
                .map_err(ModbusError::transport)?;

            let response_header = MbapHeader::from_bytes(&header_buf)?;
            if response_header.protocol_id != 0 {
                return Err(ModbusError::protocol(format!(
                    "non-zero protocol id {}",
                    response_header.protocol_id
                )));
            }
            if response_header.transaction_id != transaction_id {
                return Err(ModbusError::protocol(format!(
                    "transaction id mismatch: sent {transaction_id}, got {}",
                    response_header.transaction_id
                )));
            }
            if response_header.unit_id != unit_id {
                return Err(ModbusError::protocol(format!(
                    "unit id mismatch: sent {unit_id}, got {}",
                    response_header.unit_id
                )));
            }

            let mut body = vec![0u8; response_header.pdu_len()?];
            stream
                .read_exact(&mut body)
                .await
                .map_err(ModbusError::transport)?;
            Ok(body)
        };

        let body = match timeout(operation_timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ModbusError::Timeout {
                    operation,
                    timeout: operation_timeout,
                })
            }
        };

        if debug {
            tracing::trace!(op = operation, rx = %frame::hex_dump(&body), "modbus response");
        }

        Ok(body)
    }
}

// =============================================================================
// Precondition checks
// =============================================================================

fn read_op_name(kind: RegisterKind) -> &'static str {
    match kind {
        RegisterKind::Di => "read_discrete_inputs",
        RegisterKind::Do => "read_coils",
        RegisterKind::Ai => "read_input_registers",
        RegisterKind::Ao => "read_holding_registers",
    }
}

/// The range must fit the 16-bit register address space.
fn check_range(address: u16, length: usize) -> ModbusResult<()> {
    if length > u16::MAX as usize || address as usize + length > u16::MAX as usize {
        return Err(ModbusError::AddressOutOfRange { address, length });
    }
    Ok(())
}

fn check_count(count: usize, max: u16) -> ModbusResult<()> {
    if count == 0 || count > max as usize {
        return Err(ModbusError::TooManyItems { count, max });
    }
    Ok(())
}

fn check_read_ranges(ranges: &[RegisterRange], kind: RegisterKind) -> ModbusResult<()> {
    for &(address, length) in ranges {
        check_count(length, kind.max_read_count())?;
        check_range(address, length)?;
    }
    Ok(())
}

fn check_write_shape(
    ranges: &[RegisterRange],
    value_lens: impl ExactSizeIterator<Item = usize>,
    kind: RegisterKind,
) -> ModbusResult<()> {
    if ranges.len() != value_lens.len() {
        return Err(ModbusError::shape_mismatch(format!(
            "{} ranges but {} value buffers",
            ranges.len(),
            value_lens.len()
        )));
    }

    for (&(address, length), value_len) in ranges.iter().zip(value_lens) {
        if length != value_len {
            return Err(ModbusError::shape_mismatch(format!(
                "range at {address:#06x} covers {length} items but buffer holds {value_len}"
            )));
        }
        check_count(length, kind.max_write_count().unwrap_or(0))?;
        check_range(address, length)?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn client_for(addr: std::net::SocketAddr) -> ModbusClient {
        ModbusClient::with_endpoint(addr.ip().to_string(), addr.port().to_string(), false)
            .unwrap()
    }

    /// Accepts one connection and answers every request with `make_pdu`,
    /// optionally mangling the echoed transaction id.
    async fn serve(listener: TcpListener, pdus: Vec<Vec<u8>>, skew_tid: bool) {
        let (mut sock, _) = listener.accept().await.unwrap();
        for pdu in pdus {
            let mut header = [0u8; MbapHeader::SIZE];
            sock.read_exact(&mut header).await.unwrap();
            let request_len = u16::from_be_bytes([header[4], header[5]]) as usize - 1;
            let mut request = vec![0u8; request_len];
            sock.read_exact(&mut request).await.unwrap();

            let mut tid = u16::from_be_bytes([header[0], header[1]]);
            if skew_tid {
                tid = tid.wrapping_add(1);
            }

            let mut response = Vec::new();
            response.extend_from_slice(&tid.to_be_bytes());
            response.extend_from_slice(&[0, 0]);
            response.extend_from_slice(&((pdu.len() + 1) as u16).to_be_bytes());
            response.push(header[6]);
            response.extend_from_slice(&pdu);
            sock.write_all(&response).await.unwrap();
        }
    }

    #[test]
    fn preconditions_fail_without_io() {
        let mut client = ModbusClient::with_endpoint("127.0.0.1", "502", false).unwrap();
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        // Range past the end of the 16-bit space.
        let err = rt
            .block_on(client.read_coils(0xFFF0, 100))
            .unwrap_err();
        assert!(matches!(err, ModbusError::AddressOutOfRange { .. }));

        // Count beyond the PDU limit.
        let err = rt
            .block_on(client.read_holding_registers(0, 126))
            .unwrap_err();
        assert!(matches!(err, ModbusError::TooManyItems { count: 126, max: 125 }));

        // Zero-length request.
        let err = rt.block_on(client.write_registers(0, &[])).unwrap_err();
        assert!(matches!(err, ModbusError::TooManyItems { count: 0, .. }));

        // Shape mismatch caught before the connection check.
        let err = rt
            .block_on(client.write_coils_bulk(&[(0, 2)], &[vec![true]]))
            .unwrap_err();
        assert!(matches!(err, ModbusError::ShapeMismatch(_)));

        // A paired combined write is held to the FC 0x17 limit, not the
        // FC 0x10 limit, and trips before the first pair is issued.
        let err = rt
            .block_on(client.read_write_registers_bulk(
                &[(0, 1), (16, 1)],
                &[(256, 5), (512, 122)],
                &[vec![0; 5], vec![0; 122]],
            ))
            .unwrap_err();
        assert!(matches!(err, ModbusError::TooManyItems { count: 122, max: 121 }));
    }

    #[test]
    fn ops_require_connection() {
        let mut client = ModbusClient::with_endpoint("127.0.0.1", "502", false).unwrap();
        assert_eq!(client.state(), SessionState::Disconnected);

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = rt.block_on(client.read_coils(0, 1)).unwrap_err();
        assert!(matches!(err, ModbusError::NotConnected));

        let err = rt.block_on(client.disconnect()).unwrap_err();
        assert!(matches!(err, ModbusError::NotConnected));
    }

    #[tokio::test]
    async fn register_read_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(
            listener,
            vec![vec![0x03, 0x04, 0x12, 0x34, 0xAB, 0xCD]],
            false,
        ));

        let mut client = client_for(addr);
        client.connect().await.unwrap();
        assert!(client.state().is_connected());

        let registers = client.read_holding_registers(0x0200, 2).await.unwrap();
        assert_eq!(registers, [0x1234, 0xABCD]);

        client.disconnect().await.unwrap();
        assert_eq!(client.state(), SessionState::Disconnected);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn transaction_id_mismatch_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(
            listener,
            vec![vec![0x03, 0x02, 0x00, 0x01]],
            true,
        ));

        let mut client = client_for(addr);
        client.connect().await.unwrap();

        let err = client.read_holding_registers(0, 1).await.unwrap_err();
        assert!(matches!(err, ModbusError::Protocol(_)));

        // State unchanged by the failed op.
        assert!(client.state().is_connected());
        server.abort();
    }

    #[tokio::test]
    async fn exception_response_surfaces() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, vec![vec![0x84, 0x02]], false));

        let mut client = client_for(addr);
        client.connect().await.unwrap();

        let err = client.read_input_registers(0x9000, 1).await.unwrap_err();
        assert!(matches!(
            err,
            ModbusError::Exception { function: 0x04, code: 0x02, .. }
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn double_connect_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = client_for(addr);
        client.connect().await.unwrap();
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, ModbusError::AlreadyConnected));
        drop(listener);
    }

    #[tokio::test]
    async fn dispose_closes_the_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = client_for(addr);
        client.connect().await.unwrap();
        client.dispose().await;
        drop(listener);
    }

    #[tokio::test]
    async fn single_element_writes_use_single_functions() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(
            listener,
            vec![
                vec![0x05, 0x02, 0x00, 0xFF, 0x00],
                vec![0x06, 0x02, 0x00, 0x00, 0x2A],
            ],
            false,
        ));

        let mut client = client_for(addr);
        client.connect().await.unwrap();
        client.write_coils(0x0200, &[true]).await.unwrap();
        client.write_registers(0x0200, &[42]).await.unwrap();
        server.await.unwrap();
    }
}
