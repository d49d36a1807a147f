use portbridge_codec::json::{parse_integer, skip_value};
use portbridge_codec::{Cursor, Result};

/// Serial line settings carried by `serial_open_raw`.
///
/// Values are stored as sent; range validation happens in the driver when
/// the port is configured. `buffer_size` is accepted and forwarded but the
/// core itself never uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialOptions {
    pub bit_rate: u32,
    pub buffer_size: u32,
    /// 0 = none, 1 = software XON/XOFF, 2 = hardware RTS/CTS.
    pub cts_flow_control: u8,
    pub data_bits: u8,
    /// 0 = none, 1 = odd, 2 = even.
    pub parity_bit: u8,
    /// 0 = one, 1 = one and a half (driven as two), 2 = two.
    pub stop_bits: u8,
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            bit_rate: 9600,
            buffer_size: 4096,
            cts_flow_control: 1,
            data_bits: 8,
            parity_bit: 0,
            stop_bits: 1,
        }
    }
}

impl SerialOptions {
    /// Apply one key/value pair from the options object. Unknown keys are
    /// skipped, not errors.
    pub(crate) fn apply(&mut self, key: &str, cur: &mut Cursor) -> Result<()> {
        match key {
            "bitRate" => self.bit_rate = parse_integer(cur)? as u32,
            "bufferSize" => self.buffer_size = parse_integer(cur)? as u32,
            "ctsFlowControl" => self.cts_flow_control = parse_integer(cur)? as u8,
            "dataBits" => self.data_bits = parse_integer(cur)? as u8,
            "parityBit" => self.parity_bit = parse_integer(cur)? as u8,
            "stopBits" => self.stop_bits = parse_integer(cur)? as u8,
            _ => skip_value(cur)?,
        }
        Ok(())
    }
}
