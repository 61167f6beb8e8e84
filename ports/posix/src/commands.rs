//! The handful of HCI commands and events the simulated controller and the
//! discovery demo exchange.

/// HCI_Reset.
pub const OPCODE_RESET: u16 = 0x0c03;
/// HCI_LE_Set_Scan_Parameters.
pub const OPCODE_LE_SET_SCAN_PARAMETERS: u16 = 0x200b;
/// HCI_LE_Set_Scan_Enable.
pub const OPCODE_LE_SET_SCAN_ENABLE: u16 = 0x200c;

pub const EVENT_COMMAND_COMPLETE: u8 = 0x0e;
pub const EVENT_LE_META: u8 = 0x3e;
pub const SUBEVENT_ADVERTISING_REPORT: u8 = 0x02;

fn command(opcode: u16, params: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(3 + params.len());
    bytes.extend_from_slice(&opcode.to_le_bytes());
    bytes.push(params.len() as u8);
    bytes.extend_from_slice(params);
    bytes
}

pub fn reset() -> Vec<u8> {
    command(OPCODE_RESET, &[])
}

/// Scan parameters; interval and window are in 0.625 ms units.
pub fn le_set_scan_parameters(active: bool, interval: u16, window: u16) -> Vec<u8> {
    let [interval_lo, interval_hi] = interval.to_le_bytes();
    let [window_lo, window_hi] = window.to_le_bytes();
    command(
        OPCODE_LE_SET_SCAN_PARAMETERS,
        &[
            u8::from(active),
            interval_lo,
            interval_hi,
            window_lo,
            window_hi,
            0x00,
            0x00,
        ],
    )
}

pub fn le_set_scan_enable(enable: bool, filter_duplicates: bool) -> Vec<u8> {
    command(
        OPCODE_LE_SET_SCAN_ENABLE,
        &[u8::from(enable), u8::from(filter_duplicates)],
    )
}

/// Opcode and parameters of a command packet.
pub fn parse_command(bytes: &[u8]) -> Option<(u16, &[u8])> {
    let opcode = u16::from_le_bytes([*bytes.first()?, *bytes.get(1)?]);
    let len = usize::from(*bytes.get(2)?);
    Some((opcode, bytes.get(3..3 + len)?))
}

pub fn command_complete(opcode: u16, status: u8) -> Vec<u8> {
    let [lo, hi] = opcode.to_le_bytes();
    vec![EVENT_COMMAND_COMPLETE, 4, 1, lo, hi, status]
}

/// Opcode and status of a Command Complete event.
pub fn parse_command_complete(bytes: &[u8]) -> Option<(u16, u8)> {
    if *bytes.first()? != EVENT_COMMAND_COMPLETE {
        return None;
    }
    let opcode = u16::from_le_bytes([*bytes.get(3)?, *bytes.get(4)?]);
    Some((opcode, *bytes.get(5)?))
}

/// One entry of an LE Advertising Report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingReport {
    pub event_type: u8,
    pub address_type: u8,
    /// Most significant byte first, as printed.
    pub address: [u8; 6],
    pub data: Vec<u8>,
    pub rssi: i8,
}

impl AdvertisingReport {
    pub fn address_string(&self) -> String {
        self.address
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// LE Meta event carrying this single report.
    pub fn to_event(&self) -> Vec<u8> {
        let mut params = vec![
            SUBEVENT_ADVERTISING_REPORT,
            1,
            self.event_type,
            self.address_type,
        ];
        // Addresses travel little endian.
        params.extend(self.address.iter().rev());
        params.push(self.data.len() as u8);
        params.extend_from_slice(&self.data);
        params.push(self.rssi as u8);

        let mut event = vec![EVENT_LE_META, params.len() as u8];
        event.extend(params);
        event
    }

    /// First report of an LE Advertising Report event.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if *bytes.first()? != EVENT_LE_META || *bytes.get(2)? != SUBEVENT_ADVERTISING_REPORT {
            return None;
        }
        if *bytes.get(3)? == 0 {
            return None;
        }
        let event_type = *bytes.get(4)?;
        let address_type = *bytes.get(5)?;
        let mut address = [0u8; 6];
        for (dst, src) in address.iter_mut().zip(bytes.get(6..12)?.iter().rev()) {
            *dst = *src;
        }
        let data_len = usize::from(*bytes.get(12)?);
        let data = bytes.get(13..13 + data_len)?.to_vec();
        let rssi = *bytes.get(13 + data_len)? as i8;
        Some(Self {
            event_type,
            address_type,
            address,
            data,
            rssi,
        })
    }
}
