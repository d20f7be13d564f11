//! CH9329 command codes, acknowledgement rules and device error codes.
//!
//! Every request carries a command byte.  The chip answers with the same
//! frame layout, using `command + 0x80` for a normal acknowledgement and
//! `command + 0xC0` for an error acknowledgement whose first payload byte is
//! a [`DeviceErrorCode`].

// ── Protocol constants ────────────────────────────────────────────────────────

/// Fixed 3-byte header that starts every frame in both directions.
pub const FRAME_HEADER: [u8; 3] = [0x57, 0xAB, 0x00];

/// Size of the partial header a reader needs to learn the payload length:
/// 3 header bytes + command + length.
pub const PARTIAL_HEADER_SIZE: usize = 5;

/// Smallest possible frame: partial header plus checksum, no payload.
pub const MIN_FRAME_SIZE: usize = PARTIAL_HEADER_SIZE + 1;

/// Offset added to a request code in a normal acknowledgement.
pub const ACK_OFFSET: u8 = 0x80;

/// Offset added to a request code in an error acknowledgement.
pub const ERROR_ACK_OFFSET: u8 = 0xC0;

/// Request codes below this value are acknowledged without a payload to parse.
pub const SIMPLE_COMMAND_LIMIT: u8 = 0x10;

// ── Command codes ─────────────────────────────────────────────────────────────

/// All command codes in the CH9329 serial command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    /// Query version, USB link state and keyboard LED state.
    GetInfo = 0x01,
    /// Standard 8-byte keyboard report.
    SendKeyboardGeneral = 0x02,
    /// Multimedia keyboard report.
    SendKeyboardMedia = 0x03,
    /// Absolute mouse report (0..=4095 on both axes).
    SendMouseAbsolute = 0x04,
    /// Relative mouse report, also used for buttons and wheel.
    SendMouseRelative = 0x05,
    /// Custom HID data towards the target.
    SendCustomHid = 0x06,
    /// Custom HID data read back from the target.
    ReadCustomHid = 0x87,
    /// Read the chip's parameter configuration.
    GetParaConfig = 0x08,
    /// Read a USB string descriptor.
    GetUsbString = 0x0A,
    /// Write a USB string descriptor.
    SetUsbString = 0x0B,
    /// Restore the factory configuration.
    SetDefaultConfig = 0x0C,
    /// Software reset of the chip.
    Reset = 0x0F,
}

impl CommandCode {
    /// Returns the raw command byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Response code of a successful acknowledgement for this command.
    pub fn ack_code(self) -> u8 {
        self.as_u8().wrapping_add(ACK_OFFSET)
    }

    /// Response code of an error acknowledgement for this command.
    pub fn error_ack_code(self) -> u8 {
        self.as_u8().wrapping_add(ERROR_ACK_OFFSET)
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(CommandCode::GetInfo),
            0x02 => Ok(CommandCode::SendKeyboardGeneral),
            0x03 => Ok(CommandCode::SendKeyboardMedia),
            0x04 => Ok(CommandCode::SendMouseAbsolute),
            0x05 => Ok(CommandCode::SendMouseRelative),
            0x06 => Ok(CommandCode::SendCustomHid),
            0x87 => Ok(CommandCode::ReadCustomHid),
            0x08 => Ok(CommandCode::GetParaConfig),
            0x0A => Ok(CommandCode::GetUsbString),
            0x0B => Ok(CommandCode::SetUsbString),
            0x0C => Ok(CommandCode::SetDefaultConfig),
            0x0F => Ok(CommandCode::Reset),
            _ => Err(()),
        }
    }
}

// ── Report mode bytes ─────────────────────────────────────────────────────────

/// First payload byte of an absolute mouse report.
pub const MOUSE_ABSOLUTE_MODE: u8 = 0x02;

/// First payload byte of a relative mouse report.
pub const MOUSE_RELATIVE_MODE: u8 = 0x01;

/// Payload length of a general keyboard report.
pub const KEYBOARD_REPORT_LEN: usize = 8;

/// Payload length of an absolute mouse report.
pub const MOUSE_ABSOLUTE_REPORT_LEN: usize = 7;

/// Payload length of a relative mouse report.
pub const MOUSE_RELATIVE_REPORT_LEN: usize = 5;

// ── Device error codes ────────────────────────────────────────────────────────

/// Status byte carried by an error acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceErrorCode {
    Success = 0x00,
    Timeout = 0xE1,
    BadHeader = 0xE2,
    BadCommand = 0xE3,
    BadChecksum = 0xE4,
    BadParameter = 0xE5,
    BadOperation = 0xE6,
}

impl DeviceErrorCode {
    /// Symbolic name as printed in the chip datasheet.
    pub fn description(self) -> &'static str {
        match self {
            DeviceErrorCode::Success => "DEF_CMD_SUCCESS",
            DeviceErrorCode::Timeout => "DEF_CMD_ERR_TIMEOUT",
            DeviceErrorCode::BadHeader => "DEF_CMD_ERR_HEAD",
            DeviceErrorCode::BadCommand => "DEF_CMD_ERR_CMD",
            DeviceErrorCode::BadChecksum => "DEF_CMD_ERR_SUM",
            DeviceErrorCode::BadParameter => "DEF_CMD_ERR_PARA",
            DeviceErrorCode::BadOperation => "DEF_CMD_ERR_OPERATE",
        }
    }
}

impl TryFrom<u8> for DeviceErrorCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(DeviceErrorCode::Success),
            0xE1 => Ok(DeviceErrorCode::Timeout),
            0xE2 => Ok(DeviceErrorCode::BadHeader),
            0xE3 => Ok(DeviceErrorCode::BadCommand),
            0xE4 => Ok(DeviceErrorCode::BadChecksum),
            0xE5 => Ok(DeviceErrorCode::BadParameter),
            0xE6 => Ok(DeviceErrorCode::BadOperation),
            _ => Err(()),
        }
    }
}
