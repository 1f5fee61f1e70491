//! Wire protocol spoken with the switch firmware
//!
//! Outbound traffic is binary frames (`AA 55 len payload checksum`);
//! inbound traffic is free text carrying `KEY=VALUE` status fields.

mod command;
mod frame;
mod status;

pub use command::{AlarmAction, Command, TimeOfDay};
pub use frame::{
    CLEAR_ALARMS_FRAME, CommandFrame, FRAME_HEADER, FRAME_OVERHEAD, GET_STATUS_FRAME,
    LIGHT_OFF_FRAME, LIGHT_ON_FRAME, MAX_PAYLOAD_LEN, REBOOT_FRAME, checksum, fixed_frame,
};
pub use status::{MissingFieldPolicy, StatusFields, StatusPolicy, StatusSnapshot};
