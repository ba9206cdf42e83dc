//! Slot and token listing

use std::io::Write;

use tracing::error;

use crate::error::SpeedResult;
use crate::model::SlotId;
use crate::ports::SlotLister;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Describe every slot, and the token in it when there is one
///
/// A slot whose information cannot be read is reported on the error log
/// and skipped.
///
/// # Returns
///
/// The number of slots described
pub fn show_slots<M, W>(module: &M, out: &mut W) -> SpeedResult<usize>
where
    M: SlotLister + ?Sized,
    W: Write,
{
    let slots = module.slot_list()?;
    writeln!(out, "Available slots:")?;

    let mut shown = 0;
    for slot in slots {
        if describe_slot(module, slot, out)? {
            shown += 1;
        }
    }
    Ok(shown)
}

fn describe_slot<M, W>(module: &M, slot: SlotId, out: &mut W) -> SpeedResult<bool>
where
    M: SlotLister + ?Sized,
    W: Write,
{
    let info = match module.slot_info(slot) {
        Ok(info) => info,
        Err(err) => {
            error!("Could not get info about slot {}: {}", slot, err);
            return Ok(false);
        }
    };

    writeln!(out, "Slot {}", slot)?;
    writeln!(out, "    Slot info:")?;
    writeln!(out, "        Description:      {}", info.description)?;
    writeln!(out, "        Manufacturer ID:  {}", info.manufacturer)?;
    writeln!(out, "        Hardware version: {}", info.hardware_version)?;
    writeln!(out, "        Firmware version: {}", info.firmware_version)?;
    writeln!(out, "        Token present:    {}", yes_no(info.token_present))?;
    if !info.token_present {
        return Ok(true);
    }

    writeln!(out, "    Token info:")?;
    let token = match module.token_info(slot) {
        Ok(token) => token,
        Err(err) => {
            error!("Could not get info about the token in slot {}: {}", slot, err);
            return Ok(true);
        }
    };
    writeln!(out, "        Manufacturer ID:  {}", token.manufacturer)?;
    writeln!(out, "        Model:            {}", token.model)?;
    writeln!(out, "        Hardware version: {}", token.hardware_version)?;
    writeln!(out, "        Firmware version: {}", token.firmware_version)?;
    writeln!(out, "        Serial number:    {}", token.serial_number)?;
    writeln!(out, "        Initialized:      {}", yes_no(token.initialized))?;
    writeln!(
        out,
        "        User PIN init.:   {}",
        yes_no(token.user_pin_initialized)
    )?;
    writeln!(out, "        Label:            {}", token.label)?;
    Ok(true)
}
