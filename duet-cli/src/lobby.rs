use anyhow::{Context, Result, bail};
use dialoguer::Input;
use duet_core::RoomId;

/// Asks for a room name on the terminal.
pub fn prompt_room() -> Result<RoomId> {
    let room: String = Input::new()
        .with_prompt("Room to join")
        .default("lobby".to_owned())
        .interact_text()
        .context("Failed to read the room name")?;

    let room = room.trim();
    if room.is_empty() {
        bail!("A room name is required");
    }
    Ok(RoomId::from(room))
}
