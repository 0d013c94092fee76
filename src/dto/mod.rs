//! Wire data types shared by the transport, the services and the view.

use serde::{Deserialize, Deserializer};

/// Named server events.
pub mod events;
/// Room phase for the view.
pub mod phase;
/// Room snapshots.
pub mod snapshot;
/// Player-code and name validation.
pub mod validation;

/// Deserialize a field that the server may send as `null`, falling back to its default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
