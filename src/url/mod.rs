//! URL handling: normalization, identity derivation, handle extraction

mod handle;
mod identity;
mod normalize;

pub use handle::{extract_handle, profile_url_for};
pub use identity::{identity_of, resolve_identity, ItemIdentity};
pub use normalize::{extract_host, normalize_url, resolve_url};
