//! Client-side feed synchronization and mutation model: the session
//! gateway tracking the signed-in identity, the post store adapter
//! translating UI intents into document-store writes, and the view
//! projection holding the last-known feed state.

pub mod feed;
pub mod projection;
pub mod provider;
pub mod session;
