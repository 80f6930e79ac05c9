#[path = "1-published.rs"]
mod published;

#[path = "2-listeners.rs"]
mod listeners;

#[path = "3-sequenced.rs"]
mod sequenced;

pub use listeners::*;
pub use published::*;
pub use sequenced::*;

#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ListenerKey(pub(crate) slotmap::DefaultKey);
