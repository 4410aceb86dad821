//! Tags and filters that `Engine::new` registers.
//!
//! Nothing here is special to the engine: every entry goes through the same
//! public registration calls a host would use.

mod filters;
mod tags;

use crate::engine::Engine;
use crate::error::Result;

pub fn register(engine: &Engine) -> Result<()> {
    tags::register(engine);
    filters::register(engine)
}
