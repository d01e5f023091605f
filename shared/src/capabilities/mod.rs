//! Shell-side effects of the catalog core.
//!
//! Render and Http come straight from Crux; the pacing delay and the image
//! cache are small custom capabilities.
mod image_cache;
mod pacing;

pub use crux_core::render::Render;
pub use crux_http::Http;

pub use self::image_cache::{ImageCache, ImageCacheOperation};
pub use self::pacing::{Pacing, PacingOperation};

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub pacing: Pacing<Event>,
    pub image_cache: ImageCache<Event>,
}
